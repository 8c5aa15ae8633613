//! Run summary output.
//!
//! Prints what a run produced, either as colored terminal text or as a JSON
//! document for scripts.

use crate::models::RunSummary;
use anyhow::{Context, Result};
use colored::Colorize;

pub struct SummaryDisplay;

impl Default for SummaryDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl SummaryDisplay {
    pub fn new() -> Self {
        Self
    }

    pub fn show(&self, summary: &RunSummary, json_output: bool) -> Result<()> {
        if json_output {
            println!("{}", self.to_json(summary)?);
        } else {
            self.print_text(summary);
        }
        Ok(())
    }

    pub fn to_json(&self, summary: &RunSummary) -> Result<String> {
        serde_json::to_string_pretty(summary).context("Failed to serialize run summary")
    }

    fn print_text(&self, summary: &RunSummary) {
        println!("\n{}", "=".repeat(60).bright_cyan());
        println!(
            "{}",
            format!(
                "SoundExchange reports {} to {}",
                summary.start_date, summary.end_date
            )
            .bright_white()
            .bold()
        );
        println!("{}", "=".repeat(60).bright_cyan());

        println!(
            "\n{} files • {} lines • {} sessions → {}\n",
            summary.files_read.to_string().bright_white().bold(),
            summary.lines_read.to_string().bright_white().bold(),
            summary.total_sessions().to_string().bright_green().bold(),
            summary.destination.bright_white()
        );

        for report in &summary.reports {
            let count = if report.lines == 0 {
                report.lines.to_string().bright_yellow()
            } else {
                report.lines.to_string().bright_green()
            };
            println!(
                "   {} {} ({} sessions)",
                report.mount_point.bright_cyan(),
                report.file_name.bright_white(),
                count
            );
        }

        if summary.malformed_lines > 0 {
            println!(
                "\n{} {} malformed lines skipped",
                "!".bright_yellow(),
                summary.malformed_lines
            );
        }
        println!();
    }
}
