//! SoundExchange report output.
//!
//! Each mount point becomes one tab-separated report named
//! `<mount>-<YYYY-MM-DD>.txt`, written either as a loose file or as an entry of
//! one zip archive. Both targets receive exactly the same bytes.

use crate::models::{MountPointBucket, MountPointBuckets, WrittenReport};
use crate::parser::ROOT_MOUNT;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const REPORT_HEADER: &str = "IP Address\tDate\tTime\tStream\tDuration\tStatus\tReferrer";
pub const LINE_ENDING: &str = "\r\n";

/// Where reports go. The two targets are mutually exclusive per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "path", rename_all = "lowercase")]
pub enum OutputTarget {
    Directory(PathBuf),
    Archive(PathBuf),
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputTarget::Directory(path) => write!(f, "directory {}", path.display()),
            OutputTarget::Archive(path) => write!(f, "archive {}", path.display()),
        }
    }
}

/// File (or archive entry) name for a mount point's report.
pub fn report_file_name(mount_point: &str, end_date: NaiveDate) -> String {
    let stem = if mount_point == ROOT_MOUNT {
        "root".to_string()
    } else {
        mount_point.trim_matches('/').replace('/', "_")
    };
    format!("{}-{}.txt", stem, end_date.format("%Y-%m-%d"))
}

/// Header plus one line per session, every line CRLF-terminated.
pub fn render_report(bucket: &MountPointBucket) -> String {
    let mut content = String::with_capacity(64 * (bucket.lines.len() + 1));
    content.push_str(REPORT_HEADER);
    content.push_str(LINE_ENDING);
    for line in &bucket.lines {
        content.push_str(line);
        content.push_str(LINE_ENDING);
    }
    content
}

pub struct ReportWriter;

impl Default for ReportWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write one report per bucket and return what was written.
    pub fn write(
        &self,
        buckets: &MountPointBuckets,
        target: &OutputTarget,
        end_date: NaiveDate,
    ) -> Result<Vec<WrittenReport>> {
        let reports: Vec<(WrittenReport, String)> = buckets
            .iter()
            .filter(|bucket| !bucket.name.is_empty())
            .map(|bucket| {
                (
                    WrittenReport {
                        mount_point: bucket.name.clone(),
                        file_name: report_file_name(&bucket.name, end_date),
                        lines: bucket.lines.len(),
                    },
                    render_report(bucket),
                )
            })
            .collect();

        match target {
            OutputTarget::Directory(dir) => write_directory(dir, &reports)?,
            OutputTarget::Archive(path) => write_archive(path, &reports)?,
        }

        Ok(reports.into_iter().map(|(report, _)| report).collect())
    }
}

fn write_directory(dir: &Path, reports: &[(WrittenReport, String)]) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    for (report, content) in reports {
        let path = dir.join(&report.file_name);
        fs::write(&path, content)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        info!(path = %path.display(), lines = report.lines, "Wrote report");
    }
    Ok(())
}

fn write_archive(path: &Path, reports: &[(WrittenReport, String)]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create archive: {}", path.display()))?;
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (report, content) in reports {
        zip.start_file(report.file_name.as_str(), options)
            .with_context(|| format!("Failed to add {} to {}", report.file_name, path.display()))?;
        zip.write_all(content.as_bytes()).with_context(|| {
            format!("Failed to write {} to {}", report.file_name, path.display())
        })?;
        info!(
            archive = %path.display(),
            entry = %report.file_name,
            lines = report.lines,
            "Added report"
        );
    }

    zip.finish()
        .with_context(|| format!("Failed to finish archive: {}", path.display()))?;
    Ok(())
}
