use crate::models::{DateWindow, LogFileCandidate};
use crate::timestamp_parser::extract_bracketed_timestamp;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use glob::Pattern;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Default name pattern for Icecast access logs.
pub const DEFAULT_FILE_PATTERN: &str = "access*";

static LOG_NAME: OnceLock<Regex> = OnceLock::new();

fn log_name_regex() -> &'static Regex {
    LOG_NAME.get_or_init(|| {
        Regex::new(r"\.log(?:\.(?P<date>\d{8})_(?P<suffix>[^/]+))?$")
            .expect("log name pattern is valid")
    })
}

/// Counters describing what the selector looked at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionStats {
    #[serde(rename = "filesConsidered")]
    pub files_considered: usize,
    #[serde(rename = "filesOutOfWindow")]
    pub files_out_of_window: usize,
    #[serde(rename = "liveFilesWithoutWindowData")]
    pub live_files_without_window_data: usize,
    #[serde(rename = "filesRead")]
    pub files_read: usize,
    #[serde(rename = "linesExcluded")]
    pub lines_excluded: usize,
}

/// Lines selected for a run, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub lines: Vec<String>,
    pub stats: SelectionStats,
}

/// Handles directory traversal and selection of access logs for a date window
pub struct LogFileSelector {
    file_pattern: Pattern,
    excluded_addresses: HashSet<String>,
}

impl LogFileSelector {
    pub fn new<S: AsRef<str>>(file_pattern: &str, excluded_addresses: &[S]) -> Result<Self> {
        let file_pattern = Pattern::new(file_pattern)
            .with_context(|| format!("Invalid log file pattern: {}", file_pattern))?;

        Ok(Self {
            file_pattern,
            excluded_addresses: excluded_addresses
                .iter()
                .map(|a| a.as_ref().trim().to_string())
                .filter(|a| !a.is_empty())
                .collect(),
        })
    }

    /// Classify a path as an access log. `None` means it is not one.
    ///
    /// A rotation suffix with an impossible date leaves the file undated, so
    /// it goes through the same content check as the live log.
    pub fn candidate_for(&self, path: &Path) -> Option<LogFileCandidate> {
        let file_name = path.file_name().and_then(|n| n.to_str())?;
        if !self.file_pattern.matches(file_name) {
            return None;
        }
        let caps = log_name_regex().captures(file_name)?;

        let rotation_date = caps.name("date").and_then(|date| {
            match NaiveDate::parse_from_str(date.as_str(), "%Y%m%d") {
                Ok(date) => Some(date),
                Err(e) => {
                    warn!(
                        file = %file_name,
                        error = %e,
                        "Invalid rotation date in file name, checking contents instead"
                    );
                    None
                }
            }
        });

        Some(LogFileCandidate {
            path: path.to_path_buf(),
            file_name: file_name.to_string(),
            rotation_date,
        })
    }

    /// List the access logs in `directory`, sorted by name.
    pub fn discover_candidates(&self, directory: &Path) -> Result<Vec<LogFileCandidate>> {
        let entries = fs::read_dir(directory)
            .with_context(|| format!("Failed to read log directory: {}", directory.display()))?;

        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let entry = entry.with_context(|| {
                format!("Failed to read entry in log directory: {}", directory.display())
            })?;
            let path = entry.path();
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        Ok(paths
            .iter()
            .filter_map(|path| self.candidate_for(path))
            .collect())
    }

    /// Read every selected log for `window` and return its lines.
    pub fn select_log_lines(&self, directory: &Path, window: &DateWindow) -> Result<Selection> {
        let mut selection = Selection::default();

        for candidate in self.discover_candidates(directory)? {
            selection.stats.files_considered += 1;

            if let Some(date) = candidate.rotation_date {
                if !window.admits_rotation_date(date) {
                    debug!(
                        file = %candidate.file_name,
                        rotation_date = %date,
                        "Rotated log is outside the date window"
                    );
                    selection.stats.files_out_of_window += 1;
                    continue;
                }
            }

            let lines = self.read_filtered_lines(&candidate.path, &mut selection.stats)?;

            if candidate.is_live() && !content_in_window(&lines, window) {
                info!(
                    file = %candidate.file_name,
                    "Live log has no entries inside the date window"
                );
                selection.stats.live_files_without_window_data += 1;
                continue;
            }

            debug!(file = %candidate.file_name, lines = lines.len(), "Selected log file");
            selection.stats.files_read += 1;
            selection.lines.extend(lines);
        }

        Ok(selection)
    }

    fn read_filtered_lines(&self, path: &Path, stats: &mut SelectionStats) -> Result<Vec<String>> {
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read log file: {}", path.display()))?;
        let content = String::from_utf8_lossy(&bytes);

        let mut lines = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            if self.is_excluded(line) {
                stats.lines_excluded += 1;
                continue;
            }
            lines.push(line.to_string());
        }
        Ok(lines)
    }

    fn is_excluded(&self, line: &str) -> bool {
        line.split_whitespace()
            .next()
            .map_or(false, |addr| self.excluded_addresses.contains(addr))
    }
}

/// Does any line carry a timestamp inside the (widened) window?
pub fn content_in_window(lines: &[String], window: &DateWindow) -> bool {
    lines.iter().any(|line| {
        extract_bracketed_timestamp(line)
            .map_or(false, |ts| window.contains(ts.epoch_seconds()))
    })
}
