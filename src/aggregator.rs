//! Session Aggregation Engine
//!
//! Turns the raw lines picked by the file selector into per-mount-point report
//! buckets. Aggregation is a pure function of its inputs: the same lines, window
//! and options always give the same buckets.
//!
//! ## Pipeline
//!
//! 1. **Pre-filter**: drop lines that do not request a selected mount point
//! 2. **Sort**: order lines by their disconnect timestamp (civil fields, not text)
//! 3. **Parse**: run each line through [`LogLineParser`]; malformed lines are logged and dropped
//! 4. **Duration filter**: drop sessions shorter than the minimum (default 3 seconds)
//! 5. **Connect time**: disconnect time minus duration
//! 6. **Window**: keep sessions according to the [`WindowMode`]
//! 7. **Bucketing**: append the formatted report line to the mount point's bucket
//!
//! ## Window modes
//!
//! Historically the window check excluded a session only when its connect time
//! was both before the start and after the end, which never happens, so every
//! parsed session was kept. [`WindowMode::Historical`] reproduces that and is the
//! default; [`WindowMode::Strict`] keeps only sessions that connected inside
//! the window.

use crate::models::{DateWindow, MountPointBuckets};
use crate::parser::{LogLineParser, MountPointFilter, ParseOutcome};
use crate::timestamp_parser::{compare_disconnect, extract_bracketed_timestamp, LogTimestamp};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, warn};

/// Sessions shorter than this are treated as probes and dropped.
pub const DEFAULT_MIN_DURATION_SECS: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowMode {
    /// Keep every parsed session regardless of its connect time.
    #[default]
    Historical,
    /// Keep sessions whose connect time lies inside the window.
    Strict,
}

impl WindowMode {
    pub fn admits(&self, window: &DateWindow, connect_epoch: i64) -> bool {
        match self {
            WindowMode::Historical => {
                !(connect_epoch < window.start_epoch() && connect_epoch > window.end_epoch())
            }
            WindowMode::Strict => window.contains(connect_epoch),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateOptions {
    pub min_duration_secs: u64,
    pub window_mode: WindowMode,
    /// Render report dates and times in UTC instead of the logged offset.
    pub report_in_utc: bool,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            min_duration_secs: DEFAULT_MIN_DURATION_SECS,
            window_mode: WindowMode::default(),
            report_in_utc: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregateStats {
    #[serde(rename = "linesIn")]
    pub lines_in: usize,
    #[serde(rename = "prefiltered")]
    pub prefiltered: usize,
    pub malformed: usize,
    #[serde(rename = "tooShort")]
    pub too_short: usize,
    #[serde(rename = "outsideWindow")]
    pub outside_window: usize,
    pub bucketed: usize,
}

#[derive(Debug, Clone)]
pub struct Aggregation {
    pub buckets: MountPointBuckets,
    pub stats: AggregateStats,
}

/// Order lines by disconnect timestamp; lines without one go last.
fn compare_keyed(a: &Option<LogTimestamp>, b: &Option<LogTimestamp>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => compare_disconnect(a, b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub struct SessionAggregator {
    parser: LogLineParser,
    options: AggregateOptions,
}

impl Default for SessionAggregator {
    fn default() -> Self {
        Self::new(AggregateOptions::default())
    }
}

impl SessionAggregator {
    pub fn new(options: AggregateOptions) -> Self {
        Self {
            parser: LogLineParser::new(),
            options,
        }
    }

    pub fn options(&self) -> &AggregateOptions {
        &self.options
    }

    pub fn aggregate<S: AsRef<str>>(
        &self,
        lines: &[S],
        window: &DateWindow,
        filter: &MountPointFilter,
    ) -> Aggregation {
        let mut stats = AggregateStats {
            lines_in: lines.len(),
            ..Default::default()
        };
        let mut buckets = MountPointBuckets::new(filter.names());

        let mut keyed: Vec<(Option<LogTimestamp>, &str)> = lines
            .iter()
            .map(|line| line.as_ref())
            .filter(|line| filter.admits_line(line))
            .map(|line| (extract_bracketed_timestamp(line), line))
            .collect();
        stats.prefiltered = lines.len() - keyed.len();

        keyed.sort_by(|a, b| compare_keyed(&a.0, &b.0));

        for (_, line) in keyed {
            let record = match self.parser.parse_line(line, filter) {
                ParseOutcome::Parsed(record) => record,
                ParseOutcome::Filtered => {
                    stats.prefiltered += 1;
                    continue;
                }
                ParseOutcome::Malformed(reason) => {
                    warn!(reason = %reason, line = %line, "Skipping malformed log line");
                    stats.malformed += 1;
                    continue;
                }
            };

            if record.duration_secs < self.options.min_duration_secs {
                stats.too_short += 1;
                continue;
            }

            let connect = record.connect_epoch();
            if !self.options.window_mode.admits(window, connect) {
                debug!(
                    ip = %record.ip_address,
                    connect_epoch = connect,
                    "Session connected outside the date window"
                );
                stats.outside_window += 1;
                continue;
            }

            let formatted = match record.report_line(self.options.report_in_utc) {
                Ok(formatted) => formatted,
                Err(e) => {
                    warn!(error = %e, line = %line, "Skipping unrenderable session");
                    stats.malformed += 1;
                    continue;
                }
            };

            if buckets.push(&record.mount_point, formatted) {
                stats.bucketed += 1;
            }
        }

        Aggregation { buckets, stats }
    }
}
