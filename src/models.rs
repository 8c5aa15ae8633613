//! Core Data Models
//!
//! This module defines the data structures that flow through the report pipeline,
//! from raw access-log lines to per-mount-point report buckets.
//!
//! ## Data Flow
//!
//! 1. **Discovery**: [`LogFileCandidate`] - An access log considered for ingestion
//! 2. **Parsing**: [`SessionRecord`] - One listener session parsed from a log line
//! 3. **Aggregation**: [`MountPointBuckets`] - Formatted report lines grouped by mount point
//! 4. **Reporting**: [`RunSummary`] - What a run read, kept, and wrote
//!
//! The operator's date range is carried as a [`DateWindow`].

use crate::timestamp_parser::{
    format_at_offset, parse_operator_date, LogTimestamp, ONE_DAY_SECONDS,
};
use anyhow::{bail, Result};
use chrono::{Duration, NaiveDate, NaiveTime};
use serde::Serialize;
use std::path::PathBuf;

/// Rotated logs dated up to this many days past the window end are still read,
/// since a rotation can hold sessions that started inside the window.
pub const ROTATION_SLACK_DAYS: i64 = 7;

/// One listener session parsed from an access-log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRecord {
    pub ip_address: String,
    /// When the listener disconnected; Icecast logs the end of a session.
    pub disconnect: LogTimestamp,
    pub mount_point: String,
    pub status: u16,
    pub bytes: u64,
    pub referer: String,
    pub user_agent: String,
    pub duration_secs: u64,
    /// Anything logged after the duration field.
    pub trailing: Option<String>,
}

impl SessionRecord {
    /// UTC epoch seconds at which the session started.
    pub fn connect_epoch(&self) -> i64 {
        let duration = i64::try_from(self.duration_secs).unwrap_or(i64::MAX);
        self.disconnect.epoch_seconds().saturating_sub(duration)
    }

    /// Render the tab-separated report line for this session.
    ///
    /// The connect time is shown at the offset it was logged with, or in UTC
    /// when `in_utc` is set.
    pub fn report_line(&self, in_utc: bool) -> Result<String> {
        let offset = if in_utc {
            0
        } else {
            self.disconnect.utc_offset_minutes
        };
        let (date, time) = format_at_offset(self.connect_epoch(), offset)?;

        Ok(format!(
            "{}\t{}\t{}\t{}\t{:03}\t{:03}\t{}/{}",
            self.ip_address,
            date,
            time,
            self.mount_point,
            self.duration_secs,
            self.status,
            self.referer,
            self.user_agent
        ))
    }
}

/// The operator's inclusive `[start_date, end_date]` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Offset east of UTC at which the dates denote midnight.
    pub utc_offset_minutes: i32,
}

impl DateWindow {
    pub fn new(
        start_date: NaiveDate,
        end_date: NaiveDate,
        utc_offset_minutes: i32,
    ) -> Result<Self> {
        if start_date > end_date {
            bail!(
                "Start date {} is after end date {}",
                start_date.format("%d/%b/%Y"),
                end_date.format("%d/%b/%Y")
            );
        }
        Ok(Self {
            start_date,
            end_date,
            utc_offset_minutes,
        })
    }

    /// Build a window from two `DD/Mon/YYYY` literals.
    pub fn parse(start: &str, end: &str, utc_offset_minutes: i32) -> Result<Self> {
        Self::new(
            parse_operator_date(start)?,
            parse_operator_date(end)?,
            utc_offset_minutes,
        )
    }

    fn midnight_epoch(&self, date: NaiveDate) -> i64 {
        date.and_time(NaiveTime::MIN).and_utc().timestamp()
            - i64::from(self.utc_offset_minutes) * 60
    }

    /// Epoch seconds of midnight on the start date.
    pub fn start_epoch(&self) -> i64 {
        self.midnight_epoch(self.start_date)
    }

    /// Epoch seconds of midnight after the end date.
    pub fn end_epoch(&self) -> i64 {
        self.midnight_epoch(self.end_date) + ONE_DAY_SECONDS
    }

    pub fn contains(&self, epoch_seconds: i64) -> bool {
        epoch_seconds >= self.start_epoch() && epoch_seconds <= self.end_epoch()
    }

    /// Last rotation date whose file may still hold in-window sessions.
    pub fn rotation_limit(&self) -> NaiveDate {
        self.end_date + Duration::days(ROTATION_SLACK_DAYS)
    }

    pub fn admits_rotation_date(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.rotation_limit()
    }
}

/// A directory entry considered for ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileCandidate {
    pub path: PathBuf,
    pub file_name: String,
    /// Date from a `.log.YYYYMMDD_N` rotation suffix; `None` for the live log.
    pub rotation_date: Option<NaiveDate>,
}

impl LogFileCandidate {
    pub fn is_live(&self) -> bool {
        self.rotation_date.is_none()
    }
}

/// Report lines for one mount point, in chronological order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MountPointBucket {
    pub name: String,
    pub lines: Vec<String>,
}

/// One bucket per configured mount point, in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountPointBuckets {
    buckets: Vec<MountPointBucket>,
}

impl MountPointBuckets {
    pub fn new<S: AsRef<str>>(names: &[S]) -> Self {
        let mut buckets: Vec<MountPointBucket> = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            if name.is_empty() || buckets.iter().any(|b| b.name.eq_ignore_ascii_case(name)) {
                continue;
            }
            buckets.push(MountPointBucket {
                name: name.to_string(),
                lines: Vec::new(),
            });
        }
        Self { buckets }
    }

    /// Append a line to the bucket matching `mount_point`, ignoring case.
    /// Returns `false` when no bucket matches.
    pub fn push(&mut self, mount_point: &str, line: String) -> bool {
        match self
            .buckets
            .iter_mut()
            .find(|b| b.name.eq_ignore_ascii_case(mount_point))
        {
            Some(bucket) => {
                bucket.lines.push(line);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, mount_point: &str) -> Option<&MountPointBucket> {
        self.buckets
            .iter()
            .find(|b| b.name.eq_ignore_ascii_case(mount_point))
    }

    pub fn iter(&self) -> impl Iterator<Item = &MountPointBucket> {
        self.buckets.iter()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn total_lines(&self) -> usize {
        self.buckets.iter().map(|b| b.lines.len()).sum()
    }
}

/// A report written for one mount point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenReport {
    #[serde(rename = "mountPoint")]
    pub mount_point: String,
    #[serde(rename = "fileName")]
    pub file_name: String,
    pub lines: usize,
}

/// What one run read, kept and wrote.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    #[serde(rename = "runId")]
    pub run_id: String,
    #[serde(rename = "startDate")]
    pub start_date: String,
    #[serde(rename = "endDate")]
    pub end_date: String,
    pub destination: String,
    #[serde(rename = "filesRead")]
    pub files_read: usize,
    #[serde(rename = "linesRead")]
    pub lines_read: usize,
    #[serde(rename = "malformedLines")]
    pub malformed_lines: usize,
    #[serde(rename = "shortSessions")]
    pub short_sessions: usize,
    #[serde(rename = "outsideWindow")]
    pub outside_window: usize,
    pub reports: Vec<WrittenReport>,
}

impl RunSummary {
    pub fn total_sessions(&self) -> usize {
        self.reports.iter().map(|r| r.lines).sum()
    }
}
