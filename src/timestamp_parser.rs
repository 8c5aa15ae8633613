//! Date and time helpers for Icecast access logs.
//!
//! Access logs carry timestamps like `05/Mar/2013:22:09:36 -0600` and operators
//! pass dates like `05/Mar/2013`. Everything that compares instants goes through
//! [`to_epoch_seconds`], so a log line and a window boundary are always compared
//! as UTC epoch seconds.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;
use std::cmp::Ordering;

/// Seconds in one calendar day.
pub const ONE_DAY_SECONDS: i64 = 86_400;

/// Format of operator-supplied dates (`05/Mar/2013`).
pub const OPERATOR_DATE_FORMAT: &str = "%d/%b/%Y";

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Map an English three-letter month abbreviation to `0..=11`.
pub fn month_ordinal(name: &str) -> Result<u32> {
    MONTH_NAMES
        .iter()
        .position(|m| m.eq_ignore_ascii_case(name))
        .map(|idx| idx as u32)
        .with_context(|| format!("Unknown month name: {}", name))
}

/// Strictly parse a civil date such as `05/Mar/2013` using a chrono format.
pub fn parse_civil_date(text: &str, format: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), format)
        .with_context(|| format!("Invalid date '{}', expected format {}", text, format))
}

/// Parse an operator date in `DD/Mon/YYYY` form.
pub fn parse_operator_date(text: &str) -> Result<NaiveDate> {
    parse_civil_date(text, OPERATOR_DATE_FORMAT)
}

/// Interpret broken-down fields as local time at `utc_offset_minutes` east of
/// UTC and return UTC epoch seconds.
pub fn to_epoch_seconds(
    year: i32,
    month0: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
    utc_offset_minutes: i32,
) -> Result<i64> {
    if month0 > 11 {
        bail!("Month ordinal out of range: {}", month0);
    }
    let date = NaiveDate::from_ymd_opt(year, month0 + 1, day).with_context(|| {
        format!("Invalid calendar date {:04}-{:02}-{:02}", year, month0 + 1, day)
    })?;
    let local = date
        .and_hms_opt(hour, minute, second)
        .with_context(|| format!("Invalid time of day {:02}:{:02}:{:02}", hour, minute, second))?;

    Ok(local.and_utc().timestamp() - i64::from(utc_offset_minutes) * 60)
}

/// Parse a `+HHMM` / `-HHMM` offset into minutes east of UTC.
pub fn parse_utc_offset(text: &str) -> Result<i32> {
    let bytes = text.as_bytes();
    if bytes.len() != 5 || !bytes[1..].iter().all(u8::is_ascii_digit) {
        bail!("Invalid UTC offset: {}", text);
    }
    let sign = match bytes[0] {
        b'+' => 1,
        b'-' => -1,
        _ => bail!("Invalid UTC offset sign: {}", text),
    };
    let hours: i32 = text[1..3].parse()?;
    let minutes: i32 = text[3..5].parse()?;
    if hours > 23 || minutes > 59 {
        bail!("UTC offset out of range: {}", text);
    }
    Ok(sign * (hours * 60 + minutes))
}

/// Render an epoch instant as `(YYYY-MM-DD, HH:MM:SS)` at the given offset.
pub fn format_at_offset(epoch_seconds: i64, utc_offset_minutes: i32) -> Result<(String, String)> {
    let offset = FixedOffset::east_opt(utc_offset_minutes * 60)
        .with_context(|| format!("Invalid UTC offset of {} minutes", utc_offset_minutes))?;
    let instant = DateTime::from_timestamp(epoch_seconds, 0)
        .with_context(|| format!("Timestamp out of range: {}", epoch_seconds))?
        .with_timezone(&offset);

    Ok((
        instant.format("%Y-%m-%d").to_string(),
        instant.format("%H:%M:%S").to_string(),
    ))
}

/// A bracketed access-log timestamp, kept in the civil form it was logged in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LogTimestamp {
    pub year: i32,
    pub month0: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub utc_offset_minutes: i32,
    epoch: i64,
}

impl LogTimestamp {
    /// Parse `DD/Mon/YYYY:HH:MM:SS ±ZZZZ`.
    pub fn parse(text: &str) -> Result<Self> {
        let (datetime, offset) = text
            .trim()
            .split_once(' ')
            .with_context(|| format!("Missing UTC offset in timestamp: {}", text))?;
        let (date, time) = datetime
            .split_once(':')
            .with_context(|| format!("Missing time of day in timestamp: {}", text))?;

        let mut date_parts = date.splitn(3, '/');
        let (day, month, year) = match (date_parts.next(), date_parts.next(), date_parts.next()) {
            (Some(d), Some(m), Some(y)) => (d, m, y),
            _ => bail!("Malformed date in timestamp: {}", text),
        };

        let mut time_parts = time.splitn(3, ':');
        let (hour, minute, second) = match (time_parts.next(), time_parts.next(), time_parts.next())
        {
            (Some(h), Some(m), Some(s)) => (h, m, s),
            _ => bail!("Malformed time in timestamp: {}", text),
        };

        Self::from_parts(
            parse_digits(year, 4, "year")? as i32,
            month_ordinal(month)?,
            parse_digits(day, 2, "day")?,
            parse_digits(hour, 2, "hour")?,
            parse_digits(minute, 2, "minute")?,
            parse_digits(second, 2, "second")?,
            parse_utc_offset(offset.trim())?,
        )
    }

    pub fn from_parts(
        year: i32,
        month0: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
        utc_offset_minutes: i32,
    ) -> Result<Self> {
        let epoch = to_epoch_seconds(year, month0, day, hour, minute, second, utc_offset_minutes)?;
        Ok(Self {
            year,
            month0,
            day,
            hour,
            minute,
            second,
            utc_offset_minutes,
            epoch,
        })
    }

    /// UTC epoch seconds of this instant.
    pub fn epoch_seconds(&self) -> i64 {
        self.epoch
    }

    fn civil_key(&self) -> (i32, u32, u32, u32, u32, u32) {
        (self.year, self.month0, self.day, self.hour, self.minute, self.second)
    }
}

/// Order two disconnect timestamps by `(year, month, day, hour, minute, second)`.
pub fn compare_disconnect(a: &LogTimestamp, b: &LogTimestamp) -> Ordering {
    a.civil_key().cmp(&b.civil_key())
}

/// Pull the first `[...]` timestamp out of a raw log line.
pub fn extract_bracketed_timestamp(line: &str) -> Option<LogTimestamp> {
    let open = line.find('[')?;
    let close = line[open..].find(']')? + open;
    LogTimestamp::parse(&line[open + 1..close]).ok()
}

fn parse_digits(text: &str, max_len: usize, field: &str) -> Result<u32> {
    if text.is_empty() || text.len() > max_len || !text.bytes().all(|b| b.is_ascii_digit()) {
        bail!("Invalid {} field: '{}'", field, text);
    }
    Ok(text.parse()?)
}
