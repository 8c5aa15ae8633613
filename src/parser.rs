//! Access Log Line Parser
//!
//! Turns one Icecast access-log line into a [`SessionRecord`]. Icecast writes the
//! Apache combined format with one extra field, the session length in seconds:
//!
//! ```text
//! 1.2.3.4 - - [05/Mar/2013:22:09:36 -0600] "GET /stream HTTP/1.0" 200 134755 "-" "PlayerX/1.0" 40
//! ```
//!
//! Parsing never fails with an error. Every line yields a [`ParseOutcome`]: a
//! parsed record, a silent skip for mount points nobody asked for, or a
//! malformed line with the reason it was rejected.

use crate::models::SessionRecord;
use crate::timestamp_parser::LogTimestamp;
use anyhow::{bail, Context, Result};
use regex::Regex;
use std::sync::OnceLock;

const LINE_PATTERN: &str = r#"(?x)
    ^(?P<addr>\S+)\s\S+\s\S+\s
    \[(?P<timestamp>[^\]]+)\]\s
    "(?i:get)\s/?(?P<path>\S*)\sHTTP/(?P<version>[^"\s]+)"\s
    (?P<status>\d{3})\s
    (?P<bytes>\d+)\s
    "(?P<referer>[^"]*)"\s
    "(?P<agent>.*?)"\s
    (?P<duration>\d+)
    (?:\s+(?P<trailing>.*))?
    $"#;

/// Mount name used for requests to `/`.
pub const ROOT_MOUNT: &str = "/";

static LINE_REGEX: OnceLock<Regex> = OnceLock::new();

fn line_regex() -> &'static Regex {
    LINE_REGEX.get_or_init(|| Regex::new(LINE_PATTERN).expect("access log pattern is valid"))
}

/// Result of parsing one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Parsed(SessionRecord),
    /// The request was for a mount point outside the filter set.
    Filtered,
    Malformed(String),
}

/// Normalize a configured mount point: one leading slash is dropped, `/` stays
/// as the root mount, blank names are discarded.
pub fn normalize_mount_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed == ROOT_MOUNT {
        return Some(ROOT_MOUNT.to_string());
    }
    let name = trimmed.strip_prefix('/').unwrap_or(trimmed);
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// The set of mount points selected for a run.
#[derive(Debug, Clone)]
pub struct MountPointFilter {
    names: Vec<String>,
    prefilter: Regex,
}

impl MountPointFilter {
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for name in names {
            if let Some(name) = normalize_mount_name(name.as_ref()) {
                if !normalized.iter().any(|n| n.eq_ignore_ascii_case(&name)) {
                    normalized.push(name);
                }
            }
        }
        if normalized.is_empty() {
            bail!("At least one mount point must be selected");
        }

        let alternation = normalized
            .iter()
            .map(|n| {
                if n == ROOT_MOUNT {
                    String::new()
                } else {
                    regex::escape(n)
                }
            })
            .collect::<Vec<_>>()
            .join("|");
        let prefilter = Regex::new(&format!("(?i)get /?(?:{}) ", alternation))
            .context("Failed to build mount point filter")?;

        Ok(Self {
            names: normalized,
            prefilter,
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Cheap syntactic gate: does the line request one of our mount points?
    pub fn admits_line(&self, line: &str) -> bool {
        self.prefilter.is_match(line)
    }

    /// The configured spelling of `mount_point`, matched ignoring case.
    pub fn canonical(&self, mount_point: &str) -> Option<&str> {
        self.names
            .iter()
            .find(|n| n.eq_ignore_ascii_case(mount_point))
            .map(String::as_str)
    }
}

/// Parses access-log lines against the combined-plus-duration grammar.
pub struct LogLineParser {
    grammar: &'static Regex,
}

impl Default for LogLineParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LogLineParser {
    pub fn new() -> Self {
        Self {
            grammar: line_regex(),
        }
    }

    /// Parse one raw line for the mount points in `filter`.
    pub fn parse_line(&self, line: &str, filter: &MountPointFilter) -> ParseOutcome {
        let line = line.trim_end();
        if !filter.admits_line(line) {
            return ParseOutcome::Filtered;
        }

        let caps = match self.grammar.captures(line) {
            Some(caps) => caps,
            None => {
                return ParseOutcome::Malformed(
                    "line does not match the access log format".to_string(),
                )
            }
        };

        let path = &caps["path"];
        let requested = if path.is_empty() { ROOT_MOUNT } else { path };
        let mount_point = match filter.canonical(requested) {
            Some(name) => name.to_string(),
            None => return ParseOutcome::Filtered,
        };

        match self.build_record(&caps, mount_point) {
            Ok(record) => ParseOutcome::Parsed(record),
            Err(e) => ParseOutcome::Malformed(e.to_string()),
        }
    }

    fn build_record(
        &self,
        caps: &regex::Captures<'_>,
        mount_point: String,
    ) -> Result<SessionRecord> {
        let disconnect = LogTimestamp::parse(&caps["timestamp"])?;
        let status: u16 = caps["status"]
            .parse()
            .with_context(|| format!("Invalid status: {}", &caps["status"]))?;
        let bytes: u64 = caps["bytes"]
            .parse()
            .with_context(|| format!("Invalid byte count: {}", &caps["bytes"]))?;
        let duration_secs: u64 = caps["duration"]
            .parse()
            .with_context(|| format!("Invalid duration: {}", &caps["duration"]))?;
        let trailing = caps
            .name("trailing")
            .map(|m| m.as_str().to_string())
            .filter(|t| !t.is_empty());

        Ok(SessionRecord {
            ip_address: caps["addr"].to_string(),
            disconnect,
            mount_point,
            status,
            bytes,
            referer: caps["referer"].to_string(),
            user_agent: caps["agent"].to_string(),
            duration_secs,
            trailing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"1.2.3.4 - - [05/Mar/2013:22:09:36 -0600] "GET /stream HTTP/1.0" 200 134755 "-" "PlayerX/1.0" 40"#;

    fn filter(names: &[&str]) -> MountPointFilter {
        MountPointFilter::new(names.iter().copied()).unwrap()
    }

    fn parsed(outcome: ParseOutcome) -> SessionRecord {
        match outcome {
            ParseOutcome::Parsed(record) => record,
            other => panic!("expected a parsed record, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_sample_line() {
        let parser = LogLineParser::new();
        let record = parsed(parser.parse_line(SAMPLE, &filter(&["stream"])));

        assert_eq!(record.ip_address, "1.2.3.4");
        assert_eq!(record.mount_point, "stream");
        assert_eq!(record.status, 200);
        assert_eq!(record.bytes, 134_755);
        assert_eq!(record.referer, "-");
        assert_eq!(record.user_agent, "PlayerX/1.0");
        assert_eq!(record.duration_secs, 40);
        assert_eq!(record.disconnect.utc_offset_minutes, -360);
        assert!(record.trailing.is_none());
    }

    #[test]
    fn test_method_is_case_insensitive() {
        let parser = LogLineParser::new();
        let line = SAMPLE.replace("\"GET ", "\"get ");
        let record = parsed(parser.parse_line(&line, &filter(&["stream"])));
        assert_eq!(record.mount_point, "stream");
    }

    #[test]
    fn test_mount_point_uses_configured_spelling() {
        let parser = LogLineParser::new();
        let line = SAMPLE.replace("/stream", "/Stream");
        let record = parsed(parser.parse_line(&line, &filter(&["/stream"])));
        assert_eq!(record.mount_point, "stream");
    }

    #[test]
    fn test_other_mount_point_is_filtered() {
        let parser = LogLineParser::new();
        let line = SAMPLE.replace("/stream", "/other");
        assert_eq!(
            parser.parse_line(&line, &filter(&["stream"])),
            ParseOutcome::Filtered
        );
    }

    #[test]
    fn test_prefix_mount_point_is_filtered() {
        let parser = LogLineParser::new();
        let line = SAMPLE.replace("/stream", "/stream-hd");
        assert_eq!(
            parser.parse_line(&line, &filter(&["stream"])),
            ParseOutcome::Filtered
        );
    }

    #[test]
    fn test_root_mount_point() {
        let parser = LogLineParser::new();
        let line = SAMPLE.replace("/stream", "/");
        let record = parsed(parser.parse_line(&line, &filter(&["/"])));
        assert_eq!(record.mount_point, ROOT_MOUNT);
    }

    #[test]
    fn test_user_agent_with_parentheses_and_commas() {
        let parser = LogLineParser::new();
        let line = SAMPLE.replace(
            "PlayerX/1.0",
            "Mozilla/5.0 (Windows NT 10.0; Win64, x64) AppleWebKit/537.36 (KHTML, like Gecko)",
        );
        let record = parsed(parser.parse_line(&line, &filter(&["stream"])));
        assert_eq!(
            record.user_agent,
            "Mozilla/5.0 (Windows NT 10.0; Win64, x64) AppleWebKit/537.36 (KHTML, like Gecko)"
        );
    }

    #[test]
    fn test_trailing_fields_are_kept() {
        let parser = LogLineParser::new();
        let line = format!("{} extra=1 more", SAMPLE);
        let record = parsed(parser.parse_line(&line, &filter(&["stream"])));
        assert_eq!(record.duration_secs, 40);
        assert_eq!(record.trailing.as_deref(), Some("extra=1 more"));
    }

    #[test]
    fn test_crlf_line_ending_is_ignored() {
        let parser = LogLineParser::new();
        let line = format!("{}\r", SAMPLE);
        assert!(matches!(
            parser.parse_line(&line, &filter(&["stream"])),
            ParseOutcome::Parsed(_)
        ));
    }

    #[test]
    fn test_fractional_duration_is_malformed() {
        let parser = LogLineParser::new();
        let line = SAMPLE.replace("\" 40", "\" 40.5");
        assert!(matches!(
            parser.parse_line(&line, &filter(&["stream"])),
            ParseOutcome::Malformed(_)
        ));
    }

    #[test]
    fn test_missing_duration_is_malformed() {
        let parser = LogLineParser::new();
        let line = SAMPLE.trim_end_matches(" 40");
        assert!(matches!(
            parser.parse_line(line, &filter(&["stream"])),
            ParseOutcome::Malformed(_)
        ));
    }

    #[test]
    fn test_bad_month_is_malformed() {
        let parser = LogLineParser::new();
        let line = SAMPLE.replace("/Mar/", "/Foo/");
        assert!(matches!(
            parser.parse_line(&line, &filter(&["stream"])),
            ParseOutcome::Malformed(_)
        ));
    }

    #[test]
    fn test_short_duration_still_parses() {
        let parser = LogLineParser::new();
        let line = SAMPLE.replace("\" 40", "\" 2");
        let record = parsed(parser.parse_line(&line, &filter(&["stream"])));
        assert_eq!(record.duration_secs, 2);
    }

    #[test]
    fn test_filter_normalizes_names() {
        let f = filter(&["/stream", "", " talk ", "STREAM", "/"]);
        assert_eq!(f.names(), &["stream", "talk", "/"]);
        assert!(MountPointFilter::new(Vec::<String>::new()).is_err());
        assert!(MountPointFilter::new([" ", ""]).is_err());
    }

    #[test]
    fn test_filter_escapes_regex_characters() {
        let f = filter(&["live.mp3"]);
        assert!(f.admits_line("\"GET /live.mp3 HTTP/1.1\""));
        assert!(!f.admits_line("\"GET /liveXmp3 HTTP/1.1\""));
    }
}
