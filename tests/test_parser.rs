use icecast_sx_report::parser::{LogLineParser, MountPointFilter, ParseOutcome};

mod common;
use common::{access_line, SAMPLE_LINE};

fn parse(line: &str, mounts: &[&str]) -> ParseOutcome {
    let filter = MountPointFilter::new(mounts.iter().copied()).unwrap();
    LogLineParser::new().parse_line(line, &filter)
}

#[test]
fn test_report_line_keeps_every_field() {
    let line = r#"203.0.113.9 - - [31/Dec/2013:23:59:30 +0100] "GET /live.mp3 HTTP/1.1" 206 5000 "http://radio.example/player" "VLC/2.1.0 LibVLC/2.1.0 (Linux, x86_64)" 125 extra"#;
    let record = match parse(line, &["live.mp3"]) {
        ParseOutcome::Parsed(record) => record,
        other => panic!("unexpected outcome {:?}", other),
    };

    let report = record.report_line(false).unwrap();
    let fields: Vec<&str> = report.split('\t').collect();
    assert_eq!(
        fields,
        vec![
            "203.0.113.9",
            "2013-12-31",
            "23:57:25",
            "live.mp3",
            "125",
            "206",
            "http://radio.example/player/VLC/2.1.0 LibVLC/2.1.0 (Linux, x86_64)",
        ]
    );
}

#[test]
fn test_connect_time_crosses_midnight_and_year() {
    let line = access_line("1.1.1.1", "01/Jan/2014:00:00:10 +0000", "stream", "20");
    let record = match parse(&line, &["stream"]) {
        ParseOutcome::Parsed(record) => record,
        other => panic!("unexpected outcome {:?}", other),
    };
    let report = record.report_line(false).unwrap();
    assert!(report.contains("\t2013-12-31\t23:59:50\t"));
}

#[test]
fn test_parsing_is_deterministic() {
    let first = parse(SAMPLE_LINE, &["stream"]);
    let second = parse(SAMPLE_LINE, &["stream"]);
    assert_eq!(first, second);
}

#[test]
fn test_malformed_lines_do_not_panic() {
    let samples = [
        "",
        "GET /stream ",
        r#"1.2.3.4 - - [05/Mar/2013:22:09:36 -0600] "GET /stream HTTP/1.0" 200 - "-" "x" 40"#,
        r#"1.2.3.4 - - [05/Mar/2013:22:09:36 -0600] "GET /stream HTTP/1.0" abc 1 "-" "x" 40"#,
        r#"1.2.3.4 - - [05/Mar/2013:25:09:36 -0600] "GET /stream HTTP/1.0" 200 1 "-" "x" 40"#,
        r#"1.2.3.4 - - [05/Mar/2013:22:09:36 -0600] "GET /stream HTTP/1.0" 200 1 "-" "x" -5"#,
    ];
    for sample in samples {
        match parse(sample, &["stream"]) {
            ParseOutcome::Parsed(record) => panic!("parsed garbage: {:?}", record),
            ParseOutcome::Filtered | ParseOutcome::Malformed(_) => {}
        }
    }
}
