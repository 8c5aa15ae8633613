//! Performance benchmarks for line parsing and aggregation
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use icecast_sx_report::aggregator::SessionAggregator;
use icecast_sx_report::models::DateWindow;
use icecast_sx_report::parser::{LogLineParser, MountPointFilter};

const MONTHS: [&str; 3] = ["Mar", "Apr", "May"];

/// Generate access-log lines spread over three months and two mount points
fn generate_access_log(num_lines: usize, include_errors: bool) -> Vec<String> {
    (0..num_lines)
        .map(|i| {
            if include_errors && i % 10 == 5 {
                return "GET /stream broken line".to_string();
            }
            let mount = if i % 2 == 0 { "stream" } else { "talk" };
            format!(
                r#"10.0.{}.{} - - [{:02}/{}/2013:{:02}:{:02}:{:02} -0600] "GET /{} HTTP/1.1" 200 {} "-" "PlayerX/1.0 (Linux, x86_64)" {}"#,
                (i / 256) % 256,
                i % 256,
                1 + i % 28,
                MONTHS[i % MONTHS.len()],
                i % 24,
                i % 60,
                (i * 7) % 60,
                mount,
                1000 + i,
                i % 3600
            )
        })
        .collect()
}

fn benchmark_parse_line(c: &mut Criterion) {
    let parser = LogLineParser::new();
    let filter = MountPointFilter::new(["stream", "talk"]).unwrap();
    let lines = generate_access_log(1, false);

    c.bench_function("parse_line", |b| {
        b.iter(|| parser.parse_line(black_box(&lines[0]), &filter))
    });
}

fn benchmark_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");
    let filter = MountPointFilter::new(["stream", "talk"]).unwrap();
    let window = DateWindow::parse("01/Mar/2013", "31/May/2013", 0).unwrap();

    for size in [100, 1000, 10000].iter() {
        let lines = generate_access_log(*size, true);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            let aggregator = SessionAggregator::default();
            b.iter(|| aggregator.aggregate(black_box(&lines), &window, &filter));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_parse_line, benchmark_aggregate);
criterion_main!(benches);
