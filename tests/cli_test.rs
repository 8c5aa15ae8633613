//! Command-line behaviour of the `icecast-sx-report` binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

mod common;
use common::{write_log, SAMPLE_LINE};

fn cmd(workdir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("icecast-sx-report").unwrap();
    cmd.current_dir(workdir.path())
        .env("XDG_CONFIG_HOME", workdir.path())
        .env_remove("ICECAST_LOG_DIR")
        .env_remove("SX_REPORT_OUTPUT_DIR")
        .env_remove("SX_REPORT_MOUNTS")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_writes_reports() {
    let work = TempDir::new().unwrap();
    let logs = work.path().join("logs");
    let out = work.path().join("out");
    fs::create_dir_all(&logs).unwrap();
    write_log(&logs, "access.log", &[SAMPLE_LINE.to_string()]);

    cmd(&work)
        .args(["-s", "04/Mar/2013", "-e", "06/Mar/2013", "-m", "stream,talk"])
        .arg("--log-dir")
        .arg(&logs)
        .arg("--output-dir")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("stream-2013-03-06.txt"));

    let report = fs::read_to_string(out.join("stream-2013-03-06.txt")).unwrap();
    assert!(report.contains("1.2.3.4\t2013-03-05\t22:08:56\tstream\t040\t200\t-/PlayerX/1.0\r\n"));
    assert!(out.join("talk-2013-03-06.txt").exists());
}

#[test]
fn test_cli_json_summary() {
    let work = TempDir::new().unwrap();
    let logs = work.path().join("logs");
    fs::create_dir_all(&logs).unwrap();
    write_log(&logs, "access.log", &[SAMPLE_LINE.to_string()]);

    let output = cmd(&work)
        .args(["--start", "04/Mar/2013", "--end", "06/Mar/2013", "--json"])
        .arg("--log-dir")
        .arg(&logs)
        .arg("--zip-file")
        .arg(work.path().join("reports.zip"))
        .output()
        .unwrap();

    assert!(output.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["reports"][0]["fileName"], "stream-2013-03-06.txt");
    assert_eq!(summary["reports"][0]["lines"], 1);
    assert!(work.path().join("reports.zip").exists());
}

#[test]
fn test_cli_rejects_output_dir_with_zip_file() {
    let work = TempDir::new().unwrap();
    cmd(&work)
        .args(["-s", "04/Mar/2013", "-e", "06/Mar/2013", "-o", "out", "-z", "out.zip"])
        .assert()
        .failure();
}

#[test]
fn test_cli_requires_dates() {
    let work = TempDir::new().unwrap();
    cmd(&work)
        .args(["-e", "06/Mar/2013"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--start"));
}

#[test]
fn test_cli_reports_bad_date() {
    let work = TempDir::new().unwrap();
    cmd(&work)
        .args(["-s", "2013-03-04", "-e", "06/Mar/2013"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("2013-03-04"));
}

#[test]
fn test_cli_missing_log_directory_names_path() {
    let work = TempDir::new().unwrap();
    cmd(&work)
        .args(["-s", "04/Mar/2013", "-e", "06/Mar/2013", "-l", "missing-logs", "-o", "out"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("missing-logs"));
}
