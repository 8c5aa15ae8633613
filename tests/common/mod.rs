#![allow(dead_code)]

use std::fs;
use std::path::Path;

pub const SAMPLE_LINE: &str = r#"1.2.3.4 - - [05/Mar/2013:22:09:36 -0600] "GET /stream HTTP/1.0" 200 134755 "-" "PlayerX/1.0" 40"#;

/// Build an access-log line for `mount` disconnecting at `stamp`.
pub fn access_line(addr: &str, stamp: &str, mount: &str, duration: &str) -> String {
    format!(
        r#"{} - - [{}] "GET /{} HTTP/1.0" 200 4096 "-" "PlayerX/1.0" {}"#,
        addr, stamp, mount, duration
    )
}

pub fn write_log(dir: &Path, name: &str, lines: &[String]) {
    let mut content = lines.join("\n");
    content.push('\n');
    fs::write(dir.join(name), content).unwrap();
}
