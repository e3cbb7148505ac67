//! CLI integration tests for warc-urls.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Get a Command for the warc-urls binary.
#[allow(deprecated)]
fn cmd() -> Command {
    Command::cargo_bin("warc-urls").unwrap()
}

fn record(target: &str) -> String {
    let body = "<html></html>";
    format!(
        "WARC/1.0\r\nWARC-Type: response\r\nWARC-Target-URI: {}\r\nContent-Length: {}\r\n\r\n{}\r\n\r\n",
        target,
        body.len(),
        body
    )
}

fn sample_warc(dir: &TempDir) -> String {
    let path = dir.path().join("sample.warc");
    let input = format!(
        "{}{}{}garbage\r\n{}",
        record("http://a.example/"),
        record("http://b.example/"),
        record("http://a.example/"),
        record("http://c.example/")
    );
    fs::write(&path, input).unwrap();
    path.to_str().unwrap().to_string()
}

// ============================================================================
// Help and Argument Validation
// ============================================================================

#[test]
fn test_help() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("WARC-Target-URIs"));
}

#[test]
fn test_missing_warc_argument() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("--warc"));
}

#[test]
fn test_zero_concurrency_rejected() {
    let temp = TempDir::new().unwrap();
    let input = sample_warc(&temp);

    cmd()
        .args(["--warc", &input, "-n", "0"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("invalid concurrency setting"));
}

#[test]
fn test_missing_file_is_fatal() {
    cmd()
        .args(["--warc", "/nonexistent/crawl.warc.gz"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open WARC file"))
        .stderr(predicate::str::contains("processed").not());
}

// ============================================================================
// Extraction
// ============================================================================

#[test]
fn test_single_worker_output() {
    let temp = TempDir::new().unwrap();
    let input = sample_warc(&temp);

    cmd()
        .args(["--warc", &input, "--n-concurrent", "1"])
        .assert()
        .success()
        .stdout("http://a.example/\nhttp://b.example/\nhttp://c.example/\n")
        .stderr(predicate::str::contains("processed 4 records in"))
        .stderr(predicate::str::contains("Skipping malformed record"));
}

#[test]
fn test_one_warning_per_bad_record() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("bad.warc");
    let input = format!(
        "{}garbage\r\n{}WARC/1.0\r\nWARC-Target-URI: http://x.example/\r\n\r\npayload\r\n\r\n{}WARC/1.0\r\nContent-Length: 0\r\nbroken header\r\n\r\n{}",
        record("http://a.example/"),
        record("http://b.example/"),
        record("http://c.example/"),
        record("http://d.example/")
    );
    fs::write(&path, input).unwrap();

    let output = cmd()
        .args(["--warc", path.to_str().unwrap(), "-n", "2", "--no-progress"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert_eq!(stderr.matches("Skipping malformed record").count(), 2);
    assert_eq!(
        stderr
            .matches("Skipping record with unparseable fields")
            .count(),
        1
    );
    assert!(stderr.contains("processed 5 records in"));

    let mut lines: Vec<&str> = std::str::from_utf8(&output.stdout)
        .unwrap()
        .lines()
        .collect();
    lines.sort();
    assert_eq!(
        lines,
        vec![
            "http://a.example/",
            "http://b.example/",
            "http://c.example/",
            "http://d.example/"
        ]
    );
}

#[test]
fn test_output_file_and_profile() {
    let temp = TempDir::new().unwrap();
    let input = sample_warc(&temp);
    let output = temp.path().join("urls.txt");
    let profile = temp.path().join("profile.json");

    cmd()
        .args([
            "--warc",
            &input,
            "-n",
            "4",
            "--output",
            output.to_str().unwrap(),
            "--profile-output",
            profile.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let mut lines: Vec<String> = fs::read_to_string(&output)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    lines.sort();
    assert_eq!(
        lines,
        vec!["http://a.example/", "http://b.example/", "http://c.example/"]
    );

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&profile).unwrap()).unwrap();
    assert_eq!(json["records"], 4);
    assert_eq!(json["malformed"], 1);
    assert_eq!(json["unique"], 3);
    assert_eq!(json["concurrency"], 4);
}

#[test]
fn test_unwritable_profile_is_fatal() {
    let temp = TempDir::new().unwrap();
    let input = sample_warc(&temp);

    cmd()
        .args([
            "--warc",
            &input,
            "--cpuprofile",
            "/nonexistent/dir/profile.json",
        ])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Failed to create profile file"));
}

#[test]
fn test_hashed_dedup_flag() {
    let temp = TempDir::new().unwrap();
    let input = sample_warc(&temp);

    cmd()
        .args(["--warc", &input, "-n", "1", "--dedup", "hashed"])
        .assert()
        .success()
        .stdout("http://a.example/\nhttp://b.example/\nhttp://c.example/\n");
}

#[test]
fn test_truncated_container_fails() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("cut.warc");
    fs::write(
        &path,
        format!(
            "{}WARC/1.0\r\nContent-Length: 999\r\n\r\nshort",
            record("http://a.example/")
        ),
    )
    .unwrap();

    cmd()
        .args(["--warc", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unrecoverable framing error"))
        .stderr(predicate::str::contains("processed").not());
}
