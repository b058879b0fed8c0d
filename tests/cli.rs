//! End-to-end runs of the k2agg binary against a temporary data directory

use std::path::Path;
use std::process::{Command, Output};

fn k2agg(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_k2agg"))
        .arg("--data-dir")
        .arg(dir)
        .arg("--offline")
        .args(args)
        .env_remove("K2AGG_DATA_DIR")
        .env_remove("K2AGG_LARGE_VALUE")
        .output()
        .expect("Failed to execute command")
}

fn ok(dir: &Path, args: &[&str]) -> String {
    let output = k2agg(dir, args);
    assert!(output.status.success(), "Command {:?} failed: {:?}", args, output);
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn seed_two_entities(dir: &Path) {
    ok(dir, &["entity", "create", "-n", "Acme Corp", "-i", "11-1111111"]);
    ok(dir, &["entity", "create", "-n", "Beta LLC", "-i", "22-2222222"]);
    ok(dir, &["entry", "add", "Acme Corp", "-l", "1", "-c", "France"]);
    ok(dir, &["entry", "set", "acme corp", "-l", "1", "A", "-k", "b", "-v", "100"]);
    ok(dir, &["entry", "add", "Beta LLC", "-l", "1", "-c", "France"]);
    ok(dir, &["entry", "set", "Beta LLC", "-l", "1", "France", "-k", "d", "-v", "$50.00"]);
    ok(dir, &["entity", "submit", "Acme Corp"]);
    ok(dir, &["entity", "submit", "Beta LLC"]);
}

#[test]
fn aggregate_and_export_csv() {
    let dir = tempfile::tempdir().unwrap();
    seed_two_entities(dir.path());

    let stdout = ok(dir.path(), &["aggregate", "--year", "2024"]);
    assert!(stdout.contains("tax year 2024"));
    assert!(stdout.contains("Entities included: 2"));

    let csv = ok(dir.path(), &["report", "--csv"]);
    let lines: Vec<_> = csv.lines().collect();
    assert_eq!(lines[0], "line_number,description,country,foreign_source_total");
    assert_eq!(lines[1], "1,Sales,France,150.0000");
    assert_eq!(lines.len(), 2);
}

#[test]
fn duplicate_country_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    ok(dir.path(), &["entity", "create", "-n", "Acme Corp", "-i", "1"]);
    ok(dir.path(), &["entry", "add", "Acme Corp", "-l", "3", "-c", "Canada"]);

    let output = k2agg(dir.path(), &["entry", "add", "Acme Corp", "-l", "3", "-c", "canada"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("already exists on line 3"));
}

#[test]
fn invalid_amount_keeps_previous_value() {
    let dir = tempfile::tempdir().unwrap();
    ok(dir.path(), &["entity", "create", "-n", "Acme Corp", "-i", "1"]);
    ok(dir.path(), &["entry", "add", "Acme Corp", "-l", "1", "-c", "Peru"]);
    ok(dir.path(), &["entry", "set", "Acme Corp", "-l", "1", "Peru", "-k", "c", "-v", "12"]);

    let output = k2agg(
        dir.path(),
        &["entry", "set", "Acme Corp", "-l", "1", "Peru", "-k", "c", "-v", "1-2"],
    );
    assert!(!output.status.success());

    let json = ok(dir.path(), &["entity", "show", "Acme Corp", "--json"]);
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let columns = &value["data"]["lines"]["1"]["countries"][0]["columns"];
    assert_eq!(columns["c"], "12.0000");
    assert_eq!(columns["g"], "12.0000");
}

#[test]
fn report_requires_snapshot_and_flags_stale_data() {
    let dir = tempfile::tempdir().unwrap();
    let output = k2agg(dir.path(), &["report"]);
    assert!(!output.status.success());

    seed_two_entities(dir.path());
    ok(dir.path(), &["aggregate"]);
    assert!(!ok(dir.path(), &["report"]).contains("STALE"));

    ok(dir.path(), &["entry", "set", "Beta LLC", "-l", "1", "A", "-k", "f", "-v", "1"]);
    let report = ok(dir.path(), &["report"]);
    assert!(report.contains("STALE"));
    // results are not recomputed until the next aggregate
    assert!(report.contains("150.0000"));

    ok(dir.path(), &["aggregate"]);
    let report = ok(dir.path(), &["report", "--top"]);
    assert!(report.contains("151.0000"));
    assert!(report.contains("Top countries"));

    let history = ok(dir.path(), &["history", "list", "--json"]);
    let value: serde_json::Value = serde_json::from_str(&history).unwrap();
    assert_eq!(value["history"].as_array().unwrap().len(), 1);
    assert_eq!(value["history"][0]["isValid"], false);
}

#[test]
fn draft_entities_are_excluded() {
    let dir = tempfile::tempdir().unwrap();
    seed_two_entities(dir.path());
    ok(dir.path(), &["entity", "draft", "Beta LLC"]);
    ok(dir.path(), &["aggregate"]);
    let csv = ok(dir.path(), &["report", "--csv"]);
    assert!(csv.contains("1,Sales,France,100.0000"));
}

#[test]
fn reference_commands_work_offline() {
    let dir = tempfile::tempdir().unwrap();
    let countries = ok(dir.path(), &["countries", "--search", "united"]);
    assert!(countries.contains("United Kingdom"));
    assert!(countries.contains("United States"));
    assert!(!countries.contains("Vietnam"));

    let lines = ok(dir.path(), &["lines"]);
    assert!(lines.contains("Section 951A(a) inclusions"));

    let header = ok(dir.path(), &["schema", "csv-header"]);
    assert_eq!(header.trim(), "line_number,description,country,foreign_source_total");

    let schema = ok(dir.path(), &["schema"]);
    let value: serde_json::Value = serde_json::from_str(&schema).unwrap();
    assert_eq!(value["title"], "AppState");
}

#[test]
fn demo_then_reset() {
    let dir = tempfile::tempdir().unwrap();
    ok(dir.path(), &["demo"]);
    assert!(!k2agg(dir.path(), &["demo"]).status.success());

    ok(dir.path(), &["aggregate"]);
    let json = ok(dir.path(), &["report", "--json"]);
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["includedEntityIds"].as_array().unwrap().len(), 5);

    assert!(!k2agg(dir.path(), &["reset"]).status.success());
    ok(dir.path(), &["reset", "--yes"]);
    assert!(ok(dir.path(), &["entity", "list"]).contains("No entities"));
}
