//! CLI contract tests
//!
//! Runs the built binary against the fixture export with a throwaway
//! database and checks exit codes and JSON output.

use std::path::{Path, PathBuf};
use std::process::Command;

fn flowsentry_bin() -> &'static str {
    env!("CARGO_BIN_EXE_flowsentry")
}

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/flows.json")
}

/// Run with the project directory (and so the database) inside `dir`
fn run(dir: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(flowsentry_bin())
        .arg("-C")
        .arg(dir)
        .args(args)
        .output()
        .expect("failed to run flowsentry");
    (
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

fn run_json(dir: &Path, args: &[&str]) -> serde_json::Value {
    let mut full = args.to_vec();
    full.extend(["--format", "json"]);
    let (code, stdout, stderr) = run(dir, &full);
    assert_eq!(code, 0, "stderr: {stderr}");
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("bad JSON ({e}): {stdout}"))
}

#[test]
fn test_scan_json_output() {
    let dir = tempfile::tempdir().unwrap();
    let flows = fixture();
    let report = run_json(dir.path(), &["scan", flows.to_str().unwrap()]);

    assert_eq!(report["detectionLevel"], 1);
    assert_eq!(report["unitsAnalyzed"], 3);
    assert_eq!(report["orphanedUnits"], 1);
    assert_eq!(report["totalIssues"], 1);
    assert!(dir.path().join("flowsentry.redb").exists());
}

#[test]
fn test_summary_after_scan() {
    let dir = tempfile::tempdir().unwrap();
    let flows = fixture();
    let (code, _, stderr) = run(dir.path(), &["scan", flows.to_str().unwrap(), "--level", "2"]);
    assert_eq!(code, 0, "stderr: {stderr}");

    let summary = run_json(dir.path(), &["summary"]);
    assert_eq!(summary["summary"]["totalFlows"], 2);
    assert_eq!(summary["summary"]["totalFunctionNodes"], 3);
    assert_eq!(summary["summary"]["totalIssues"], 4);

    let group = run_json(dir.path(), &["group", "flow-main"]);
    assert_eq!(group["qualityScore"], 50.0);
    assert_eq!(group["units"][0]["id"], "fn-debug");
}

#[test]
fn test_empty_summary_text() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run(dir.path(), &["summary"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("No scans recorded yet"));
}

#[test]
fn test_unit_uses_full_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let flows = fixture();
    let unit = run_json(dir.path(), &["unit", flows.to_str().unwrap(), "fn-debug"]);
    assert_eq!(unit["issuesBySeverity"]["critical"], 2);
    assert_eq!(unit["status"]["color"], "red");

    let (code, _, stderr) = run(dir.path(), &["unit", flows.to_str().unwrap(), "nope"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("not found"));
}

#[test]
fn test_unknown_group_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run(dir.path(), &["group", "flow-main"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("No scan records"));
}

#[test]
fn test_missing_export_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.json");
    let (code, _, stderr) = run(dir.path(), &["scan", missing.to_str().unwrap()]);
    assert_ne!(code, 0);
    assert!(stderr.contains("not available"));
}

#[test]
fn test_init_writes_config_once() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run(dir.path(), &["init"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Created"));
    assert!(dir.path().join("flowsentry.toml").exists());

    let (code, stdout, _) = run(dir.path(), &["init"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("already exists"));
}

#[test]
fn test_project_config_sets_level() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("flowsentry.toml"), "detectionLevel = 2\n").unwrap();
    let flows = fixture();
    let report = run_json(dir.path(), &["scan", flows.to_str().unwrap()]);
    assert_eq!(report["detectionLevel"], 2);
    assert_eq!(report["totalIssues"], 4);
}

#[test]
fn test_status_and_clear() {
    let dir = tempfile::tempdir().unwrap();
    let flows = fixture();
    run_json(dir.path(), &["scan", flows.to_str().unwrap()]);

    let status = run_json(dir.path(), &["status"]);
    assert_eq!(status["counts"]["units"], 3);
    assert_eq!(status["counts"]["groups"], 2);

    let (code, _, _) = run(dir.path(), &["clear"]);
    assert_ne!(code, 0);

    let (code, _, _) = run(dir.path(), &["clear", "--yes"]);
    assert_eq!(code, 0);
    let status = run_json(dir.path(), &["status"]);
    assert_eq!(status["counts"]["units"], 0);
}

#[test]
fn test_monitor_ticks_stream_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, stderr) = run(
        dir.path(),
        &["monitor", "--force", "--ticks", "2", "--interval", "1", "--format", "json"],
    );
    assert_eq!(code, 0, "stderr: {stderr}");

    let ticks: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(ticks.len(), 2);
    assert_eq!(ticks[1]["tick"], 2);

    let perf = run_json(dir.path(), &["perf"]);
    assert_eq!(perf["statistics"]["totalSamples"], 2);
}

#[test]
fn test_monitor_respects_disabled_setting() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run(dir.path(), &["monitor", "--ticks", "1"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("disabled"));
}
