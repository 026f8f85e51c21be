//! CLI contract tests
//!
//! Runs the built binary against a temp data directory. None of these
//! commands reach an analysis provider, so no API keys are needed.

use std::path::Path;
use std::process::Command;

fn framescan_bin() -> String {
    env!("CARGO_BIN_EXE_framescan").to_string()
}

fn run(dir: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(framescan_bin())
        .args(args)
        .arg("--data-dir")
        .arg(dir.join("data"))
        .arg("--config")
        .arg(dir.join("framescan.toml"))
        .env("HOME", dir)
        .env_remove("RUST_LOG")
        .env_remove("FRAMESCAN_CONFIG")
        .env_remove("FRAMESCAN_DATA_DIR")
        .output()
        .expect("failed to run framescan");

    (
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

#[test]
fn init_refuses_to_overwrite_without_force() {
    let dir = tempfile::tempdir().unwrap();

    let (code, stdout, _) = run(dir.path(), &["init"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Created"));
    let written = std::fs::read_to_string(dir.path().join("framescan.toml")).unwrap();
    assert!(written.contains("[credits]"));

    let (code, _, stderr) = run(dir.path(), &["init"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("already exists"));

    let (code, _, _) = run(dir.path(), &["init", "--force"]);
    assert_eq!(code, 0);
}

#[test]
fn fresh_install_has_welcome_bonus() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run(dir.path(), &["credits"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("3 available"), "stdout: {stdout}");
}

#[test]
fn purchases_persist_between_runs() {
    let dir = tempfile::tempdir().unwrap();

    let (code, stdout, _) = run(dir.path(), &["credits", "buy", "starter"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("13 available"), "stdout: {stdout}");
    assert!(dir.path().join("data").join("ledger.json").exists());

    let (code, stdout, _) = run(dir.path(), &["credits", "bonus", "2", "promo"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("15 available"), "stdout: {stdout}");

    let (code, stdout, _) = run(dir.path(), &["credits", "history"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("purchase"));
    assert!(stdout.contains("promo"));
}

#[test]
fn unknown_package_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run(dir.path(), &["credits", "buy", "platinum"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("Unknown package"));
    assert!(stderr.contains("starter"));
}

#[test]
fn empty_history() {
    let dir = tempfile::tempdir().unwrap();

    let (code, stdout, _) = run(dir.path(), &["reports"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("No reports yet"));

    let (code, stdout, _) = run(dir.path(), &["profile", "acme-jo", "--format", "json"]);
    assert_eq!(code, 0);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(json["contact_id"], "acme-jo");
    assert_eq!(json["current_frame_score"], 50);
    assert_eq!(json["scans_count"], 0);
}

#[test]
fn missing_report_fails() {
    let dir = tempfile::tempdir().unwrap();

    let (code, _, stderr) = run(dir.path(), &["show", "scan_1_deadbeef"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("No report with id"));

    let (code, _, _) = run(dir.path(), &["tag", "scan_1_deadbeef", "vip"]);
    assert_ne!(code, 0);
}

#[test]
fn rejects_bad_format() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, _) = run(dir.path(), &["reports", "--format", "xml"]);
    assert_ne!(code, 0);
}
