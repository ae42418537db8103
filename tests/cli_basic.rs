//! Integration tests for basic CLI behavior.
//!
//! Tests argument handling, exit codes and that failures never leave a
//! report behind. None of them need pdfium or tesseract to succeed.

#![allow(deprecated)] // cargo_bin deprecation, replacement not yet stable

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Helper: get a Command for the `pagelens` binary.
fn pagelens() -> Command {
    Command::cargo_bin("pagelens").expect("binary 'pagelens' should be built")
}

fn pagelens_ocr() -> Command {
    Command::cargo_bin("pagelens-ocr").expect("binary 'pagelens-ocr' should be built")
}

/// Empty config file so the user's own settings never leak into a test.
fn empty_config(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "").unwrap();
    path
}

// ─── pagelens ────────────────────────────────────────────────────────────────

#[test]
fn help_flag_shows_usage() {
    pagelens()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: pagelens"))
        .stdout(predicate::str::contains("<INPUT>"))
        .stdout(predicate::str::contains("[OUTPUT]"));
}

#[test]
fn version_flag_shows_semver() {
    pagelens()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^pagelens \d+\.\d+\.\d+\n$").unwrap());
}

#[test]
fn missing_input_exits_with_one() {
    let dir = TempDir::new().unwrap();
    pagelens()
        .current_dir(dir.path())
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("<INPUT>"));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn nonexistent_input_exits_with_one_and_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let config = empty_config(&dir);
    let output = dir.path().join("report.txt");

    pagelens()
        .arg(dir.path().join("absent.pdf"))
        .arg(&output)
        .arg("--config")
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error:"));

    assert!(!output.exists());
}

#[test]
fn malformed_config_exits_with_one() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "[analysis\n").unwrap();

    pagelens()
        .arg(dir.path().join("absent.pdf"))
        .arg("--config")
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid TOML"));
}

// ─── pagelens-ocr ────────────────────────────────────────────────────────────

#[test]
fn ocr_help_flag_shows_usage() {
    pagelens_ocr()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: pagelens-ocr"));
}

#[test]
fn ocr_missing_input_exits_with_one() {
    pagelens_ocr().assert().code(1).stdout(predicate::str::is_empty());
}

#[test]
fn ocr_unreadable_image_exits_with_one() {
    let dir = TempDir::new().unwrap();
    let config = empty_config(&dir);
    let output = dir.path().join("text.txt");

    pagelens_ocr()
        .arg(dir.path().join("absent.png"))
        .arg(&output)
        .arg("--config")
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to load image"));

    assert!(!output.exists());
}
