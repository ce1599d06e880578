//! CLI integration tests using assert_cmd
//!
//! These tests verify the CLI commands work end-to-end against a temporary
//! data directory and home.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Get a command instance for the switchyard binary, isolated in `temp`
fn switchyard_cmd(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("switchyard").expect("Failed to find switchyard binary");
    cmd.env("SWITCHYARD_HOME", temp.path().join("data"))
        .env("HOME", temp.path())
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_command() {
    let temp = TempDir::new().unwrap();
    switchyard_cmd(&temp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("provider switcher"));
}

#[test]
fn test_version_command() {
    let temp = TempDir::new().unwrap();
    switchyard_cmd(&temp)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("switchyard"));
}

#[test]
fn test_provider_help() {
    let temp = TempDir::new().unwrap();
    switchyard_cmd(&temp)
        .args(["provider", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Manage providers"));
}

#[test]
fn test_unknown_app_is_rejected() {
    let temp = TempDir::new().unwrap();
    switchyard_cmd(&temp)
        .args(["provider", "list", "--app", "vim"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown application"));
}

#[test]
fn test_provider_list_empty() {
    let temp = TempDir::new().unwrap();
    switchyard_cmd(&temp)
        .args(["provider", "list", "--app", "claude"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No providers for claude"));
}

#[test]
fn test_add_switch_and_list() {
    let temp = TempDir::new().unwrap();

    switchyard_cmd(&temp)
        .args([
            "provider",
            "add",
            "Work",
            "--app",
            "opencode",
            "--id",
            "work",
            "--sort-index",
            "0",
            "--settings",
            r#"{"options":{"baseURL":"https://work.example"}}"#,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added provider: work"));

    switchyard_cmd(&temp)
        .args(["provider", "switch", "work", "--app", "opencode"])
        .assert()
        .success();

    let live = fs::read_to_string(temp.path().join(".config/opencode/opencode.json")).unwrap();
    assert!(live.contains("https://work.example"));

    switchyard_cmd(&temp)
        .args(["provider", "duplicate", "work", "--app", "opencode"])
        .assert()
        .success()
        .stdout(predicate::str::contains("work-copy"));

    switchyard_cmd(&temp)
        .args(["provider", "list", "--app", "opencode"])
        .assert()
        .success()
        .stdout(predicate::str::contains("* [0] work - Work"))
        .stdout(predicate::str::contains("[1] work-copy - Work copy"));
}

#[test]
fn test_switch_to_missing_provider_fails() {
    let temp = TempDir::new().unwrap();
    switchyard_cmd(&temp)
        .args(["provider", "switch", "ghost", "--app", "codex"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("INVALID_REFERENCE"));
}

#[test]
fn test_delete_with_force() {
    let temp = TempDir::new().unwrap();

    switchyard_cmd(&temp)
        .args(["provider", "add", "Temp", "--app", "gemini", "--id", "tmp"])
        .assert()
        .success();

    switchyard_cmd(&temp)
        .args(["provider", "delete", "tmp", "--app", "gemini", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted provider: Temp"));

    switchyard_cmd(&temp)
        .args(["provider", "show", "tmp", "--app", "gemini"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NOT_FOUND"));
}

#[test]
fn test_env_check_json() {
    let temp = TempDir::new().unwrap();
    switchyard_cmd(&temp)
        .args(["env", "check", "--app", "gemini", "--json"])
        .env("GEMINI_API_KEY", "from-env")
        .assert()
        .success()
        .stdout(predicate::str::contains("GEMINI_API_KEY"))
        .stdout(predicate::str::contains("Process Environment"));
}

#[test]
fn test_config_set_dir_redirects_live_files() {
    let temp = TempDir::new().unwrap();
    let custom = temp.path().join("custom-claude");
    fs::create_dir_all(&custom).unwrap();

    switchyard_cmd(&temp)
        .args(["config", "set-dir", "--app", "claude"])
        .arg(&custom)
        .assert()
        .success()
        .stdout(predicate::str::contains("claude config directory"));

    let saved = fs::read_to_string(temp.path().join("data/settings.json")).unwrap();
    assert!(saved.contains("claudeConfigDir"));

    switchyard_cmd(&temp)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("custom-claude"))
        .stdout(predicate::str::contains("opencode.json"));

    switchyard_cmd(&temp)
        .args(["provider", "add", "Main", "--app", "claude", "--id", "main"])
        .assert()
        .success();
    switchyard_cmd(&temp)
        .args(["provider", "switch", "main", "--app", "claude"])
        .assert()
        .success();
    assert!(custom.join("settings.json").exists());

    switchyard_cmd(&temp)
        .args(["config", "set-dir", "--app", "claude", "--clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("reset to default"));
    let saved = fs::read_to_string(temp.path().join("data/settings.json")).unwrap();
    assert!(!saved.contains("claudeConfigDir"));
}

#[test]
fn test_config_set_dir_needs_a_directory() {
    let temp = TempDir::new().unwrap();
    switchyard_cmd(&temp)
        .args(["config", "set-dir", "--app", "codex"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--clear"));
}
