//! Integration tests for the file_cache binary
//!
//! Each invocation is a fresh process, so every read after the first exercises the
//! disk tier.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

/// Helper to run the CLI against a cache rooted in `dir`
fn run_cli(dir: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_file_cache"))
        .arg("--dir")
        .arg(dir)
        .args(args)
        .output()
        .expect("Failed to execute file_cache")
}

#[test]
fn test_help_flag_exits_successfully() {
    let output = Command::new(env!("CARGO_BIN_EXE_file_cache"))
        .arg("--help")
        .output()
        .expect("Failed to execute file_cache");
    assert!(output.status.success(), "Expected --help to exit successfully");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("file_cache"), "Help should mention file_cache");
    assert!(stdout.contains("cleanup"), "Help should list the cleanup command");
}

#[test]
fn test_set_then_get_across_processes() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");

    let set = run_cli(temp_dir.path(), &["set", "k", r#"{"n":1}"#]);
    assert!(set.status.success());

    let get = run_cli(temp_dir.path(), &["get", "k"]);
    assert!(get.status.success());
    assert_eq!(String::from_utf8_lossy(&get.stdout).trim(), r#"{"n":1}"#);

    let file = temp_dir
        .path()
        .join("file_cache")
        .join("default")
        .join("k.json");
    assert!(file.exists(), "Entry file should be written under root/name");
}

#[test]
fn test_get_missing_key_exits_with_miss_status() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");

    let output = run_cli(temp_dir.path(), &["get", "absent"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("absent"), "Should name the missing key: {}", stderr);
}

#[test]
fn test_invalid_json_value_prints_error() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");

    let output = run_cli(temp_dir.path(), &["set", "k", "{broken"]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid value"), "Unexpected stderr: {}", stderr);
}

#[test]
fn test_has_and_clear() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    run_cli(temp_dir.path(), &["--name", "weather", "set", "today", "\"sunny\""]);

    let has = run_cli(temp_dir.path(), &["--name", "weather", "has", "today"]);
    assert_eq!(String::from_utf8_lossy(&has.stdout).trim(), "true");

    let clear = run_cli(temp_dir.path(), &["--name", "weather", "clear"]);
    assert!(clear.status.success());

    let has = run_cli(temp_dir.path(), &["--name", "weather", "has", "today"]);
    assert_eq!(String::from_utf8_lossy(&has.stdout).trim(), "false");
}

#[test]
fn test_cleanup_removes_expired_files() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    run_cli(temp_dir.path(), &["--ttl", "0", "set", "old", "1"]);
    run_cli(temp_dir.path(), &["set", "new", "2"]);

    let output = run_cli(temp_dir.path(), &["cleanup"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("1 files"), "Unexpected stdout: {}", stdout);

    let get = run_cli(temp_dir.path(), &["get", "new"]);
    assert_eq!(String::from_utf8_lossy(&get.stdout).trim(), "2");
}

#[test]
fn test_out_of_range_ttl_prints_error() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");

    let output = run_cli(temp_dir.path(), &["--ttl", "10000000000000000", "set", "k", "1"]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid TTL"), "Unexpected stderr: {}", stderr);
}
