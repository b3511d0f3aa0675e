//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary against a throwaway config directory and
//! verify outputs.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(config_dir: &Path, args: &[&str], stdin: Option<&str>) -> (String, String, i32) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_focusbreak"))
        .args(args)
        .env("FOCUSBREAK_CONFIG_DIR", config_dir)
        .env_remove("FOCUSBREAK_LOG")
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute CLI command");

    {
        let mut pipe = child.stdin.take().expect("stdin is piped");
        if let Some(input) = stdin {
            pipe.write_all(input.as_bytes()).expect("write stdin");
        }
    }

    let output = child.wait_with_output().expect("CLI did not finish");
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn config_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("temp dir")
}

#[test]
fn test_config_get_default() {
    let dir = config_dir();
    let (stdout, _, code) = run_cli(dir.path(), &["config", "get", "timer.work_minutes"], None);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "25");
    assert!(dir.path().join("config.toml").exists());
}

#[test]
fn test_config_set_persists() {
    let dir = config_dir();
    let (stdout, _, code) = run_cli(dir.path(), &["config", "set", "timer.work_minutes", "50"], None);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "ok");

    let (stdout, _, _) = run_cli(dir.path(), &["config", "get", "timer.work_minutes"], None);
    assert_eq!(stdout.trim(), "50");
}

#[test]
fn test_config_set_out_of_range_fails() {
    let dir = config_dir();
    let (_, stderr, code) = run_cli(dir.path(), &["config", "set", "timer.break_minutes", "90"], None);
    assert_ne!(code, 0);
    assert!(stderr.contains("timer.break_minutes"), "{stderr}");

    let (stdout, _, _) = run_cli(dir.path(), &["config", "get", "timer.break_minutes"], None);
    assert_eq!(stdout.trim(), "5");
}

#[test]
fn test_config_unknown_key() {
    let dir = config_dir();
    let (_, stderr, code) = run_cli(dir.path(), &["config", "get", "timer.colour"], None);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown key"));
}

#[test]
fn test_config_list_json() {
    let dir = config_dir();
    let (stdout, _, code) = run_cli(dir.path(), &["config", "list", "--json"], None);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(parsed["timer"]["sessions_before_long_break"], 4);
    assert_eq!(parsed["driver"]["poll_interval_ms"], 100);
}

#[test]
fn test_exercise_list() {
    let dir = config_dir();
    let (stdout, _, code) = run_cli(dir.path(), &["exercise", "list", "--json"], None);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(parsed.as_array().map(Vec::len), Some(20));
}

#[test]
fn test_exercise_next_is_reproducible() {
    let dir = config_dir();
    let args = ["exercise", "next", "--count", "3", "--seed", "9"];
    let (first, _, code) = run_cli(dir.path(), &args, None);
    assert_eq!(code, 0);
    let (second, _, _) = run_cli(dir.path(), &args, None);
    assert_eq!(first, second);
}

#[test]
fn test_run_status_and_quit() {
    let dir = config_dir();
    let (stdout, _, code) = run_cli(
        dir.path(),
        &["run", "--no-sound", "--no-notify", "--work", "30"],
        Some("status\njson\nquit\n"),
    );
    assert_eq!(code, 0);
    assert!(stdout.contains("Ready 00:00"), "{stdout}");

    let start = stdout.find('{').expect("json status");
    let end = stdout.rfind('}').expect("json status");
    let view: serde_json::Value = serde_json::from_str(&stdout[start..=end]).expect("valid JSON");
    assert_eq!(view["phase"], "idle");
    assert_eq!(view["config"]["work_minutes"], 30);
    assert_eq!(view["audio_enabled"], false);
}

#[test]
fn test_run_start_skip_and_exercise() {
    let dir = config_dir();
    let (stdout, _, code) = run_cli(
        dir.path(),
        &["run", "--no-sound", "--no-notify"],
        Some("start\nskip\nstatus\ndone\nstatus\nquit\n"),
    );
    assert_eq!(code, 0);
    assert!(stdout.contains("waiting for exercise"), "{stdout}");
    assert!(stdout.contains("type 'done' when finished"), "{stdout}");
    assert!(stdout.contains("Short break 05:00"), "{stdout}");
}

#[test]
fn test_run_rejects_bad_setting() {
    let dir = config_dir();
    let (_, stderr, code) = run_cli(
        dir.path(),
        &["run", "--no-sound", "--no-notify"],
        Some("set work 200\nquit\n"),
    );
    assert_eq!(code, 0);
    assert!(stderr.contains("work_minutes"), "{stderr}");
}

#[test]
fn test_run_rejects_bad_flag() {
    let dir = config_dir();
    let (_, stderr, code) = run_cli(dir.path(), &["run", "--work", "0"], Some("quit\n"));
    assert_eq!(code, 1);
    assert!(stderr.contains("work_minutes"), "{stderr}");
}
