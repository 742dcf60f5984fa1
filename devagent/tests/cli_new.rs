//! CLI tests for `devagent init` and `devagent new`.
//!
//! Spawns the binary in a temp directory and checks files and exit codes.

use std::fs;
use std::process::Command;

use devagent::exit_codes;
use devagent::io::config::{AgentConfig, load_config};

#[test]
fn init_writes_default_config() {
    let temp = tempfile::tempdir().expect("tempdir");

    let status = Command::new(env!("CARGO_BIN_EXE_devagent"))
        .current_dir(temp.path())
        .arg("init")
        .status()
        .expect("devagent init");

    assert_eq!(status.code(), Some(exit_codes::OK));
    let cfg = load_config(&temp.path().join("devagent.toml")).expect("load");
    assert_eq!(cfg, AgentConfig::default());
}

#[test]
fn init_refuses_to_overwrite_without_force() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("custom.toml");
    fs::write(&path, "[correction]\nmax_attempts = 5\n").expect("write");

    let status = Command::new(env!("CARGO_BIN_EXE_devagent"))
        .current_dir(temp.path())
        .args(["--config", "custom.toml", "init"])
        .status()
        .expect("devagent init");
    assert_eq!(status.code(), Some(exit_codes::INVALID));
    assert_eq!(load_config(&path).expect("load").correction.max_attempts, 5);

    let status = Command::new(env!("CARGO_BIN_EXE_devagent"))
        .current_dir(temp.path())
        .args(["--config", "custom.toml", "init", "--force"])
        .status()
        .expect("devagent init --force");
    assert_eq!(status.code(), Some(exit_codes::OK));
    assert_eq!(load_config(&path).expect("load").correction.max_attempts, 3);
}

#[test]
fn new_without_prompt_is_a_usage_error() {
    let temp = tempfile::tempdir().expect("tempdir");

    let output = Command::new(env!("CARGO_BIN_EXE_devagent"))
        .current_dir(temp.path())
        .arg("new")
        .output()
        .expect("devagent new");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("<PROMPT>"));
}

#[test]
fn invalid_config_is_rejected() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(
        temp.path().join("devagent.toml"),
        "[correction]\nmax_attempts = 0\n",
    )
    .expect("write");

    let output = Command::new(env!("CARGO_BIN_EXE_devagent"))
        .current_dir(temp.path())
        .args(["new", "a todo app"])
        .output()
        .expect("devagent new");

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("max_attempts"));
}

/// Nothing listens on the discard port, so planning fails without writing files.
#[test]
fn unreachable_planner_exits_with_plan_failed() {
    let temp = tempfile::tempdir().expect("tempdir");

    let output = Command::new(env!("CARGO_BIN_EXE_devagent"))
        .current_dir(temp.path())
        .args(["--endpoint", "http://127.0.0.1:9", "new", "a", "todo", "app"])
        .output()
        .expect("devagent new");

    assert_eq!(output.status.code(), Some(exit_codes::PLAN_FAILED));
    let entries: Vec<_> = fs::read_dir(temp.path())
        .expect("read dir")
        .collect::<Result<_, _>>()
        .expect("entries");
    assert!(entries.is_empty());
}
