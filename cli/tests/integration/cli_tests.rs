//! Integration tests for argument parsing, listing and the long-running commands.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

pub fn botfleet(home: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("botfleet"));
    cmd.env("NO_COLOR", "1")
        .env("BOTFLEET_HOME", home.path())
        .env_remove("RUST_LOG");
    cmd
}

// --- Help and version tests ---

#[test]
fn test_cli_no_args_shows_help() {
    let home = TempDir::new().expect("tempdir");
    botfleet(&home)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Supervise a fleet"));
}

#[test]
fn test_cli_help_lists_commands() {
    let home = TempDir::new().expect("tempdir");
    botfleet(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("agents"))
        .stdout(predicate::str::contains("token"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("console"));
}

#[test]
fn test_cli_version_flag_shows_version() {
    let home = TempDir::new().expect("tempdir");
    botfleet(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("botfleet"));
}

#[test]
fn test_unknown_command_fails() {
    let home = TempDir::new().expect("tempdir");
    botfleet(&home).arg("launch").assert().failure();
}

// --- agents ---

#[test]
fn test_agents_json_lists_builtin_agents_stopped() {
    let home = TempDir::new().expect("tempdir");
    let output = botfleet(&home)
        .args(["agents", "--json"])
        .output()
        .expect("run");
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid json");
    let agents = value["agents"].as_array().expect("agents array");
    let names: Vec<&str> = agents
        .iter()
        .map(|a| a["name"].as_str().expect("name"))
        .collect();
    assert_eq!(names, ["iq-test", "registration", "crypto", "giveaway"]);
    for agent in agents {
        assert_eq!(agent["status"], "stopped");
        assert!(agent["credential"].is_null());
        assert_eq!(agent["allowed_actions"], serde_json::json!(["set-token"]));
    }
}

#[test]
fn test_agents_reads_registry_file() {
    let home = TempDir::new().expect("tempdir");
    std::fs::write(
        home.path().join("agents.yaml"),
        "agents:\n  - name: shop-bot\n    flow: registration\n",
    )
    .expect("write registry");

    botfleet(&home)
        .arg("agents")
        .assert()
        .success()
        .stdout(predicate::str::contains("shop-bot"))
        .stdout(predicate::str::contains("crypto").not());
}

#[test]
fn test_invalid_registry_is_reported() {
    let home = TempDir::new().expect("tempdir");
    std::fs::write(home.path().join("agents.yaml"), "agents: [").expect("write registry");

    botfleet(&home)
        .arg("agents")
        .assert()
        .failure()
        .stderr(predicate::str::contains("agent registry"));
}

// --- run / console ---

#[test]
fn test_run_without_tokens_fails() {
    let home = TempDir::new().expect("tempdir");
    botfleet(&home)
        .arg("run")
        .assert()
        .failure()
        .stdout(predicate::str::contains("skipped (no token)"))
        .stderr(predicate::str::contains("no agent was started"));
}

#[test]
fn test_run_unknown_agent_fails() {
    let home = TempDir::new().expect("tempdir");
    botfleet(&home)
        .args(["run", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("'ghost' not found"));
}

#[test]
fn test_console_reads_commands_until_quit() {
    let home = TempDir::new().expect("tempdir");
    botfleet(&home)
        .arg("console")
        .write_stdin("help\nset crypto 123456:ABCDEFGHIJ\nstatus\nbogus\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("start-all"))
        .stdout(predicate::str::contains("Token saved for crypto"))
        .stdout(predicate::str::contains("1234…GHIJ"))
        .stderr(predicate::str::contains("Unknown command 'bogus'"));

    let tokens = std::fs::read_to_string(home.path().join("tokens.json")).expect("tokens");
    assert!(tokens.contains("123456:ABCDEFGHIJ"));
}

#[test]
fn test_console_exits_at_end_of_input() {
    let home = TempDir::new().expect("tempdir");
    botfleet(&home)
        .arg("console")
        .write_stdin("status\n")
        .assert()
        .success();
}
