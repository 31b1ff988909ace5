//! Integration tests for `botfleet token`.

#![allow(clippy::expect_used)]

use predicates::prelude::*;
use tempfile::TempDir;

use crate::cli_tests::botfleet;

#[test]
fn test_token_set_show_clear_round_trip() {
    let home = TempDir::new().expect("tempdir");

    botfleet(&home)
        .args(["token", "set", "crypto", "123456:ABCDEFGHIJ"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Token saved for crypto"));

    let output = botfleet(&home)
        .args(["token", "show", "crypto", "--json"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(value["agent"], "crypto");
    assert_eq!(value["token"], "1234…GHIJ");

    botfleet(&home)
        .args(["token", "clear", "crypto", "--yes"])
        .assert()
        .success();

    botfleet(&home)
        .args(["token", "show", "crypto"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not set"));
}

#[test]
fn test_agents_listing_masks_tokens() {
    let home = TempDir::new().expect("tempdir");
    botfleet(&home)
        .args(["token", "set", "giveaway", "987654:SECRETSECRET"])
        .assert()
        .success();

    botfleet(&home)
        .arg("agents")
        .assert()
        .success()
        .stdout(predicate::str::contains("9876…CRET"))
        .stdout(predicate::str::contains("SECRETSECRET").not());
}

#[test]
fn test_blank_token_is_rejected() {
    let home = TempDir::new().expect("tempdir");
    botfleet(&home)
        .args(["token", "set", "crypto", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Token must not be empty"));

    assert!(!home.path().join("tokens.json").exists());
}

#[test]
fn test_unknown_agent_is_rejected() {
    let home = TempDir::new().expect("tempdir");
    botfleet(&home)
        .args(["token", "set", "ghost", "abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Agent 'ghost' not found"));
}

#[test]
fn test_token_set_json_confirms() {
    let home = TempDir::new().expect("tempdir");
    let output = botfleet(&home)
        .args(["--json", "token", "set", "crypto", "abc"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(value["action"], "token-set");
    assert_eq!(value["ok"], true);
}
