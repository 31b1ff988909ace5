//! Unit tests for `FleetSupervisor` driven through mock ports.

#![allow(clippy::expect_used)]

use botfleet_cli::application::services::fleet::FleetSupervisor;
use botfleet_cli::domain::{
    ActionReport, AgentAction, AgentStatus, CredentialError, FleetError, LogEntry, LogSource,
    StopOutcome,
};
use botfleet_common::builtin_agents;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::mocks::{MOCK_PID, MemoryCredentialStore, MockLauncher};

type Fleet = FleetSupervisor<MemoryCredentialStore, MockLauncher>;

fn fleet(launcher: &MockLauncher) -> (Fleet, UnboundedReceiver<LogEntry>, MemoryCredentialStore) {
    let store = MemoryCredentialStore::default();
    let (fleet, log) = FleetSupervisor::new(builtin_agents(), store.clone(), launcher.clone());
    (fleet, log, store)
}

fn fleet_error(error: &anyhow::Error) -> &FleetError {
    error
        .downcast_ref::<FleetError>()
        .expect("error should be a FleetError")
}

fn drain(log: &mut UnboundedReceiver<LogEntry>) -> Vec<LogEntry> {
    let mut entries = Vec::new();
    while let Ok(entry) = log.try_recv() {
        entries.push(entry);
    }
    entries
}

// ── Credentials ──────────────────────────────────────────────────────────────

#[test]
fn whitespace_token_is_rejected_and_store_unchanged() {
    let (mut fleet, _log, store) = fleet(&MockLauncher::default());

    let err = fleet
        .set_credential("crypto", "  \t ")
        .expect_err("blank token");

    assert_eq!(
        err.downcast_ref::<CredentialError>(),
        Some(&CredentialError::EmptyToken)
    );
    assert!(store.snapshot().is_empty());
    assert_eq!(fleet.credential("crypto").expect("known agent"), "");
}

#[test]
fn token_is_trimmed_and_read_back() {
    let (mut fleet, _log, _store) = fleet(&MockLauncher::default());

    fleet.set_credential("crypto", "  123:abc \n").expect("set");

    assert_eq!(fleet.credential("crypto").expect("get"), "123:abc");
}

#[test]
fn unknown_agent_is_not_found() {
    let (mut fleet, _log, _store) = fleet(&MockLauncher::default());

    let err = fleet.set_credential("ghost", "abc").expect_err("unknown");
    assert_eq!(fleet_error(&err), &FleetError::NotFound("ghost".into()));
    assert!(fleet.start("ghost").is_err());
    assert!(fleet.status("ghost").is_err());
}

// ── Start / stop ─────────────────────────────────────────────────────────────

#[test]
fn start_without_token_is_refused() {
    let launcher = MockLauncher::default();
    let (mut fleet, _log, _store) = fleet(&launcher);

    let err = fleet.start("crypto").expect_err("no token");

    assert_eq!(fleet_error(&err), &FleetError::NoCredential("crypto".into()));
    assert_eq!(fleet.status("crypto").expect("status"), AgentStatus::Stopped);
    assert!(launcher.launched().is_empty());
}

#[test]
fn start_after_setting_token_runs_with_it_injected() {
    let launcher = MockLauncher::default();
    let (mut fleet, _log, _store) = fleet(&launcher);

    fleet.set_credential("crypto", "abc").expect("set");
    fleet.start("crypto").expect("start");

    assert_eq!(fleet.status("crypto").expect("status"), AgentStatus::Running);
    assert_eq!(launcher.launched(), vec![("crypto".to_string(), "abc".to_string())]);
    assert_eq!(fleet.running(), 1);
}

#[test]
fn starting_twice_is_refused() {
    let (mut fleet, _log, _store) = fleet(&MockLauncher::default());
    fleet.set_credential("crypto", "abc").expect("set");
    fleet.start("crypto").expect("start");

    let err = fleet.start("crypto").expect_err("already running");

    assert_eq!(fleet_error(&err), &FleetError::AlreadyRunning("crypto".into()));
}

#[test]
fn launch_failure_returns_to_stopped() {
    let (mut fleet, mut log, _store) = fleet(&MockLauncher::failing());
    fleet.set_credential("crypto", "abc").expect("set");

    let err = fleet.start("crypto").expect_err("spawn fails");

    assert!(format!("{err:#}").contains("spawn failed"));
    assert_eq!(fleet.status("crypto").expect("status"), AgentStatus::Stopped);
    let events = drain(&mut log);
    assert!(events.iter().any(|e| e.line.starts_with("failed to start")));
}

#[test]
fn credential_edits_are_refused_while_running() {
    let (mut fleet, _log, store) = fleet(&MockLauncher::default());
    fleet.set_credential("crypto", "abc").expect("set");
    fleet.start("crypto").expect("start");

    let set = fleet.set_credential("crypto", "xyz").expect_err("busy");
    let clear = fleet.clear_credential("crypto").expect_err("busy");

    for err in [set, clear] {
        assert!(matches!(
            fleet_error(&err),
            FleetError::Busy {
                status: AgentStatus::Running,
                ..
            }
        ));
    }
    assert_eq!(store.snapshot().get("crypto").map(String::as_str), Some("abc"));
}

#[tokio::test]
async fn stop_ends_stopped_even_when_the_agent_ignores_sigterm() {
    let (mut fleet, _log, _store) = fleet(&MockLauncher::ignoring_sigterm());
    fleet.set_credential("crypto", "abc").expect("set");
    fleet.start("crypto").expect("start");

    let outcome = fleet.stop("crypto").await.expect("stop");

    assert_eq!(outcome, StopOutcome::Killed);
    assert_eq!(fleet.status("crypto").expect("status"), AgentStatus::Stopped);
    // Editable again once stopped.
    fleet.clear_credential("crypto").expect("clear");
    let err = fleet.start("crypto").expect_err("token cleared");
    assert_eq!(fleet_error(&err), &FleetError::NoCredential("crypto".into()));
}

#[tokio::test]
async fn stop_of_a_stopped_agent_is_refused() {
    let (mut fleet, _log, _store) = fleet(&MockLauncher::default());

    let err = fleet.stop("crypto").await.expect_err("not running");

    assert_eq!(fleet_error(&err), &FleetError::NotRunning("crypto".into()));
}

// ── Fleet-wide actions ───────────────────────────────────────────────────────

#[tokio::test]
async fn start_all_and_stop_all_report_per_agent() {
    let (mut fleet, _log, _store) = fleet(&MockLauncher::default());
    fleet.set_credential("crypto", "abc").expect("set");
    fleet.set_credential("giveaway", "def").expect("set");

    let started = fleet.start_all();

    assert_eq!(
        started,
        vec![
            ("iq-test".to_string(), ActionReport::Skipped("no token".into())),
            ("registration".to_string(), ActionReport::Skipped("no token".into())),
            ("crypto".to_string(), ActionReport::Done),
            ("giveaway".to_string(), ActionReport::Done),
        ]
    );

    // Idempotent: nothing new to start.
    let again = fleet.start_all();
    assert!(again.iter().all(|(_, r)| matches!(r, ActionReport::Skipped(_))));
    assert_eq!(fleet.running(), 2);

    let stopped = fleet.stop_all().await;
    let done: Vec<&str> = stopped
        .iter()
        .filter(|(_, r)| *r == ActionReport::Done)
        .map(|(name, _)| name.as_str())
        .collect();
    assert_eq!(done, ["crypto", "giveaway"]);
    assert_eq!(fleet.running(), 0);
}

#[test]
fn start_all_tolerates_partial_failure() {
    let (mut fleet, _log, _store) = fleet(&MockLauncher::failing());
    fleet.set_credential("crypto", "abc").expect("set");

    let reports = fleet.start_all();

    let crypto = reports
        .iter()
        .find(|(name, _)| name == "crypto")
        .map(|(_, r)| r.clone());
    assert!(matches!(crypto, Some(ActionReport::Failed(_))));
    assert_eq!(reports.len(), 4);
    assert_eq!(fleet.running(), 0);
}

// ── Exits and log ────────────────────────────────────────────────────────────

#[tokio::test]
async fn refresh_reports_each_exit_once() {
    let launcher = MockLauncher::default();
    let (mut fleet, mut log, _store) = fleet(&launcher);
    fleet.set_credential("crypto", "abc").expect("set");
    fleet.start("crypto").expect("start");
    assert!(fleet.refresh().is_empty());

    launcher.exit("crypto", Some(1));
    let exits = fleet.refresh();

    assert_eq!(exits.len(), 1);
    assert_eq!(exits[0].0, "crypto");
    assert_eq!(exits[0].1.code, Some(1));
    assert!(fleet.refresh().is_empty(), "exit must be reported once");
    assert!(
        drain(&mut log)
            .iter()
            .any(|e| e.source == LogSource::Supervisor && e.line == "exited with code 1")
    );

    let view = fleet
        .views()
        .into_iter()
        .find(|v| v.name == "crypto")
        .expect("crypto view");
    assert!(view.exit.is_some());

    let outcome = fleet.stop("crypto").await.expect("stop");
    assert_eq!(outcome, StopOutcome::AlreadyExited);
    assert_eq!(fleet.status("crypto").expect("status"), AgentStatus::Stopped);
}

#[test]
fn output_and_events_arrive_in_order_and_are_recorded() {
    let (mut fleet, mut log, _store) = fleet(&MockLauncher::default());
    fleet.set_credential("crypto", "abc").expect("set");
    fleet.start("crypto").expect("start");

    let entries = drain(&mut log);
    for entry in &entries {
        fleet.record(entry);
    }

    let lines: Vec<(&str, LogSource, &str)> = entries
        .iter()
        .map(|e| (e.agent.as_str(), e.source, e.line.as_str()))
        .collect();
    assert_eq!(
        lines,
        vec![
            ("crypto", LogSource::Stdout, "crypto online"),
            ("crypto", LogSource::Supervisor, "started (pid 4242)"),
        ]
    );
    assert_eq!(fleet.log().len(), 2);
}

#[test]
fn log_buffer_is_bounded() {
    let (fleet, _log, _store) = fleet(&MockLauncher::default());
    let mut fleet = fleet.with_log_capacity(3);

    for i in 0..5 {
        fleet.record(&LogEntry::new("crypto", LogSource::Stdout, format!("line {i}")));
    }

    let lines: Vec<&str> = fleet.log().iter().map(|e| e.line.as_str()).collect();
    assert_eq!(lines, ["line 2", "line 3", "line 4"]);
}

#[test]
fn views_mask_tokens_and_list_allowed_actions() {
    let (mut fleet, _log, _store) = fleet(&MockLauncher::default());
    fleet
        .set_credential("crypto", "123456:ABCDEFGHIJ")
        .expect("set");
    fleet.start("crypto").expect("start");

    let views = fleet.views();
    let crypto = views.iter().find(|v| v.name == "crypto").expect("crypto");
    let giveaway = views.iter().find(|v| v.name == "giveaway").expect("giveaway");

    assert_eq!(crypto.credential.as_deref(), Some("1234…GHIJ"));
    assert_eq!(crypto.pid, Some(MOCK_PID));
    assert_eq!(crypto.allowed_actions, vec![AgentAction::Stop]);
    assert_eq!(giveaway.credential, None);
    assert_eq!(giveaway.allowed_actions, vec![AgentAction::SetCredential]);
}
