//! Tests for console line parsing.

use botfleet_cli::domain::{ConsoleCommand, ConsoleError, DEFAULT_LOG_TAIL};

fn parse(line: &str) -> ConsoleCommand {
    match ConsoleCommand::parse(line) {
        Ok(Some(command)) => command,
        other => panic!("{line:?} did not parse: {other:?}"),
    }
}

#[test]
fn every_verb_parses() {
    assert_eq!(parse("start crypto"), ConsoleCommand::Start("crypto".into()));
    assert_eq!(parse("stop crypto"), ConsoleCommand::Stop("crypto".into()));
    assert_eq!(parse("start-all"), ConsoleCommand::StartAll);
    assert_eq!(parse("stop-all"), ConsoleCommand::StopAll);
    assert_eq!(
        parse("set crypto 123:abc"),
        ConsoleCommand::Set {
            agent: "crypto".into(),
            token: "123:abc".into()
        }
    );
    assert_eq!(parse("clear crypto"), ConsoleCommand::Clear("crypto".into()));
    assert_eq!(parse("status"), ConsoleCommand::Status);
    assert_eq!(parse("log"), ConsoleCommand::Log(DEFAULT_LOG_TAIL));
    assert_eq!(parse("log 5"), ConsoleCommand::Log(5));
    assert_eq!(parse("help"), ConsoleCommand::Help);
    assert_eq!(parse("quit"), ConsoleCommand::Quit);
    assert_eq!(parse("exit"), ConsoleCommand::Quit);
}

#[test]
fn surrounding_whitespace_is_ignored() {
    assert_eq!(parse("   stop    crypto  "), ConsoleCommand::Stop("crypto".into()));
}

#[test]
fn missing_arguments_report_usage() {
    assert_eq!(
        ConsoleCommand::parse("start"),
        Err(ConsoleError::Usage("start <agent>"))
    );
    assert_eq!(
        ConsoleCommand::parse("set crypto"),
        Err(ConsoleError::Usage("set <agent> <token>"))
    );
    assert_eq!(
        ConsoleCommand::parse("clear a b"),
        Err(ConsoleError::Usage("clear <agent>"))
    );
}

#[test]
fn unknown_verbs_are_reported() {
    assert_eq!(
        ConsoleCommand::parse("launch crypto"),
        Err(ConsoleError::Unknown("launch crypto".into()))
    );
    assert!(ConsoleCommand::parse("start-all now").is_err());
}
