//! Property-based tests for credential handling and the action table.
//!
//! Uses `proptest` to verify invariants across many random inputs.

#![allow(clippy::expect_used)]

use botfleet_cli::domain::{
    AgentAction, AgentStatus, ConsoleCommand, allowed_actions, mask_token, validate_token,
};
use proptest::prelude::*;

fn status() -> impl Strategy<Value = AgentStatus> {
    prop_oneof![
        Just(AgentStatus::Stopped),
        Just(AgentStatus::Starting),
        Just(AgentStatus::Running),
        Just(AgentStatus::Stopping),
    ]
}

proptest! {
    /// Whitespace-only input is never a token.
    #[test]
    fn prop_blank_tokens_rejected(token in "[ \t\r\n]{0,16}") {
        prop_assert!(validate_token(&token).is_err());
    }

    /// Valid tokens are stored trimmed and validation is idempotent.
    #[test]
    fn prop_validation_trims(core in "[0-9]{6,10}:[A-Za-z0-9_-]{10,35}", pad in "[ \t]{0,3}") {
        let stored = validate_token(&format!("{pad}{core}{pad}")).expect("valid token");
        prop_assert_eq!(&stored, &core);
        prop_assert_eq!(validate_token(&stored).expect("still valid"), core);
    }

    /// Long tokens keep only their first and last four characters.
    #[test]
    fn prop_mask_keeps_only_the_ends(token in "\\PC{0,64}") {
        let masked = mask_token(&token);
        let chars: Vec<char> = token.chars().collect();
        if chars.len() <= 8 {
            prop_assert_eq!(masked, "****");
        } else {
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[chars.len() - 4..].iter().collect();
            prop_assert_eq!(masked, format!("{head}…{tail}"));
        }
    }

    /// Credential edits are only offered for stopped agents.
    #[test]
    fn prop_active_agents_offer_no_credential_edits(has in any::<bool>(), status in status()) {
        let actions = allowed_actions(has, status);
        let edits = actions.contains(&AgentAction::SetCredential)
            || actions.contains(&AgentAction::ClearCredential);
        prop_assert_eq!(edits, status == AgentStatus::Stopped);
    }

    /// Start is offered exactly when the agent is stopped and has a token.
    #[test]
    fn prop_start_requires_token(has in any::<bool>(), status in status()) {
        let can_start = allowed_actions(has, status).contains(&AgentAction::Start);
        prop_assert_eq!(can_start, has && status == AgentStatus::Stopped);
    }

    /// The console parser never panics on arbitrary input.
    #[test]
    fn prop_console_parse_total(line in "\\PC{0,80}") {
        let _ = ConsoleCommand::parse(&line);
    }
}
