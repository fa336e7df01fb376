//! Authorization rules of the management API: a configured key gates
//! every mutating command, read-only commands pass without one.

use music_api::middleware::{
    authorize, is_read_only_command, peek_command, timing_safe_eq, AuthDecision,
};

const KEY: &str = "mgmt-key-4f2a9c";

fn body(command: &str) -> Vec<u8> {
    format!(r#"{{"command":"{}","zone":"example.com."}}"#, command).into_bytes()
}

#[test]
fn no_configured_key_allows_everything() {
    assert_eq!(
        authorize(None, None, &body("delete")),
        AuthDecision::Allow
    );
    assert_eq!(authorize(None, None, b"not json"), AuthDecision::Allow);
}

#[test]
fn matching_key_allows_mutations() {
    assert_eq!(
        authorize(Some(KEY), Some(KEY), &body("join")),
        AuthDecision::Allow
    );
}

#[test]
fn wrong_key_falls_back_to_command_rules() {
    // A wrong key on a mutation is denied...
    assert_eq!(
        authorize(Some(KEY), Some("mgmt-key-000000"), &body("step-fsm")),
        AuthDecision::Deny
    );
    // ...but a wrong key on a listing degrades to the keyless path.
    assert_eq!(
        authorize(Some(KEY), Some("mgmt-key-000000"), &body("list")),
        AuthDecision::Allow
    );
}

#[test]
fn missing_key_allows_read_only_commands() {
    for command in ["list", "status", "view", "graph", "get-rrsets"] {
        assert_eq!(
            authorize(Some(KEY), None, &body(command)),
            AuthDecision::Allow,
            "command '{}' should pass without a key",
            command
        );
    }
}

#[test]
fn missing_key_denies_mutating_commands() {
    for command in ["add", "delete", "join", "leave", "step-fsm", "stop", "copy-rrset"] {
        assert_eq!(
            authorize(Some(KEY), None, &body(command)),
            AuthDecision::Deny,
            "command '{}' must not pass without a key",
            command
        );
    }
}

#[test]
fn unparseable_or_commandless_bodies_are_denied_without_key() {
    assert_eq!(authorize(Some(KEY), None, b"not json"), AuthDecision::Deny);
    assert_eq!(
        authorize(Some(KEY), None, br#"{"zone":"example.com."}"#),
        AuthDecision::Deny
    );
    assert_eq!(authorize(Some(KEY), None, b""), AuthDecision::Deny);
}

#[test]
fn peek_finds_the_discriminator() {
    assert_eq!(peek_command(&body("list")).as_deref(), Some("list"));
    assert_eq!(
        peek_command(br#"{"command":"fsm","process":"add-signer"}"#).as_deref(),
        Some("fsm")
    );
    assert_eq!(peek_command(br#"{"command":42}"#), None);
    assert_eq!(peek_command(br#"["command"]"#), None);
}

#[test]
fn read_only_classification() {
    assert!(is_read_only_command("list"));
    assert!(is_read_only_command("status"));
    assert!(!is_read_only_command("add"));
    // The delegation "sync" command schedules work, so it mutates.
    assert!(!is_read_only_command("sync"));
    // Unknown commands fail closed.
    assert!(!is_read_only_command("frobnicate"));
}

#[test]
fn key_comparison_is_exact() {
    assert!(timing_safe_eq(KEY.as_bytes(), KEY.as_bytes()));
    // Same length, one byte off.
    assert!(!timing_safe_eq(KEY.as_bytes(), b"mgmt-key-4f2a9d"));
    // Prefix of the real key.
    assert!(!timing_safe_eq(KEY.as_bytes(), b"mgmt-key"));
    assert!(timing_safe_eq(b"", b""));
}
