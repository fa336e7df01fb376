//! Static API-key authentication for the management API.
//!
//! Mutating commands require the `X-API-Key` header. Read-only commands
//! (list, status, view, ...) pass without one; the management surface is
//! all POST with the command in the JSON body, so the middleware buffers
//! the body and peeks at the discriminator before the handler parses it
//! for real.

use axum::body::{to_bytes, Body};
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;

use crate::state::AppState;

pub const API_KEY_HEADER: &str = "X-API-Key";

/// Bodies above this size are rejected before the peek; real command
/// requests are tiny.
const MAX_PEEK_BYTES: usize = 256 * 1024;

/// Commands that only read state. Anything not listed here mutates.
const READ_ONLY_COMMANDS: &[&str] = &[
    "list",
    "list-rrset",
    "get-rrsets",
    "graph",
    "check",
    "status",
    "view",
    "api",
];

pub fn is_read_only_command(command: &str) -> bool {
    READ_ONLY_COMMANDS.contains(&command)
}

/// Constant-time byte comparison; unequal lengths short-circuit, which
/// leaks nothing an attacker does not already know.
pub fn timing_safe_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// The `command` discriminator of a management request body, if the body
/// is a JSON object carrying one.
pub fn peek_command(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()?
        .get("command")?
        .as_str()
        .map(str::to_string)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecision {
    Allow,
    Deny,
}

/// The whole authorization rule in one place: no configured key means
/// open access, a matching key allows everything, and without one only
/// read-only commands get through.
pub fn authorize(expected: Option<&str>, presented: Option<&str>, body: &[u8]) -> AuthDecision {
    let Some(expected) = expected else {
        return AuthDecision::Allow;
    };

    if let Some(presented) = presented {
        if timing_safe_eq(presented.as_bytes(), expected.as_bytes()) {
            return AuthDecision::Allow;
        }
    }

    match peek_command(body) {
        Some(command) if is_read_only_command(&command) => AuthDecision::Allow,
        _ => AuthDecision::Deny,
    }
}

pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = &state.api_key else {
        return Ok(next.run(request).await);
    };

    let presented = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    // A valid key allows everything; no need to touch the body.
    if let Some(presented) = &presented {
        if timing_safe_eq(presented.as_bytes(), expected.as_bytes()) {
            return Ok(next.run(request).await);
        }
    }

    // No valid key: buffer the body to peek at the command, then hand
    // the bytes back to the handler untouched.
    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_PEEK_BYTES)
        .await
        .map_err(|_| StatusCode::PAYLOAD_TOO_LARGE)?;
    let decision = authorize(Some(expected), presented.as_deref(), &bytes);
    let request = Request::from_parts(parts, Body::from(bytes));

    match decision {
        AuthDecision::Allow => Ok(next.run(request).await),
        AuthDecision::Deny => Err(StatusCode::UNAUTHORIZED),
    }
}
