use crate::handlers;
use crate::middleware::require_api_key;
use crate::state::AppState;
use axum::{middleware, routing::post, Router};

/// The management API, guarded by the static API key.
pub fn create_management_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/ping", post(handlers::ping::ping))
        .route("/api/v1/keystore", post(handlers::keystore::keystore_command))
        .route(
            "/api/v1/truststore",
            post(handlers::truststore::truststore_command),
        )
        .route("/api/v1/zone", post(handlers::zone::zone_command))
        .route(
            "/api/v1/delegation",
            post(handlers::delegation::delegation_command),
        )
        .route("/api/v1/debug", post(handlers::debug::debug_command))
        .route("/api/v1/command", post(handlers::command::command_command))
        .route("/api/v1/config", post(handlers::config::config_command))
        .route("/api/v1/signer", post(handlers::signer::signer_command))
        .route(
            "/api/v1/signergroup",
            post(handlers::signergroup::signergroup_command),
        )
        .route("/api/v1/test", post(handlers::test::test_command))
        .route("/api/v1/process", post(handlers::process::process_command))
        .route("/api/v1/show", post(handlers::show::show_command))
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .with_state(state)
}

/// The sidecar-to-sidecar API, served behind the TLS listener that
/// requests client certificates. No API key: `/hello` is open, the rest
/// authenticate by certificate.
pub fn create_sync_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/hello", post(handlers::sync::hello))
        .route("/api/v1/beat", post(handlers::sync::beat))
        .route("/api/v1/ping", post(handlers::sync::sync_ping))
        .with_state(state)
}
