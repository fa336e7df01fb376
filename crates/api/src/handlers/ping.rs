use axum::extract::State;
use axum::response::Json;
use chrono::Utc;

use crate::dto::ApiResponse;
use crate::state::AppState;

pub async fn ping(State(state): State<AppState>) -> Json<ApiResponse> {
    let uptime = (Utc::now() - state.started_at).num_seconds();
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());
    Json(ApiResponse::ok(format!(
        "pong from {} ({}), up {} s",
        state.config.sidecar.identity, host, uptime
    )))
}
