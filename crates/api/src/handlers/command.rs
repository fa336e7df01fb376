use axum::extract::State;
use axum::response::Json;
use chrono::Utc;
use music_application::ports::PeerDirectory;
use tracing::info;

use crate::dto::{ApiResponse, CommandRequest};
use crate::state::AppState;

pub async fn command_command(
    State(state): State<AppState>,
    Json(req): Json<CommandRequest>,
) -> Json<ApiResponse> {
    let response = match req.command.as_str() {
        "status" => status(&state).await,
        "stop" => {
            info!("Stop requested through the management API");
            state.shutdown.cancel();
            ApiResponse::ok("shutting down")
        }
        other => ApiResponse::unknown_command("command", other),
    };
    Json(response)
}

async fn status(state: &AppState) -> ApiResponse {
    let zones = match state.list_zones.execute().await {
        Ok(zones) => zones,
        Err(e) => return ApiResponse::failure(&e),
    };
    let in_process = zones.iter().filter(|z| z.is_in_process()).count();
    let blocked = zones.iter().filter(|z| z.is_blocked()).count();
    let peers = state.directory.peers().len();
    let uptime = (Utc::now() - state.started_at).num_seconds();

    ApiResponse::ok(format!(
        "{} zones ({} in process, {} blocked), {} peers, up {} s",
        zones.len(),
        in_process,
        blocked,
        peers,
        uptime
    ))
}
