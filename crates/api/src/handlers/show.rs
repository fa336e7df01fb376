use axum::extract::State;
use axum::response::Json;

use crate::dto::{ApiResponse, CommandRequest};
use crate::state::AppState;

const ENDPOINTS: &[&str] = &[
    "POST /api/v1/ping",
    "POST /api/v1/keystore",
    "POST /api/v1/truststore",
    "POST /api/v1/zone",
    "POST /api/v1/delegation",
    "POST /api/v1/debug",
    "POST /api/v1/command",
    "POST /api/v1/config",
    "POST /api/v1/signer",
    "POST /api/v1/signergroup",
    "POST /api/v1/test",
    "POST /api/v1/process",
    "POST /api/v1/show",
    "POST /api/v1/hello (sync)",
    "POST /api/v1/beat (sync)",
];

pub async fn show_command(
    State(_state): State<AppState>,
    Json(req): Json<CommandRequest>,
) -> Json<ApiResponse> {
    let response = match req.command.as_str() {
        "api" => ApiResponse::ok(ENDPOINTS.join("\n")),
        other => ApiResponse::unknown_command("show", other),
    };
    Json(response)
}
