use axum::extract::State;
use axum::response::Json;
use tracing::debug;

use crate::dto::{ApiResponse, CommandRequest};
use crate::state::AppState;

pub async fn signergroup_command(
    State(state): State<AppState>,
    Json(req): Json<CommandRequest>,
) -> Json<ApiResponse> {
    debug!(command = %req.command, "signergroup command");
    let response = match req.command.as_str() {
        "add" => match req.group.as_deref() {
            Some(group) => match state.add_group.execute(group).await {
                Ok(group) => ApiResponse::ok(format!("signer group {} added", group.name)),
                Err(e) => ApiResponse::failure(&e),
            },
            None => ApiResponse {
                error: true,
                error_msg: "missing required field 'group'".into(),
                ..ApiResponse::default()
            },
        },
        "delete" => match req.group.as_deref() {
            Some(group) => match state.delete_group.execute(group).await {
                Ok(()) => ApiResponse::ok(format!("signer group {} deleted", group)),
                Err(e) => ApiResponse::failure(&e),
            },
            None => ApiResponse {
                error: true,
                error_msg: "missing required field 'group'".into(),
                ..ApiResponse::default()
            },
        },
        "list" => match state.list_groups.execute().await {
            Ok(groups) => {
                ApiResponse::ok(format!("{} signer groups", groups.len())).with_groups(groups)
            }
            Err(e) => ApiResponse::failure(&e),
        },
        other => ApiResponse::unknown_command("signergroup", other),
    };
    Json(response)
}
