use axum::extract::State;
use axum::response::Json;
use tracing::debug;

use crate::dto::{ApiResponse, CommandRequest};
use crate::state::AppState;

pub async fn signer_command(
    State(state): State<AppState>,
    Json(req): Json<CommandRequest>,
) -> Json<ApiResponse> {
    debug!(command = %req.command, "signer command");
    let response = match req.command.as_str() {
        "add" => match req.signer {
            Some(signer) => match state.add_signer.execute(signer).await {
                Ok(signer) => ApiResponse::ok(format!("signer {} added", signer.name)),
                Err(e) => ApiResponse::failure(&e),
            },
            None => ApiResponse {
                error: true,
                error_msg: "missing required field 'signer'".into(),
                ..ApiResponse::default()
            },
        },
        "update" => match req.signer {
            Some(signer) => match state.update_signer.execute(signer).await {
                Ok(signer) => ApiResponse::ok(format!("signer {} updated", signer.name)),
                Err(e) => ApiResponse::failure(&e),
            },
            None => ApiResponse {
                error: true,
                error_msg: "missing required field 'signer'".into(),
                ..ApiResponse::default()
            },
        },
        "delete" => match req.signer_name.as_deref() {
            Some(name) => match state.delete_signer.execute(name).await {
                Ok(()) => ApiResponse::ok(format!("signer {} deleted", name)),
                Err(e) => ApiResponse::failure(&e),
            },
            None => ApiResponse {
                error: true,
                error_msg: "missing required field 'signer_name'".into(),
                ..ApiResponse::default()
            },
        },
        "list" => match state.list_signers.execute().await {
            Ok(signers) => {
                ApiResponse::ok(format!("{} signers", signers.len())).with_signers(signers)
            }
            Err(e) => ApiResponse::failure(&e),
        },
        "join" => match (req.signer_name.as_deref(), req.group.as_deref()) {
            (Some(signer), Some(group)) => {
                match state.signer_join_group.execute(signer, group).await {
                    Ok(()) => ApiResponse::ok(format!(
                        "signer {} joining group {}, add-signer started",
                        signer, group
                    )),
                    Err(e) => ApiResponse::failure(&e),
                }
            }
            _ => ApiResponse {
                error: true,
                error_msg: "missing required fields 'signer_name' and 'group'".into(),
                ..ApiResponse::default()
            },
        },
        "leave" => match (req.signer_name.as_deref(), req.group.as_deref()) {
            (Some(signer), Some(group)) => {
                match state.signer_leave_group.execute(signer, group).await {
                    Ok(()) => ApiResponse::ok(format!(
                        "signer {} leaving group {}, remove-signer started",
                        signer, group
                    )),
                    Err(e) => ApiResponse::failure(&e),
                }
            }
            _ => ApiResponse {
                error: true,
                error_msg: "missing required fields 'signer_name' and 'group'".into(),
                ..ApiResponse::default()
            },
        },
        other => ApiResponse::unknown_command("signer", other),
    };
    Json(response)
}
