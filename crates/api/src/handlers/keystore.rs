use axum::extract::State;
use axum::response::Json;

use crate::dto::{ApiResponse, CommandRequest};
use crate::state::AppState;

/// Operator-managed SIG(0) public keys, consulted when a DNS-method
/// peer publishes no KEY record (or to pin one explicitly).
pub async fn keystore_command(
    State(state): State<AppState>,
    Json(req): Json<CommandRequest>,
) -> Json<ApiResponse> {
    let response = match req.command.as_str() {
        "add" => match (req.identity.as_deref(), req.sig0_key) {
            (Some(identity), Some(key)) => {
                state.keystore.insert(identity.to_string(), key);
                ApiResponse::ok(format!("SIG(0) key for {} stored", identity))
            }
            _ => ApiResponse {
                error: true,
                error_msg: "missing required fields 'identity' and 'sig0_key'".into(),
                ..ApiResponse::default()
            },
        },
        "delete" => match req.identity.as_deref() {
            Some(identity) => {
                if state.keystore.remove(identity).is_some() {
                    ApiResponse::ok(format!("SIG(0) key for {} removed", identity))
                } else {
                    ApiResponse {
                        error: true,
                        error_msg: format!("no SIG(0) key stored for {}", identity),
                        ..ApiResponse::default()
                    }
                }
            }
            None => ApiResponse {
                error: true,
                error_msg: "missing required field 'identity'".into(),
                ..ApiResponse::default()
            },
        },
        "list" => {
            let mut meta = std::collections::BTreeMap::new();
            for entry in state.keystore.iter() {
                meta.insert(
                    entry.key().clone(),
                    format!(
                        "alg {} tag-material {} octets",
                        entry.value().algorithm,
                        entry.value().public_key.len()
                    ),
                );
            }
            ApiResponse::ok(format!("{} SIG(0) keys", meta.len())).with_meta(meta)
        }
        other => ApiResponse::unknown_command("keystore", other),
    };
    Json(response)
}
