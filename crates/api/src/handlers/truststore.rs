use axum::extract::State;
use axum::response::Json;

use crate::dto::{ApiResponse, CommandRequest};
use crate::state::AppState;

/// Operator-pinned TLSA anchors, taking precedence over DNS-discovered
/// records when present.
pub async fn truststore_command(
    State(state): State<AppState>,
    Json(req): Json<CommandRequest>,
) -> Json<ApiResponse> {
    let response = match req.command.as_str() {
        "add" => match (req.identity.as_deref(), req.tlsa) {
            (Some(identity), Some(tlsa)) => {
                state.truststore.insert(identity.to_string(), tlsa);
                ApiResponse::ok(format!("TLSA anchor for {} stored", identity))
            }
            _ => ApiResponse {
                error: true,
                error_msg: "missing required fields 'identity' and 'tlsa'".into(),
                ..ApiResponse::default()
            },
        },
        "delete" => match req.identity.as_deref() {
            Some(identity) => {
                if state.truststore.remove(identity).is_some() {
                    ApiResponse::ok(format!("TLSA anchor for {} removed", identity))
                } else {
                    ApiResponse {
                        error: true,
                        error_msg: format!("no TLSA anchor stored for {}", identity),
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
            for entry in state.truststore.iter() {
                let tlsa = entry.value();
                meta.insert(
                    entry.key().clone(),
                    format!(
                        "{} {} {} {}",
                        tlsa.usage, tlsa.selector, tlsa.matching_type, tlsa.cert_data
                    ),
                );
            }
            ApiResponse::ok(format!("{} TLSA anchors", meta.len())).with_meta(meta)
        }
        other => ApiResponse::unknown_command("truststore", other),
    };
    Json(response)
}
