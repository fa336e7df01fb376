use axum::extract::State;
use axum::response::Json;
use music_domain::{Config, SignerAuth};

use crate::dto::{ApiResponse, CommandRequest};
use crate::state::AppState;

/// Credentials never leave the process through the view command.
fn redacted(config: &Config) -> Config {
    let mut copy = config.clone();
    if copy.apiserver.api_key.is_some() {
        copy.apiserver.api_key = Some("<redacted>".to_string());
    }
    for signer in &mut copy.signers {
        signer.auth = match &signer.auth {
            SignerAuth::Tsig {
                key_name,
                algorithm,
                ..
            } => SignerAuth::Tsig {
                key_name: key_name.clone(),
                algorithm: algorithm.clone(),
                secret: "<redacted>".to_string(),
            },
            SignerAuth::Token { .. } => SignerAuth::Token {
                token: "<redacted>".to_string(),
            },
            SignerAuth::None => SignerAuth::None,
        };
    }
    copy
}

pub async fn config_command(
    State(state): State<AppState>,
    Json(req): Json<CommandRequest>,
) -> Json<ApiResponse> {
    let response = match req.command.as_str() {
        "view" => match serde_json::to_string_pretty(&redacted(&state.config)) {
            Ok(rendered) => ApiResponse::ok(rendered),
            Err(e) => ApiResponse {
                error: true,
                error_msg: format!("cannot render config: {}", e),
                ..ApiResponse::default()
            },
        },
        "reload" => ApiResponse {
            error: true,
            error_msg: "config reload requires a restart".into(),
            ..ApiResponse::default()
        },
        other => ApiResponse::unknown_command("config", other),
    };
    Json(response)
}
