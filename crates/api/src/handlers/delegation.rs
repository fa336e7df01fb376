use axum::extract::State;
use axum::response::Json;
use music_application::fsm::EngineCheck;
use music_application::ports::DnsLookup;
use music_domain::{MusicError, RecordType};
use music_infrastructure::dns::presentation::data_to_presentation;

use crate::dto::{ApiResponse, CommandRequest, RrsetInfo};
use crate::state::AppState;

pub async fn delegation_command(
    State(state): State<AppState>,
    Json(req): Json<CommandRequest>,
) -> Json<ApiResponse> {
    let Some(zone) = req.zone.as_deref() else {
        return Json(ApiResponse {
            error: true,
            error_msg: "missing required field 'zone'".into(),
            ..ApiResponse::default()
        });
    };

    let response = match req.command.as_str() {
        "status" => status(&state, zone).await,
        "sync" => {
            match state.engine_checks.send(EngineCheck::for_zone(zone)).await {
                Ok(()) => ApiResponse::ok(format!("evaluation scheduled for {}", zone)),
                Err(_) => ApiResponse {
                    error: true,
                    error_msg: "engine is shut down".into(),
                    ..ApiResponse::default()
                },
            }
        }
        other => ApiResponse::unknown_command("delegation", other),
    };
    Json(response)
}

/// The delegation as the parent currently serves it: NS and DS at the
/// address recorded in the zone's `parentaddr` metadata.
async fn status(state: &AppState, zone: &str) -> ApiResponse {
    let parent = match state.set_zone_meta.get(zone, "parentaddr").await {
        Ok(Some(parent)) => parent,
        Ok(None) => {
            return ApiResponse {
                error: true,
                error_msg: format!("no parentaddr metadata for zone {}", zone),
                ..ApiResponse::default()
            }
        }
        Err(e) => return ApiResponse::failure(&e),
    };

    let mut rrsets = Vec::new();
    for rtype in [RecordType::NS, RecordType::DS] {
        match state.lookup.query_at(&parent, zone, rtype).await {
            Ok(rrset) => rrsets.push(RrsetInfo {
                signer: format!("parent {}", parent),
                owner: rrset.owner.clone(),
                rtype: rrset.rtype.to_string(),
                ttl: rrset.ttl,
                records: rrset.records.iter().map(data_to_presentation).collect(),
            }),
            Err(e @ MusicError::Timeout(_)) | Err(e @ MusicError::DnsProtocol(_)) => {
                return ApiResponse::failure(&e)
            }
            Err(e) => return ApiResponse::failure(&e),
        }
    }

    ApiResponse::ok(format!("delegation at parent {}", parent)).with_rrsets(rrsets)
}
