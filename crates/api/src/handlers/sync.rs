//! Sidecar-to-sidecar endpoints.
//!
//! `/hello` is open: the sender is not yet a known peer, so it can only
//! be parked as a wannabe and verified against the DNS later. `/beat`
//! and `/ping` require a client certificate whose subject CN maps to a
//! known peer and which verifies against that peer's TLSA record.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::Extension;
use music_application::ports::PeerDirectory;
use music_application::services::{BeatMsg, BeatResponse, FullBeatMsg, HelloMsg, HelloResponse};
use music_infrastructure::sync::tlsa;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::state::AppState;

/// The peer's TLS client certificate in DER form, inserted by the sync
/// listener's connection handler.
#[derive(Clone, Default)]
pub struct ClientCertDer(pub Option<Vec<u8>>);

/// Map a presented client certificate to a known, TLSA-verified peer
/// identity.
fn authenticate_peer(state: &AppState, cert: &ClientCertDer) -> Result<String, StatusCode> {
    let Some(cert_der) = &cert.0 else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    let cn = tlsa::subject_common_name(cert_der)
        .ok()
        .flatten()
        .ok_or(StatusCode::UNAUTHORIZED)?;
    let identity = if cn.ends_with('.') { cn } else { format!("{}.", cn) };

    let Some(peer) = state.directory.get(&identity) else {
        warn!(peer = %identity, "Beat from unknown peer identity");
        return Err(StatusCode::UNAUTHORIZED);
    };

    // The pinned truststore anchor wins over the discovered record.
    let tlsa_record = state
        .truststore
        .get(&identity)
        .map(|entry| entry.value().clone())
        .or_else(|| peer.api.as_ref().and_then(|api| api.tlsa.clone()));
    let Some(tlsa_record) = tlsa_record else {
        warn!(peer = %identity, "No TLSA record to verify client certificate against");
        return Err(StatusCode::UNAUTHORIZED);
    };

    match tlsa::verify_cert(cert_der, &tlsa_record) {
        Ok(true) => Ok(identity),
        _ => {
            warn!(peer = %identity, "Client certificate does not match TLSA record");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

pub async fn hello(
    State(state): State<AppState>,
    Json(hello): Json<HelloMsg>,
) -> Json<HelloResponse> {
    let identity = state.hello_service_identity();
    debug!(peer = %hello.identity, zones = hello.zones.len(), "HELLO received");
    state.hello_service.receive_hello(hello);
    Json(HelloResponse {
        msg: "howdy".to_string(),
        identity,
    })
}

/// `/beat` accepts both the summary and the full form; they share the
/// endpoint and differ in payload.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum AnyBeat {
    Full(FullBeatMsg),
    Summary(BeatMsg),
}

pub async fn beat(
    State(state): State<AppState>,
    Extension(cert): Extension<ClientCertDer>,
    Json(beat): Json<AnyBeat>,
) -> Result<Json<BeatResponse>, StatusCode> {
    let identity = authenticate_peer(&state, &cert)?;

    let known = match beat {
        AnyBeat::Full(full) => {
            if full.identity != identity {
                return Err(StatusCode::UNAUTHORIZED);
            }
            state.hello_service.receive_full_beat(full)
        }
        AnyBeat::Summary(summary) => {
            if summary.identity != identity {
                return Err(StatusCode::UNAUTHORIZED);
            }
            state.hello_service.receive_beat(&summary)
        }
    };

    if !known {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(BeatResponse {
        msg: "ok".to_string(),
    }))
}

pub async fn sync_ping(
    State(state): State<AppState>,
    Extension(cert): Extension<ClientCertDer>,
) -> Result<Json<BeatResponse>, StatusCode> {
    let identity = authenticate_peer(&state, &cert)?;
    debug!(peer = %identity, "Sync ping");
    Ok(Json(BeatResponse {
        msg: "pong".to_string(),
    }))
}

impl AppState {
    fn hello_service_identity(&self) -> String {
        self.config.sidecar.identity.clone()
    }
}
