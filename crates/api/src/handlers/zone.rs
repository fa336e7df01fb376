use axum::extract::State;
use axum::response::Json;
use music_application::ports::ZoneRepository;
use music_domain::{FsmMode, ZoneType};
use tracing::debug;

use crate::dto::{ApiResponse, CommandRequest};
use crate::state::AppState;

fn required<'a>(value: &'a Option<String>, what: &str) -> Result<&'a str, ApiResponse> {
    value.as_deref().ok_or_else(|| ApiResponse {
        error: true,
        error_msg: format!("missing required field '{}'", what),
        ..ApiResponse::default()
    })
}

pub async fn zone_command(
    State(state): State<AppState>,
    Json(req): Json<CommandRequest>,
) -> Json<ApiResponse> {
    debug!(command = %req.command, "zone command");
    let response = match req.command.as_str() {
        "add" => add(&state, &req).await,
        "delete" => delete(&state, &req).await,
        "list" => list(&state).await,
        "join" => join(&state, &req).await,
        "leave" => leave(&state, &req).await,
        "fsm" => attach_fsm(&state, &req).await,
        "step-fsm" => step_fsm(&state, &req).await,
        "meta" => meta(&state, &req).await,
        other => ApiResponse::unknown_command("zone", other),
    };
    Json(response)
}

async fn add(state: &AppState, req: &CommandRequest) -> ApiResponse {
    let zone = match required(&req.zone, "zone") {
        Ok(zone) => zone,
        Err(resp) => return resp,
    };
    let zone_type = req
        .zone_type
        .as_deref()
        .and_then(ZoneType::parse)
        .unwrap_or(ZoneType::Normal);
    let fsm_mode = req
        .fsm_mode
        .as_deref()
        .and_then(FsmMode::parse)
        .unwrap_or(FsmMode::Auto);

    match state.add_zone.execute(zone.to_string(), zone_type, fsm_mode).await {
        Ok(zone) => ApiResponse::ok(format!("zone {} added", zone.name)),
        Err(e) => ApiResponse::failure(&e),
    }
}

async fn delete(state: &AppState, req: &CommandRequest) -> ApiResponse {
    let zone = match required(&req.zone, "zone") {
        Ok(zone) => zone,
        Err(resp) => return resp,
    };
    match state.delete_zone.execute(zone).await {
        Ok(()) => ApiResponse::ok(format!("zone {} deleted", zone)),
        Err(e) => ApiResponse::failure(&e),
    }
}

async fn list(state: &AppState) -> ApiResponse {
    match state.list_zones.execute().await {
        Ok(zones) => {
            ApiResponse::ok(format!("{} zones", zones.len())).with_zones(zones)
        }
        Err(e) => ApiResponse::failure(&e),
    }
}

async fn join(state: &AppState, req: &CommandRequest) -> ApiResponse {
    let (zone, group) = match (required(&req.zone, "zone"), required(&req.group, "group")) {
        (Ok(zone), Ok(group)) => (zone, group),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    match state.zone_join_group.execute(zone, group).await {
        Ok(()) => ApiResponse::ok(format!("zone {} joined group {}", zone, group)),
        Err(e) => ApiResponse::failure(&e),
    }
}

async fn leave(state: &AppState, req: &CommandRequest) -> ApiResponse {
    let (zone, group) = match (required(&req.zone, "zone"), required(&req.group, "group")) {
        (Ok(zone), Ok(group)) => (zone, group),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    match state.zone_leave_group.execute(zone, group).await {
        Ok(()) => ApiResponse::ok(format!("zone {} left group {}", zone, group)),
        Err(e) => ApiResponse::failure(&e),
    }
}

async fn attach_fsm(state: &AppState, req: &CommandRequest) -> ApiResponse {
    let (zone, process) = match (required(&req.zone, "zone"), required(&req.process, "process")) {
        (Ok(zone), Ok(process)) => (zone, process),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    let Some(definition) = state.engine.processes().get(process) else {
        return ApiResponse {
            error: true,
            error_msg: format!("unknown process '{}'", process),
            ..ApiResponse::default()
        };
    };

    match state
        .zones
        .attach_fsm(zone, process, &definition.initial_state, false)
        .await
    {
        Ok(()) => {
            let _ = state
                .engine_checks
                .send(music_application::fsm::EngineCheck::for_zone(zone))
                .await;
            ApiResponse::ok(format!("zone {} attached to process {}", zone, process))
        }
        Err(e) => ApiResponse::failure(&e),
    }
}

async fn step_fsm(state: &AppState, req: &CommandRequest) -> ApiResponse {
    let zone = match required(&req.zone, "zone") {
        Ok(zone) => zone,
        Err(resp) => return resp,
    };
    match state
        .step_fsm
        .execute(zone, req.next_state.as_deref())
        .await
    {
        Ok(outcome) => ApiResponse::ok(format!("{:?}", outcome)),
        Err(e) => ApiResponse::failure(&e),
    }
}

async fn meta(state: &AppState, req: &CommandRequest) -> ApiResponse {
    let (zone, key) = match (required(&req.zone, "zone"), required(&req.key, "key")) {
        (Ok(zone), Ok(key)) => (zone, key),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    match &req.value {
        Some(value) => match state.set_zone_meta.execute(zone, key, value).await {
            Ok(()) => ApiResponse::ok(format!("zone {} metadata {} set", zone, key)),
            Err(e) => ApiResponse::failure(&e),
        },
        None => match state.set_zone_meta.get(zone, key).await {
            Ok(value) => {
                let mut meta = std::collections::BTreeMap::new();
                meta.insert(key.to_string(), value.unwrap_or_default());
                ApiResponse::ok("metadata").with_meta(meta)
            }
            Err(e) => ApiResponse::failure(&e),
        },
    }
}
