use axum::extract::State;
use axum::response::Json;
use music_application::ports::{SignerOps, SignerRepository};
use music_domain::{MusicError, RecordType, Signer};
use music_infrastructure::dns::presentation::data_to_presentation;

use crate::dto::{ApiResponse, CommandRequest, RrsetInfo};
use crate::state::AppState;

fn parse_rtype(req: &CommandRequest) -> Result<RecordType, ApiResponse> {
    req.rtype
        .as_deref()
        .and_then(RecordType::parse)
        .ok_or_else(|| ApiResponse {
            error: true,
            error_msg: format!("unknown record type '{}'", req.rtype.as_deref().unwrap_or("")),
            ..ApiResponse::default()
        })
}

async fn fetch_info(
    state: &AppState,
    signer: &Signer,
    zone: &str,
    owner: &str,
    rtype: RecordType,
) -> Result<RrsetInfo, MusicError> {
    let rrset = state.ops.fetch_rrset(signer, zone, owner, rtype).await?;
    Ok(RrsetInfo {
        signer: signer.name.clone(),
        owner: rrset.owner.clone(),
        rtype: rrset.rtype.to_string(),
        ttl: rrset.ttl,
        records: rrset.records.iter().map(data_to_presentation).collect(),
    })
}

pub async fn debug_command(
    State(state): State<AppState>,
    Json(req): Json<CommandRequest>,
) -> Json<ApiResponse> {
    let response = match req.command.as_str() {
        "get-rrsets" => get_rrsets(&state, &req).await,
        "list-rrset" => list_rrset(&state, &req).await,
        "copy-rrset" => copy_rrset(&state, &req).await,
        other => ApiResponse::unknown_command("debug", other),
    };
    Json(response)
}

/// Fetch one RRset from every signer in the zone's group.
async fn get_rrsets(state: &AppState, req: &CommandRequest) -> ApiResponse {
    let Some(zone_name) = req.zone.as_deref() else {
        return ApiResponse {
            error: true,
            error_msg: "missing required field 'zone'".into(),
            ..ApiResponse::default()
        };
    };
    let rtype = match parse_rtype(req) {
        Ok(rtype) => rtype,
        Err(resp) => return resp,
    };
    let owner = req.owner.as_deref().unwrap_or(zone_name);

    let zone = match state.list_zones.get(zone_name).await {
        Ok(Some(zone)) => zone,
        Ok(None) => return ApiResponse::failure(&MusicError::ZoneNotFound(zone_name.into())),
        Err(e) => return ApiResponse::failure(&e),
    };
    let Some(group) = zone.signer_group.as_deref() else {
        return ApiResponse {
            error: true,
            error_msg: format!("zone {} is not bound to a signer group", zone_name),
            ..ApiResponse::default()
        };
    };

    let signers = match state.signers.signers_in_group(group).await {
        Ok(signers) => signers,
        Err(e) => return ApiResponse::failure(&e),
    };

    let mut rrsets = Vec::with_capacity(signers.len());
    for signer in &signers {
        match fetch_info(state, signer, zone_name, owner, rtype).await {
            Ok(info) => rrsets.push(info),
            Err(e) => return ApiResponse::failure(&e),
        }
    }
    ApiResponse::ok(format!("{} RRsets", rrsets.len())).with_rrsets(rrsets)
}

/// Fetch one RRset from one named signer.
async fn list_rrset(state: &AppState, req: &CommandRequest) -> ApiResponse {
    let (Some(zone), Some(signer_name)) = (req.zone.as_deref(), req.signer_name.as_deref())
    else {
        return ApiResponse {
            error: true,
            error_msg: "missing required fields 'zone' and 'signer_name'".into(),
            ..ApiResponse::default()
        };
    };
    let rtype = match parse_rtype(req) {
        Ok(rtype) => rtype,
        Err(resp) => return resp,
    };
    let owner = req.owner.as_deref().unwrap_or(zone);

    let signer = match state.signers.get_signer(signer_name).await {
        Ok(Some(signer)) => signer,
        Ok(None) => {
            return ApiResponse::failure(&MusicError::SignerNotFound(signer_name.into()))
        }
        Err(e) => return ApiResponse::failure(&e),
    };

    match fetch_info(state, &signer, zone, owner, rtype).await {
        Ok(info) => ApiResponse::ok("1 RRset").with_rrsets(vec![info]),
        Err(e) => ApiResponse::failure(&e),
    }
}

/// Copy one RRset verbatim from one signer to another.
async fn copy_rrset(state: &AppState, req: &CommandRequest) -> ApiResponse {
    let (Some(zone), Some(from), Some(to)) = (
        req.zone.as_deref(),
        req.from_signer.as_deref(),
        req.to_signer.as_deref(),
    ) else {
        return ApiResponse {
            error: true,
            error_msg: "missing required fields 'zone', 'from_signer' and 'to_signer'".into(),
            ..ApiResponse::default()
        };
    };
    let rtype = match parse_rtype(req) {
        Ok(rtype) => rtype,
        Err(resp) => return resp,
    };
    let owner = req.owner.as_deref().unwrap_or(zone);

    let (from_signer, to_signer) = match (
        state.signers.get_signer(from).await,
        state.signers.get_signer(to).await,
    ) {
        (Ok(Some(from)), Ok(Some(to))) => (from, to),
        (Ok(None), _) => return ApiResponse::failure(&MusicError::SignerNotFound(from.into())),
        (_, Ok(None)) => return ApiResponse::failure(&MusicError::SignerNotFound(to.into())),
        (Err(e), _) | (_, Err(e)) => return ApiResponse::failure(&e),
    };

    let rrset = match state.ops.fetch_rrset(&from_signer, zone, owner, rtype).await {
        Ok(rrset) => rrset,
        Err(e) => return ApiResponse::failure(&e),
    };
    match state
        .ops
        .update_rrsets(&to_signer, zone, owner, std::slice::from_ref(&rrset), &[])
        .await
    {
        Ok(()) => ApiResponse::ok(format!(
            "copied {} {} records from {} to {}",
            rrset.len(),
            rtype,
            from,
            to
        )),
        Err(e) => ApiResponse::failure(&e),
    }
}
