//! Shared plumbing for transition steps.

use music_domain::{MusicError, RecordType, Rrset, Signer, SignerGroup, Zone};

use crate::fsm::process::FsmContext;

/// Metadata key holding the parent primary's address for a zone.
pub const META_PARENT_ADDR: &str = "parentaddr";

/// Load the zone's signer group and its member signers, recording a
/// stop-reason when the zone is unusable for a group process.
pub async fn load_group(
    ctx: &FsmContext,
    zone: &Zone,
) -> Result<Option<(SignerGroup, Vec<Signer>)>, MusicError> {
    let Some(group_name) = &zone.signer_group else {
        ctx.zones
            .set_stop_reason(&zone.name, "zone is not bound to a signer group")
            .await?;
        return Ok(None);
    };

    let Some(group) = ctx.groups.get_group(group_name).await? else {
        ctx.zones
            .set_stop_reason(
                &zone.name,
                &format!("signer group '{}' does not exist", group_name),
            )
            .await?;
        return Ok(None);
    };

    let signers = ctx.signers.signers_in_group(group_name).await?;
    if signers.is_empty() {
        ctx.zones
            .set_stop_reason(
                &zone.name,
                &format!("signer group '{}' has no signers", group_name),
            )
            .await?;
        return Ok(None);
    }

    Ok(Some((group, signers)))
}

/// Fetch the same RRset from every signer in the group.
pub async fn fetch_from_all(
    ctx: &FsmContext,
    signers: &[Signer],
    zone: &str,
    owner: &str,
    rtype: RecordType,
) -> Result<Vec<(Signer, Rrset)>, MusicError> {
    let mut out = Vec::with_capacity(signers.len());
    for signer in signers {
        let rrset = ctx.ops.fetch_rrset(signer, zone, owner, rtype).await?;
        out.push((signer.clone(), rrset));
    }
    Ok(out)
}

/// Make one signer serve exactly `target`: insert what is missing,
/// delete what is stale. No-op when the served set already matches.
pub async fn ensure_exact(
    ctx: &FsmContext,
    signer: &Signer,
    zone: &str,
    target: &Rrset,
) -> Result<(), MusicError> {
    let served = ctx
        .ops
        .fetch_rrset(signer, zone, &target.owner, target.rtype)
        .await?;

    let missing = served.missing_from(target);
    let stale = served.extra_over(target);
    if missing.is_empty() && stale.is_empty() {
        return Ok(());
    }

    let mut inserts = Vec::new();
    if !missing.is_empty() {
        inserts.push(Rrset::with_records(
            target.owner.clone(),
            target.rtype,
            target.ttl,
            missing,
        ));
    }
    let mut removes = Vec::new();
    if !stale.is_empty() {
        removes.push(Rrset::with_records(
            target.owner.clone(),
            target.rtype,
            target.ttl,
            stale,
        ));
    }

    ctx.ops
        .update_rrsets(signer, zone, &target.owner, &inserts, &removes)
        .await
}

/// Make one signer serve at least `target`: insert what is missing and
/// leave anything extra alone.
pub async fn ensure_contains(
    ctx: &FsmContext,
    signer: &Signer,
    zone: &str,
    target: &Rrset,
) -> Result<(), MusicError> {
    let served = ctx
        .ops
        .fetch_rrset(signer, zone, &target.owner, target.rtype)
        .await?;

    let missing = served.missing_from(target);
    if missing.is_empty() {
        return Ok(());
    }

    let inserts = vec![Rrset::with_records(
        target.owner.clone(),
        target.rtype,
        target.ttl,
        missing,
    )];
    ctx.ops
        .update_rrsets(signer, zone, &target.owner, &inserts, &[])
        .await
}

/// The parent primary for a zone, from metadata. Records a stop-reason
/// when unset.
pub async fn parent_addr(ctx: &FsmContext, zone: &Zone) -> Result<Option<String>, MusicError> {
    match ctx.zones.get_meta(&zone.name, META_PARENT_ADDR).await? {
        Some(addr) if !addr.is_empty() => Ok(Some(addr)),
        _ => {
            ctx.zones
                .set_stop_reason(
                    &zone.name,
                    &format!("no {} metadata for zone", META_PARENT_ADDR),
                )
                .await?;
            Ok(None)
        }
    }
}
