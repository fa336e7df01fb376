//! Transition steps shared by the shipped processes.
//!
//! Every action follows fetch, diff, apply so that re-running a step
//! whose post-condition already holds changes nothing.

use async_trait::async_trait;
use chrono::Utc;
use music_domain::{
    CsyncData, DnskeyData, MusicError, RecordData, RecordType, Rrset, Signer, SignerGroup, Zone,
};
use std::collections::BTreeSet;
use tracing::debug;

use crate::fsm::process::{FsmContext, TransitionStep};

use super::dnssec;
use super::support::{
    ensure_contains, ensure_exact, fetch_from_all, load_group, parent_addr,
};

fn dnskeys_in(rrset: &Rrset) -> Vec<DnskeyData> {
    rrset
        .records
        .iter()
        .filter_map(|r| r.as_dnskey().cloned())
        .collect()
}

/// Remaining members once the pending removal is taken out.
fn remaining<'s>(group: &SignerGroup, signers: &'s [Signer]) -> Vec<&'s Signer> {
    signers
        .iter()
        .filter(|s| Some(s.name.as_str()) != group.pending_removal.as_deref())
        .collect()
}

async fn leaving_signer_name(
    ctx: &FsmContext,
    zone: &Zone,
    group: &SignerGroup,
) -> Result<Option<String>, MusicError> {
    match &group.pending_removal {
        Some(name) => Ok(Some(name.clone())),
        None => {
            ctx.zones
                .set_stop_reason(
                    &zone.name,
                    &format!("group '{}' has no pending signer removal", group.name),
                )
                .await?;
            Ok(None)
        }
    }
}

// ---------------------------------------------------------------------------
// DNSKEY synchronisation (add-signer)

/// Make every signer serve the union of all signers' DNSKEYs.
pub struct SyncDnskeys;

#[async_trait]
impl TransitionStep for SyncDnskeys {
    async fn pre_condition(&self, ctx: &FsmContext, zone: &Zone) -> Result<bool, MusicError> {
        Ok(load_group(ctx, zone).await?.is_some())
    }

    async fn action(&self, ctx: &FsmContext, zone: &Zone) -> Result<(), MusicError> {
        let Some((_, signers)) = load_group(ctx, zone).await? else {
            return Err(MusicError::GroupNotFound(zone.name.clone()));
        };

        let fetched =
            fetch_from_all(ctx, &signers, &zone.name, &zone.name, RecordType::DNSKEY).await?;

        // Record each signer's pre-sync keys once; remove-signer later
        // retracts exactly this contribution.
        for (signer, rrset) in &fetched {
            let recorded = ctx.zones.get_zone_dnskeys(&zone.name, &signer.name).await?;
            if recorded.is_empty() {
                ctx.zones
                    .set_zone_dnskeys(&zone.name, &signer.name, &dnskeys_in(rrset))
                    .await?;
            }
        }

        let sets: Vec<Rrset> = fetched.iter().map(|(_, rrset)| rrset.clone()).collect();
        let union = Rrset::union(&zone.name, RecordType::DNSKEY, 3600, &sets);
        debug!(zone = %zone.name, keys = union.len(), "DNSKEY union computed");

        for (signer, _) in &fetched {
            ensure_contains(ctx, signer, &zone.name, &union).await?;
        }
        Ok(())
    }

    async fn post_condition(&self, ctx: &FsmContext, zone: &Zone) -> Result<bool, MusicError> {
        let Some((_, signers)) = load_group(ctx, zone).await? else {
            return Ok(false);
        };
        let fetched =
            fetch_from_all(ctx, &signers, &zone.name, &zone.name, RecordType::DNSKEY).await?;
        all_serve_same(ctx, zone, &fetched, "DNSKEY").await
    }
}

async fn all_serve_same(
    ctx: &FsmContext,
    zone: &Zone,
    fetched: &[(Signer, Rrset)],
    what: &str,
) -> Result<bool, MusicError> {
    let Some((_, reference)) = fetched.first() else {
        return Ok(false);
    };
    for (signer, rrset) in fetched {
        if !rrset.same_records(reference) {
            ctx.zones
                .set_stop_reason(
                    &zone.name,
                    &format!(
                        "signer '{}' serves {} {} records, expected {}",
                        signer.name,
                        rrset.len(),
                        what,
                        reference.len()
                    ),
                )
                .await?;
            return Ok(false);
        }
    }
    Ok(true)
}

// ---------------------------------------------------------------------------
// NS synchronisation (add-signer)

/// Make every signer serve the union of all signers' apex NS records.
pub struct SyncNses;

#[async_trait]
impl TransitionStep for SyncNses {
    async fn pre_condition(&self, ctx: &FsmContext, zone: &Zone) -> Result<bool, MusicError> {
        Ok(load_group(ctx, zone).await?.is_some())
    }

    async fn action(&self, ctx: &FsmContext, zone: &Zone) -> Result<(), MusicError> {
        let Some((_, signers)) = load_group(ctx, zone).await? else {
            return Err(MusicError::GroupNotFound(zone.name.clone()));
        };

        let fetched =
            fetch_from_all(ctx, &signers, &zone.name, &zone.name, RecordType::NS).await?;

        for (signer, rrset) in &fetched {
            let recorded = ctx.zones.get_zone_nses(&zone.name, &signer.name).await?;
            if recorded.is_empty() {
                let hosts: Vec<String> = rrset.ns_hosts().into_iter().collect();
                ctx.zones
                    .set_zone_nses(&zone.name, &signer.name, &hosts)
                    .await?;
            }
        }

        let sets: Vec<Rrset> = fetched.iter().map(|(_, rrset)| rrset.clone()).collect();
        let union = Rrset::union(&zone.name, RecordType::NS, 3600, &sets);

        for (signer, _) in &fetched {
            ensure_contains(ctx, signer, &zone.name, &union).await?;
        }
        Ok(())
    }

    async fn post_condition(&self, ctx: &FsmContext, zone: &Zone) -> Result<bool, MusicError> {
        let Some((_, signers)) = load_group(ctx, zone).await? else {
            return Ok(false);
        };
        let fetched =
            fetch_from_all(ctx, &signers, &zone.name, &zone.name, RecordType::NS).await?;
        all_serve_same(ctx, zone, &fetched, "NS").await
    }
}

// ---------------------------------------------------------------------------
// CDS/CDNSKEY publication (both group processes)

/// Publish CDS and CDNSKEY for every key-signing key currently served,
/// retracting stale entries.
pub struct PublishCds;

impl PublishCds {
    async fn targets(
        ctx: &FsmContext,
        zone: &Zone,
        signers: &[Signer],
    ) -> Result<(Rrset, Rrset), MusicError> {
        let fetched =
            fetch_from_all(ctx, signers, &zone.name, &zone.name, RecordType::DNSKEY).await?;
        let sets: Vec<Rrset> = fetched.into_iter().map(|(_, rrset)| rrset).collect();
        let union = Rrset::union(&zone.name, RecordType::DNSKEY, 3600, &sets);

        let mut cds = Rrset::new(zone.name.clone(), RecordType::CDS, 3600);
        let mut cdnskey = Rrset::new(zone.name.clone(), RecordType::CDNSKEY, 3600);
        for record in &union.records {
            if let Some(key) = record.as_dnskey() {
                if key.is_ksk() {
                    cds.records
                        .push(RecordData::Cds(dnssec::cds_for_key(&zone.name, key)?));
                    cdnskey.records.push(RecordData::Cdnskey(key.clone()));
                }
            }
        }
        Ok((cds, cdnskey))
    }
}

#[async_trait]
impl TransitionStep for PublishCds {
    async fn pre_condition(&self, ctx: &FsmContext, zone: &Zone) -> Result<bool, MusicError> {
        let Some((_, signers)) = load_group(ctx, zone).await? else {
            return Ok(false);
        };
        let (cds, _) = Self::targets(ctx, zone, &signers).await?;
        if cds.is_empty() {
            ctx.zones
                .set_stop_reason(&zone.name, "no key-signing keys to publish CDS for")
                .await?;
            return Ok(false);
        }
        Ok(true)
    }

    async fn action(&self, ctx: &FsmContext, zone: &Zone) -> Result<(), MusicError> {
        let Some((_, signers)) = load_group(ctx, zone).await? else {
            return Err(MusicError::GroupNotFound(zone.name.clone()));
        };
        let (cds, cdnskey) = Self::targets(ctx, zone, &signers).await?;
        for signer in &signers {
            ensure_exact(ctx, signer, &zone.name, &cds).await?;
            ensure_exact(ctx, signer, &zone.name, &cdnskey).await?;
        }
        Ok(())
    }

    async fn post_condition(&self, ctx: &FsmContext, zone: &Zone) -> Result<bool, MusicError> {
        let Some((_, signers)) = load_group(ctx, zone).await? else {
            return Ok(false);
        };
        let (target, _) = Self::targets(ctx, zone, &signers).await?;
        for signer in &signers {
            let served = ctx
                .ops
                .fetch_rrset(signer, &zone.name, &zone.name, RecordType::CDS)
                .await?;
            if !served.same_records(&target) {
                ctx.zones
                    .set_stop_reason(
                        &zone.name,
                        &format!("signer '{}' does not serve the target CDS set", signer.name),
                    )
                    .await?;
                return Ok(false);
            }
        }
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Parent DS wait (both group processes)

/// Wait until the parent's DS RRset covers the published CDS set. A wait
/// state: a false pre-condition leaves the zone delayed, not blocked.
pub struct WaitParentDs {
    /// remove-signer: also require the leaving signer's key tags to be
    /// gone from the parent.
    pub exclude_leaving: bool,
}

#[async_trait]
impl TransitionStep for WaitParentDs {
    async fn pre_condition(&self, ctx: &FsmContext, zone: &Zone) -> Result<bool, MusicError> {
        let Some((group, signers)) = load_group(ctx, zone).await? else {
            return Ok(false);
        };
        let Some(parent) = parent_addr(ctx, zone).await? else {
            return Ok(false);
        };

        let (cds, _) = PublishCds::targets(ctx, zone, &signers).await?;
        let wanted: BTreeSet<u16> = cds
            .records
            .iter()
            .filter_map(|r| match r {
                RecordData::Cds(cds) => Some(cds.key_tag),
                _ => None,
            })
            .collect();

        let parent_ds = ctx
            .lookup
            .query_at(&parent, &zone.name, RecordType::DS)
            .await?;
        let present: BTreeSet<u16> = parent_ds
            .records
            .iter()
            .filter_map(|r| match r {
                RecordData::Ds(ds) | RecordData::Cds(ds) => Some(ds.key_tag),
                _ => None,
            })
            .collect();

        if !wanted.is_subset(&present) {
            debug!(zone = %zone.name, "Waiting for parent DS update");
            return Ok(false);
        }

        if self.exclude_leaving {
            let Some(leaving) = leaving_signer_name(ctx, zone, &group).await? else {
                return Ok(false);
            };
            let leaving_keys = ctx.zones.get_zone_dnskeys(&zone.name, &leaving).await?;
            for key in leaving_keys.iter().filter(|k| k.is_ksk()) {
                if present.contains(&key.key_tag()?) {
                    debug!(zone = %zone.name, "Waiting for stale parent DS removal");
                    return Ok(false);
                }
            }
        }

        Ok(true)
    }

    async fn action(&self, _ctx: &FsmContext, _zone: &Zone) -> Result<(), MusicError> {
        Ok(())
    }

    async fn post_condition(&self, _ctx: &FsmContext, _zone: &Zone) -> Result<bool, MusicError> {
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// CSYNC publication (both group processes)

/// Publish an immediate NS-only CSYNC on every signer, keyed to each
/// signer's own SOA serial.
pub struct PublishCsync;

impl PublishCsync {
    async fn target_for(
        ctx: &FsmContext,
        signer: &Signer,
        zone: &Zone,
    ) -> Result<Rrset, MusicError> {
        let soa = ctx
            .ops
            .fetch_rrset(signer, &zone.name, &zone.name, RecordType::SOA)
            .await?;
        let serial = soa
            .records
            .iter()
            .find_map(|r| r.as_soa().map(|s| s.serial))
            .ok_or_else(|| {
                MusicError::SignerOpFailed {
                    signer: signer.name.clone(),
                    detail: format!("no SOA served for zone {}", zone.name),
                }
            })?;
        Ok(Rrset::with_records(
            zone.name.clone(),
            RecordType::CSYNC,
            3600,
            vec![RecordData::Csync(CsyncData::for_ns(serial))],
        ))
    }
}

#[async_trait]
impl TransitionStep for PublishCsync {
    async fn pre_condition(&self, ctx: &FsmContext, zone: &Zone) -> Result<bool, MusicError> {
        Ok(load_group(ctx, zone).await?.is_some())
    }

    async fn action(&self, ctx: &FsmContext, zone: &Zone) -> Result<(), MusicError> {
        let Some((group, signers)) = load_group(ctx, zone).await? else {
            return Err(MusicError::GroupNotFound(zone.name.clone()));
        };
        for signer in remaining(&group, &signers) {
            let target = Self::target_for(ctx, signer, zone).await?;
            ensure_exact(ctx, signer, &zone.name, &target).await?;
        }
        Ok(())
    }

    async fn post_condition(&self, ctx: &FsmContext, zone: &Zone) -> Result<bool, MusicError> {
        let Some((group, signers)) = load_group(ctx, zone).await? else {
            return Ok(false);
        };
        for signer in remaining(&group, &signers) {
            let served = ctx
                .ops
                .fetch_rrset(signer, &zone.name, &zone.name, RecordType::CSYNC)
                .await?;
            let ok = served.records.iter().any(|r| match r {
                RecordData::Csync(csync) => {
                    csync.flags & CsyncData::FLAG_IMMEDIATE != 0
                        && csync.types.contains(&RecordType::NS)
                }
                _ => false,
            });
            if !ok {
                ctx.zones
                    .set_stop_reason(
                        &zone.name,
                        &format!("signer '{}' does not serve CSYNC", signer.name),
                    )
                    .await?;
                return Ok(false);
            }
        }
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Parent NS wait (both group processes)

/// Wait for the parent's delegation NS to reflect the synced set. A wait
/// state like `WaitParentDs`.
pub struct WaitParentNs {
    pub exclude_leaving: bool,
}

#[async_trait]
impl TransitionStep for WaitParentNs {
    async fn pre_condition(&self, ctx: &FsmContext, zone: &Zone) -> Result<bool, MusicError> {
        let Some((group, signers)) = load_group(ctx, zone).await? else {
            return Ok(false);
        };
        let Some(parent) = parent_addr(ctx, zone).await? else {
            return Ok(false);
        };

        let parent_ns = ctx
            .lookup
            .query_at(&parent, &zone.name, RecordType::NS)
            .await?;
        let delegated = parent_ns.ns_hosts();

        if self.exclude_leaving {
            let Some(leaving) = leaving_signer_name(ctx, zone, &group).await? else {
                return Ok(false);
            };
            let contribution = ctx.zones.get_zone_nses(&zone.name, &leaving).await?;
            let stale = contribution.iter().any(|host| delegated.contains(host));
            if stale {
                debug!(zone = %zone.name, "Waiting for parent NS retraction");
            }
            return Ok(!stale);
        }

        let members = remaining(&group, &signers);
        let fetched: Vec<(Signer, Rrset)> = {
            let mut out = Vec::new();
            for signer in members {
                let rrset = ctx
                    .ops
                    .fetch_rrset(signer, &zone.name, &zone.name, RecordType::NS)
                    .await?;
                out.push((signer.clone(), rrset));
            }
            out
        };
        let sets: Vec<Rrset> = fetched.into_iter().map(|(_, rrset)| rrset).collect();
        let union = Rrset::union(&zone.name, RecordType::NS, 3600, &sets);
        let wanted = union.ns_hosts();

        if !wanted.is_subset(&delegated) {
            debug!(zone = %zone.name, "Waiting for parent NS update");
            return Ok(false);
        }
        Ok(true)
    }

    async fn action(&self, _ctx: &FsmContext, _zone: &Zone) -> Result<(), MusicError> {
        Ok(())
    }

    async fn post_condition(&self, _ctx: &FsmContext, _zone: &Zone) -> Result<bool, MusicError> {
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Leaving-signer retraction (remove-signer)

/// Retract the leaving signer's recorded NS contribution from the
/// remaining signers.
pub struct RemoveLeavingNses;

#[async_trait]
impl TransitionStep for RemoveLeavingNses {
    async fn pre_condition(&self, ctx: &FsmContext, zone: &Zone) -> Result<bool, MusicError> {
        let Some((group, _)) = load_group(ctx, zone).await? else {
            return Ok(false);
        };
        let Some(leaving) = leaving_signer_name(ctx, zone, &group).await? else {
            return Ok(false);
        };
        let contribution = ctx.zones.get_zone_nses(&zone.name, &leaving).await?;
        if contribution.is_empty() {
            ctx.zones
                .set_stop_reason(
                    &zone.name,
                    &format!("no recorded NS contribution for leaving signer '{}'", leaving),
                )
                .await?;
            return Ok(false);
        }
        Ok(true)
    }

    async fn action(&self, ctx: &FsmContext, zone: &Zone) -> Result<(), MusicError> {
        let Some((group, signers)) = load_group(ctx, zone).await? else {
            return Err(MusicError::GroupNotFound(zone.name.clone()));
        };
        let Some(leaving) = group.pending_removal.clone() else {
            return Err(MusicError::SignerNotFound("pending removal".into()));
        };
        let contribution: BTreeSet<String> = ctx
            .zones
            .get_zone_nses(&zone.name, &leaving)
            .await?
            .into_iter()
            .collect();

        for signer in remaining(&group, &signers) {
            let served = ctx
                .ops
                .fetch_rrset(signer, &zone.name, &zone.name, RecordType::NS)
                .await?;
            let stale: Vec<RecordData> = served
                .records
                .iter()
                .filter(|r| {
                    r.as_ns()
                        .map(|host| contribution.contains(host))
                        .unwrap_or(false)
                })
                .cloned()
                .collect();
            if !stale.is_empty() {
                let removes = vec![Rrset::with_records(
                    zone.name.clone(),
                    RecordType::NS,
                    0,
                    stale,
                )];
                ctx.ops
                    .update_rrsets(signer, &zone.name, &zone.name, &[], &removes)
                    .await?;
            }
        }
        Ok(())
    }

    async fn post_condition(&self, ctx: &FsmContext, zone: &Zone) -> Result<bool, MusicError> {
        let Some((group, signers)) = load_group(ctx, zone).await? else {
            return Ok(false);
        };
        let Some(leaving) = group.pending_removal.clone() else {
            return Ok(false);
        };
        let contribution: BTreeSet<String> = ctx
            .zones
            .get_zone_nses(&zone.name, &leaving)
            .await?
            .into_iter()
            .collect();

        for signer in remaining(&group, &signers) {
            let served = ctx
                .ops
                .fetch_rrset(signer, &zone.name, &zone.name, RecordType::NS)
                .await?;
            if served.ns_hosts().iter().any(|host| contribution.contains(host)) {
                ctx.zones
                    .set_stop_reason(
                        &zone.name,
                        &format!(
                            "signer '{}' still serves NS records of leaving signer '{}'",
                            signer.name, leaving
                        ),
                    )
                    .await?;
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Retract the leaving signer's DNSKEYs from the remaining signers, after
/// the old delegation has expired from caches (NS TTL wait).
pub struct RemoveLeavingDnskeys;

#[async_trait]
impl TransitionStep for RemoveLeavingDnskeys {
    async fn pre_condition(&self, ctx: &FsmContext, zone: &Zone) -> Result<bool, MusicError> {
        let Some((group, signers)) = load_group(ctx, zone).await? else {
            return Ok(false);
        };
        let Some(first) = remaining(&group, &signers).into_iter().next() else {
            ctx.zones
                .set_stop_reason(&zone.name, "no remaining signers in group")
                .await?;
            return Ok(false);
        };

        let ns = ctx
            .ops
            .fetch_rrset(first, &zone.name, &zone.name, RecordType::NS)
            .await?;
        let elapsed = (Utc::now() - zone.state_timestamp).num_seconds();
        if elapsed < ns.ttl as i64 {
            debug!(
                zone = %zone.name,
                elapsed,
                ttl = ns.ttl,
                "Waiting out NS TTL before DNSKEY retraction"
            );
            return Ok(false);
        }
        Ok(true)
    }

    async fn action(&self, ctx: &FsmContext, zone: &Zone) -> Result<(), MusicError> {
        let Some((group, signers)) = load_group(ctx, zone).await? else {
            return Err(MusicError::GroupNotFound(zone.name.clone()));
        };
        let Some(leaving) = group.pending_removal.clone() else {
            return Err(MusicError::SignerNotFound("pending removal".into()));
        };
        let leaving_keys = ctx.zones.get_zone_dnskeys(&zone.name, &leaving).await?;

        for signer in remaining(&group, &signers) {
            let served = ctx
                .ops
                .fetch_rrset(signer, &zone.name, &zone.name, RecordType::DNSKEY)
                .await?;
            let stale: Vec<RecordData> = served
                .records
                .iter()
                .filter(|r| {
                    r.as_dnskey()
                        .map(|key| leaving_keys.contains(key))
                        .unwrap_or(false)
                })
                .cloned()
                .collect();
            if !stale.is_empty() {
                let removes = vec![Rrset::with_records(
                    zone.name.clone(),
                    RecordType::DNSKEY,
                    0,
                    stale,
                )];
                ctx.ops
                    .update_rrsets(signer, &zone.name, &zone.name, &[], &removes)
                    .await?;
            }
        }
        Ok(())
    }

    async fn post_condition(&self, ctx: &FsmContext, zone: &Zone) -> Result<bool, MusicError> {
        let Some((group, signers)) = load_group(ctx, zone).await? else {
            return Ok(false);
        };
        let Some(leaving) = group.pending_removal.clone() else {
            return Ok(false);
        };
        let leaving_keys = ctx.zones.get_zone_dnskeys(&zone.name, &leaving).await?;

        for signer in remaining(&group, &signers) {
            let served = ctx
                .ops
                .fetch_rrset(signer, &zone.name, &zone.name, RecordType::DNSKEY)
                .await?;
            let stale = served
                .records
                .iter()
                .any(|r| r.as_dnskey().map(|k| leaving_keys.contains(k)).unwrap_or(false));
            if stale {
                ctx.zones
                    .set_stop_reason(
                        &zone.name,
                        &format!(
                            "signer '{}' still serves DNSKEYs of leaving signer '{}'",
                            signer.name, leaving
                        ),
                    )
                    .await?;
                return Ok(false);
            }
        }
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Process cleanup (both group processes)

/// Retract the temporary signalling records (CSYNC, CDS, CDNSKEY) before
/// the terminal state.
pub struct CleanupSignalling;

#[async_trait]
impl TransitionStep for CleanupSignalling {
    async fn pre_condition(&self, ctx: &FsmContext, zone: &Zone) -> Result<bool, MusicError> {
        Ok(load_group(ctx, zone).await?.is_some())
    }

    async fn action(&self, ctx: &FsmContext, zone: &Zone) -> Result<(), MusicError> {
        let Some((group, signers)) = load_group(ctx, zone).await? else {
            return Err(MusicError::GroupNotFound(zone.name.clone()));
        };
        for signer in remaining(&group, &signers) {
            for rtype in [RecordType::CSYNC, RecordType::CDS, RecordType::CDNSKEY] {
                let served = ctx
                    .ops
                    .fetch_rrset(signer, &zone.name, &zone.name, rtype)
                    .await?;
                if !served.is_empty() {
                    ctx.ops
                        .remove_rrset(signer, &zone.name, &zone.name, rtype)
                        .await?;
                }
            }
        }
        Ok(())
    }

    async fn post_condition(&self, ctx: &FsmContext, zone: &Zone) -> Result<bool, MusicError> {
        let Some((group, signers)) = load_group(ctx, zone).await? else {
            return Ok(false);
        };
        for signer in remaining(&group, &signers) {
            let served = ctx
                .ops
                .fetch_rrset(signer, &zone.name, &zone.name, RecordType::CSYNC)
                .await?;
            if !served.is_empty() {
                ctx.zones
                    .set_stop_reason(
                        &zone.name,
                        &format!("signer '{}' still serves CSYNC", signer.name),
                    )
                    .await?;
                return Ok(false);
            }
        }
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Coherence check (verify-zone-sync)

/// One-shot verification that all signers serve identical DNSKEY and NS
/// sets.
pub struct VerifyCoherence;

#[async_trait]
impl TransitionStep for VerifyCoherence {
    async fn pre_condition(&self, ctx: &FsmContext, zone: &Zone) -> Result<bool, MusicError> {
        Ok(load_group(ctx, zone).await?.is_some())
    }

    async fn action(&self, _ctx: &FsmContext, _zone: &Zone) -> Result<(), MusicError> {
        Ok(())
    }

    async fn post_condition(&self, ctx: &FsmContext, zone: &Zone) -> Result<bool, MusicError> {
        let Some((_, signers)) = load_group(ctx, zone).await? else {
            return Ok(false);
        };
        for rtype in [RecordType::DNSKEY, RecordType::NS] {
            let fetched =
                fetch_from_all(ctx, &signers, &zone.name, &zone.name, rtype).await?;
            if !all_serve_same(ctx, zone, &fetched, rtype.as_str()).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
