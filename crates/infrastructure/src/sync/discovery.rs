//! Peer sidecar discovery from DNS.
//!
//! A zone's HSYNC RRset names the peer sidecars serving it. For each
//! target identity the per-method connection details live under well
//! known owner names:
//!
//! - `dns.<target>`  SVCB (addresses, port) and KEY (SIG(0) public key)
//! - `api.<target>`  SVCB and URI (base-URI template)
//! - `_<port>._tcp.api.<target>`  TLSA (certificate binding)
//!
//! Per-method details are refreshed at most once per hour unless a
//! change-triggered refresh forces it. A peer whose resolution fails is
//! removed from the membership; a peer whose API method lacks a TLSA
//! binding is never inserted.

use chrono::{Duration as ChronoDuration, Utc};
use music_application::ports::{DnsLookup, PeerDirectory};
use music_application::services::HelloMsg;
use music_domain::{
    HsyncData, HsyncMethod, MusicError, RecordData, RecordType, Sidecar, SidecarApiDetails,
    SidecarDnsDetails,
};
use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::api_client::SidecarApiClient;

const REFRESH_CAP_SECS: i64 = 3600;

pub struct HsyncDiscovery {
    lookup: Arc<dyn DnsLookup>,
    directory: Arc<dyn PeerDirectory>,
    api_client: Arc<SidecarApiClient>,
    identity: String,
}

impl HsyncDiscovery {
    pub fn new(
        lookup: Arc<dyn DnsLookup>,
        directory: Arc<dyn PeerDirectory>,
        api_client: Arc<SidecarApiClient>,
        identity: String,
    ) -> Self {
        Self {
            lookup,
            directory,
            api_client,
            identity,
        }
    }

    /// The HSYNC RRset of a zone, falling back to the legacy MSIGNER
    /// type for zones that have not been renamed yet.
    pub async fn zone_hsync(&self, zone: &str) -> Result<Vec<HsyncData>, MusicError> {
        let mut rrset = self.lookup.query(zone, RecordType::HSYNC).await?;
        if rrset.is_empty() {
            rrset = self.lookup.query(zone, RecordType::MSIGNER).await?;
        }
        Ok(rrset
            .records
            .iter()
            .filter_map(|r| r.as_hsync().cloned())
            .collect())
    }

    fn svcb_endpoint(&self, rrset: &music_domain::Rrset) -> Option<(Vec<IpAddr>, Option<u16>)> {
        let svcb = rrset.records.iter().find_map(|r| match r {
            RecordData::Svcb(svcb) => Some(svcb),
            _ => None,
        })?;
        let mut addresses: Vec<IpAddr> =
            svcb.ipv4hint.iter().map(|a| IpAddr::V4(*a)).collect();
        addresses.extend(svcb.ipv6hint.iter().map(|a| IpAddr::V6(*a)));
        Some((addresses, svcb.port))
    }

    async fn resolve_api_details(
        &self,
        target: &str,
    ) -> Result<SidecarApiDetails, MusicError> {
        let owner = format!("api.{}", target);
        let svcb = self.lookup.query(&owner, RecordType::SVCB).await?;
        let Some((addresses, port)) = self.svcb_endpoint(&svcb) else {
            return Err(MusicError::PeerVerification {
                identity: target.to_string(),
                detail: format!("no SVCB record at {}", owner),
            });
        };
        let port = port.unwrap_or(443);

        let tlsa_owner = format!("_{}._tcp.api.{}", port, target);
        let tlsa_rrset = self.lookup.query(&tlsa_owner, RecordType::TLSA).await?;
        let tlsa = tlsa_rrset.records.iter().find_map(|r| match r {
            RecordData::Tlsa(tlsa) => Some(tlsa.clone()),
            _ => None,
        });
        let Some(tlsa) = tlsa else {
            return Err(MusicError::PeerVerification {
                identity: target.to_string(),
                detail: format!("no TLSA record at {}", tlsa_owner),
            });
        };

        let uri_rrset = self.lookup.query(&owner, RecordType::URI).await?;
        let base_uri = uri_rrset
            .records
            .iter()
            .find_map(|r| match r {
                RecordData::Uri(uri) => Some(uri.target.clone()),
                _ => None,
            })
            .unwrap_or_else(|| "https://{TARGET}:{PORT}/api/v1".to_string());

        Ok(SidecarApiDetails {
            addresses,
            port,
            tlsa: Some(tlsa),
            base_uri,
            last_refresh: Utc::now(),
        })
    }

    async fn resolve_dns_details(
        &self,
        target: &str,
    ) -> Result<SidecarDnsDetails, MusicError> {
        let owner = format!("dns.{}", target);
        let svcb = self.lookup.query(&owner, RecordType::SVCB).await?;
        let Some((addresses, port)) = self.svcb_endpoint(&svcb) else {
            return Err(MusicError::PeerVerification {
                identity: target.to_string(),
                detail: format!("no SVCB record at {}", owner),
            });
        };

        let key_rrset = self.lookup.query(&owner, RecordType::KEY).await?;
        let key = key_rrset.records.iter().find_map(|r| match r {
            RecordData::Key(key) => Some(key.clone()),
            _ => None,
        });
        if key.is_none() {
            warn!(peer = %target, "DNS method without KEY record, SIG(0) unavailable");
        }

        Ok(SidecarDnsDetails {
            addresses,
            port: port.unwrap_or(53),
            key,
            last_refresh: Utc::now(),
        })
    }

    /// Resolve (or re-resolve) one peer's per-method details.
    #[instrument(skip(self))]
    pub async fn discover_peer(
        &self,
        target: &str,
        methods: &BTreeSet<HsyncMethod>,
    ) -> Result<Sidecar, MusicError> {
        let mut peer = self
            .directory
            .get(target)
            .unwrap_or_else(|| Sidecar::new(target.to_string()));
        peer.methods = methods.clone();

        if methods.contains(&HsyncMethod::Api) {
            peer.api = Some(self.resolve_api_details(target).await?);
        }
        if methods.contains(&HsyncMethod::Dns) {
            peer.dns = Some(self.resolve_dns_details(target).await?);
        }
        Ok(peer)
    }

    fn refresh_due(peer: &Sidecar) -> bool {
        let cap = ChronoDuration::seconds(REFRESH_CAP_SECS);
        let api_due = peer
            .api
            .as_ref()
            .map(|api| Utc::now() - api.last_refresh >= cap)
            .unwrap_or(true);
        let dns_due = peer
            .dns
            .as_ref()
            .map(|dns| Utc::now() - dns.last_refresh >= cap)
            .unwrap_or(true);
        api_due || dns_due
    }

    /// Refresh a known peer, respecting the once-per-hour cap unless
    /// `force` is set (change-triggered refresh).
    #[instrument(skip(self))]
    pub async fn refresh_peer(&self, identity: &str, force: bool) -> Result<(), MusicError> {
        let Some(peer) = self.directory.get(identity) else {
            return Err(MusicError::PeerNotFound(identity.to_string()));
        };
        if !force && !Self::refresh_due(&peer) {
            debug!(peer = %identity, "Refresh cap not reached, skipping");
            return Ok(());
        }

        match self.discover_peer(identity, &peer.methods.clone()).await {
            Ok(mut refreshed) => {
                refreshed.shared_zones = peer.shared_zones;
                refreshed.last_beat = peer.last_beat;
                self.api_client.invalidate(identity);
                self.directory.upsert(refreshed);
                Ok(())
            }
            Err(e) => {
                // Resolution failure removes the peer from membership.
                warn!(peer = %identity, error = %e, "Peer resolution failed, removing from membership");
                self.directory.remove(identity);
                self.api_client.invalidate(identity);
                Err(e)
            }
        }
    }

    /// React to a changed HSYNC RRset for one zone: discover and greet
    /// additions, purge removals.
    #[instrument(skip(self))]
    pub async fn reset_hsync_group(&self, zone: &str) -> Result<(), MusicError> {
        let announced = self.zone_hsync(zone).await?;

        let mut wanted: BTreeMap<String, BTreeSet<HsyncMethod>> = BTreeMap::new();
        for hsync in &announced {
            if hsync.target == self.identity {
                continue;
            }
            wanted
                .entry(hsync.target.clone())
                .or_default()
                .insert(hsync.method);
        }

        // Removals: every member that shared this zone but is no longer
        // announced.
        for peer in self.directory.peers() {
            if peer.shared_zones.contains(zone) && !wanted.contains_key(&peer.identity) {
                info!(peer = %peer.identity, zone = %zone, "Peer no longer announced for zone");
                self.directory.set_zone_shared(&peer.identity, zone, false);
                if let Some(current) = self.directory.get(&peer.identity) {
                    if current.shared_zones.is_empty() {
                        info!(peer = %peer.identity, "No shared zones left, removing peer");
                        self.directory.remove(&peer.identity);
                        self.api_client.invalidate(&peer.identity);
                    }
                }
            }
        }

        // Additions: discover, authenticate, insert, one HELLO.
        for (target, methods) in wanted {
            let known = self.directory.get(&target).is_some();
            if known {
                self.directory.set_zone_shared(&target, zone, true);
                continue;
            }

            match self.discover_peer(&target, &methods).await {
                Ok(mut peer) => {
                    peer.shared_zones.insert(zone.to_string());
                    self.directory.upsert(peer.clone());
                    info!(peer = %target, zone = %zone, "New peer discovered");

                    if peer.supports(HsyncMethod::Api) {
                        let hello = HelloMsg {
                            identity: self.identity.clone(),
                            methods: BTreeSet::from([HsyncMethod::Api]),
                            zones: BTreeSet::from([zone.to_string()]),
                        };
                        if let Err(e) = self.api_client.send_hello(&peer, &hello).await {
                            warn!(peer = %target, error = %e, "HELLO failed");
                        }
                    }
                }
                Err(e) => {
                    // Verification failure: the peer never enters the
                    // membership.
                    warn!(peer = %target, zone = %zone, error = %e, "Peer discovery failed, not inserted");
                }
            }
        }

        Ok(())
    }
}
