use chrono::Utc;
use music_domain::{MusicError, RecordType, Sidecar};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::ports::{DnsLookup, PeerDirectory, Wannabe};

use super::messages::{BeatMsg, FullBeatMsg, HelloMsg};

/// Intake and verification of peer contact.
///
/// A HELLO parks the sender in the wannabe set; the hello-eval ticker
/// calls `evaluate_wannabes`, which re-resolves the claimed zones' HSYNC
/// RRsets and promotes only peers that the DNS actually announces.
pub struct HelloService {
    directory: Arc<dyn PeerDirectory>,
    lookup: Arc<dyn DnsLookup>,
    /// Our own identity, so we never admit ourselves as a peer.
    identity: String,
}

impl HelloService {
    pub fn new(
        directory: Arc<dyn PeerDirectory>,
        lookup: Arc<dyn DnsLookup>,
        identity: String,
    ) -> Self {
        Self {
            directory,
            lookup,
            identity,
        }
    }

    /// Handle an inbound HELLO. Known peers just refresh their shared
    /// zones; unknown senders become wannabes.
    #[instrument(skip(self, hello), fields(peer = %hello.identity))]
    pub fn receive_hello(&self, hello: HelloMsg) {
        if hello.identity == self.identity {
            debug!("Ignoring HELLO from ourselves");
            return;
        }

        if self.directory.get(&hello.identity).is_some() {
            self.directory
                .record_beat(&hello.identity, Some(hello.zones));
            return;
        }

        info!(peer = %hello.identity, zones = hello.zones.len(), "HELLO from unknown peer, parked as wannabe");
        self.directory.add_wannabe(Wannabe {
            identity: hello.identity,
            methods: hello.methods,
            claimed_zones: hello.zones,
            received: Utc::now(),
        });
    }

    /// Handle an inbound BEAT from a known peer. Returns false for
    /// unknown senders, which must HELLO first.
    pub fn receive_beat(&self, beat: &BeatMsg) -> bool {
        self.directory.record_beat(&beat.identity, None)
    }

    /// Handle an inbound FULLBEAT, replacing the peer's shared-zone set.
    pub fn receive_full_beat(&self, beat: FullBeatMsg) -> bool {
        self.directory.record_beat(&beat.identity, Some(beat.zones))
    }

    /// Verify parked wannabes against the DNS and promote the truthful
    /// ones. Returns the identities promoted by this pass.
    #[instrument(skip(self))]
    pub async fn evaluate_wannabes(&self) -> Result<Vec<String>, MusicError> {
        let mut promoted = Vec::new();

        for wannabe in self.directory.take_wannabes() {
            let verified = self.verify_claim(&wannabe).await;
            match verified {
                Ok(zones) if !zones.is_empty() => {
                    let mut peer = Sidecar::new(wannabe.identity.clone());
                    peer.methods = wannabe.methods;
                    peer.shared_zones = zones;
                    peer.last_beat = Some(Utc::now());
                    self.directory.upsert(peer);
                    info!(peer = %wannabe.identity, "Wannabe verified and promoted");
                    promoted.push(wannabe.identity);
                }
                Ok(_) => {
                    warn!(peer = %wannabe.identity, "Wannabe claim not backed by any HSYNC record, dropped");
                }
                Err(e) => {
                    warn!(peer = %wannabe.identity, error = %e, "Wannabe verification failed, dropped");
                }
            }
        }

        Ok(promoted)
    }

    /// The subset of claimed zones whose HSYNC RRset really announces the
    /// wannabe's identity.
    async fn verify_claim(&self, wannabe: &Wannabe) -> Result<BTreeSet<String>, MusicError> {
        let mut verified = BTreeSet::new();
        for zone in &wannabe.claimed_zones {
            let hsync = self.lookup.query(zone, RecordType::HSYNC).await?;
            let announced = hsync
                .records
                .iter()
                .filter_map(|r| r.as_hsync())
                .any(|h| h.target == wannabe.identity);
            if announced {
                verified.insert(zone.clone());
            } else {
                debug!(zone = %zone, peer = %wannabe.identity, "Claimed zone does not announce peer");
            }
        }
        Ok(verified)
    }
}
