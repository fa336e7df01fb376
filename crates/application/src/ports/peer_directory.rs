use chrono::{DateTime, Utc};
use music_domain::{HsyncMethod, Sidecar};
use std::collections::BTreeSet;

/// A peer that sent a HELLO but whose shared-zone claim has not been
/// verified yet. Promoted into the membership by the hello evaluation
/// ticker, or dropped.
#[derive(Debug, Clone)]
pub struct Wannabe {
    pub identity: String,
    pub methods: BTreeSet<HsyncMethod>,
    pub claimed_zones: BTreeSet<String>,
    pub received: DateTime<Utc>,
}

/// The live peer membership map.
///
/// Read-mostly; all mutation happens on the discovery and sync tasks.
/// Not persisted: membership is rebuilt from HSYNC on restart.
pub trait PeerDirectory: Send + Sync {
    fn peers(&self) -> Vec<Sidecar>;

    fn get(&self, identity: &str) -> Option<Sidecar>;

    fn upsert(&self, peer: Sidecar);

    fn remove(&self, identity: &str) -> Option<Sidecar>;

    /// Record a heartbeat from a known peer; unknown identities are
    /// ignored (they must HELLO first).
    fn record_beat(&self, identity: &str, shared_zones: Option<BTreeSet<String>>) -> bool;

    /// Add or remove a zone from the shared set of one peer.
    fn set_zone_shared(&self, identity: &str, zone: &str, shared: bool);

    fn add_wannabe(&self, wannabe: Wannabe);

    /// Drain the wannabe set for evaluation.
    fn take_wannabes(&self) -> Vec<Wannabe>;
}
