//! The process-wide peer membership map.
//!
//! Read-mostly: the FSM and API handlers read it, only the discovery and
//! sync tasks mutate it. Rebuilt from HSYNC at startup, never persisted.

use chrono::Utc;
use dashmap::DashMap;
use music_application::ports::{PeerDirectory, Wannabe};
use music_domain::Sidecar;
use std::collections::BTreeSet;
use std::sync::Mutex;
use tracing::debug;

#[derive(Default)]
pub struct PeerMembership {
    peers: DashMap<String, Sidecar>,
    wannabes: Mutex<Vec<Wannabe>>,
}

impl PeerMembership {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

impl PeerDirectory for PeerMembership {
    fn peers(&self) -> Vec<Sidecar> {
        self.peers.iter().map(|entry| entry.value().clone()).collect()
    }

    fn get(&self, identity: &str) -> Option<Sidecar> {
        self.peers.get(identity).map(|entry| entry.value().clone())
    }

    fn upsert(&self, peer: Sidecar) {
        debug!(peer = %peer.identity, "Peer upserted into membership");
        self.peers.insert(peer.identity.clone(), peer);
    }

    fn remove(&self, identity: &str) -> Option<Sidecar> {
        self.peers.remove(identity).map(|(_, peer)| peer)
    }

    fn record_beat(&self, identity: &str, shared_zones: Option<BTreeSet<String>>) -> bool {
        match self.peers.get_mut(identity) {
            Some(mut peer) => {
                peer.last_beat = Some(Utc::now());
                if let Some(zones) = shared_zones {
                    peer.shared_zones = zones;
                }
                true
            }
            None => false,
        }
    }

    fn set_zone_shared(&self, identity: &str, zone: &str, shared: bool) {
        if let Some(mut peer) = self.peers.get_mut(identity) {
            if shared {
                peer.shared_zones.insert(zone.to_string());
            } else {
                peer.shared_zones.remove(zone);
            }
        }
    }

    fn add_wannabe(&self, wannabe: Wannabe) {
        let mut wannabes = self.wannabes.lock().unwrap();
        // Re-HELLOs refresh the claim instead of queueing duplicates.
        wannabes.retain(|w| w.identity != wannabe.identity);
        wannabes.push(wannabe);
    }

    fn take_wannabes(&self) -> Vec<Wannabe> {
        std::mem::take(&mut *self.wannabes.lock().unwrap())
    }
}
