//! Sidecar-to-sidecar wire messages.
//!
//! Field names are PascalCase on the wire for compatibility with
//! existing multi-signer deployments.

use music_domain::HsyncMethod;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// First contact from a peer that discovered us through a zone's HSYNC
/// RRset. The claim is verified before the peer enters the membership.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HelloMsg {
    pub identity: String,
    pub methods: BTreeSet<HsyncMethod>,
    /// Zones the sender believes both sidecars serve.
    pub zones: BTreeSet<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HelloResponse {
    pub msg: String,
    pub identity: String,
}

/// Periodic liveness summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BeatMsg {
    pub identity: String,
    /// Count of zones shared with the receiver, as a cheap divergence
    /// signal between full beats.
    pub shared_zone_count: usize,
}

/// Periodic full state: the complete set of zones shared with the
/// receiver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FullBeatMsg {
    pub identity: String,
    pub zones: BTreeSet<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BeatResponse {
    pub msg: String,
}
