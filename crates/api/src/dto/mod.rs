//! Request and response payloads.
//!
//! Every management endpoint takes a `command`-discriminated request;
//! responses are PascalCase on the wire for compatibility with existing
//! multi-signer tooling. Command failures are 2xx with `Error = true`
//! and a human-readable `ErrorMsg`.

use music_domain::{MusicError, Sidecar, Signer, SignerGroup, Zone};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub command: String,

    // Common operands; which ones matter depends on the command.
    pub zone: Option<String>,
    pub group: Option<String>,
    pub signer: Option<Signer>,
    pub signer_name: Option<String>,
    pub zone_type: Option<String>,
    pub fsm_mode: Option<String>,
    pub next_state: Option<String>,
    pub process: Option<String>,
    pub key: Option<String>,
    pub value: Option<String>,
    pub owner: Option<String>,
    pub rtype: Option<String>,
    pub from_signer: Option<String>,
    pub to_signer: Option<String>,
    pub identity: Option<String>,
    pub tlsa: Option<music_domain::TlsaData>,
    pub sig0_key: Option<music_domain::KeyData>,
    pub qname: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProcessInfo {
    pub name: String,
    pub description: String,
    pub states: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RrsetInfo {
    pub signer: String,
    pub owner: String,
    pub rtype: String,
    pub ttl: u32,
    pub records: Vec<String>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiResponse {
    pub msg: String,
    pub error: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error_msg: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub zones: Option<Vec<Zone>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signers: Option<Vec<Signer>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer_groups: Option<Vec<SignerGroup>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processes: Option<Vec<ProcessInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rrsets: Option<Vec<RrsetInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peers: Option<Vec<Sidecar>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<BTreeMap<String, String>>,
}

impl ApiResponse {
    pub fn ok(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            ..Self::default()
        }
    }

    pub fn failure(error: &MusicError) -> Self {
        Self {
            msg: String::new(),
            error: true,
            error_msg: error.to_string(),
            ..Self::default()
        }
    }

    pub fn unknown_command(endpoint: &str, command: &str) -> Self {
        Self {
            error: true,
            error_msg: format!("unknown {} command '{}'", endpoint, command),
            ..Self::default()
        }
    }

    pub fn with_zones(mut self, zones: Vec<Zone>) -> Self {
        self.zones = Some(zones);
        self
    }

    pub fn with_signers(mut self, signers: Vec<Signer>) -> Self {
        self.signers = Some(signers);
        self
    }

    pub fn with_groups(mut self, groups: Vec<SignerGroup>) -> Self {
        self.signer_groups = Some(groups);
        self
    }

    pub fn with_processes(mut self, processes: Vec<ProcessInfo>) -> Self {
        self.processes = Some(processes);
        self
    }

    pub fn with_graph(mut self, graph: String) -> Self {
        self.graph = Some(graph);
        self
    }

    pub fn with_rrsets(mut self, rrsets: Vec<RrsetInfo>) -> Self {
        self.rrsets = Some(rrsets);
        self
    }

    pub fn with_peers(mut self, peers: Vec<Sidecar>) -> Self {
        self.peers = Some(peers);
        self
    }

    pub fn with_meta(mut self, meta: BTreeMap<String, String>) -> Self {
        self.meta = Some(meta);
        self
    }
}
