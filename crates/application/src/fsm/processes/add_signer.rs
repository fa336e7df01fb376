//! The add-signer process.
//!
//! Drives a zone through key and delegation synchronisation after a new
//! signer joined its group:
//!
//! `unsynced -> dnskeys-synced -> cds-published -> parent-updated ->
//! ns-synced -> csync-published -> parent-ns-synced -> stop`

use std::collections::HashMap;
use std::sync::Arc;

use crate::fsm::process::{FsmTransition, Process, TERMINAL_STATE};

use super::steps::{
    CleanupSignalling, PublishCds, PublishCsync, SyncDnskeys, SyncNses, WaitParentDs,
    WaitParentNs,
};
use super::PROCESS_ADD_SIGNER;

pub fn process() -> Process {
    let mut states = HashMap::new();

    states.insert(
        "unsynced".to_string(),
        vec![FsmTransition::new(
            "dnskeys-synced",
            "sync DNSKEY union across all signers",
            Arc::new(SyncDnskeys),
        )],
    );
    states.insert(
        "dnskeys-synced".to_string(),
        vec![FsmTransition::new(
            "cds-published",
            "publish CDS/CDNSKEY for all key-signing keys",
            Arc::new(PublishCds),
        )],
    );
    states.insert(
        "cds-published".to_string(),
        vec![FsmTransition::new(
            "parent-updated",
            "wait for the parent DS RRset to cover the published CDS set",
            Arc::new(WaitParentDs {
                exclude_leaving: false,
            }),
        )],
    );
    states.insert(
        "parent-updated".to_string(),
        vec![FsmTransition::new(
            "ns-synced",
            "sync NS union across all signers",
            Arc::new(SyncNses),
        )],
    );
    states.insert(
        "ns-synced".to_string(),
        vec![FsmTransition::new(
            "csync-published",
            "publish immediate NS-only CSYNC on all signers",
            Arc::new(PublishCsync),
        )],
    );
    states.insert(
        "csync-published".to_string(),
        vec![FsmTransition::new(
            "parent-ns-synced",
            "wait for the parent delegation to match the NS union",
            Arc::new(WaitParentNs {
                exclude_leaving: false,
            }),
        )],
    );
    states.insert(
        "parent-ns-synced".to_string(),
        vec![FsmTransition::new(
            TERMINAL_STATE,
            "retract CSYNC and CDS signalling",
            Arc::new(CleanupSignalling),
        )],
    );

    Process {
        name: PROCESS_ADD_SIGNER.to_string(),
        description: "join a new signer into the zone's signer group".to_string(),
        initial_state: "unsynced".to_string(),
        states,
    }
}
