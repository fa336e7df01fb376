//! The remove-signer process.
//!
//! Mirror of add-signer with leaving-signer handling: the delegation is
//! shrunk first, the leaving signer's keys are only retracted after the
//! old NS set has expired from caches (NS TTL wait inside the
//! `RemoveLeavingDnskeys` pre-condition).
//!
//! `unsynced -> ns-synced -> csync-published -> parent-ns-synced ->
//! dnskeys-synced -> cds-published -> parent-updated -> stop`

use std::collections::HashMap;
use std::sync::Arc;

use crate::fsm::process::{FsmTransition, Process, TERMINAL_STATE};

use super::steps::{
    CleanupSignalling, PublishCds, PublishCsync, RemoveLeavingDnskeys, RemoveLeavingNses,
    WaitParentDs, WaitParentNs,
};
use super::PROCESS_REMOVE_SIGNER;

pub fn process() -> Process {
    let mut states = HashMap::new();

    states.insert(
        "unsynced".to_string(),
        vec![FsmTransition::new(
            "ns-synced",
            "retract the leaving signer's NS records from the remaining signers",
            Arc::new(RemoveLeavingNses),
        )],
    );
    states.insert(
        "ns-synced".to_string(),
        vec![FsmTransition::new(
            "csync-published",
            "publish immediate NS-only CSYNC on the remaining signers",
            Arc::new(PublishCsync),
        )],
    );
    states.insert(
        "csync-published".to_string(),
        vec![FsmTransition::new(
            "parent-ns-synced",
            "wait for the parent delegation to drop the leaving signer",
            Arc::new(WaitParentNs {
                exclude_leaving: true,
            }),
        )],
    );
    states.insert(
        "parent-ns-synced".to_string(),
        vec![FsmTransition::new(
            "dnskeys-synced",
            "after the NS TTL, retract the leaving signer's DNSKEYs",
            Arc::new(RemoveLeavingDnskeys),
        )],
    );
    states.insert(
        "dnskeys-synced".to_string(),
        vec![FsmTransition::new(
            "cds-published",
            "republish CDS/CDNSKEY for the remaining key-signing keys",
            Arc::new(PublishCds),
        )],
    );
    states.insert(
        "cds-published".to_string(),
        vec![FsmTransition::new(
            "parent-updated",
            "wait for the parent DS RRset to match the remaining keys",
            Arc::new(WaitParentDs {
                exclude_leaving: true,
            }),
        )],
    );
    states.insert(
        "parent-updated".to_string(),
        vec![FsmTransition::new(
            TERMINAL_STATE,
            "retract CSYNC and CDS signalling",
            Arc::new(CleanupSignalling),
        )],
    );

    Process {
        name: PROCESS_REMOVE_SIGNER.to_string(),
        description: "remove a signer from the zone's signer group".to_string(),
        initial_state: "unsynced".to_string(),
        states,
    }
}
