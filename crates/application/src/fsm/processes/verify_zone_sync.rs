//! The verify-zone-sync process: a single transition that checks all
//! signers serve identical DNSKEY and NS sets, then stops.

use std::collections::HashMap;
use std::sync::Arc;

use crate::fsm::process::{FsmTransition, Process, TERMINAL_STATE};

use super::steps::VerifyCoherence;
use super::PROCESS_VERIFY_ZONE_SYNC;

pub fn process() -> Process {
    let mut states = HashMap::new();
    states.insert(
        "verified".to_string(),
        vec![FsmTransition::new(
            TERMINAL_STATE,
            "verify DNSKEY and NS coherence across the signer group",
            Arc::new(VerifyCoherence),
        )],
    );

    Process {
        name: PROCESS_VERIFY_ZONE_SYNC.to_string(),
        description: "verify that all signers serve the zone consistently".to_string(),
        initial_state: "verified".to_string(),
        states,
    }
}
