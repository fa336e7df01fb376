//! The shipped process definitions.
//!
//! Each transition step is a small struct shared between processes where
//! the behaviour coincides (CDS publication and the parent wait states
//! appear in both add-signer and remove-signer, with a mode flag).

pub mod add_signer;
pub mod dnssec;
pub mod remove_signer;
pub mod steps;
pub mod support;
pub mod verify_zone_sync;

use music_domain::MusicError;

use super::process::ProcessRegistry;

pub const PROCESS_ADD_SIGNER: &str = "add-signer";
pub const PROCESS_REMOVE_SIGNER: &str = "remove-signer";
pub const PROCESS_VERIFY_ZONE_SYNC: &str = "verify-zone-sync";

/// The registry every sidecar starts with.
pub fn default_registry() -> Result<ProcessRegistry, MusicError> {
    let mut registry = ProcessRegistry::new();
    registry.register(add_signer::process())?;
    registry.register(remove_signer::process())?;
    registry.register(verify_zone_sync::process())?;
    Ok(registry)
}
