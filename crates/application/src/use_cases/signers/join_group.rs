use music_domain::MusicError;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

use crate::fsm::processes::PROCESS_ADD_SIGNER;
use crate::ports::{GroupRepository, SignerRepository, ZoneRepository};
use crate::fsm::EngineCheck;

/// Use case for adding a signer to a group.
///
/// Locks the group for the add-signer process, adds the signer to the
/// membership and attaches every zone bound to the group to the process,
/// starting at its initial state. One engine-check per zone is pushed so
/// evaluation begins without waiting for the next ticker.
pub struct SignerJoinGroupUseCase {
    zones: Arc<dyn ZoneRepository>,
    signers: Arc<dyn SignerRepository>,
    groups: Arc<dyn GroupRepository>,
    checks: mpsc::Sender<EngineCheck>,
}

impl SignerJoinGroupUseCase {
    pub fn new(
        zones: Arc<dyn ZoneRepository>,
        signers: Arc<dyn SignerRepository>,
        groups: Arc<dyn GroupRepository>,
        checks: mpsc::Sender<EngineCheck>,
    ) -> Self {
        Self {
            zones,
            signers,
            groups,
            checks,
        }
    }

    /// # Errors
    ///
    /// * `MusicError::GroupLocked` - another group process is running
    /// * `MusicError::SignerNotFound` / `MusicError::GroupNotFound`
    #[instrument(skip(self))]
    pub async fn execute(&self, signer: &str, group: &str) -> Result<(), MusicError> {
        if self.signers.get_signer(signer).await?.is_none() {
            return Err(MusicError::SignerNotFound(signer.to_string()));
        }
        let Some(group_state) = self.groups.get_group(group).await? else {
            return Err(MusicError::GroupNotFound(group.to_string()));
        };
        if group_state.contains(signer) {
            return Err(MusicError::Config(format!(
                "signer '{}' is already a member of group '{}'",
                signer, group
            )));
        }

        self.groups
            .lock_for_process(group, PROCESS_ADD_SIGNER, Some(signer), None)
            .await?;
        self.groups.add_signer_to_group(group, signer).await?;

        let mut attached = 0;
        for zone in self.zones.list_zones().await? {
            if zone.signer_group.as_deref() != Some(group) {
                continue;
            }
            self.zones
                .attach_fsm(&zone.name, PROCESS_ADD_SIGNER, "unsynced", false)
                .await?;
            attached += 1;
            if self
                .checks
                .send(EngineCheck::for_zone(&zone.name))
                .await
                .is_err()
            {
                warn!(zone = %zone.name, "Engine check channel closed");
            }
        }

        if attached == 0 {
            // No zones to synchronise; the process completes on the spot.
            self.groups.check_if_process_complete(group).await?;
        }

        info!(
            signer = %signer,
            group = %group,
            zones = attached,
            "Signer joining group, add-signer process started"
        );
        Ok(())
    }
}
