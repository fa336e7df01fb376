use music_domain::MusicError;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

use crate::fsm::processes::PROCESS_REMOVE_SIGNER;
use crate::ports::{GroupRepository, SignerRepository, ZoneRepository};
use crate::fsm::EngineCheck;

/// Use case for removing a signer from a group.
///
/// The signer stays a member for the duration of the remove-signer
/// process (its records must still be reachable for retraction); the
/// membership row is dropped when the last zone completes the process.
pub struct SignerLeaveGroupUseCase {
    zones: Arc<dyn ZoneRepository>,
    signers: Arc<dyn SignerRepository>,
    groups: Arc<dyn GroupRepository>,
    checks: mpsc::Sender<EngineCheck>,
}

impl SignerLeaveGroupUseCase {
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

    #[instrument(skip(self))]
    pub async fn execute(&self, signer: &str, group: &str) -> Result<(), MusicError> {
        if self.signers.get_signer(signer).await?.is_none() {
            return Err(MusicError::SignerNotFound(signer.to_string()));
        }
        let Some(group_state) = self.groups.get_group(group).await? else {
            return Err(MusicError::GroupNotFound(group.to_string()));
        };
        if !group_state.contains(signer) {
            return Err(MusicError::Config(format!(
                "signer '{}' is not a member of group '{}'",
                signer, group
            )));
        }

        self.groups
            .lock_for_process(group, PROCESS_REMOVE_SIGNER, None, Some(signer))
            .await?;

        let mut attached = 0;
        for zone in self.zones.list_zones().await? {
            if zone.signer_group.as_deref() != Some(group) {
                continue;
            }
            self.zones
                .attach_fsm(&zone.name, PROCESS_REMOVE_SIGNER, "unsynced", false)
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
            self.groups.check_if_process_complete(group).await?;
        }

        info!(
            signer = %signer,
            group = %group,
            zones = attached,
            "Signer leaving group, remove-signer process started"
        );
        Ok(())
    }
}
