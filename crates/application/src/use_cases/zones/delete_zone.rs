use music_domain::MusicError;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::ports::{GroupRepository, ZoneRepository};

pub struct DeleteZoneUseCase {
    zones: Arc<dyn ZoneRepository>,
    groups: Arc<dyn GroupRepository>,
}

impl DeleteZoneUseCase {
    pub fn new(zones: Arc<dyn ZoneRepository>, groups: Arc<dyn GroupRepository>) -> Self {
        Self { zones, groups }
    }

    /// Removes a zone. A zone inside a process is detached first so that
    /// group progress is re-checked.
    #[instrument(skip(self))]
    pub async fn execute(&self, name: &str) -> Result<(), MusicError> {
        let Some(zone) = self.zones.get_zone(name).await? else {
            return Err(MusicError::ZoneNotFound(name.to_string()));
        };

        if zone.is_in_process() {
            self.zones.detach_fsm(&zone.name, &zone.fsm).await?;
            if let Some(group) = &zone.signer_group {
                self.groups.check_if_process_complete(group).await?;
            }
        }

        self.zones.delete_zone(&zone.name).await?;
        info!(zone = %zone.name, "Zone deleted");
        Ok(())
    }
}
