use music_domain::MusicError;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::ports::{GroupRepository, ZoneRepository};

pub struct ZoneLeaveGroupUseCase {
    zones: Arc<dyn ZoneRepository>,
    groups: Arc<dyn GroupRepository>,
}

impl ZoneLeaveGroupUseCase {
    pub fn new(zones: Arc<dyn ZoneRepository>, groups: Arc<dyn GroupRepository>) -> Self {
        Self { zones, groups }
    }

    /// Unbinds a zone from its signer group. A zone inside the group
    /// process is detached first and group progress re-checked; if other
    /// zones still hold the group lock the leave is refused.
    #[instrument(skip(self))]
    pub async fn execute(&self, zone_name: &str, group: &str) -> Result<(), MusicError> {
        let Some(zone) = self.zones.get_zone(zone_name).await? else {
            return Err(MusicError::ZoneNotFound(zone_name.to_string()));
        };

        if zone.is_in_process() {
            self.zones.detach_fsm(&zone.name, &zone.fsm).await?;
            self.groups.check_if_process_complete(group).await?;
        }

        self.zones.zone_leave_group(&zone.name, group).await?;
        info!(zone = %zone.name, group = %group, "Zone left signer group");
        Ok(())
    }
}
