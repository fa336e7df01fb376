use music_domain::MusicError;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::ports::{GroupRepository, ZoneRepository};

pub struct ZoneJoinGroupUseCase {
    zones: Arc<dyn ZoneRepository>,
    groups: Arc<dyn GroupRepository>,
}

impl ZoneJoinGroupUseCase {
    pub fn new(zones: Arc<dyn ZoneRepository>, groups: Arc<dyn GroupRepository>) -> Self {
        Self { zones, groups }
    }

    /// Binds a zone to a signer group.
    ///
    /// # Errors
    ///
    /// * `MusicError::GroupLocked` - the group is running a process;
    ///   zones may not join until it completes
    #[instrument(skip(self))]
    pub async fn execute(&self, zone: &str, group: &str) -> Result<(), MusicError> {
        if self.groups.get_group(group).await?.is_none() {
            return Err(MusicError::GroupNotFound(group.to_string()));
        }

        self.zones.zone_join_group(zone, group).await?;
        info!(zone = %zone, group = %group, "Zone joined signer group");
        Ok(())
    }
}
