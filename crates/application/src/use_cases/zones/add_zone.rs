use music_domain::{validators, FsmMode, MusicError, Zone, ZoneType};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::ports::ZoneRepository;

/// Use case for registering a zone with this sidecar.
pub struct AddZoneUseCase {
    zones: Arc<dyn ZoneRepository>,
}

impl AddZoneUseCase {
    pub fn new(zones: Arc<dyn ZoneRepository>) -> Self {
        Self { zones }
    }

    /// Creates a zone with no process and no group binding. The name is
    /// normalised to lowercase FQDN form.
    #[instrument(skip(self))]
    pub async fn execute(
        &self,
        name: String,
        zone_type: ZoneType,
        fsm_mode: FsmMode,
    ) -> Result<Zone, MusicError> {
        let name = validators::normalize_zone_name(&name).map_err(MusicError::InvalidZoneName)?;

        let zone = Zone::new(name.clone(), zone_type, fsm_mode);
        self.zones.add_zone(&zone).await?;

        info!(zone = %name, zone_type = zone_type.as_str(), "Zone added");
        Ok(zone)
    }
}
