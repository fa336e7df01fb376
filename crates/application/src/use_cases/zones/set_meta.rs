use music_domain::MusicError;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::ports::ZoneRepository;

/// Per-zone metadata writes (e.g. `parentaddr`, the parent primary the
/// wait-parent predicates poll).
pub struct SetZoneMetaUseCase {
    zones: Arc<dyn ZoneRepository>,
}

impl SetZoneMetaUseCase {
    pub fn new(zones: Arc<dyn ZoneRepository>) -> Self {
        Self { zones }
    }

    #[instrument(skip(self))]
    pub async fn execute(&self, zone: &str, key: &str, value: &str) -> Result<(), MusicError> {
        if self.zones.get_zone(zone).await?.is_none() {
            return Err(MusicError::ZoneNotFound(zone.to_string()));
        }
        self.zones.set_meta(zone, key, value).await?;
        info!(zone = %zone, key = %key, "Zone metadata updated");
        Ok(())
    }

    pub async fn get(&self, zone: &str, key: &str) -> Result<Option<String>, MusicError> {
        self.zones.get_meta(zone, key).await
    }
}
