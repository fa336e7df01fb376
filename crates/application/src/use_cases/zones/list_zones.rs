use music_domain::{MusicError, Zone};
use std::sync::Arc;

use crate::ports::ZoneRepository;

pub struct ListZonesUseCase {
    zones: Arc<dyn ZoneRepository>,
}

impl ListZonesUseCase {
    pub fn new(zones: Arc<dyn ZoneRepository>) -> Self {
        Self { zones }
    }

    pub async fn execute(&self) -> Result<Vec<Zone>, MusicError> {
        self.zones.list_zones().await
    }

    pub async fn get(&self, name: &str) -> Result<Option<Zone>, MusicError> {
        self.zones.get_zone(name).await
    }
}
