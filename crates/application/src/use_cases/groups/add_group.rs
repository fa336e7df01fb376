use music_domain::{MusicError, SignerGroup};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::ports::GroupRepository;

pub struct AddGroupUseCase {
    groups: Arc<dyn GroupRepository>,
}

impl AddGroupUseCase {
    pub fn new(groups: Arc<dyn GroupRepository>) -> Self {
        Self { groups }
    }

    #[instrument(skip(self))]
    pub async fn execute(&self, name: &str) -> Result<SignerGroup, MusicError> {
        if name.is_empty() {
            return Err(MusicError::Config("group name cannot be empty".into()));
        }
        let group = self.groups.add_group(name).await?;
        info!(group = %name, "Signer group created");
        Ok(group)
    }
}
