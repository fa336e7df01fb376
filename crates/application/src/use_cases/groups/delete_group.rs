use music_domain::MusicError;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::ports::GroupRepository;

pub struct DeleteGroupUseCase {
    groups: Arc<dyn GroupRepository>,
}

impl DeleteGroupUseCase {
    pub fn new(groups: Arc<dyn GroupRepository>) -> Self {
        Self { groups }
    }

    /// Removes a group. Locked groups and groups with bound zones are
    /// refused by the repository.
    #[instrument(skip(self))]
    pub async fn execute(&self, name: &str) -> Result<(), MusicError> {
        self.groups.delete_group(name).await?;
        info!(group = %name, "Signer group deleted");
        Ok(())
    }
}
