use music_domain::{MusicError, SignerGroup};
use std::sync::Arc;

use crate::ports::GroupRepository;

pub struct ListGroupsUseCase {
    groups: Arc<dyn GroupRepository>,
}

impl ListGroupsUseCase {
    pub fn new(groups: Arc<dyn GroupRepository>) -> Self {
        Self { groups }
    }

    pub async fn execute(&self) -> Result<Vec<SignerGroup>, MusicError> {
        self.groups.list_groups().await
    }

    pub async fn get(&self, name: &str) -> Result<Option<SignerGroup>, MusicError> {
        self.groups.get_group(name).await
    }
}
