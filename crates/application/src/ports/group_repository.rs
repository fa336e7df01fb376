use async_trait::async_trait;
use music_domain::{MusicError, SignerGroup};

/// Signer-group state, including the process lock.
///
/// Invariant: a group is locked iff at least one member zone is inside
/// the group-scoped process named by `current_process`.
#[async_trait]
pub trait GroupRepository: Send + Sync {
    async fn add_group(&self, name: &str) -> Result<SignerGroup, MusicError>;

    async fn get_group(&self, name: &str) -> Result<Option<SignerGroup>, MusicError>;

    async fn list_groups(&self) -> Result<Vec<SignerGroup>, MusicError>;

    /// Deletes a group.
    ///
    /// # Errors
    ///
    /// * `MusicError::GroupLocked` - if a process is in progress
    /// * `MusicError::GroupNotFound` - if the group does not exist
    async fn delete_group(&self, name: &str) -> Result<(), MusicError>;

    async fn add_signer_to_group(&self, group: &str, signer: &str) -> Result<(), MusicError>;

    async fn remove_signer_from_group(&self, group: &str, signer: &str)
        -> Result<(), MusicError>;

    /// Lock the group for a process, recording the pending membership
    /// change to apply when the process completes.
    ///
    /// # Errors
    ///
    /// * `MusicError::GroupLocked` - if already locked
    async fn lock_for_process(
        &self,
        group: &str,
        process: &str,
        pending_addition: Option<&str>,
        pending_removal: Option<&str>,
    ) -> Result<(), MusicError>;

    /// When no zone bound to the group remains in `current_process`,
    /// unlock the group and apply the pending addition/removal. Returns
    /// true when the group was unlocked by this call.
    async fn check_if_process_complete(&self, group: &str) -> Result<bool, MusicError>;
}
