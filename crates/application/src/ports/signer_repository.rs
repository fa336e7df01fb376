use async_trait::async_trait;
use music_domain::{MusicError, Signer};

#[async_trait]
pub trait SignerRepository: Send + Sync {
    /// Creates a signer.
    ///
    /// # Errors
    ///
    /// * `MusicError::Database` - on storage failure or duplicate name
    async fn add_signer(&self, signer: &Signer) -> Result<(), MusicError>;

    async fn get_signer(&self, name: &str) -> Result<Option<Signer>, MusicError>;

    async fn list_signers(&self) -> Result<Vec<Signer>, MusicError>;

    async fn update_signer(&self, signer: &Signer) -> Result<(), MusicError>;

    /// Deletes a signer.
    ///
    /// # Errors
    ///
    /// * `MusicError::SignerNotFound` - if the signer does not exist
    async fn delete_signer(&self, name: &str) -> Result<(), MusicError>;

    /// Resolved member signers of a group, in membership order.
    async fn signers_in_group(&self, group: &str) -> Result<Vec<Signer>, MusicError>;
}
