use music_domain::MusicError;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::ports::SignerRepository;

pub struct DeleteSignerUseCase {
    signers: Arc<dyn SignerRepository>,
}

impl DeleteSignerUseCase {
    pub fn new(signers: Arc<dyn SignerRepository>) -> Self {
        Self { signers }
    }

    /// Removes a signer. The repository refuses while the signer is a
    /// member of any group; it must leave its groups first.
    #[instrument(skip(self))]
    pub async fn execute(&self, name: &str) -> Result<(), MusicError> {
        self.signers.delete_signer(name).await?;
        info!(signer = %name, "Signer deleted");
        Ok(())
    }
}
