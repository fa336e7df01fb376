use music_domain::{MusicError, Signer};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::ports::SignerRepository;

pub struct UpdateSignerUseCase {
    signers: Arc<dyn SignerRepository>,
}

impl UpdateSignerUseCase {
    pub fn new(signers: Arc<dyn SignerRepository>) -> Self {
        Self { signers }
    }

    #[instrument(skip(self, signer), fields(signer = %signer.name))]
    pub async fn execute(&self, signer: Signer) -> Result<Signer, MusicError> {
        if self.signers.get_signer(&signer.name).await?.is_none() {
            return Err(MusicError::SignerNotFound(signer.name.clone()));
        }
        self.signers.update_signer(&signer).await?;
        info!(signer = %signer.name, "Signer updated");
        Ok(signer)
    }
}
