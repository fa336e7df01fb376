use music_domain::{MusicError, Signer};
use std::sync::Arc;

use crate::ports::SignerRepository;

pub struct ListSignersUseCase {
    signers: Arc<dyn SignerRepository>,
}

impl ListSignersUseCase {
    pub fn new(signers: Arc<dyn SignerRepository>) -> Self {
        Self { signers }
    }

    pub async fn execute(&self) -> Result<Vec<Signer>, MusicError> {
        self.signers.list_signers().await
    }
}
