use music_domain::{validators, MusicError, Signer};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::ports::SignerRepository;

pub struct AddSignerUseCase {
    signers: Arc<dyn SignerRepository>,
}

impl AddSignerUseCase {
    pub fn new(signers: Arc<dyn SignerRepository>) -> Self {
        Self { signers }
    }

    /// Registers a signer. Rate limits must be positive; a TSIG secret,
    /// when present, must be valid base64.
    #[instrument(skip(self, signer), fields(signer = %signer.name))]
    pub async fn execute(&self, signer: Signer) -> Result<Signer, MusicError> {
        if signer.name.is_empty() {
            return Err(MusicError::Config("signer name cannot be empty".into()));
        }
        if signer.fetch_limit == 0 || signer.update_limit == 0 {
            return Err(MusicError::Config(format!(
                "signer '{}' has a zero rate limit",
                signer.name
            )));
        }
        if let Some((_, _, secret)) = signer.tsig() {
            validators::validate_tsig_secret(secret).map_err(MusicError::Config)?;
        }

        self.signers.add_signer(&signer).await?;
        info!(signer = %signer.name, method = signer.method.as_str(), "Signer added");
        Ok(signer)
    }
}
