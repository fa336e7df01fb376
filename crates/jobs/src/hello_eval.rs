use music_application::services::HelloService;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Periodic evaluation of wannabe peers: verified claims are promoted
/// into the membership, the rest are dropped.
pub struct HelloEvalJob {
    service: Arc<HelloService>,
    interval_secs: u64,
    shutdown: CancellationToken,
}

impl HelloEvalJob {
    pub fn new(service: Arc<HelloService>, interval_secs: u64) -> Self {
        Self {
            service,
            interval_secs,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub async fn start(self: Arc<Self>) {
        info!(interval = self.interval_secs, "Starting hello evaluation job");

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("HelloEvalJob: shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        match self.service.evaluate_wannabes().await {
                            Ok(promoted) if !promoted.is_empty() => {
                                info!(promoted = promoted.len(), "Wannabe evaluation completed");
                            }
                            Ok(_) => {}
                            Err(e) => {
                                error!(error = %e, "Wannabe evaluation failed");
                            }
                        }
                    }
                }
            }
        });
    }
}
