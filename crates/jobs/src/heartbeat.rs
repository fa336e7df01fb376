use music_application::ports::PeerDirectory;
use music_application::services::BeatMsg;
use music_domain::HsyncMethod;
use music_infrastructure::sync::dns_transport::DnsBeatSender;
use music_infrastructure::sync::SidecarApiClient;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Periodic BEAT summary to every known peer, over each peer's
/// preferred method.
pub struct HeartbeatJob {
    directory: Arc<dyn PeerDirectory>,
    api_client: Arc<SidecarApiClient>,
    dns_sender: Arc<DnsBeatSender>,
    identity: String,
    interval_secs: u64,
    shutdown: CancellationToken,
}

impl HeartbeatJob {
    pub fn new(
        directory: Arc<dyn PeerDirectory>,
        api_client: Arc<SidecarApiClient>,
        dns_sender: Arc<DnsBeatSender>,
        identity: String,
        interval_secs: u64,
    ) -> Self {
        Self {
            directory,
            api_client,
            dns_sender,
            identity,
            interval_secs,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    async fn beat_all(&self) {
        for peer in self.directory.peers() {
            let beat = BeatMsg {
                identity: self.identity.clone(),
                shared_zone_count: peer.shared_zones.len(),
            };
            let result = match peer.preferred_method() {
                Some(HsyncMethod::Api) => {
                    self.api_client.send_beat(&peer, &beat).await.map(|_| ())
                }
                Some(HsyncMethod::Dns) => self.dns_sender.send(&peer, &beat).await,
                None => continue,
            };
            match result {
                Ok(()) => debug!(peer = %peer.identity, "BEAT delivered"),
                Err(e) => warn!(peer = %peer.identity, error = %e, "BEAT failed"),
            }
        }
    }

    pub async fn start(self: Arc<Self>) {
        info!(interval = self.interval_secs, "Starting heartbeat job");

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("HeartbeatJob: shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        self.beat_all().await;
                    }
                }
            }
        });
    }
}
