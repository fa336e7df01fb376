use music_application::ports::PeerDirectory;
use music_application::services::FullBeatMsg;
use music_domain::HsyncMethod;
use music_infrastructure::sync::dns_transport::DnsBeatSender;
use music_infrastructure::sync::SidecarApiClient;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Periodic FULLBEAT carrying the complete set of zones shared with each
/// peer, so divergence introduced by lost beats heals.
pub struct FullHeartbeatJob {
    directory: Arc<dyn PeerDirectory>,
    api_client: Arc<SidecarApiClient>,
    dns_sender: Arc<DnsBeatSender>,
    identity: String,
    interval_secs: u64,
    shutdown: CancellationToken,
}

impl FullHeartbeatJob {
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

    async fn full_beat_all(&self) {
        for peer in self.directory.peers() {
            let beat = FullBeatMsg {
                identity: self.identity.clone(),
                zones: peer.shared_zones.clone(),
            };
            let result = match peer.preferred_method() {
                Some(HsyncMethod::Api) => self
                    .api_client
                    .send_full_beat(&peer, &beat)
                    .await
                    .map(|_| ()),
                Some(HsyncMethod::Dns) => self.dns_sender.send(&peer, &beat).await,
                None => continue,
            };
            match result {
                Ok(()) => debug!(peer = %peer.identity, zones = beat.zones.len(), "FULLBEAT delivered"),
                Err(e) => warn!(peer = %peer.identity, error = %e, "FULLBEAT failed"),
            }
        }
    }

    pub async fn start(self: Arc<Self>) {
        info!(interval = self.interval_secs, "Starting full heartbeat job");

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("FullHeartbeatJob: shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        self.full_beat_all().await;
                    }
                }
            }
        });
    }
}
