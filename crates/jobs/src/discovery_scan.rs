use music_application::ports::{PeerDirectory, ZoneRepository};
use music_infrastructure::sync::HsyncDiscovery;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Periodic HSYNC re-resolution for every zone.
///
/// Catches membership changes (added or removed peer announcements) and
/// drives the hourly per-peer detail refresh; `HsyncDiscovery` itself
/// enforces the refresh cap, so a short scan interval stays cheap.
pub struct DiscoveryScanJob {
    zones: Arc<dyn ZoneRepository>,
    directory: Arc<dyn PeerDirectory>,
    discovery: Arc<HsyncDiscovery>,
    interval_secs: u64,
    shutdown: CancellationToken,
}

impl DiscoveryScanJob {
    pub fn new(
        zones: Arc<dyn ZoneRepository>,
        directory: Arc<dyn PeerDirectory>,
        discovery: Arc<HsyncDiscovery>,
        interval_secs: u64,
    ) -> Self {
        Self {
            zones,
            directory,
            discovery,
            interval_secs,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    async fn scan(&self) {
        let zones = match self.zones.list_zones().await {
            Ok(zones) => zones,
            Err(e) => {
                warn!(error = %e, "Cannot list zones for discovery scan");
                return;
            }
        };

        for zone in &zones {
            if let Err(e) = self.discovery.reset_hsync_group(&zone.name).await {
                debug!(zone = %zone.name, error = %e, "HSYNC scan failed for zone");
            }
        }

        // Known peers get their connection details refreshed at most
        // once per hour.
        for peer in self.directory.peers() {
            if let Err(e) = self.discovery.refresh_peer(&peer.identity, false).await {
                debug!(peer = %peer.identity, error = %e, "Peer refresh failed");
            }
        }
    }

    pub async fn start(self: Arc<Self>) {
        info!(interval = self.interval_secs, "Starting discovery scan job");

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("DiscoveryScanJob: shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        self.scan().await;
                    }
                }
            }
        });
    }
}
