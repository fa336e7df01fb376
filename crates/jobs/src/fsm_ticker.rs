use music_application::fsm::{EngineCheck, FsmEngine};
use music_application::ports::ZoneRepository;
use music_domain::config::FsmIntervals;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Drives the FSM engine's periodic stimuli.
///
/// Two tickers: the `target` ticker pushes a check for every auto-mode
/// zone currently in a process (and re-pushes delayed zones whose retry
/// window is open); the `complete` ticker sweeps every auto-mode zone to
/// catch lost stimuli, skipping zones that advanced within the last
/// `minimum` seconds.
pub struct FsmTickerJob {
    zones: Arc<dyn ZoneRepository>,
    engine: Arc<FsmEngine>,
    checks: mpsc::Sender<EngineCheck>,
    intervals: FsmIntervals,
    shutdown: CancellationToken,
}

impl FsmTickerJob {
    pub fn new(
        zones: Arc<dyn ZoneRepository>,
        engine: Arc<FsmEngine>,
        checks: mpsc::Sender<EngineCheck>,
        intervals: FsmIntervals,
    ) -> Self {
        Self {
            zones,
            engine,
            checks,
            intervals,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    async fn push_check(&self, zone: &str) {
        if self.checks.send(EngineCheck::for_zone(zone)).await.is_err() {
            error!(zone = %zone, "Engine check channel closed");
        }
    }

    async fn target_tick(&self) {
        let zones = match self.zones.list_auto_zones().await {
            Ok(zones) => zones,
            Err(e) => {
                error!(error = %e, "Cannot list auto zones");
                return;
            }
        };

        let mut pushed = 0;
        for zone in zones.iter().filter(|z| z.is_in_process()) {
            self.push_check(&zone.name).await;
            pushed += 1;
        }

        // Delayed zones get their own nudge once the minimum wait is
        // over, independent of whether the list above caught them.
        for zone in self.engine.due_for_retry() {
            self.push_check(&zone).await;
            pushed += 1;
        }

        if pushed > 0 {
            debug!(pushed, "FSM target tick");
        }
    }

    async fn complete_sweep(&self) {
        let zones = match self.zones.list_auto_zones().await {
            Ok(zones) => zones,
            Err(e) => {
                error!(error = %e, "Cannot list auto zones for sweep");
                return;
            }
        };

        let mut swept = 0;
        for zone in zones.iter().filter(|z| z.is_in_process()) {
            if self.engine.sweep_worthy(&zone.name) {
                self.push_check(&zone.name).await;
                swept += 1;
            }
        }
        info!(swept, "FSM complete sweep");
    }

    pub async fn start(self: Arc<Self>) {
        info!(
            target = self.intervals.target,
            complete = self.intervals.complete,
            "Starting FSM ticker job"
        );

        tokio::spawn(async move {
            let mut target = tokio::time::interval(Duration::from_secs(self.intervals.target));
            let mut complete = tokio::time::interval(Duration::from_secs(self.intervals.complete));
            // The immediate first ticks would double-hit zones at boot.
            target.tick().await;
            complete.tick().await;

            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("FsmTickerJob: shutting down");
                        break;
                    }
                    _ = target.tick() => {
                        self.target_tick().await;
                    }
                    _ = complete.tick() => {
                        self.complete_sweep().await;
                    }
                }
            }
        });
    }
}
