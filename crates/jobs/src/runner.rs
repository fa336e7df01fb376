use crate::{DiscoveryScanJob, FsmTickerJob, FullHeartbeatJob, HeartbeatJob, HelloEvalJob};
use std::sync::Arc;
use tracing::info;

/// Central orchestrator for all background jobs.
///
/// Use the builder pattern to register jobs, then call `.start()` once.
///
/// # Example
///
/// ```rust,ignore
/// JobRunner::new()
///     .with_fsm_ticker(FsmTickerJob::new(zones, engine, checks, intervals))
///     .with_heartbeat(HeartbeatJob::new(directory, api, dns, identity, 60))
///     .start()
///     .await;
/// ```
pub struct JobRunner {
    fsm_ticker: Option<FsmTickerJob>,
    heartbeat: Option<HeartbeatJob>,
    full_heartbeat: Option<FullHeartbeatJob>,
    hello_eval: Option<HelloEvalJob>,
    discovery_scan: Option<DiscoveryScanJob>,
}

impl JobRunner {
    pub fn new() -> Self {
        Self {
            fsm_ticker: None,
            heartbeat: None,
            full_heartbeat: None,
            hello_eval: None,
            discovery_scan: None,
        }
    }

    pub fn with_fsm_ticker(mut self, job: FsmTickerJob) -> Self {
        self.fsm_ticker = Some(job);
        self
    }

    pub fn with_heartbeat(mut self, job: HeartbeatJob) -> Self {
        self.heartbeat = Some(job);
        self
    }

    pub fn with_full_heartbeat(mut self, job: FullHeartbeatJob) -> Self {
        self.full_heartbeat = Some(job);
        self
    }

    pub fn with_hello_eval(mut self, job: HelloEvalJob) -> Self {
        self.hello_eval = Some(job);
        self
    }

    pub fn with_discovery_scan(mut self, job: DiscoveryScanJob) -> Self {
        self.discovery_scan = Some(job);
        self
    }

    /// Start all registered background jobs.
    pub async fn start(self) {
        info!("Starting background job runner");

        if let Some(job) = self.fsm_ticker {
            Arc::new(job).start().await;
        }
        if let Some(job) = self.heartbeat {
            Arc::new(job).start().await;
        }
        if let Some(job) = self.full_heartbeat {
            Arc::new(job).start().await;
        }
        if let Some(job) = self.hello_eval {
            Arc::new(job).start().await;
        }
        if let Some(job) = self.discovery_scan {
            Arc::new(job).start().await;
        }

        info!("All background jobs started");
    }
}

impl Default for JobRunner {
    fn default() -> Self {
        Self::new()
    }
}
