//! Rate-limited operation queues.
//!
//! One fetch queue and one update queue exist per updater kind. A ticker
//! fires once per second; each tick dispatches queued operations FIFO,
//! up to every signer's per-second budget. Operations execute
//! synchronously on the dispatcher path, which also serialises all work
//! against any one signer.
//!
//! A backend rate-limit signal (`MusicError::RateLimited`) makes the
//! dispatcher sleep the announced interval and retry the *same* request
//! before the budget is considered consumed; after a bounded number of
//! retries the operation fails with `RateLimitExhausted`.

use music_application::ports::{SignerOp, SignerOpKind, SignerOpReply, SignerUpdater};
use music_domain::MusicError;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const MAX_RATE_LIMIT_RETRIES: u32 = 5;

/// Which per-signer budget applies to this queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    Fetch,
    Update,
}

impl QueueKind {
    fn as_str(&self) -> &'static str {
        match self {
            QueueKind::Fetch => "fetch",
            QueueKind::Update => "update",
        }
    }
}

/// Handle to one queue; cloneable, enqueue-only.
#[derive(Clone)]
pub struct RateLimitedQueue {
    tx: mpsc::UnboundedSender<SignerOp>,
}

impl RateLimitedQueue {
    pub fn spawn(
        kind: QueueKind,
        updater: Arc<dyn SignerUpdater>,
        shutdown: CancellationToken,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher {
            kind,
            updater,
            queue: VecDeque::new(),
            shutdown: shutdown.clone(),
        };
        tokio::spawn(dispatcher.run(rx));
        Self { tx }
    }

    pub fn enqueue(&self, op: SignerOp) -> Result<(), MusicError> {
        self.tx.send(op).map_err(|_| MusicError::Shutdown)
    }
}

struct Dispatcher {
    kind: QueueKind,
    updater: Arc<dyn SignerUpdater>,
    queue: VecDeque<SignerOp>,
    shutdown: CancellationToken,
}

impl Dispatcher {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<SignerOp>) {
        info!(kind = self.kind.as_str(), "Rate-limited queue started");
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    while let Ok(op) = rx.try_recv() {
                        self.queue.push_back(op);
                    }
                    for op in self.queue.drain(..) {
                        let _ = op.reply.send(SignerOpReply::failed(MusicError::Shutdown));
                    }
                    info!(kind = self.kind.as_str(), "Rate-limited queue: shutting down");
                    break;
                }
                op = rx.recv() => {
                    let Some(op) = op else { break };
                    self.queue.push_back(op);
                }
                _ = ticker.tick() => {
                    self.dispatch_tick().await;
                }
            }
        }
    }

    /// One tick: run head-of-queue operations until every remaining
    /// operation's signer is out of budget for this second. Deferred
    /// operations keep their relative order.
    async fn dispatch_tick(&mut self) {
        if self.queue.is_empty() {
            return;
        }

        let mut used: HashMap<String, u32> = HashMap::new();
        let mut deferred = VecDeque::new();

        while let Some(op) = self.queue.pop_front() {
            let limit = match self.kind {
                QueueKind::Fetch => op.signer.fetch_limit,
                QueueKind::Update => op.signer.update_limit,
            };
            let spent = used.entry(op.signer.name.clone()).or_insert(0);
            if *spent >= limit {
                deferred.push_back(op);
                continue;
            }
            *spent += 1;
            self.execute(op).await;
        }

        self.queue = deferred;
        if !self.queue.is_empty() {
            debug!(
                kind = self.kind.as_str(),
                deferred = self.queue.len(),
                "Budget exhausted, operations deferred to next tick"
            );
        }
    }

    async fn execute(&self, op: SignerOp) {
        let SignerOp {
            signer,
            zone,
            owner,
            kind,
            reply,
        } = op;

        let mut attempt = 0;
        let outcome = loop {
            attempt += 1;
            let result = match &kind {
                SignerOpKind::Fetch { rtype } => self
                    .updater
                    .fetch_rrset(&signer, &zone, &owner, *rtype)
                    .await
                    .map(|rrset| SignerOpReply::fetched(rrset, "NOERROR".to_string())),
                SignerOpKind::Update { inserts, removes } => self
                    .updater
                    .update_rrsets(&signer, &zone, &owner, inserts, removes)
                    .await
                    .map(|()| SignerOpReply::updated("NOERROR".to_string())),
            };

            match result {
                Err(MusicError::RateLimited { seconds }) => {
                    if attempt > MAX_RATE_LIMIT_RETRIES {
                        break SignerOpReply::failed(MusicError::RateLimitExhausted(
                            signer.name.clone(),
                        ));
                    }
                    warn!(
                        signer = %signer.name,
                        seconds,
                        attempt,
                        "Backend rate limit, sleeping before retry"
                    );
                    tokio::select! {
                        _ = self.shutdown.cancelled() => {
                            break SignerOpReply::failed(MusicError::Shutdown);
                        }
                        _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
                    }
                }
                Ok(reply) => break reply,
                Err(e) => break SignerOpReply::failed(e),
            }
        };

        // A dropped receiver means the caller gave up; nothing to do.
        let _ = reply.send(outcome);
    }
}
