//! The method-tag registry and the `SignerOps` implementation that
//! funnels every operation through the rate-limited queues.

use async_trait::async_trait;
use music_application::ports::{SignerOp, SignerOpKind, SignerOps, SignerUpdater};
use music_domain::{MusicError, RecordType, Rrset, Signer, UpdateMethod};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use super::rate_limited::{QueueKind, RateLimitedQueue};
use crate::dns::{DdnsUpdater, DesecApiUpdater};

/// Method tag to updater implementation, built once at startup.
pub struct UpdaterRegistry {
    updaters: HashMap<UpdateMethod, Arc<dyn SignerUpdater>>,
}

impl UpdaterRegistry {
    /// Registry with the two shipped updaters.
    pub fn with_defaults() -> Result<Self, MusicError> {
        let mut registry = Self {
            updaters: HashMap::new(),
        };
        registry.register(UpdateMethod::Ddns, Arc::new(DdnsUpdater::new()));
        registry.register(UpdateMethod::DesecApi, Arc::new(DesecApiUpdater::new()?));
        Ok(registry)
    }

    pub fn empty() -> Self {
        Self {
            updaters: HashMap::new(),
        }
    }

    pub fn register(&mut self, method: UpdateMethod, updater: Arc<dyn SignerUpdater>) {
        self.updaters.insert(method, updater);
    }

    pub fn get(&self, method: UpdateMethod) -> Option<Arc<dyn SignerUpdater>> {
        self.updaters.get(&method).cloned()
    }
}

struct QueuePair {
    fetch: RateLimitedQueue,
    update: RateLimitedQueue,
}

/// Routes each operation into the right queue pair and awaits its reply
/// channel, keeping rate limiting invisible to the FSM.
pub struct UpdaterDispatcher {
    queues: HashMap<UpdateMethod, QueuePair>,
}

impl UpdaterDispatcher {
    /// Spawn one fetch and one update queue per registered updater kind.
    pub fn spawn(registry: &UpdaterRegistry, shutdown: CancellationToken) -> Self {
        let mut queues = HashMap::new();
        for (method, updater) in &registry.updaters {
            queues.insert(
                *method,
                QueuePair {
                    fetch: RateLimitedQueue::spawn(
                        QueueKind::Fetch,
                        updater.clone(),
                        shutdown.clone(),
                    ),
                    update: RateLimitedQueue::spawn(
                        QueueKind::Update,
                        updater.clone(),
                        shutdown.clone(),
                    ),
                },
            );
        }
        Self { queues }
    }

    fn pair(&self, signer: &Signer) -> Result<&QueuePair, MusicError> {
        self.queues
            .get(&signer.method)
            .ok_or_else(|| MusicError::UpdaterNotFound(signer.method.as_str().to_string()))
    }

    async fn roundtrip(
        &self,
        queue: &RateLimitedQueue,
        signer: &Signer,
        zone: &str,
        owner: &str,
        kind: SignerOpKind,
    ) -> Result<Option<Rrset>, MusicError> {
        let (tx, rx) = oneshot::channel();
        queue.enqueue(SignerOp {
            signer: signer.clone(),
            zone: zone.to_string(),
            owner: owner.to_string(),
            kind,
            reply: tx,
        })?;
        let reply = rx.await.map_err(|_| MusicError::Shutdown)?;
        reply.into_result()
    }
}

#[async_trait]
impl SignerOps for UpdaterDispatcher {
    async fn fetch_rrset(
        &self,
        signer: &Signer,
        zone: &str,
        owner: &str,
        rtype: RecordType,
    ) -> Result<Rrset, MusicError> {
        let pair = self.pair(signer)?;
        let rrset = self
            .roundtrip(&pair.fetch, signer, zone, owner, SignerOpKind::Fetch { rtype })
            .await?;
        rrset.ok_or_else(|| MusicError::SignerOpFailed {
            signer: signer.name.clone(),
            detail: "fetch reply carried no RRset".to_string(),
        })
    }

    async fn update_rrsets(
        &self,
        signer: &Signer,
        zone: &str,
        owner: &str,
        inserts: &[Rrset],
        removes: &[Rrset],
    ) -> Result<(), MusicError> {
        let pair = self.pair(signer)?;
        self.roundtrip(
            &pair.update,
            signer,
            zone,
            owner,
            SignerOpKind::Update {
                inserts: inserts.to_vec(),
                removes: removes.to_vec(),
            },
        )
        .await?;
        Ok(())
    }
}
