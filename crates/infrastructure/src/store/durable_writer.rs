//! The single durable-update writer task.
//!
//! The FSM engine and the discovery engine never write to the store
//! directly; they enqueue `DurableUpdate` messages here. One consumer
//! applies them in order, which serialises updates per zone, and retries
//! busy-database conditions with back-off for as long as it takes. Any
//! other write error is logged and the item dropped.

use dashmap::DashMap;
use music_domain::DnskeyData;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// In-memory stop-reason overlay giving read-your-writes before the
/// durable write lands.
pub type StopReasonCache = Arc<DashMap<String, String>>;

#[derive(Debug, Clone)]
pub enum DurableUpdate {
    StopReason {
        zone: String,
        reason: String,
    },
    InsertZoneNs {
        zone: String,
        signer: String,
        nses: Vec<String>,
    },
    InsertZoneDnskeys {
        zone: String,
        signer: String,
        keys: Vec<DnskeyData>,
    },
}

pub type DurableTx = mpsc::UnboundedSender<DurableUpdate>;

pub struct DurableWriter {
    pool: SqlitePool,
    cache: StopReasonCache,
}

impl DurableWriter {
    /// Spawn the writer task; returns the sender side of its channel.
    pub fn spawn(
        pool: SqlitePool,
        cache: StopReasonCache,
        shutdown: CancellationToken,
    ) -> DurableTx {
        let (tx, rx) = mpsc::unbounded_channel();
        let writer = DurableWriter { pool, cache };
        tokio::spawn(writer.run(rx, shutdown));
        tx
    }

    async fn run(
        self,
        mut rx: mpsc::UnboundedReceiver<DurableUpdate>,
        shutdown: CancellationToken,
    ) {
        info!("Durable writer started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    // Drain whatever is already queued before stopping.
                    while let Ok(update) = rx.try_recv() {
                        self.commit(update).await;
                    }
                    info!("Durable writer: shutting down");
                    break;
                }
                update = rx.recv() => {
                    let Some(update) = update else { break };
                    self.commit(update).await;
                }
            }
        }
    }

    /// Apply one update, retrying busy-database conditions forever with
    /// back-off. Other errors drop the item.
    async fn commit(&self, update: DurableUpdate) {
        let mut backoff = Duration::from_millis(50);
        loop {
            match self.apply(&update).await {
                Ok(()) => {
                    if let DurableUpdate::StopReason { zone, reason } = &update {
                        // A newer overlay entry stays until its own
                        // write commits.
                        self.cache.remove_if(zone, |_, current| current == reason);
                    }
                    return;
                }
                Err(e) if is_busy(&e) => {
                    debug!(error = %e, "Database busy, retrying durable update");
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(Duration::from_secs(5));
                }
                Err(e) => {
                    error!(error = %e, update = ?update, "Durable update failed, dropped");
                    return;
                }
            }
        }
    }

    async fn apply(&self, update: &DurableUpdate) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        match update {
            DurableUpdate::StopReason { zone, reason } => {
                sqlx::query(
                    "INSERT INTO zone_metadata (zone_name, key, value) VALUES (?, 'stop-reason', ?)
                     ON CONFLICT (zone_name, key) DO UPDATE SET value = excluded.value",
                )
                .bind(zone)
                .bind(reason)
                .execute(&mut *tx)
                .await?;
                let updated = sqlx::query("UPDATE zones SET fsm_status = 'blocked' WHERE name = ?")
                    .bind(zone)
                    .execute(&mut *tx)
                    .await?;
                if updated.rows_affected() == 0 {
                    warn!(zone = %zone, "Stop-reason for unknown zone");
                }
            }
            DurableUpdate::InsertZoneNs { zone, signer, nses } => {
                sqlx::query("DELETE FROM zone_nses WHERE zone_name = ? AND signer_name = ?")
                    .bind(zone)
                    .bind(signer)
                    .execute(&mut *tx)
                    .await?;
                for ns in nses {
                    sqlx::query(
                        "INSERT OR IGNORE INTO zone_nses (zone_name, signer_name, ns) VALUES (?, ?, ?)",
                    )
                    .bind(zone)
                    .bind(signer)
                    .bind(ns)
                    .execute(&mut *tx)
                    .await?;
                }
            }
            DurableUpdate::InsertZoneDnskeys { zone, signer, keys } => {
                sqlx::query("DELETE FROM zone_dnskeys WHERE zone_name = ? AND signer_name = ?")
                    .bind(zone)
                    .bind(signer)
                    .execute(&mut *tx)
                    .await?;
                for key in keys {
                    let encoded = serde_json::to_string(key)
                        .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
                    sqlx::query(
                        "INSERT OR IGNORE INTO zone_dnskeys (zone_name, signer_name, dnskey) VALUES (?, ?, ?)",
                    )
                    .bind(zone)
                    .bind(signer)
                    .bind(encoded)
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }
        tx.commit().await
    }
}

fn is_busy(e: &sqlx::Error) -> bool {
    let text = e.to_string();
    text.contains("database is locked") || text.contains("database table is locked")
}
