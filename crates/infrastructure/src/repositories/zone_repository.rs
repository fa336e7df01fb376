use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use music_application::ports::ZoneRepository;
use music_domain::{DnskeyData, FsmMode, FsmStatus, MusicError, Zone, ZoneType};
use sqlx::SqlitePool;
use tracing::{error, instrument};

use crate::store::{DurableTx, DurableUpdate, StopReasonCache};

type ZoneRow = (
    String,         // name
    String,         // zone_type
    String,         // fsm_mode
    String,         // fsm
    String,         // state
    String,         // fsm_status
    String,         // signer_group
    String,         // state_timestamp
    Option<String>, // stop-reason metadata
);

const ZONE_SELECT: &str = "SELECT z.name, z.zone_type, z.fsm_mode, z.fsm, z.state, \
     z.fsm_status, z.signer_group, z.state_timestamp, m.value \
     FROM zones z \
     LEFT JOIN zone_metadata m ON m.zone_name = z.name AND m.key = 'stop-reason'";

pub struct SqliteZoneRepository {
    read_pool: SqlitePool,
    write_pool: SqlitePool,
    durable: DurableTx,
    stop_reasons: StopReasonCache,
}

impl SqliteZoneRepository {
    pub fn new(
        read_pool: SqlitePool,
        write_pool: SqlitePool,
        durable: DurableTx,
        stop_reasons: StopReasonCache,
    ) -> Self {
        Self {
            read_pool,
            write_pool,
            durable,
            stop_reasons,
        }
    }

    fn parse_timestamp(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|_| {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|dt| dt.and_utc())
            })
            .unwrap_or_else(|_| Utc::now())
    }

    fn row_to_zone(&self, row: ZoneRow) -> Zone {
        let (name, zone_type, fsm_mode, fsm, state, fsm_status, signer_group, ts, stop_reason) =
            row;

        // The in-memory overlay wins over the durable copy: a freshly set
        // stop-reason is visible before the writer commits it.
        let stop_reason = self
            .stop_reasons
            .get(&name)
            .map(|entry| entry.value().clone())
            .or(stop_reason);

        Zone {
            zone_type: ZoneType::parse(&zone_type).unwrap_or(ZoneType::Normal),
            fsm_mode: FsmMode::parse(&fsm_mode).unwrap_or(FsmMode::Auto),
            fsm,
            state,
            fsm_status: FsmStatus::parse(&fsm_status),
            signer_group: (!signer_group.is_empty()).then_some(signer_group),
            stop_reason,
            state_timestamp: Self::parse_timestamp(&ts),
            name,
        }
    }

    fn db_err(e: sqlx::Error, what: &str) -> MusicError {
        error!(error = %e, "{} failed", what);
        MusicError::Database(e.to_string())
    }
}

#[async_trait]
impl ZoneRepository for SqliteZoneRepository {
    #[instrument(skip(self, zone), fields(zone = %zone.name))]
    async fn add_zone(&self, zone: &Zone) -> Result<(), MusicError> {
        sqlx::query(
            "INSERT INTO zones (name, zone_type, fsm_mode, fsm, state, fsm_status, signer_group, state_timestamp)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&zone.name)
        .bind(zone.zone_type.as_str())
        .bind(zone.fsm_mode.as_str())
        .bind(&zone.fsm)
        .bind(&zone.state)
        .bind(zone.fsm_status.as_str())
        .bind(zone.signer_group.as_deref().unwrap_or(""))
        .bind(zone.state_timestamp.to_rfc3339())
        .execute(&self.write_pool)
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint failed") {
                MusicError::Database(format!("zone '{}' already exists", zone.name))
            } else {
                Self::db_err(e, "add_zone")
            }
        })?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_zone(&self, name: &str) -> Result<Option<Zone>, MusicError> {
        let row = sqlx::query_as::<_, ZoneRow>(&format!("{} WHERE z.name = ?", ZONE_SELECT))
            .bind(name)
            .fetch_optional(&self.read_pool)
            .await
            .map_err(|e| Self::db_err(e, "get_zone"))?;
        Ok(row.map(|r| self.row_to_zone(r)))
    }

    #[instrument(skip(self))]
    async fn list_zones(&self) -> Result<Vec<Zone>, MusicError> {
        let rows = sqlx::query_as::<_, ZoneRow>(&format!("{} ORDER BY z.name", ZONE_SELECT))
            .fetch_all(&self.read_pool)
            .await
            .map_err(|e| Self::db_err(e, "list_zones"))?;
        Ok(rows.into_iter().map(|r| self.row_to_zone(r)).collect())
    }

    #[instrument(skip(self))]
    async fn list_auto_zones(&self) -> Result<Vec<Zone>, MusicError> {
        let rows = sqlx::query_as::<_, ZoneRow>(&format!(
            "{} WHERE z.fsm_mode = 'auto' ORDER BY z.name",
            ZONE_SELECT
        ))
        .fetch_all(&self.read_pool)
        .await
        .map_err(|e| Self::db_err(e, "list_auto_zones"))?;
        Ok(rows.into_iter().map(|r| self.row_to_zone(r)).collect())
    }

    #[instrument(skip(self, zone), fields(zone = %zone.name))]
    async fn update_zone(&self, zone: &Zone) -> Result<(), MusicError> {
        let result = sqlx::query(
            "UPDATE zones SET zone_type = ?, fsm_mode = ?, fsm = ?, state = ?, fsm_status = ?,
             signer_group = ?, state_timestamp = ? WHERE name = ?",
        )
        .bind(zone.zone_type.as_str())
        .bind(zone.fsm_mode.as_str())
        .bind(&zone.fsm)
        .bind(&zone.state)
        .bind(zone.fsm_status.as_str())
        .bind(zone.signer_group.as_deref().unwrap_or(""))
        .bind(zone.state_timestamp.to_rfc3339())
        .bind(&zone.name)
        .execute(&self.write_pool)
        .await
        .map_err(|e| Self::db_err(e, "update_zone"))?;

        if result.rows_affected() == 0 {
            return Err(MusicError::ZoneNotFound(zone.name.clone()));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_zone(&self, name: &str) -> Result<(), MusicError> {
        let result = sqlx::query("DELETE FROM zones WHERE name = ?")
            .bind(name)
            .execute(&self.write_pool)
            .await
            .map_err(|e| Self::db_err(e, "delete_zone"))?;
        if result.rows_affected() == 0 {
            return Err(MusicError::ZoneNotFound(name.to_string()));
        }
        self.stop_reasons.remove(name);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn attach_fsm(
        &self,
        zone: &str,
        process: &str,
        initial_state: &str,
        preempt: bool,
    ) -> Result<(), MusicError> {
        let mut tx = self
            .write_pool
            .begin()
            .await
            .map_err(|e| Self::db_err(e, "attach_fsm"))?;

        let current: Option<(String,)> = sqlx::query_as("SELECT fsm FROM zones WHERE name = ?")
            .bind(zone)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| Self::db_err(e, "attach_fsm"))?;
        let Some((current,)) = current else {
            return Err(MusicError::ZoneNotFound(zone.to_string()));
        };
        if !current.is_empty() && !preempt {
            return Err(MusicError::AlreadyAttached {
                zone: zone.to_string(),
                process: current,
            });
        }

        sqlx::query(
            "UPDATE zones SET fsm = ?, state = ?, fsm_status = '', state_timestamp = ? WHERE name = ?",
        )
        .bind(process)
        .bind(initial_state)
        .bind(Utc::now().to_rfc3339())
        .bind(zone)
        .execute(&mut *tx)
        .await
        .map_err(|e| Self::db_err(e, "attach_fsm"))?;

        sqlx::query("DELETE FROM zone_metadata WHERE zone_name = ? AND key = 'stop-reason'")
            .bind(zone)
            .execute(&mut *tx)
            .await
            .map_err(|e| Self::db_err(e, "attach_fsm"))?;

        tx.commit().await.map_err(|e| Self::db_err(e, "attach_fsm"))?;
        self.stop_reasons.remove(zone);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn detach_fsm(&self, zone: &str, process: &str) -> Result<(), MusicError> {
        let result = sqlx::query(
            "UPDATE zones SET fsm = '', state = '', fsm_status = '' WHERE name = ? AND fsm = ?",
        )
        .bind(zone)
        .bind(process)
        .execute(&self.write_pool)
        .await
        .map_err(|e| Self::db_err(e, "detach_fsm"))?;

        if result.rows_affected() == 0 {
            return Err(MusicError::NotAttached {
                zone: zone.to_string(),
                process: process.to_string(),
            });
        }
        self.stop_reasons.remove(zone);
        Ok(())
    }

    /// The engine's commit: compare-and-set on the state column. Exactly
    /// one of two concurrent transitions from the same state succeeds.
    #[instrument(skip(self))]
    async fn state_transition(&self, zone: &str, from: &str, to: &str) -> Result<(), MusicError> {
        let mut tx = self
            .write_pool
            .begin()
            .await
            .map_err(|e| Self::db_err(e, "state_transition"))?;

        let result = sqlx::query(
            "UPDATE zones SET state = ?, fsm_status = '', state_timestamp = ?
             WHERE name = ? AND state = ?",
        )
        .bind(to)
        .bind(Utc::now().to_rfc3339())
        .bind(zone)
        .bind(from)
        .execute(&mut *tx)
        .await
        .map_err(|e| Self::db_err(e, "state_transition"))?;

        if result.rows_affected() == 0 {
            let actual: Option<(String,)> =
                sqlx::query_as("SELECT state FROM zones WHERE name = ?")
                    .bind(zone)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(|e| Self::db_err(e, "state_transition"))?;
            return match actual {
                Some((actual,)) => Err(MusicError::StateMismatch {
                    zone: zone.to_string(),
                    expected: from.to_string(),
                    actual,
                }),
                None => Err(MusicError::ZoneNotFound(zone.to_string())),
            };
        }

        sqlx::query("DELETE FROM zone_metadata WHERE zone_name = ? AND key = 'stop-reason'")
            .bind(zone)
            .execute(&mut *tx)
            .await
            .map_err(|e| Self::db_err(e, "state_transition"))?;

        tx.commit()
            .await
            .map_err(|e| Self::db_err(e, "state_transition"))?;
        self.stop_reasons.remove(zone);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_fsm_status(&self, zone: &str, status: FsmStatus) -> Result<(), MusicError> {
        sqlx::query("UPDATE zones SET fsm_status = ? WHERE name = ?")
            .bind(status.as_str())
            .bind(zone)
            .execute(&self.write_pool)
            .await
            .map_err(|e| Self::db_err(e, "set_fsm_status"))?;
        Ok(())
    }

    /// Visible to readers immediately through the overlay; the durable
    /// write (which also flips `fsm_status` to blocked) follows on the
    /// writer channel.
    #[instrument(skip(self))]
    async fn set_stop_reason(&self, zone: &str, reason: &str) -> Result<(), MusicError> {
        self.stop_reasons
            .insert(zone.to_string(), reason.to_string());
        self.durable
            .send(DurableUpdate::StopReason {
                zone: zone.to_string(),
                reason: reason.to_string(),
            })
            .map_err(|_| MusicError::Shutdown)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_stop_reason(&self, zone: &str) -> Result<Option<String>, MusicError> {
        if let Some(reason) = self.stop_reasons.get(zone) {
            return Ok(Some(reason.value().clone()));
        }
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT value FROM zone_metadata WHERE zone_name = ? AND key = 'stop-reason'",
        )
        .bind(zone)
        .fetch_optional(&self.read_pool)
        .await
        .map_err(|e| Self::db_err(e, "get_stop_reason"))?;
        Ok(row.map(|(value,)| value))
    }

    #[instrument(skip(self))]
    async fn zone_join_group(&self, zone: &str, group: &str) -> Result<(), MusicError> {
        let mut tx = self
            .write_pool
            .begin()
            .await
            .map_err(|e| Self::db_err(e, "zone_join_group"))?;

        let locked: Option<(i64,)> =
            sqlx::query_as("SELECT locked FROM signergroups WHERE name = ?")
                .bind(group)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| Self::db_err(e, "zone_join_group"))?;
        match locked {
            None => return Err(MusicError::GroupNotFound(group.to_string())),
            Some((locked,)) if locked != 0 => {
                return Err(MusicError::GroupLocked(group.to_string()))
            }
            Some(_) => {}
        }

        let result = sqlx::query("UPDATE zones SET signer_group = ? WHERE name = ?")
            .bind(group)
            .bind(zone)
            .execute(&mut *tx)
            .await
            .map_err(|e| Self::db_err(e, "zone_join_group"))?;
        if result.rows_affected() == 0 {
            return Err(MusicError::ZoneNotFound(zone.to_string()));
        }

        tx.commit()
            .await
            .map_err(|e| Self::db_err(e, "zone_join_group"))
    }

    #[instrument(skip(self))]
    async fn zone_leave_group(&self, zone: &str, group: &str) -> Result<(), MusicError> {
        let mut tx = self
            .write_pool
            .begin()
            .await
            .map_err(|e| Self::db_err(e, "zone_leave_group"))?;

        let locked: Option<(i64,)> =
            sqlx::query_as("SELECT locked FROM signergroups WHERE name = ?")
                .bind(group)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| Self::db_err(e, "zone_leave_group"))?;
        match locked {
            None => return Err(MusicError::GroupNotFound(group.to_string())),
            Some((locked,)) if locked != 0 => {
                return Err(MusicError::GroupLocked(group.to_string()))
            }
            Some(_) => {}
        }

        let result =
            sqlx::query("UPDATE zones SET signer_group = '' WHERE name = ? AND signer_group = ?")
                .bind(zone)
                .bind(group)
                .execute(&mut *tx)
                .await
                .map_err(|e| Self::db_err(e, "zone_leave_group"))?;
        if result.rows_affected() == 0 {
            return Err(MusicError::ZoneNotFound(zone.to_string()));
        }

        tx.commit()
            .await
            .map_err(|e| Self::db_err(e, "zone_leave_group"))
    }

    #[instrument(skip(self))]
    async fn get_meta(&self, zone: &str, key: &str) -> Result<Option<String>, MusicError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM zone_metadata WHERE zone_name = ? AND key = ?")
                .bind(zone)
                .bind(key)
                .fetch_optional(&self.read_pool)
                .await
                .map_err(|e| Self::db_err(e, "get_meta"))?;
        Ok(row.map(|(value,)| value))
    }

    #[instrument(skip(self))]
    async fn set_meta(&self, zone: &str, key: &str, value: &str) -> Result<(), MusicError> {
        sqlx::query(
            "INSERT INTO zone_metadata (zone_name, key, value) VALUES (?, ?, ?)
             ON CONFLICT (zone_name, key) DO UPDATE SET value = excluded.value",
        )
        .bind(zone)
        .bind(key)
        .bind(value)
        .execute(&self.write_pool)
        .await
        .map_err(|e| Self::db_err(e, "set_meta"))?;
        Ok(())
    }

    async fn set_zone_nses(
        &self,
        zone: &str,
        signer: &str,
        nses: &[String],
    ) -> Result<(), MusicError> {
        self.durable
            .send(DurableUpdate::InsertZoneNs {
                zone: zone.to_string(),
                signer: signer.to_string(),
                nses: nses.to_vec(),
            })
            .map_err(|_| MusicError::Shutdown)?;
        Ok(())
    }

    async fn get_zone_nses(&self, zone: &str, signer: &str) -> Result<Vec<String>, MusicError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT ns FROM zone_nses WHERE zone_name = ? AND signer_name = ? ORDER BY ns",
        )
        .bind(zone)
        .bind(signer)
        .fetch_all(&self.read_pool)
        .await
        .map_err(|e| Self::db_err(e, "get_zone_nses"))?;
        Ok(rows.into_iter().map(|(ns,)| ns).collect())
    }

    async fn set_zone_dnskeys(
        &self,
        zone: &str,
        signer: &str,
        keys: &[DnskeyData],
    ) -> Result<(), MusicError> {
        self.durable
            .send(DurableUpdate::InsertZoneDnskeys {
                zone: zone.to_string(),
                signer: signer.to_string(),
                keys: keys.to_vec(),
            })
            .map_err(|_| MusicError::Shutdown)?;
        Ok(())
    }

    async fn get_zone_dnskeys(
        &self,
        zone: &str,
        signer: &str,
    ) -> Result<Vec<DnskeyData>, MusicError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT dnskey FROM zone_dnskeys WHERE zone_name = ? AND signer_name = ?",
        )
        .bind(zone)
        .bind(signer)
        .fetch_all(&self.read_pool)
        .await
        .map_err(|e| Self::db_err(e, "get_zone_dnskeys"))?;

        rows.into_iter()
            .map(|(encoded,)| {
                serde_json::from_str(&encoded)
                    .map_err(|e| MusicError::Database(format!("corrupt dnskey row: {}", e)))
            })
            .collect()
    }
}
