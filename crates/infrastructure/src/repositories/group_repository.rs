use async_trait::async_trait;
use music_application::ports::GroupRepository;
use music_domain::{MusicError, SignerGroup};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{error, info, instrument};

type GroupRow = (String, i64, String, String, String);

pub struct SqliteGroupRepository {
    read_pool: SqlitePool,
    write_pool: SqlitePool,
}

impl SqliteGroupRepository {
    pub fn new(read_pool: SqlitePool, write_pool: SqlitePool) -> Self {
        Self {
            read_pool,
            write_pool,
        }
    }

    fn db_err(e: sqlx::Error, what: &str) -> MusicError {
        error!(error = %e, "{} failed", what);
        MusicError::Database(e.to_string())
    }

    async fn hydrate(&self, row: GroupRow) -> Result<SignerGroup, MusicError> {
        let (name, locked, current_process, pending_addition, pending_removal) = row;

        let signers: Vec<(String,)> = sqlx::query_as(
            "SELECT signer_name FROM signergroup_signers WHERE group_name = ? ORDER BY signer_name",
        )
        .bind(&name)
        .fetch_all(&self.read_pool)
        .await
        .map_err(|e| Self::db_err(e, "group signers"))?;

        let num_zones: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM zones WHERE signer_group = ?")
                .bind(&name)
                .fetch_one(&self.read_pool)
                .await
                .map_err(|e| Self::db_err(e, "group zone count"))?;

        let num_process_zones: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM zones WHERE signer_group = ? AND fsm = ? AND fsm != ''",
        )
        .bind(&name)
        .bind(&current_process)
        .fetch_one(&self.read_pool)
        .await
        .map_err(|e| Self::db_err(e, "group process zone count"))?;

        Ok(SignerGroup {
            name,
            signers: signers.into_iter().map(|(s,)| s).collect(),
            locked: locked != 0,
            current_process,
            pending_addition: (!pending_addition.is_empty()).then_some(pending_addition),
            pending_removal: (!pending_removal.is_empty()).then_some(pending_removal),
            num_zones: num_zones.0 as u32,
            num_process_zones: num_process_zones.0 as u32,
        })
    }

    async fn fetch_row(
        tx: &mut Transaction<'_, Sqlite>,
        name: &str,
    ) -> Result<Option<GroupRow>, MusicError> {
        sqlx::query_as::<_, GroupRow>(
            "SELECT name, locked, current_process, pending_addition, pending_removal
             FROM signergroups WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| Self::db_err(e, "fetch group"))
    }
}

#[async_trait]
impl GroupRepository for SqliteGroupRepository {
    #[instrument(skip(self))]
    async fn add_group(&self, name: &str) -> Result<SignerGroup, MusicError> {
        sqlx::query("INSERT INTO signergroups (name) VALUES (?)")
            .bind(name)
            .execute(&self.write_pool)
            .await
            .map_err(|e| {
                if e.to_string().contains("UNIQUE constraint failed") {
                    MusicError::Database(format!("signer group '{}' already exists", name))
                } else {
                    Self::db_err(e, "add_group")
                }
            })?;
        Ok(SignerGroup::new(name.to_string()))
    }

    #[instrument(skip(self))]
    async fn get_group(&self, name: &str) -> Result<Option<SignerGroup>, MusicError> {
        let row = sqlx::query_as::<_, GroupRow>(
            "SELECT name, locked, current_process, pending_addition, pending_removal
             FROM signergroups WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.read_pool)
        .await
        .map_err(|e| Self::db_err(e, "get_group"))?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn list_groups(&self) -> Result<Vec<SignerGroup>, MusicError> {
        let rows = sqlx::query_as::<_, GroupRow>(
            "SELECT name, locked, current_process, pending_addition, pending_removal
             FROM signergroups ORDER BY name",
        )
        .fetch_all(&self.read_pool)
        .await
        .map_err(|e| Self::db_err(e, "list_groups"))?;

        let mut groups = Vec::with_capacity(rows.len());
        for row in rows {
            groups.push(self.hydrate(row).await?);
        }
        Ok(groups)
    }

    #[instrument(skip(self))]
    async fn delete_group(&self, name: &str) -> Result<(), MusicError> {
        let Some(group) = self.get_group(name).await? else {
            return Err(MusicError::GroupNotFound(name.to_string()));
        };
        if group.locked {
            return Err(MusicError::GroupLocked(name.to_string()));
        }
        if group.num_zones > 0 {
            return Err(MusicError::Database(format!(
                "signer group '{}' still serves {} zone(s)",
                name, group.num_zones
            )));
        }

        sqlx::query("DELETE FROM signergroups WHERE name = ?")
            .bind(name)
            .execute(&self.write_pool)
            .await
            .map_err(|e| Self::db_err(e, "delete_group"))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn add_signer_to_group(&self, group: &str, signer: &str) -> Result<(), MusicError> {
        sqlx::query(
            "INSERT OR IGNORE INTO signergroup_signers (group_name, signer_name) VALUES (?, ?)",
        )
        .bind(group)
        .bind(signer)
        .execute(&self.write_pool)
        .await
        .map_err(|e| {
            if e.to_string().contains("FOREIGN KEY constraint failed") {
                MusicError::GroupNotFound(format!("{} (or signer {})", group, signer))
            } else {
                Self::db_err(e, "add_signer_to_group")
            }
        })?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_signer_from_group(&self, group: &str, signer: &str) -> Result<(), MusicError> {
        sqlx::query("DELETE FROM signergroup_signers WHERE group_name = ? AND signer_name = ?")
            .bind(group)
            .bind(signer)
            .execute(&self.write_pool)
            .await
            .map_err(|e| Self::db_err(e, "remove_signer_from_group"))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn lock_for_process(
        &self,
        group: &str,
        process: &str,
        pending_addition: Option<&str>,
        pending_removal: Option<&str>,
    ) -> Result<(), MusicError> {
        let mut tx = self
            .write_pool
            .begin()
            .await
            .map_err(|e| Self::db_err(e, "lock_for_process"))?;

        let Some((_, locked, ..)) = Self::fetch_row(&mut tx, group).await? else {
            return Err(MusicError::GroupNotFound(group.to_string()));
        };
        if locked != 0 {
            return Err(MusicError::GroupLocked(group.to_string()));
        }

        sqlx::query(
            "UPDATE signergroups SET locked = 1, current_process = ?,
             pending_addition = ?, pending_removal = ? WHERE name = ?",
        )
        .bind(process)
        .bind(pending_addition.unwrap_or(""))
        .bind(pending_removal.unwrap_or(""))
        .bind(group)
        .execute(&mut *tx)
        .await
        .map_err(|e| Self::db_err(e, "lock_for_process"))?;

        tx.commit()
            .await
            .map_err(|e| Self::db_err(e, "lock_for_process"))?;
        info!(group = %group, process = %process, "Signer group locked for process");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn check_if_process_complete(&self, group: &str) -> Result<bool, MusicError> {
        let mut tx = self
            .write_pool
            .begin()
            .await
            .map_err(|e| Self::db_err(e, "check_if_process_complete"))?;

        let Some((_, locked, current_process, _, pending_removal)) =
            Self::fetch_row(&mut tx, group).await?
        else {
            return Err(MusicError::GroupNotFound(group.to_string()));
        };
        if locked == 0 {
            return Ok(false);
        }

        let running: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM zones WHERE signer_group = ? AND fsm = ? AND fsm != ''",
        )
        .bind(group)
        .bind(&current_process)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| Self::db_err(e, "check_if_process_complete"))?;
        if running.0 > 0 {
            return Ok(false);
        }

        // Last zone has left the process: unlock and apply the pending
        // membership change.
        sqlx::query(
            "UPDATE signergroups SET locked = 0, current_process = '',
             pending_addition = '', pending_removal = '' WHERE name = ?",
        )
        .bind(group)
        .execute(&mut *tx)
        .await
        .map_err(|e| Self::db_err(e, "check_if_process_complete"))?;

        if !pending_removal.is_empty() {
            sqlx::query(
                "DELETE FROM signergroup_signers WHERE group_name = ? AND signer_name = ?",
            )
            .bind(group)
            .bind(&pending_removal)
            .execute(&mut *tx)
            .await
            .map_err(|e| Self::db_err(e, "check_if_process_complete"))?;
        }

        tx.commit()
            .await
            .map_err(|e| Self::db_err(e, "check_if_process_complete"))?;
        info!(group = %group, process = %current_process, "Group process complete, group unlocked");
        Ok(true)
    }
}
