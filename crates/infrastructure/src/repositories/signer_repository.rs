use async_trait::async_trait;
use music_application::ports::SignerRepository;
use music_domain::{MusicError, Signer, SignerAuth, UpdateMethod};
use sqlx::SqlitePool;
use tracing::{error, instrument};

type SignerRow = (String, String, String, i64, String, i64, i64);

pub struct SqliteSignerRepository {
    read_pool: SqlitePool,
    write_pool: SqlitePool,
}

impl SqliteSignerRepository {
    pub fn new(read_pool: SqlitePool, write_pool: SqlitePool) -> Self {
        Self {
            read_pool,
            write_pool,
        }
    }

    fn row_to_signer(row: SignerRow) -> Result<Signer, MusicError> {
        let (name, method, address, port, auth, fetch_limit, update_limit) = row;

        let method = UpdateMethod::parse(&method)
            .ok_or_else(|| MusicError::Database(format!("unknown signer method '{}'", method)))?;
        let auth = if auth.is_empty() {
            SignerAuth::None
        } else {
            serde_json::from_str(&auth)
                .map_err(|e| MusicError::Database(format!("corrupt signer auth: {}", e)))?
        };

        Ok(Signer {
            name,
            method,
            address,
            port: port as u16,
            auth,
            fetch_limit: fetch_limit as u32,
            update_limit: update_limit as u32,
        })
    }

    fn auth_json(signer: &Signer) -> Result<String, MusicError> {
        serde_json::to_string(&signer.auth)
            .map_err(|e| MusicError::Database(format!("cannot encode signer auth: {}", e)))
    }

    fn db_err(e: sqlx::Error, what: &str) -> MusicError {
        error!(error = %e, "{} failed", what);
        MusicError::Database(e.to_string())
    }
}

#[async_trait]
impl SignerRepository for SqliteSignerRepository {
    #[instrument(skip(self, signer), fields(signer = %signer.name))]
    async fn add_signer(&self, signer: &Signer) -> Result<(), MusicError> {
        sqlx::query(
            "INSERT INTO signers (name, method, address, port, auth, fetch_limit, update_limit)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&signer.name)
        .bind(signer.method.as_str())
        .bind(&signer.address)
        .bind(signer.port as i64)
        .bind(Self::auth_json(signer)?)
        .bind(signer.fetch_limit as i64)
        .bind(signer.update_limit as i64)
        .execute(&self.write_pool)
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint failed") {
                MusicError::Database(format!("signer '{}' already exists", signer.name))
            } else {
                Self::db_err(e, "add_signer")
            }
        })?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_signer(&self, name: &str) -> Result<Option<Signer>, MusicError> {
        let row = sqlx::query_as::<_, SignerRow>(
            "SELECT name, method, address, port, auth, fetch_limit, update_limit
             FROM signers WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.read_pool)
        .await
        .map_err(|e| Self::db_err(e, "get_signer"))?;

        row.map(Self::row_to_signer).transpose()
    }

    #[instrument(skip(self))]
    async fn list_signers(&self) -> Result<Vec<Signer>, MusicError> {
        let rows = sqlx::query_as::<_, SignerRow>(
            "SELECT name, method, address, port, auth, fetch_limit, update_limit
             FROM signers ORDER BY name",
        )
        .fetch_all(&self.read_pool)
        .await
        .map_err(|e| Self::db_err(e, "list_signers"))?;

        rows.into_iter().map(Self::row_to_signer).collect()
    }

    #[instrument(skip(self, signer), fields(signer = %signer.name))]
    async fn update_signer(&self, signer: &Signer) -> Result<(), MusicError> {
        let result = sqlx::query(
            "UPDATE signers SET method = ?, address = ?, port = ?, auth = ?,
             fetch_limit = ?, update_limit = ? WHERE name = ?",
        )
        .bind(signer.method.as_str())
        .bind(&signer.address)
        .bind(signer.port as i64)
        .bind(Self::auth_json(signer)?)
        .bind(signer.fetch_limit as i64)
        .bind(signer.update_limit as i64)
        .bind(&signer.name)
        .execute(&self.write_pool)
        .await
        .map_err(|e| Self::db_err(e, "update_signer"))?;

        if result.rows_affected() == 0 {
            return Err(MusicError::SignerNotFound(signer.name.clone()));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_signer(&self, name: &str) -> Result<(), MusicError> {
        let memberships: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM signergroup_signers WHERE signer_name = ?")
                .bind(name)
                .fetch_one(&self.read_pool)
                .await
                .map_err(|e| Self::db_err(e, "delete_signer"))?;
        if memberships.0 > 0 {
            return Err(MusicError::Database(format!(
                "signer '{}' is still a member of {} group(s)",
                name, memberships.0
            )));
        }

        let result = sqlx::query("DELETE FROM signers WHERE name = ?")
            .bind(name)
            .execute(&self.write_pool)
            .await
            .map_err(|e| Self::db_err(e, "delete_signer"))?;
        if result.rows_affected() == 0 {
            return Err(MusicError::SignerNotFound(name.to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn signers_in_group(&self, group: &str) -> Result<Vec<Signer>, MusicError> {
        let rows = sqlx::query_as::<_, SignerRow>(
            "SELECT s.name, s.method, s.address, s.port, s.auth, s.fetch_limit, s.update_limit
             FROM signers s
             JOIN signergroup_signers gs ON gs.signer_name = s.name
             WHERE gs.group_name = ?
             ORDER BY s.name",
        )
        .bind(group)
        .fetch_all(&self.read_pool)
        .await
        .map_err(|e| Self::db_err(e, "signers_in_group"))?;

        rows.into_iter().map(Self::row_to_signer).collect()
    }
}
