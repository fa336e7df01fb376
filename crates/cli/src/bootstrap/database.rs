use music_domain::Config;
use music_infrastructure::database::{create_read_pool, create_write_pool};
use sqlx::SqlitePool;
use tracing::info;

pub struct DbPools {
    pub read: SqlitePool,
    pub write: SqlitePool,
}

pub async fn init_database(config: &Config) -> anyhow::Result<DbPools> {
    let url = format!("sqlite://{}", config.db.path);

    let write = create_write_pool(&url, &config.db).await?;
    let read = create_read_pool(&url, &config.db).await?;

    info!(path = %config.db.path, "Database initialised, migrations applied");
    Ok(DbPools { read, write })
}
