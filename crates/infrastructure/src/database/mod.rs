use music_domain::config::DatabaseConfig;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Build base connection options shared by both pools.
fn base_options(database_url: &str) -> Result<SqliteConnectOptions, sqlx::Error> {
    SqliteConnectOptions::from_str(database_url).map(|o| {
        o.create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
    })
}

async fn apply_pragmas(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("PRAGMA cache_size = -65536")
        .execute(pool)
        .await?;
    sqlx::query("PRAGMA temp_store = MEMORY")
        .execute(pool)
        .await?;
    Ok(())
}

/// Create the **write pool** (durable-update writer and admin CRUD).
///
/// Runs all pending migrations on startup. Intentionally small: SQLite
/// WAL serialises writers at the file level, so extra connections only
/// increase contention.
pub async fn create_write_pool(
    database_url: &str,
    cfg: &DatabaseConfig,
) -> Result<SqlitePool, sqlx::Error> {
    let options =
        base_options(database_url)?.busy_timeout(Duration::from_secs(cfg.write_busy_timeout_secs));

    let pool = SqlitePoolOptions::new()
        .max_connections(cfg.write_pool_max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(cfg.write_busy_timeout_secs))
        .connect_with(options)
        .await?;

    apply_pragmas(&pool).await?;

    sqlx::query(&format!(
        "PRAGMA wal_autocheckpoint = {}",
        cfg.wal_autocheckpoint
    ))
    .execute(&pool)
    .await?;

    // Migrations run once on the write pool only.
    let migrator = Migrator::new(Path::new("./migrations")).await?;
    migrator.run(&pool).await?;

    sqlx::query("PRAGMA optimize").execute(&pool).await?;

    Ok(pool)
}

/// Create the **read pool**. WAL allows readers concurrent with the
/// writer; keeping them on their own pool means engine evaluations never
/// starve API list endpoints for connection slots.
pub async fn create_read_pool(
    database_url: &str,
    cfg: &DatabaseConfig,
) -> Result<SqlitePool, sqlx::Error> {
    let options = base_options(database_url)?.busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(cfg.read_pool_max_connections)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(options)
        .await?;

    apply_pragmas(&pool).await?;

    Ok(pool)
}

/// In-memory pool for tests, migrated from the embedded schema so tests
/// do not depend on the working directory.
pub async fn create_test_pool() -> Result<SqlitePool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(
            SqliteConnectOptions::from_str("sqlite::memory:")?
                .foreign_keys(true)
                .journal_mode(SqliteJournalMode::Memory),
        )
        .await?;
    sqlx::raw_sql(include_str!("../../../../migrations/0001_initial_schema.sql"))
        .execute(&pool)
        .await?;
    Ok(pool)
}
