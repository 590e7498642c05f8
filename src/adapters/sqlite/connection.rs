use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;

/// Grounded on `adapters/sqlite/connection.rs`: WAL mode, `synchronous=NORMAL`,
/// foreign keys enforced, a bounded busy timeout so writers don't deadlock
/// under contention.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("failed to connect to database: {0}")]
    Connect(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

pub async fn create_pool(database_path: &str, config: PoolConfig) -> Result<SqlitePool, ConnectionError> {
    let options = SqliteConnectOptions::new()
        .filename(database_path)
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
        ConnectionError::Connect(sqlx::Error::Migrate(Box::new(e)))
    })?;

    Ok(pool)
}

/// In-memory pool for tests, grounded on
/// `adapters/sqlite/connection.rs::create_test_pool`.
pub async fn create_test_pool() -> Result<SqlitePool, ConnectionError> {
    let options = SqliteConnectOptions::new()
        .filename(":memory:")
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
        ConnectionError::Connect(sqlx::Error::Migrate(Box::new(e)))
    })?;

    Ok(pool)
}
