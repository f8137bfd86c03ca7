/// Database layer for Mirador
///
/// Manages the SQLite connection pool and embedded migrations.
use crate::error::{EngageError, EngageResult};
use sqlx::sqlite::SqlitePool;
use std::path::Path;

/// Embedded migrations, shared by the server and by tests running
/// against in-memory pools.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Database connection options
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub max_connections: u32,
    pub enable_wal: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            enable_wal: true,
        }
    }
}

/// Create a SQLite connection pool
pub async fn create_pool(path: &Path, options: DatabaseOptions) -> EngageResult<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(options.max_connections)
        .connect_with(
            sqlx::sqlite::SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(if options.enable_wal {
                    sqlx::sqlite::SqliteJournalMode::Wal
                } else {
                    sqlx::sqlite::SqliteJournalMode::Delete
                })
                .foreign_keys(true)
                .busy_timeout(std::time::Duration::from_secs(5)),
        )
        .await
        .map_err(EngageError::Storage)?;

    Ok(pool)
}

/// Run migrations for a database
pub async fn run_migrations(pool: &SqlitePool) -> EngageResult<()> {
    MIGRATOR
        .run(pool)
        .await
        .map_err(|e| EngageError::Internal(format!("Migration failed: {}", e)))?;

    Ok(())
}

/// Test database connection
pub async fn test_connection(pool: &SqlitePool) -> EngageResult<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(EngageError::Storage)?;

    Ok(())
}

/// In-memory pool with the full schema, for tests
#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePool::connect(":memory:").await.unwrap();
    MIGRATOR.run(&pool).await.unwrap();
    pool
}
