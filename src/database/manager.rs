use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::info;

use crate::config::DatabaseConfig;

/// Errors from DatabaseManager
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Owns the application's connection pool, created on first use
pub struct DatabaseManager {
    pool: OnceCell<PgPool>,
    config: DatabaseConfig,
}

impl DatabaseManager {
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            pool: OnceCell::new(),
            config,
        }
    }

    /// Get the pool, connecting lazily
    pub async fn pool(&self) -> Result<PgPool, DatabaseError> {
        let pool = self
            .pool
            .get_or_try_init(|| async {
                let url = self
                    .config
                    .url
                    .as_deref()
                    .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;

                let pool = PgPoolOptions::new()
                    .max_connections(self.config.max_connections)
                    .acquire_timeout(Duration::from_secs(self.config.connection_timeout))
                    .connect(url)
                    .await?;

                info!("Created database pool ({} max connections)", self.config.max_connections);
                Ok::<_, DatabaseError>(pool)
            })
            .await?;
        Ok(pool.clone())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        let pool = self.pool().await?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        Ok(())
    }

    /// Apply the embedded migrations
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        let pool = self.pool().await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Close the pool (e.g., on shutdown)
    pub async fn close(&self) {
        if let Some(pool) = self.pool.get() {
            pool.close().await;
            info!("Closed database pool");
        }
    }
}
