pub mod migrate;
pub mod tokens;
pub mod user;

use crate::config::AppConfig;
use crate::database::DatabaseManager;

/// Connect using the configured database
pub async fn connect(config: &AppConfig) -> anyhow::Result<(DatabaseManager, sqlx::PgPool)> {
    let database = DatabaseManager::new(config.database.clone());
    let pool = database.pool().await?;
    Ok((database, pool))
}
