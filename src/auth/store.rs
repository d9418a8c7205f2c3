use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::database::{DatabaseError, DatabaseToken, NewToken};

/// Page window for listing a user's tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub per_page: u64,
    /// Fetch one row past the page to learn whether another follows
    pub look_ahead: bool,
}

impl PageRequest {
    pub fn new(page: u64, per_page: u64) -> Self {
        Self { page, per_page, look_ahead: false }
    }

    pub fn look_ahead(mut self) -> Self {
        self.look_ahead = true;
        self
    }

    /// Rows to skip, or `None` when the window starts past what SQL can address
    pub fn offset(&self) -> Option<i64> {
        self.page
            .saturating_sub(1)
            .checked_mul(self.per_page)
            .and_then(|offset| i64::try_from(offset).ok())
    }

    pub fn limit(&self) -> i64 {
        let limit = self.per_page.saturating_add(u64::from(self.look_ahead));
        i64::try_from(limit).unwrap_or(i64::MAX)
    }
}

/// Persistence for database tokens
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn find(&self, id: i64) -> Result<Option<DatabaseToken>, DatabaseError>;

    async fn create(&self, token: NewToken) -> Result<DatabaseToken, DatabaseError>;

    /// Returns whether a row was deleted
    async fn delete(&self, id: i64) -> Result<bool, DatabaseError>;

    /// Delete every token of an owner, optionally sparing one id
    async fn delete_for(
        &self,
        provider: &str,
        auth_id: &str,
        except: Option<i64>,
    ) -> Result<u64, DatabaseError>;

    /// Newest first
    async fn list_for(
        &self,
        provider: &str,
        auth_id: &str,
        page: PageRequest,
    ) -> Result<Vec<DatabaseToken>, DatabaseError>;

    async fn count_for(&self, provider: &str, auth_id: &str) -> Result<u64, DatabaseError>;
}

pub struct PgTokenStore {
    pool: PgPool,
}

impl PgTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn find(&self, id: i64) -> Result<Option<DatabaseToken>, DatabaseError> {
        let token = sqlx::query_as::<_, DatabaseToken>(
            "SELECT id, hash, provider, auth_id, created_at, updated_at FROM database_tokens WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(token)
    }

    async fn create(&self, token: NewToken) -> Result<DatabaseToken, DatabaseError> {
        let row = sqlx::query_as::<_, DatabaseToken>(
            r#"
            INSERT INTO database_tokens (hash, provider, auth_id)
            VALUES ($1, $2, $3)
            RETURNING id, hash, provider, auth_id, created_at, updated_at
            "#,
        )
        .bind(&token.hash)
        .bind(&token.provider)
        .bind(&token.auth_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete(&self, id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM database_tokens WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_for(
        &self,
        provider: &str,
        auth_id: &str,
        except: Option<i64>,
    ) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            r#"
            DELETE FROM database_tokens
            WHERE provider = $1 AND auth_id = $2
            AND ($3::BIGINT IS NULL OR id <> $3)
            "#,
        )
        .bind(provider)
        .bind(auth_id)
        .bind(except)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn list_for(
        &self,
        provider: &str,
        auth_id: &str,
        page: PageRequest,
    ) -> Result<Vec<DatabaseToken>, DatabaseError> {
        let Some(offset) = page.offset() else {
            return Ok(Vec::new());
        };
        let rows = sqlx::query_as::<_, DatabaseToken>(
            r#"
            SELECT id, hash, provider, auth_id, created_at, updated_at
            FROM database_tokens
            WHERE provider = $1 AND auth_id = $2
            ORDER BY id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(provider)
        .bind(auth_id)
        .bind(page.limit())
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn count_for(&self, provider: &str, auth_id: &str) -> Result<u64, DatabaseError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM database_tokens WHERE provider = $1 AND auth_id = $2",
        )
        .bind(provider)
        .bind(auth_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0 as u64)
    }
}

/// In-process token table, used by tests and database-less runs
#[derive(Default, Clone)]
pub struct MemoryTokenStore {
    rows: Arc<RwLock<BTreeMap<i64, DatabaseToken>>>,
    last_id: Arc<AtomicI64>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn find(&self, id: i64) -> Result<Option<DatabaseToken>, DatabaseError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn create(&self, token: NewToken) -> Result<DatabaseToken, DatabaseError> {
        let mut rows = self.rows.write().await;
        // ids are never reused, like a sequence
        let id = self.last_id.fetch_add(1, Ordering::SeqCst) + 1;
        let now = Utc::now();
        let row = DatabaseToken {
            id,
            hash: token.hash,
            provider: token.provider,
            auth_id: token.auth_id,
            created_at: now,
            updated_at: now,
            bearer: None,
        };
        rows.insert(id, row.clone());
        Ok(row)
    }

    async fn delete(&self, id: i64) -> Result<bool, DatabaseError> {
        Ok(self.rows.write().await.remove(&id).is_some())
    }

    async fn delete_for(
        &self,
        provider: &str,
        auth_id: &str,
        except: Option<i64>,
    ) -> Result<u64, DatabaseError> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|id, row| {
            !(row.provider == provider && row.auth_id == auth_id && Some(*id) != except)
        });
        Ok((before - rows.len()) as u64)
    }

    async fn list_for(
        &self,
        provider: &str,
        auth_id: &str,
        page: PageRequest,
    ) -> Result<Vec<DatabaseToken>, DatabaseError> {
        let Some(offset) = page.offset().and_then(|offset| usize::try_from(offset).ok()) else {
            return Ok(Vec::new());
        };
        let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .rev()
            .filter(|row| row.provider == provider && row.auth_id == auth_id)
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count_for(&self, provider: &str, auth_id: &str) -> Result<u64, DatabaseError> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|row| row.provider == provider && row.auth_id == auth_id)
            .count() as u64)
    }
}
