use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::coerce;
use crate::database::{DatabaseError, User};

/// Source of users for a guard
#[async_trait]
pub trait UserProvider: Send + Sync {
    /// Look up by the string form of the primary key stored on tokens
    async fn retrieve_by_id(&self, auth_id: &str) -> Result<Option<User>, DatabaseError>;

    async fn retrieve_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), DatabaseError>;
}

/// Named user providers. Tokens record which entry issued them.
#[derive(Clone, Default)]
pub struct UserProviders {
    providers: HashMap<String, Arc<dyn UserProvider>>,
}

impl UserProviders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, provider: Arc<dyn UserProvider>) -> Self {
        self.providers.insert(name.into(), provider);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn UserProvider>> {
        self.providers.get(name)
    }
}

/// Decides whether an otherwise valid user may be authenticated
pub trait LoginPolicy: Send + Sync {
    fn can_login(&self, user: &User) -> bool;
}

/// Denies deactivated accounts
#[derive(Debug, Default, Clone, Copy)]
pub struct ActiveUserPolicy;

impl LoginPolicy for ActiveUserPolicy {
    fn can_login(&self, user: &User) -> bool {
        user.is_active
    }
}

pub struct PgUserProvider {
    pool: PgPool,
}

impl PgUserProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a user with an already hashed password
    pub async fn create(&self, name: &str, email: &str, password_hash: &str) -> Result<User, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, password, is_active, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }
}

#[async_trait]
impl UserProvider for PgUserProvider {
    async fn retrieve_by_id(&self, auth_id: &str) -> Result<Option<User>, DatabaseError> {
        // A token pointing at a non-numeric id cannot match any row
        let Ok(id) = coerce::parse_id(auth_id, "auth_id") else {
            return Ok(None);
        };

        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, password, is_active, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn retrieve_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, password, is_active, created_at, updated_at FROM users WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE users SET password = $1, updated_at = NOW() WHERE id = $2")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("user {}", id)));
        }
        Ok(())
    }
}

/// In-process user table, used by tests and database-less runs
#[derive(Default, Clone)]
pub struct MemoryUserProvider {
    users: Arc<RwLock<HashMap<i64, User>>>,
    last_id: Arc<AtomicI64>,
}

impl MemoryUserProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, mut user: User) -> User {
        if user.id == 0 {
            user.id = self.last_id.fetch_add(1, Ordering::SeqCst) + 1;
        } else {
            self.last_id.fetch_max(user.id, Ordering::SeqCst);
        }
        self.users.write().await.insert(user.id, user.clone());
        user
    }

    pub async fn remove(&self, id: i64) -> Option<User> {
        self.users.write().await.remove(&id)
    }

    pub async fn set_active(&self, id: i64, active: bool) {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            user.is_active = active;
        }
    }
}

#[async_trait]
impl UserProvider for MemoryUserProvider {
    async fn retrieve_by_id(&self, auth_id: &str) -> Result<Option<User>, DatabaseError> {
        let Ok(id) = coerce::parse_id(auth_id, "auth_id") else {
            return Ok(None);
        };
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn retrieve_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), DatabaseError> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::NotFound(format!("user {}", id)))?;
        user.password = password_hash.to_string();
        user.updated_at = Utc::now();
        Ok(())
    }
}
