use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// A row of `database_tokens`.
///
/// `bearer` is only populated on the instance returned from token creation;
/// rows read back from storage never carry it since only the hash is kept.
#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
pub struct DatabaseToken {
    pub id: i64,
    #[serde(skip_serializing)]
    pub hash: String,
    pub provider: String,
    pub auth_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(skip_serializing)]
    pub bearer: Option<String>,
}

/// Values needed to insert a token row
#[derive(Debug, Clone)]
pub struct NewToken {
    pub hash: String,
    pub provider: String,
    pub auth_id: String,
}
