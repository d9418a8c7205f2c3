use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::coerce;

/// Separator between the token id and the secret in a bearer string
pub const BEARER_DELIMITER: char = '|';

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BearerError {
    #[error("bearer token has no id delimiter")]
    MissingDelimiter,

    #[error("bearer token id is not numeric")]
    InvalidId,

    #[error("bearer token secret is empty")]
    EmptySecret,
}

/// A bearer string split into its row id and plaintext secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken<'a> {
    pub id: i64,
    pub secret: &'a str,
}

impl<'a> BearerToken<'a> {
    /// Split `"{id}|{secret}"` on the first delimiter.
    pub fn parse(raw: &'a str) -> Result<Self, BearerError> {
        let (id, secret) = raw
            .split_once(BEARER_DELIMITER)
            .ok_or(BearerError::MissingDelimiter)?;
        let id = coerce::parse_id(id, "token id").map_err(|_| BearerError::InvalidId)?;
        if secret.is_empty() {
            return Err(BearerError::EmptySecret);
        }
        Ok(Self { id, secret })
    }

    pub fn format(id: i64, secret: &str) -> String {
        format!("{}{}{}", id, BEARER_DELIMITER, secret)
    }
}

/// Random alphanumeric secret of the given length
pub fn generate_secret(length: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Hex-encoded SHA-256 digest of a secret
pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hash `secret` and compare it against a stored digest in constant time
pub fn verify_secret(secret: &str, stored_hash: &str) -> bool {
    constant_time_eq(hash_secret(secret).as_bytes(), stored_hash.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
