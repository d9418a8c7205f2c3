pub mod guard;
pub mod password;
pub mod provider;
pub mod store;
pub mod throttle;
pub mod token;

use thiserror::Error;

use crate::database::DatabaseError;

pub use guard::{DatabaseTokenGuard, Resolution, TokenGuardConfig};
pub use provider::{ActiveUserPolicy, LoginPolicy, MemoryUserProvider, PgUserProvider, UserProvider, UserProviders};
pub use store::{MemoryTokenStore, PageRequest, PgTokenStore, TokenStore};
pub use throttle::LoginThrottle;
pub use token::{BearerError, BearerToken};

/// Failures of the authentication machinery itself.
///
/// A request that simply fails to authenticate is not an error: the guard
/// resolves it to a guest. These variants cover broken storage, hashing and
/// configuration.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token storage failed: {0}")]
    Storage(#[from] DatabaseError),

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("guard provider '{0}' is not registered")]
    UnknownProvider(String),

    #[error("no authenticated user")]
    Unauthenticated,
}
