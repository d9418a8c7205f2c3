use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use once_cell::sync::Lazy;

use super::AuthError;

/// Verified against when the email matches no user, so unknown accounts cost
/// the same argon2 pass as wrong passwords.
static DUMMY_HASH: Lazy<String> = Lazy::new(|| {
    hash_password("guardrail-dummy-password")
        .unwrap_or_else(|_| "$argon2id$v=19$m=19456,t=2,p=1$dW5rbm93bg$dW5rbm93bg".to_string())
});

fn hasher() -> Result<Argon2<'static>, AuthError> {
    // Argon2id with moderate memory keeps interactive logins fast
    const MEMORY_COST_KIB: u32 = 19 * 1024;
    const ITERATIONS: u32 = 2;
    const PARALLELISM: u32 = 1;
    let params = Params::new(MEMORY_COST_KIB, ITERATIONS, PARALLELISM, None)
        .map_err(|e| AuthError::Hashing(e.to_string()))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a password into a PHC string for storage
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::Hashing(e.to_string()))?;
    Ok(hash.to_string())
}

/// Check a password against a stored PHC string. An unparseable stored hash never matches.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, AuthError> {
    let parsed = match PasswordHash::new(stored) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!("Stored password hash is not a PHC string: {}", e);
            return Ok(false);
        }
    };
    match hasher()?.verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Hashing(e.to_string())),
    }
}

/// Burn one verification for a login attempt with no matching user. Always false.
pub fn verify_dummy(password: &str) -> bool {
    if let Err(e) = verify_password(password, &DUMMY_HASH) {
        tracing::warn!(error = %e, "Dummy hash verification failed unexpectedly");
    }
    false
}
