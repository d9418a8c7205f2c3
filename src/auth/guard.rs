//! Request-scoped authentication guard backed by the `database_tokens` table.
//!
//! A client presents `"{id}|{secret}"` either as an `Authorization: Bearer`
//! header or in the guard's cookie. The id selects a token row, the secret is
//! checked against the row's SHA-256 hash, and the row's provider resolves the
//! owning user. Every way this can fail (malformed bearer, unknown id, wrong
//! secret, deleted user, login policy) collapses into the same guest outcome.

use axum::http::{header, HeaderMap};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::provider::{LoginPolicy, UserProviders};
use super::store::TokenStore;
use super::token::{self, BearerToken};
use super::AuthError;
use crate::config::CookieSettings;
use crate::database::{DatabaseToken, NewToken, User};

/// Outcome of resolving the request's user, memoized for the request
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Resolution has not been attempted yet
    Unresolved,
    /// Attempted, and the request is anonymous
    Guest,
    /// `token` is absent when the user was set directly rather than through a bearer
    Authenticated {
        user: User,
        token: Option<DatabaseToken>,
    },
}

/// Everything a guard needs besides the request itself
#[derive(Clone)]
pub struct TokenGuardConfig {
    pub name: String,
    /// Provider recorded on tokens issued by `login`
    pub provider: String,
    pub secret_length: usize,
    pub cookies: CookieSettings,
    pub tokens: Arc<dyn TokenStore>,
    pub providers: UserProviders,
    pub policy: Arc<dyn LoginPolicy>,
}

impl TokenGuardConfig {
    pub fn cookie_name(&self) -> String {
        self.cookies.cookie_name(&self.name)
    }

    /// Build the guard for one request
    pub fn guard_for(&self, headers: &HeaderMap) -> DatabaseTokenGuard {
        let bearer = DatabaseTokenGuard::bearer_from(headers, &self.cookie_name());
        DatabaseTokenGuard::new(self.clone(), bearer)
    }
}

pub struct DatabaseTokenGuard {
    config: TokenGuardConfig,
    bearer: Option<String>,
    resolution: Resolution,
    queued_cookies: Vec<Cookie<'static>>,
}

impl DatabaseTokenGuard {
    pub fn new(config: TokenGuardConfig, bearer: Option<String>) -> Self {
        Self {
            config,
            bearer,
            resolution: Resolution::Unresolved,
            queued_cookies: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// `Authorization: Bearer` first, then the guard cookie
    pub fn bearer_from(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
        let from_header = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| {
                let (scheme, rest) = value.split_once(' ')?;
                scheme.eq_ignore_ascii_case("bearer").then(|| rest.trim())
            })
            .filter(|token| !token.is_empty());

        if let Some(token) = from_header {
            return Some(token.to_string());
        }

        CookieJar::from_headers(headers)
            .get(cookie_name)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
    }

    pub fn bearer(&self) -> Option<&str> {
        self.bearer.as_deref()
    }

    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    /// The authenticated user, resolving on first call.
    ///
    /// Storage failures are returned as errors and are not memoized.
    pub async fn user(&mut self) -> Result<Option<User>, AuthError> {
        if self.resolution == Resolution::Unresolved {
            self.resolution = self.resolve().await?;
        }
        Ok(match &self.resolution {
            Resolution::Authenticated { user, .. } => Some(user.clone()),
            _ => None,
        })
    }

    async fn resolve(&self) -> Result<Resolution, AuthError> {
        let Some(raw) = self.bearer.as_deref() else {
            return Ok(Resolution::Guest);
        };

        let bearer = match BearerToken::parse(raw) {
            Ok(bearer) => bearer,
            Err(e) => {
                debug!(guard = %self.config.name, "Rejected bearer: {}", e);
                return Ok(Resolution::Guest);
            }
        };

        let Some(token) = self.config.tokens.find(bearer.id).await? else {
            debug!(guard = %self.config.name, token_id = bearer.id, "Rejected bearer: unknown token");
            return Ok(Resolution::Guest);
        };

        if !token::verify_secret(bearer.secret, &token.hash) {
            debug!(guard = %self.config.name, token_id = token.id, "Rejected bearer: secret mismatch");
            return Ok(Resolution::Guest);
        }

        let Some(provider) = self.config.providers.get(&token.provider) else {
            warn!(guard = %self.config.name, token_id = token.id, "Token names unregistered provider '{}'", token.provider);
            return Ok(Resolution::Guest);
        };

        let Some(user) = provider.retrieve_by_id(&token.auth_id).await? else {
            debug!(guard = %self.config.name, token_id = token.id, "Rejected bearer: owner no longer exists");
            return Ok(Resolution::Guest);
        };

        if !self.config.policy.can_login(&user) {
            debug!(guard = %self.config.name, user_id = user.id, "Rejected bearer: login policy denied user");
            return Ok(Resolution::Guest);
        }

        debug!(guard = %self.config.name, user_id = user.id, token_id = token.id, "Authenticated bearer");
        Ok(Resolution::Authenticated { user, token: Some(token) })
    }

    /// Current token, if the user was authenticated through one
    pub fn token(&self) -> Option<&DatabaseToken> {
        match &self.resolution {
            Resolution::Authenticated { token, .. } => token.as_ref(),
            _ => None,
        }
    }

    pub async fn id(&mut self) -> Result<Option<i64>, AuthError> {
        Ok(self.user().await?.map(|user| user.id))
    }

    pub async fn check(&mut self) -> Result<bool, AuthError> {
        Ok(self.user().await?.is_some())
    }

    pub async fn guest(&mut self) -> Result<bool, AuthError> {
        Ok(!self.check().await?)
    }

    /// Whether a user is already held, without attempting resolution
    pub fn has_user(&self) -> bool {
        matches!(self.resolution, Resolution::Authenticated { .. })
    }

    pub fn set_user(&mut self, user: User) {
        self.resolution = Resolution::Authenticated { user, token: None };
    }

    /// Drop the memoized outcome so the next `user()` resolves again
    pub fn forget_user(&mut self) {
        self.resolution = Resolution::Unresolved;
    }

    /// Credential checks belong to the login handler, never to this guard.
    pub fn validate(&self, _credentials: &Map<String, Value>) -> bool {
        false
    }

    /// Issue a new token for `user` and queue its cookie.
    ///
    /// The returned token carries the plaintext bearer; it cannot be
    /// recovered afterwards.
    pub async fn login(&mut self, user: User) -> Result<DatabaseToken, AuthError> {
        if self.config.providers.get(&self.config.provider).is_none() {
            return Err(AuthError::UnknownProvider(self.config.provider.clone()));
        }

        let secret = token::generate_secret(self.config.secret_length);
        let mut created = self
            .config
            .tokens
            .create(NewToken {
                hash: token::hash_secret(&secret),
                provider: self.config.provider.clone(),
                auth_id: user.auth_identifier(),
            })
            .await?;

        let bearer = BearerToken::format(created.id, &secret);
        created.bearer = Some(bearer.clone());

        self.queued_cookies.push(self.token_cookie(bearer.clone()));
        self.bearer = Some(bearer);

        info!(guard = %self.config.name, user_id = user.id, token_id = created.id, "Issued database token");

        let mut stored = created.clone();
        stored.bearer = None;
        self.resolution = Resolution::Authenticated { user, token: Some(stored) };
        Ok(created)
    }

    /// Delete the current token, if any, and expire the cookie
    pub async fn logout(&mut self) -> Result<(), AuthError> {
        self.user().await?;

        if let Some(token) = self.token() {
            let id = token.id;
            self.config.tokens.delete(id).await?;
            info!(guard = %self.config.name, token_id = id, "Revoked database token");
        }

        self.queued_cookies.push(self.forget_cookie());
        self.bearer = None;
        self.resolution = Resolution::Guest;
        Ok(())
    }

    /// Delete every token of the current user except the one in use
    pub async fn logout_other_devices(&mut self) -> Result<u64, AuthError> {
        let user = self.user().await?.ok_or(AuthError::Unauthenticated)?;
        let current = self.token().map(|t| t.id);
        let deleted = self
            .config
            .tokens
            .delete_for(&self.config.provider, &user.auth_identifier(), current)
            .await?;
        info!(guard = %self.config.name, user_id = user.id, deleted, "Revoked tokens on other devices");
        Ok(deleted)
    }

    /// Delete every token of the current user, this one included
    pub async fn logout_all(&mut self) -> Result<u64, AuthError> {
        let user = self.user().await?.ok_or(AuthError::Unauthenticated)?;
        let deleted = self
            .config
            .tokens
            .delete_for(&self.config.provider, &user.auth_identifier(), None)
            .await?;
        info!(guard = %self.config.name, user_id = user.id, deleted, "Revoked all tokens");

        self.queued_cookies.push(self.forget_cookie());
        self.bearer = None;
        self.resolution = Resolution::Guest;
        Ok(deleted)
    }

    /// Cookies to attach to the response, in the order they were queued
    pub fn take_queued_cookies(&mut self) -> Vec<Cookie<'static>> {
        std::mem::take(&mut self.queued_cookies)
    }

    fn base_cookie(&self, value: String) -> Cookie<'static> {
        let same_site = if self.config.cookies.is_production() {
            SameSite::Lax
        } else {
            SameSite::None
        };
        let mut cookie = Cookie::new(self.config.cookie_name(), value);
        cookie.set_path("/");
        cookie.set_http_only(true);
        cookie.set_secure(!self.config.cookies.is_local());
        cookie.set_same_site(same_site);
        cookie
    }

    fn token_cookie(&self, bearer: String) -> Cookie<'static> {
        let mut cookie = self.base_cookie(bearer);
        cookie.make_permanent();
        cookie
    }

    fn forget_cookie(&self) -> Cookie<'static> {
        let mut cookie = self.base_cookie(String::new());
        cookie.make_removal();
        cookie
    }
}
