use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::{
    ActiveUserPolicy, LoginThrottle, MemoryTokenStore, MemoryUserProvider, PgTokenStore, PgUserProvider,
    TokenGuardConfig, UserProvider, UserProviders,
};
use crate::config::AppConfig;
use crate::database::{DatabaseError, DatabaseManager};
use crate::error::ApiError;
use crate::handlers;
use crate::middleware::{guard_middleware, require_auth};
use crate::validation::Catalog;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Absent when running on in-memory stores
    pub database: Option<Arc<DatabaseManager>>,
    pub guard: TokenGuardConfig,
    pub throttle: LoginThrottle,
    pub catalog: Arc<Catalog>,
}

impl AppState {
    pub fn new(config: AppConfig, guard: TokenGuardConfig, database: Option<Arc<DatabaseManager>>) -> Self {
        let throttle = LoginThrottle::new(
            config.auth.max_login_attempts,
            Duration::from_secs(config.auth.login_decay_secs),
        );
        Self {
            config: Arc::new(config),
            database,
            guard,
            throttle,
            catalog: Arc::new(Catalog::english()),
        }
    }

    /// PostgreSQL-backed stores; connects eagerly so start-up fails fast
    pub async fn postgres(config: AppConfig) -> Result<Self, DatabaseError> {
        let database = Arc::new(DatabaseManager::new(config.database.clone()));
        let pool = database.pool().await?;

        let providers = UserProviders::new().with(
            config.auth.provider.clone(),
            Arc::new(PgUserProvider::new(pool.clone())),
        );
        let guard = guard_config(&config, Arc::new(PgTokenStore::new(pool)), providers);
        Ok(Self::new(config, guard, Some(database)))
    }

    /// In-process stores, for tests and database-less runs
    pub fn in_memory(config: AppConfig, users: MemoryUserProvider, tokens: MemoryTokenStore) -> Self {
        let providers = UserProviders::new().with(config.auth.provider.clone(), Arc::new(users));
        let guard = guard_config(&config, Arc::new(tokens), providers);
        Self::new(config, guard, None)
    }

    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    /// The provider this guard issues tokens for
    pub fn user_provider(&self) -> Result<Arc<dyn UserProvider>, ApiError> {
        self.guard
            .providers
            .get(&self.guard.provider)
            .cloned()
            .ok_or_else(|| {
                tracing::error!("Guard provider '{}' is not registered", self.guard.provider);
                ApiError::internal_server_error("Server Error")
            })
    }
}

fn guard_config(
    config: &AppConfig,
    tokens: Arc<dyn crate::auth::TokenStore>,
    providers: UserProviders,
) -> TokenGuardConfig {
    TokenGuardConfig {
        name: config.auth.guard.clone(),
        provider: config.auth.provider.clone(),
        secret_length: config.auth.secret_length,
        cookies: config.cookie_settings(),
        tokens,
        providers,
        policy: Arc::new(ActiveUserPolicy),
    }
}

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        // Public
        .route("/health", get(handlers::health))
        .merge(auth_public_routes())
        // Protected
        .merge(auth_routes())
        // Global middleware
        .layer(from_fn_with_state(state.clone(), guard_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn auth_public_routes() -> Router<AppState> {
    use handlers::public::auth;

    Router::new().route("/auth/login", post(auth::login_post))
}

fn auth_routes() -> Router<AppState> {
    use handlers::protected::auth;

    Router::new()
        .route("/api/auth/logout", post(auth::logout_post))
        .route("/api/auth/logout-other-devices", post(auth::logout_other_devices_post))
        .route("/api/auth/password", put(auth::password_put))
        .route("/api/auth/user", get(auth::user_get))
        .route("/api/auth/tokens", get(auth::tokens_get))
        .route_layer(from_fn(require_auth))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter(|origin| !origin.is_empty() && origin.as_str() != "*")
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    // Credentialed requests cannot use wildcards
    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
}
