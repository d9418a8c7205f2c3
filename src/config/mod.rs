use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub app: AppSection,
    pub auth: AuthConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Local,
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn from_name(name: &str) -> Self {
        match name {
            "production" | "prod" => Environment::Production,
            "staging" | "stage" => Environment::Staging,
            "development" | "dev" => Environment::Development,
            _ => Environment::Local,
        }
    }

    /// Name used in cookie names and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSection {
    pub name: String,
}

impl AppSection {
    /// Cookie-safe slug of the application name: lowercase, runs of
    /// non-alphanumerics collapsed to `_`.
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub guard: String,
    pub provider: String,
    pub secret_length: usize,
    pub max_login_attempts: u32,
    pub login_decay_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub default_page_size: u32,
    pub max_page_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = Environment::from_name(env::var("APP_ENV").as_deref().unwrap_or("local"));

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
            Environment::Local => Self::local(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("APP_NAME") {
            self.app.name = v;
        }

        // Auth overrides
        if let Ok(v) = env::var("AUTH_GUARD") {
            self.auth.guard = v;
        }
        if let Ok(v) = env::var("AUTH_PROVIDER") {
            self.auth.provider = v;
        }
        if let Ok(v) = env::var("AUTH_SECRET_LENGTH") {
            self.auth.secret_length = v.parse().unwrap_or(self.auth.secret_length);
        }
        if let Ok(v) = env::var("AUTH_MAX_LOGIN_ATTEMPTS") {
            self.auth.max_login_attempts = v.parse().unwrap_or(self.auth.max_login_attempts);
        }
        if let Ok(v) = env::var("AUTH_LOGIN_DECAY_SECS") {
            self.auth.login_decay_secs = v.parse().unwrap_or(self.auth.login_decay_secs);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // API overrides
        if let Some(port) = env::var("APP_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.api.port = port;
        }
        if let Ok(v) = env::var("API_DEFAULT_PAGE_SIZE") {
            self.api.default_page_size = v.parse().unwrap_or(self.api.default_page_size);
        }
        if let Ok(v) = env::var("API_MAX_PAGE_SIZE") {
            self.api.max_page_size = v.parse().unwrap_or(self.api.max_page_size);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        self
    }

    pub fn local() -> Self {
        Self {
            environment: Environment::Local,
            app: AppSection { name: "Guardrail".to_string() },
            auth: AuthConfig {
                guard: "api".to_string(),
                provider: "users".to_string(),
                secret_length: 100,
                max_login_attempts: 50,
                login_decay_secs: 60,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 5,
                connection_timeout: 30,
            },
            api: ApiConfig {
                port: 3000,
                default_page_size: 15,
                max_page_size: 100,
            },
            security: SecurityConfig {
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
        }
    }

    fn development() -> Self {
        let mut config = Self::local();
        config.environment = Environment::Development;
        config.auth.max_login_attempts = 10;
        config.database.max_connections = 10;
        config
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            app: AppSection { name: "Guardrail".to_string() },
            auth: AuthConfig {
                guard: "api".to_string(),
                provider: "users".to_string(),
                secret_length: 100,
                max_login_attempts: 5,
                login_decay_secs: 60,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            api: ApiConfig {
                port: 3000,
                default_page_size: 15,
                max_page_size: 100,
            },
            security: SecurityConfig {
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            app: AppSection { name: "Guardrail".to_string() },
            auth: AuthConfig {
                guard: "api".to_string(),
                provider: "users".to_string(),
                secret_length: 100,
                max_login_attempts: 5,
                login_decay_secs: 60,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            api: ApiConfig {
                port: 3000,
                default_page_size: 15,
                max_page_size: 50,
            },
            security: SecurityConfig {
                cors_origins: vec!["https://app.example.com".to_string()],
            },
        }
    }

    /// Cookie settings for a guard, derived from the app and environment sections
    pub fn cookie_settings(&self) -> CookieSettings {
        CookieSettings {
            app_slug: self.app.slug(),
            environment: self.environment,
        }
    }
}

/// Inputs for naming and flagging the guard's token cookie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSettings {
    pub app_slug: String,
    pub environment: Environment,
}

impl CookieSettings {
    pub fn is_local(&self) -> bool {
        self.environment == Environment::Local
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// `[__Host-]{app}_{env}_database_token_{guard}`
    pub fn cookie_name(&self, guard: &str) -> String {
        let prefix = if self.is_local() { "" } else { "__Host-" };
        format!(
            "{}{}_{}_database_token_{}",
            prefix,
            self.app_slug,
            self.environment.as_str(),
            guard
        )
    }
}

pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('_');
            }
            pending_separator = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }
    slug
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
