#![allow(dead_code)]

use std::net::SocketAddr;

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::{json, Value};

use guardrail_api::auth::password::hash_password;
use guardrail_api::auth::{MemoryTokenStore, MemoryUserProvider};
use guardrail_api::config::AppConfig;
use guardrail_api::database::User;
use guardrail_api::{router, AppState};

pub const PASSWORD: &str = "correct horse battery";

/// The router served in-process on an ephemeral port, over memory stores
pub struct TestServer {
    pub base_url: String,
    pub users: MemoryUserProvider,
    pub tokens: MemoryTokenStore,
    pub config: AppConfig,
    pub client: reqwest::Client,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        Self::start_with(AppConfig::local()).await
    }

    pub async fn start_with(config: AppConfig) -> Result<Self> {
        let users = MemoryUserProvider::new();
        let tokens = MemoryTokenStore::new();
        let state = AppState::in_memory(config.clone(), users.clone(), tokens.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind test listener")?;
        let addr = listener.local_addr()?;
        let app = router(state).into_make_service_with_connect_info::<SocketAddr>();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            base_url: format!("http://{}", addr),
            users,
            tokens,
            config,
            client: reqwest::Client::new(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn cookie_name(&self) -> String {
        self.config.cookie_settings().cookie_name(&self.config.auth.guard)
    }

    /// Seed an active user whose password is [`PASSWORD`]
    pub async fn user(&self, email: &str) -> Result<User> {
        let now = Utc::now();
        let user = User {
            id: 0,
            name: email.split('@').next().unwrap_or(email).to_string(),
            email: email.to_string(),
            password: hash_password(PASSWORD)?,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        Ok(self.users.insert(user).await)
    }

    pub async fn login_response(&self, email: &str, password: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?)
    }

    /// Log in and return the bearer from `meta.token`
    pub async fn login(&self, email: &str) -> Result<String> {
        let res = self.login_response(email, PASSWORD).await?;
        anyhow::ensure!(res.status().is_success(), "login failed: {}", res.status());
        let body: Value = res.json().await?;
        body["meta"]["token"]
            .as_str()
            .map(str::to_string)
            .context("login response carried no token")
    }

    pub async fn get_with_bearer(&self, path: &str, bearer: &str) -> Result<reqwest::Response> {
        Ok(self.client.get(self.url(path)).bearer_auth(bearer).send().await?)
    }
}
