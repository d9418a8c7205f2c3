// handlers/public/auth/login.rs - POST /auth/login handler

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::HeaderMap,
    Json,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tracing::{info, warn};

use crate::api::{JsonApiResponse, UserResource};
use crate::app::AppState;
use crate::auth::password::{verify_dummy, verify_password};
use crate::auth::LoginThrottle;
use crate::coerce;
use crate::error::ApiError;
use crate::handlers::utils::{json_object, line};
use crate::middleware::AuthGuard;
use crate::validation::{Rules, Validator};

/// POST /auth/login - Verify credentials and issue a database token
///
/// Input:
/// ```json
/// { "email": "ada@example.com", "password": "correct horse battery staple" }
/// ```
///
/// Output (200, `application/vnd.api+json`), plus the guard cookie:
/// ```json
/// {
///   "data": { "id": "42", "slug": "42", "type": "users", "attributes": { "name": "Ada", ... } },
///   "meta": { "token": "7|Yp3..." }
/// }
/// ```
///
/// The bearer in `meta.token` is shown only here. Wrong credentials are a
/// 422 on `email`; repeated failures per email and client address are
/// throttled with 429.
pub async fn login_post(
    State(state): State<AppState>,
    guard: AuthGuard,
    connect: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<JsonApiResponse, ApiError> {
    let input = json_object(body)?;

    let validator = Validator::new(
        [
            ("email", Rules::new().required().string().email().max(255)),
            ("password", Rules::new().required().string()),
        ],
        state.catalog.as_ref(),
    )?;
    let validated = validator.validate(&input)?;
    let email = coerce::string(validated.get("email"), "email")?;
    let password = coerce::string(validated.get("password"), "password")?;

    let throttle_key = LoginThrottle::key(&email, &client_ip(&headers, connect.as_ref()));
    if state.throttle.too_many_attempts(&throttle_key).await {
        let seconds = state.throttle.available_in(&throttle_key).await;
        warn!(email = %email, retry_after = seconds, "Login throttled");
        let message = line(state.catalog.as_ref(), "auth.throttle", &[("seconds", seconds.to_string())])?;
        return Err(ApiError::too_many_requests(message, seconds));
    }

    let provider = state.user_provider()?;
    let candidate = provider.retrieve_by_email(&email).await?;

    let verified = match &candidate {
        Some(user) => verify_password(&password, &user.password)?,
        None => verify_dummy(&password),
    };

    let user = match candidate {
        Some(user) if verified && state.guard.policy.can_login(&user) => user,
        _ => {
            let attempts = state.throttle.hit(&throttle_key).await;
            info!(email = %email, attempts, "Login failed");
            return Err(ApiError::field("email", line(state.catalog.as_ref(), "auth.failed", &[])?));
        }
    };

    state.throttle.clear(&throttle_key).await;

    let token = guard.lock().await.login(user.clone()).await?;

    Ok(JsonApiResponse::resource(&UserResource::new(user)).meta_entry("token", json!(token.bearer)))
}

/// First `X-Forwarded-For` hop, else the peer address
fn client_ip(headers: &HeaderMap, connect: Option<&ConnectInfo<SocketAddr>>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .or_else(|| connect.map(|ConnectInfo(addr)| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}
