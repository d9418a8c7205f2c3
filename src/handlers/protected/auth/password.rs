// handlers/protected/auth/password.rs - PUT /api/auth/password handler

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use serde_json::{json, Value};
use tracing::info;

use crate::api::{JsonApiResponse, UserResource};
use crate::app::AppState;
use crate::auth::password::{hash_password, verify_password};
use crate::coerce;
use crate::error::ApiError;
use crate::handlers::utils::{json_object, line};
use crate::middleware::{AuthGuard, CurrentUser};
use crate::validation::{Rules, Validator};

/// PUT /api/auth/password - Change the password and sign out everywhere
///
/// Input:
/// ```json
/// { "current_password": "...", "password": "...", "password_confirmation": "..." }
/// ```
///
/// Every token of the user is revoked, then a fresh one is issued to this
/// client and returned once in `meta.token`.
pub async fn password_put(
    State(state): State<AppState>,
    guard: AuthGuard,
    Extension(CurrentUser(mut user)): Extension<CurrentUser>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<JsonApiResponse, ApiError> {
    let input = json_object(body)?;

    let validator = Validator::new(
        [
            ("current_password", Rules::new().required().string()),
            ("password", Rules::new().required().string().min(8).max(255).confirmed()),
        ],
        state.catalog.as_ref(),
    )?;
    let validated = validator.validate(&input)?;
    let current = coerce::string(validated.get("current_password"), "current_password")?;
    let password = coerce::string(validated.get("password"), "password")?;

    if !verify_password(&current, &user.password)? {
        return Err(ApiError::field(
            "current_password",
            line(state.catalog.as_ref(), "auth.password", &[])?,
        ));
    }

    let hash = hash_password(&password)?;
    state.user_provider()?.update_password(user.id, &hash).await?;
    user.password = hash;

    let mut guard = guard.lock().await;
    let revoked = guard.logout_all().await?;
    let token = guard.login(user.clone()).await?;
    info!(user_id = user.id, revoked, "Password changed");

    Ok(JsonApiResponse::resource(&UserResource::new(user))
        .meta_entry("token", json!(token.bearer))
        .meta_entry("revoked", json!(revoked)))
}
