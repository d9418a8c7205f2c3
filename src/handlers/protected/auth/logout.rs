// handlers/protected/auth/logout.rs - Token revocation for the current user

use axum::{http::StatusCode, Extension};
use serde_json::json;

use crate::api::{JsonApiResponse, UserResource};
use crate::error::ApiError;
use crate::middleware::{AuthGuard, CurrentUser};

/// POST /api/auth/logout - Revoke the token used for this request
///
/// Responds 204 and expires the guard cookie.
pub async fn logout_post(guard: AuthGuard) -> Result<StatusCode, ApiError> {
    guard.lock().await.logout().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/auth/logout-other-devices - Revoke every other token of the user
///
/// ```json
/// { "data": { "id": "42", "type": "users", ... }, "meta": { "revoked": 3 } }
/// ```
pub async fn logout_other_devices_post(
    guard: AuthGuard,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<JsonApiResponse, ApiError> {
    let revoked = guard.lock().await.logout_other_devices().await?;
    Ok(JsonApiResponse::resource(&UserResource::new(user)).meta_entry("revoked", json!(revoked)))
}
