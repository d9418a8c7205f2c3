// handlers/protected/auth/user.rs - GET /api/auth/user handler

use axum::{extract::State, Extension};

use crate::api::{JsonApiResponse, UserResource};
use crate::app::AppState;
use crate::auth::PageRequest;
use crate::error::ApiError;
use crate::middleware::{AuthGuard, CurrentUser};

/// GET /api/auth/user - The current user with their tokens
///
/// Tokens are related under `tokens` and hoisted into `included`; each one
/// relates back to its `owner`, which is the primary resource and is not
/// repeated. The token used for this request has `meta.current = true`.
pub async fn user_get(
    State(state): State<AppState>,
    guard: AuthGuard,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<JsonApiResponse, ApiError> {
    let current = guard.lock().await.token().map(|token| token.id);

    let page = PageRequest::new(1, u64::from(state.config.api.max_page_size));
    let tokens = state
        .guard
        .tokens
        .list_for(&state.guard.provider, &user.auth_identifier(), page)
        .await?;

    Ok(JsonApiResponse::resource(&UserResource::new(user).with_tokens(tokens, current)))
}
