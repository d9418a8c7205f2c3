use axum::{extract::Request, middleware::Next, response::Response};

use super::guard::AuthGuard;
use crate::database::User;
use crate::error::ApiError;

/// The user resolved by `require_auth`
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

/// Reject guests with 401 and expose the user to handlers
pub async fn require_auth(guard: AuthGuard, mut request: Request, next: Next) -> Result<Response, ApiError> {
    let user = guard.lock().await.user().await?;
    let Some(user) = user else {
        return Err(ApiError::unauthenticated());
    };

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}
