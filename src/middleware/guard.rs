use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use crate::app::AppState;
use crate::auth::DatabaseTokenGuard;
use crate::error::ApiError;

/// The request's guard, shared between middleware and handlers
#[derive(Clone)]
pub struct AuthGuard(Arc<Mutex<DatabaseTokenGuard>>);

impl AuthGuard {
    pub fn new(guard: DatabaseTokenGuard) -> Self {
        Self(Arc::new(Mutex::new(guard)))
    }

    pub async fn lock(&self) -> MutexGuard<'_, DatabaseTokenGuard> {
        self.0.lock().await
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthGuard
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<AuthGuard>().cloned().ok_or_else(|| {
            tracing::error!("AuthGuard requested on a route without guard_middleware");
            ApiError::internal_server_error("Server Error")
        })
    }
}

/// Build a guard for the request, then flush its queued cookies onto the response
pub async fn guard_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let guard = AuthGuard::new(state.guard.guard_for(request.headers()));
    request.extensions_mut().insert(guard.clone());

    let mut response = next.run(request).await;

    let cookies = guard.lock().await.take_queued_cookies();
    for cookie in cookies {
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::warn!("Dropping unencodable cookie {}: {}", cookie.name(), e),
        }
    }

    response
}
