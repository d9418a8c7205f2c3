// handlers/protected/auth/tokens.rs - GET /api/auth/tokens handler

use axum::{
    extract::{Query, State},
    Extension,
};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::api::{JsonApiResponse, Pagination, TokenResource};
use crate::app::AppState;
use crate::auth::PageRequest;
use crate::coerce::{self, CoerceError};
use crate::error::ApiError;
use crate::middleware::{AuthGuard, CurrentUser};
use crate::validation::{Rules, Validator};

/// GET /api/auth/tokens?page=&per_page=&simple= - Paginated list of the user's tokens
///
/// Newest first. `meta` carries `page`, `per_page`, `next` and `prev`, plus
/// `count` and `last_page` unless `simple` is set. Simple pages skip the
/// count query and look one row ahead instead.
pub async fn tokens_get(
    State(state): State<AppState>,
    guard: AuthGuard,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<JsonApiResponse, ApiError> {
    let input: Map<String, Value> = params
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect();

    let max = u64::from(state.config.api.max_page_size);
    let validator = Validator::new(
        [
            ("page", Rules::new().integer().min(1)),
            ("per_page", Rules::new().integer().min(1).max(max)),
            ("simple", Rules::new().boolean()),
        ],
        state.catalog.as_ref(),
    )?;
    let validated = validator.validate(&input)?;

    let page = match validated.get("page") {
        Some(value) => coerce::positive_integer(Some(value), "page")?,
        None => 1,
    };
    let per_page = match validated.get("per_page") {
        Some(value) => coerce::positive_integer(Some(value), "per_page")?,
        None => u64::from(state.config.api.default_page_size),
    };
    let simple = match validated.get("simple") {
        Some(value) => coerce::boolean(Some(value), "simple")?,
        None => false,
    };

    let request = PageRequest::new(page, per_page);
    if request.offset().is_none() {
        return Err(CoerceError::OutOfRange { field: "page".to_string() }.into());
    }

    let auth_id = user.auth_identifier();
    let provider = &state.guard.provider;
    let (rows, pagination) = if simple {
        let mut rows = state
            .guard
            .tokens
            .list_for(provider, &auth_id, request.look_ahead())
            .await?;
        let has_more = rows.len() as u64 > per_page;
        rows.truncate(per_page as usize);
        (rows, Pagination::Simple { page, per_page, has_more })
    } else {
        let total = state.guard.tokens.count_for(provider, &auth_id).await?;
        let rows = state
            .guard
            .tokens
            .list_for(provider, &auth_id, request)
            .await?;
        (rows, Pagination::LengthAware { page, per_page, total })
    };

    let current = guard.lock().await.token().map(|token| token.id);
    let resources: Vec<TokenResource> = rows
        .into_iter()
        .map(|token| {
            let is_current = Some(token.id) == current;
            TokenResource::new(token).current(is_current)
        })
        .collect();

    Ok(JsonApiResponse::paginated(&resources, pagination))
}
