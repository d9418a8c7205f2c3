// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::auth::AuthError;
use crate::coerce::CoerceError;
use crate::database::DatabaseError;
use crate::validation::{TranslationError, ValidationErrors};

/// Field name to messages, as rendered under `errors`
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    InvalidJson(String),

    // 401 Unauthorized
    Unauthenticated(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 422 Unprocessable Entity
    UnprocessableEntity {
        message: String,
        errors: FieldErrors,
    },

    // 429 Too Many Requests
    TooManyRequests {
        message: String,
        retry_after: u64,
    },

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::Unauthenticated(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::UnprocessableEntity { .. } => 422,
            ApiError::TooManyRequests { .. } => 429,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Unauthenticated(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::UnprocessableEntity { message, .. } => message,
            ApiError::TooManyRequests { message, .. } => message,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Unauthenticated(_) => "UNAUTHENTICATED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::UnprocessableEntity { .. } => "VALIDATION_ERROR",
            ApiError::TooManyRequests { .. } => "TOO_MANY_REQUESTS",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// `{message, status, code, errors?}`
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "message": self.message(),
            "status": self.status_code(),
            "code": self.error_code(),
        });

        match self {
            ApiError::UnprocessableEntity { errors, .. } => {
                body["errors"] = json!(errors);
            }
            ApiError::TooManyRequests { retry_after, .. } => {
                body["retry_after"] = json!(retry_after);
            }
            _ => {}
        }

        body
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn unauthenticated() -> Self {
        ApiError::Unauthenticated("Unauthenticated.".to_string())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    /// A 422 carrying a single field failure
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut errors = FieldErrors::new();
        errors.insert(field.into(), vec![message.clone()]);
        ApiError::UnprocessableEntity { message, errors }
    }

    pub fn too_many_requests(message: impl Into<String>, retry_after: u64) -> Self {
        ApiError::TooManyRequests {
            message: message.into(),
            retry_after,
        }
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::UnprocessableEntity {
            message: errors.summary(),
            errors: errors.into_map(),
        }
    }
}

impl From<CoerceError> for ApiError {
    fn from(err: CoerceError) -> Self {
        ApiError::field(err.field().to_string(), err.to_string())
    }
}

impl From<TranslationError> for ApiError {
    fn from(err: TranslationError) -> Self {
        tracing::error!("Translation error: {}", err);
        ApiError::internal_server_error("Server Error")
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::ConfigMissing(var) => {
                tracing::error!("Database is not configured: {} is unset", var);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::Migration(e) => {
                tracing::error!("Migration error: {}", e);
                ApiError::service_unavailable("Service is being updated, please try again later")
            }
            DatabaseError::Sqlx(sqlx::Error::PoolTimedOut) | DatabaseError::Sqlx(sqlx::Error::Io(_)) => {
                tracing::error!("Database connection error");
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::Sqlx(e) => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", e);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Storage(e) => e.into(),
            AuthError::Unauthenticated => ApiError::unauthenticated(),
            AuthError::Hashing(msg) => {
                tracing::error!("Password hashing error: {}", msg);
                ApiError::internal_server_error("Server Error")
            }
            AuthError::UnknownProvider(name) => {
                tracing::error!("Guard references unregistered provider '{}'", name);
                ApiError::internal_server_error("Server Error")
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, Json(self.to_json())).into_response();
        if let ApiError::TooManyRequests { retry_after, .. } = &self {
            if let Ok(value) = retry_after.to_string().parse() {
                response.headers_mut().insert(axum::http::header::RETRY_AFTER, value);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_render_as_422_with_field_map() {
        let mut errors = ValidationErrors::new();
        errors.add("email", "The email field is required.");
        let body = ApiError::from(errors).to_json();
        assert_eq!(body["status"], 422);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["message"], "The email field is required.");
        assert_eq!(body["errors"]["email"][0], "The email field is required.");
    }

    #[test]
    fn storage_errors_hide_details() {
        let err = ApiError::from(AuthError::Storage(DatabaseError::Sqlx(sqlx::Error::RowNotFound)));
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.message(), "Database error occurred");
        assert!(err.to_json().get("errors").is_none());
    }

    #[test]
    fn throttle_carries_retry_after() {
        let response = ApiError::too_many_requests("slow down", 30).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[axum::http::header::RETRY_AFTER], "30");
    }

    #[test]
    fn missing_translation_is_a_server_error() {
        let err = ApiError::from(TranslationError::MissingKey("validation.email".into()));
        assert_eq!(err.status_code(), 500);
    }
}
