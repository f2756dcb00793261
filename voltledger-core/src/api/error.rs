// File: voltledger-core/src/api/error.rs
//
// Maps domain errors onto HTTP statuses and the JSON error envelope.

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use voltledger_common::FieldError;
use crate::api::AppState;
use crate::Error;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

/// Marks a 500 response so production can strip its detail.
#[derive(Debug, Clone, Copy)]
pub struct InternalFailure;

#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Status, machine code and caller-facing message for an error.
pub fn classify(err: &Error) -> (StatusCode, &'static str, String) {
    match err {
        Error::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", "Validation failed".into()),
        Error::Auth(m) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", m.clone()),
        Error::Forbidden(m) => (StatusCode::FORBIDDEN, "FORBIDDEN", m.clone()),
        Error::NotFound(m) => (StatusCode::NOT_FOUND, "NOT_FOUND", m.clone()),
        Error::Conflict(m) => (StatusCode::CONFLICT, "CONFLICT", m.clone()),
        Error::BadRequest(m) | Error::Parse(m) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", m.clone()),
        Error::Json(e) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", format!("Invalid JSON: {}", e)),
        Error::RateLimited { .. } => (
            StatusCode::TOO_MANY_REQUESTS,
            "RATE_LIMIT_EXCEEDED",
            "Too many requests, please try again later.".into(),
        ),
        Error::ServiceUnavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", m.clone()),
        Error::Timeout(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            "Upstream service timed out".into(),
        ),
        Error::Database(sqlx::Error::RowNotFound) => {
            (StatusCode::NOT_FOUND, "NOT_FOUND", "Record not found".into())
        }
        Error::Database(sqlx::Error::Database(db)) => match db.code().as_deref() {
            Some("23505") => (
                StatusCode::CONFLICT,
                "UNIQUE_CONSTRAINT_VIOLATION",
                "A record with this value already exists".into(),
            ),
            Some("23503") => (
                StatusCode::BAD_REQUEST,
                "FOREIGN_KEY_VIOLATION",
                "Related record not found".into(),
            ),
            Some("23514") => (
                StatusCode::BAD_REQUEST,
                "CHECK_VIOLATION",
                "A value is out of the allowed range".into(),
            ),
            Some("23502") => (
                StatusCode::BAD_REQUEST,
                "REQUIRED_RELATION_VIOLATION",
                "A required field is missing".into(),
            ),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", err.to_string()),
        },
        other => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", other.to_string()),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = classify(&self.0);
        let internal = status == StatusCode::INTERNAL_SERVER_ERROR;
        if internal {
            error!("request failed: {:?}", self.0);
        }
        let mut retry_after = None;
        let errors = match self.0 {
            Error::Validation(fields) => Some(fields),
            Error::RateLimited { retry_after_secs } => {
                retry_after = Some(retry_after_secs);
                None
            }
            _ => None,
        };
        let body = ErrorBody { success: false, error: message, code: Some(code), errors };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        if internal {
            response.extensions_mut().insert(InternalFailure);
        }
        response
    }
}

/// In production, replaces the body of any 500 with a generic message.
pub async fn mask_internal_errors(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    if state.config.environment.is_production() && response.extensions().get::<InternalFailure>().is_some() {
        let body = ErrorBody {
            success: false,
            error: "Internal server error".into(),
            code: Some("INTERNAL_ERROR"),
            errors: None,
        };
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
    }
    response
}
