//! API error taxonomy and the mapping onto HTTP responses.
//!
//! Every failure that can reach a client is one of the [`ApiError`] variants.
//! [`ApiError::to_response`] is the only place errors become bytes on the
//! wire, and it is total over the enum.

use serde::Serialize;
use thiserror::Error;

use crate::http::parser::ParseError;
use crate::http::response::{Response, ResponseBuilder, StatusCode};
use crate::store::StoreError;

/// Result type for route handlers and dispatch.
pub type ApiResult<T> = Result<T, ApiError>;

/// Message shown for every internal failure. Collaborator detail never goes here.
pub const INTERNAL_MESSAGE: &str = "An internal error occurred";

/// Errors surfaced to API clients.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Malformed request line, headers, or body.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing, unknown or expired session, or bad credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// No route, or the addressed resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),

    /// Collaborator or storage failure. The payload is diagnostic detail
    /// that is only exposed in dev mode.
    #[error("internal error: {0}")]
    Internal(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'static str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a str>,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(detail: impl std::fmt::Display) -> Self {
        Self::Internal(detail.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BadRequest,
            ApiError::Unauthorized(_) => StatusCode::Unauthorized,
            ApiError::Forbidden(_) => StatusCode::Forbidden,
            ApiError::NotFound(_) => StatusCode::NotFound,
            ApiError::MethodNotAllowed(_) => StatusCode::MethodNotAllowed,
            ApiError::Internal(_) => StatusCode::InternalServerError,
            ApiError::NotImplemented(_) => StatusCode::NotImplemented,
            ApiError::Unavailable(_) => StatusCode::ServiceUnavailable,
        }
    }

    /// Client-facing message. Internal failures get a fixed generic text.
    pub fn message(&self) -> &str {
        match self {
            ApiError::Internal(_) => INTERNAL_MESSAGE,
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::MethodNotAllowed(msg)
            | ApiError::NotImplemented(msg)
            | ApiError::Unavailable(msg) => msg,
        }
    }

    fn details(&self) -> Option<&str> {
        match self {
            ApiError::Internal(detail) => Some(detail),
            _ => None,
        }
    }

    /// Maps the error to a JSON response:
    /// `{"error": <reason phrase>, "message": <message>, "details": <dev only>}`.
    pub fn to_response(&self, dev_mode: bool) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: status.reason_phrase(),
            message: self.message(),
            details: if dev_mode { self.details() } else { None },
        };

        match ResponseBuilder::new(status).json(&body) {
            Ok(builder) => builder.build(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize error body");
                ResponseBuilder::new(status)
                    .header("Content-Type", "application/json")
                    .body(format!(
                        "{{\"error\":\"{}\",\"message\":\"{}\"}}",
                        status.reason_phrase(),
                        INTERNAL_MESSAGE
                    ))
                    .build()
            }
        }
    }

    pub fn into_response(self, dev_mode: bool) -> Response {
        self.to_response(dev_mode)
    }
}

impl From<ParseError> for ApiError {
    fn from(e: ParseError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => ApiError::NotFound(format!("{what} not found")),
            StoreError::AlreadyExists(what) => ApiError::BadRequest(format!("{what} already exists")),
            StoreError::Invalid(msg) => ApiError::BadRequest(msg),
            StoreError::Backend(detail) => ApiError::Internal(detail),
        }
    }
}

/// Serialization of a handler's own response body failed.
impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Internal(format!("response serialization failed: {e}"))
    }
}
