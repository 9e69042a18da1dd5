//! The closed error taxonomy and the standard response envelope.
//!
//! Every error that leaves the gateway is one of the [`ErrorCode`] variants,
//! rendered into the envelope below with the request's correlation id:
//!
//! ```json
//! { "success": false,
//!   "data": null,
//!   "error": { "code": "...", "message": "...", "details": null },
//!   "metadata": { "timestamp": "...", "correlation_id": "..." } }
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Standard error codes exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    RateLimited,
    InternalServerError,
    ServiceUnavailable,
    RequestTimeout,
}

impl ErrorCode {
    /// Maps an HTTP status onto its error code.
    ///
    /// Unlisted 4xx statuses collapse to `INVALID_REQUEST`, everything else
    /// to `INTERNAL_SERVER_ERROR`.
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            400 => ErrorCode::InvalidRequest,
            401 => ErrorCode::Unauthorized,
            403 => ErrorCode::Forbidden,
            404 => ErrorCode::NotFound,
            429 => ErrorCode::RateLimited,
            500 => ErrorCode::InternalServerError,
            502 | 503 => ErrorCode::ServiceUnavailable,
            504 => ErrorCode::RequestTimeout,
            s if (400..500).contains(&s) => ErrorCode::InvalidRequest,
            _ => ErrorCode::InternalServerError,
        }
    }
}

/// The `error` object inside the envelope.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<Value>,
}

/// The `metadata` object inside the envelope.
#[derive(Debug, Serialize)]
pub struct ResponseMetadata {
    pub timestamp: String,
    pub correlation_id: Option<String>,
}

/// The full error envelope.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub data: Option<Value>,
    pub error: ErrorDetail,
    pub metadata: ResponseMetadata,
}

/// Renders an envelope; pure aside from stamping the current time.
pub fn error_envelope(
    code: ErrorCode,
    message: impl Into<String>,
    details: Option<Value>,
    correlation_id: Option<String>,
) -> ErrorEnvelope {
    ErrorEnvelope {
        success: false,
        data: None,
        error: ErrorDetail {
            code,
            message: message.into(),
            details,
        },
        metadata: ResponseMetadata {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            correlation_id,
        },
    }
}

/// An error on its way out of the gateway.
#[derive(Debug, Error)]
#[error("{code:?}: {message}")]
pub struct GatewayError {
    pub status: StatusCode,
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<Value>,
    pub correlation_id: Option<String>,
}

impl GatewayError {
    /// Builds an error from a status; the code follows the mapping table.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            code: ErrorCode::from_status(status),
            message: message.into(),
            details: None,
            correlation_id: None,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Attaches a `details` object to the envelope.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Attaches the request's correlation id.
    pub fn with_correlation(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let envelope = error_envelope(self.code, self.message, self.details, self.correlation_id);
        (self.status, Json(envelope)).into_response()
    }
}
