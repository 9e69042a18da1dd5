//! Header names the gateway consumes and emits.

use axum::http::HeaderName;

/// Joins logs and downstream traces for one request.
pub static X_CORRELATION_ID: HeaderName = HeaderName::from_static("x-correlation-id");

/// Authenticated subject, forwarded to downstreams.
pub static X_USER_ID: HeaderName = HeaderName::from_static("x-user-id");

/// Authenticated tenant, forwarded to downstreams.
pub static X_TENANT_ID: HeaderName = HeaderName::from_static("x-tenant-id");

/// Permits left in the tightest rate-limit window.
pub static X_RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-rate-limit-remaining");

/// When the tightest rate-limit window resets (ISO-8601 UTC).
pub static X_RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("x-rate-limit-reset");
