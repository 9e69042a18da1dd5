//! portcullis — the sole HTTP ingress for a federation of services.
//!
//! The gateway authenticates untrusted client traffic, enforces multi-scope
//! rate limits, routes requests to downstream services by URL-path prefix,
//! and shields both callers and the fleet from cascading failures with
//! per-service circuit breakers and proactive health monitoring.
//!
//! The request pipeline, outermost to innermost: correlation → security
//! headers → request logging → authentication → rate limiting → routing →
//! forwarding. Every error leaves the gateway wrapped in the standard
//! response envelope with the request's correlation id.

pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod gateway;
pub mod headers;
pub mod middleware;
pub mod proxy;
pub mod registry;
pub mod routes;

pub use auth::{AuthError, Claims, TokenValidator};
pub use config::{BreakerSettings, GatewayConfig, RateLimitSettings};
pub use context::RequestContext;
pub use error::{ErrorCode, GatewayError};
pub use gateway::Gateway;
pub use registry::{ServiceDescriptor, ServiceRegistry};
