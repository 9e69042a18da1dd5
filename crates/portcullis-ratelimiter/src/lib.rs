//! Multi-scope fixed-window rate limiting.
//!
//! The limiter keeps one counter cell per scope key (`user:<id>`,
//! `tenant:<id>`, `ip:<addr>`) inside a non-sliding 60 second window. All
//! requests that land inside a window share the cell; the first request after
//! the window elapses installs a fresh one.
//!
//! ## Basic usage
//!
//! ```rust
//! use portcullis_ratelimiter::RateLimiterConfig;
//!
//! let limiter = RateLimiterConfig::builder()
//!     .per_user_limit(1000)
//!     .per_tenant_limit(100_000)
//!     .per_ip_limit(10_000)
//!     .name("gateway")
//!     .build();
//!
//! let decision = limiter.check_all(Some("u-1"), Some("t-1"), Some("10.0.0.9"));
//! assert!(decision.allowed);
//! ```
//!
//! ## Scope evaluation order
//!
//! [`RateLimiter::check_all`] evaluates IP, then user, then tenant. The first
//! scope that denies short-circuits the rest: later scopes are neither
//! consulted nor incremented, and the denying scope is reported as
//! [`Decision::violating_scope`]. When every scope allows, `remaining` is the
//! minimum across the scopes that were checked.
//!
//! ## Denials do not consume budget
//!
//! A denied request leaves its cell untouched, so a saturated window keeps
//! reporting the same `reset_at` no matter how many times it is hit.
//!
//! ## Feature flags
//! - `tracing`: log denials and sweep results via the `tracing` crate

use std::sync::Arc;

mod config;
mod limiter;

pub use config::{RateLimiterConfig, RateLimiterConfigBuilder};
pub use limiter::{Decision, RateLimiter, Scope, ScopeUsage};

pub(crate) type LimitExceededHook = dyn Fn(&str, u64) + Send + Sync;
pub(crate) type SharedLimitExceededHook = Arc<LimitExceededHook>;
