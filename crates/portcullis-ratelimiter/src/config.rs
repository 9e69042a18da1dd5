use crate::{RateLimiter, SharedLimitExceededHook};
use std::sync::Arc;
use std::time::Duration;

/// Configuration for the multi-scope rate limiter.
pub struct RateLimiterConfig {
    pub(crate) per_user_limit: u64,
    pub(crate) per_tenant_limit: u64,
    pub(crate) per_ip_limit: u64,
    pub(crate) window: Duration,
    pub(crate) on_limit_exceeded: Option<SharedLimitExceededHook>,
    pub(crate) name: String,
}

impl RateLimiterConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> RateLimiterConfigBuilder {
        RateLimiterConfigBuilder::new()
    }
}

/// Builder for [`RateLimiterConfig`].
pub struct RateLimiterConfigBuilder {
    per_user_limit: u64,
    per_tenant_limit: u64,
    per_ip_limit: u64,
    window: Duration,
    on_limit_exceeded: Option<SharedLimitExceededHook>,
    name: String,
}

impl Default for RateLimiterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiterConfigBuilder {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - per_user_limit: 1000
    /// - per_tenant_limit: 100000
    /// - per_ip_limit: 10000
    /// - window: 60 seconds
    /// - name: `"<unnamed>"`
    pub fn new() -> Self {
        Self {
            per_user_limit: 1000,
            per_tenant_limit: 100_000,
            per_ip_limit: 10_000,
            window: Duration::from_secs(60),
            on_limit_exceeded: None,
            name: "<unnamed>".to_string(),
        }
    }

    /// Sets the maximum number of requests a single user may issue per window.
    pub fn per_user_limit(mut self, limit: u64) -> Self {
        self.per_user_limit = limit;
        self
    }

    /// Sets the maximum number of requests a single tenant may issue per window.
    pub fn per_tenant_limit(mut self, limit: u64) -> Self {
        self.per_tenant_limit = limit;
        self
    }

    /// Sets the maximum number of requests a single client address may issue
    /// per window. The IP scope is checked first, so it is the line of defense
    /// against unauthenticated floods.
    pub fn per_ip_limit(mut self, limit: u64) -> Self {
        self.per_ip_limit = limit;
        self
    }

    /// Sets the duration of the fixed window.
    ///
    /// All counter cells share this duration; a request arriving after
    /// `window_start + window` installs a fresh cell.
    pub fn window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Sets the name for this limiter instance (used in logs).
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Sets a callback invoked when a request is denied.
    ///
    /// The callback receives the saturated scope key (e.g. `"user:u-1"`) and
    /// the limit that was hit.
    pub fn on_limit_exceeded<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, u64) + Send + Sync + 'static,
    {
        self.on_limit_exceeded = Some(Arc::new(f));
        self
    }

    /// Builds the rate limiter.
    pub fn build(self) -> RateLimiter {
        RateLimiter::new(RateLimiterConfig {
            per_user_limit: self.per_user_limit,
            per_tenant_limit: self.per_tenant_limit,
            per_ip_limit: self.per_ip_limit,
            window: self.window,
            on_limit_exceeded: self.on_limit_exceeded,
            name: self.name,
        })
    }
}
