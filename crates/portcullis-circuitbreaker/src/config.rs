use crate::{BreakerRegistry, CircuitState, SharedRejectionHook, SharedTransitionHook};
use std::sync::Arc;
use std::time::Duration;

/// Configuration shared by every breaker in a registry.
pub struct BreakerConfig {
    pub(crate) failure_threshold: u32,
    pub(crate) recovery_timeout: Duration,
    pub(crate) half_open_max_calls: u32,
    pub(crate) on_state_transition: Option<SharedTransitionHook>,
    pub(crate) on_call_rejected: Option<SharedRejectionHook>,
    pub(crate) name: String,
}

impl BreakerConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> BreakerConfigBuilder {
        BreakerConfigBuilder::new()
    }
}

/// Builder for [`BreakerConfig`].
pub struct BreakerConfigBuilder {
    failure_threshold: u32,
    recovery_timeout: Duration,
    half_open_max_calls: u32,
    on_state_transition: Option<SharedTransitionHook>,
    on_call_rejected: Option<SharedRejectionHook>,
    name: String,
}

impl Default for BreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BreakerConfigBuilder {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - failure_threshold: 5
    /// - recovery_timeout: 60 seconds
    /// - half_open_max_calls: 3
    /// - name: `"<unnamed>"`
    pub fn new() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            half_open_max_calls: 3,
            on_state_transition: None,
            on_call_rejected: None,
            name: "<unnamed>".to_string(),
        }
    }

    /// Sets the number of consecutive failures in closed state that trips
    /// the circuit.
    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Sets how long an open circuit waits after the last failure before a
    /// probe call is admitted.
    pub fn recovery_timeout(mut self, timeout: Duration) -> Self {
        self.recovery_timeout = timeout;
        self
    }

    /// Sets the probe budget of the half-open state: at most this many calls
    /// are admitted, and the same count of consecutive successes closes the
    /// circuit. Caps concurrent probes so a still-sick service cannot be
    /// stampeded.
    pub fn half_open_max_calls(mut self, max_calls: u32) -> Self {
        self.half_open_max_calls = max_calls;
        self
    }

    /// Sets the registry name (used in logs).
    pub fn name<N: Into<String>>(mut self, name: N) -> Self {
        self.name = name.into();
        self
    }

    /// Sets a callback for state transitions, keyed by service name.
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.on_state_transition = Some(Arc::new(f));
        self
    }

    /// Sets a callback for rejected calls, keyed by service name.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_call_rejected = Some(Arc::new(f));
        self
    }

    /// Builds the configuration and returns a [`BreakerRegistry`].
    pub fn build(self) -> BreakerRegistry {
        BreakerRegistry::new(BreakerConfig {
            failure_threshold: self.failure_threshold,
            recovery_timeout: self.recovery_timeout,
            half_open_max_calls: self.half_open_max_calls,
            on_state_transition: self.on_state_transition,
            on_call_rejected: self.on_call_rejected,
            name: self.name,
        })
    }
}
