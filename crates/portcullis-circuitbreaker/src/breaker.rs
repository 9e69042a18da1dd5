use crate::config::BreakerConfig;
use std::time::{Instant, SystemTime};

/// Represents the state of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CircuitState {
    /// Normal operation, calls are admitted.
    Closed,
    /// The circuit is tripped, calls are rejected.
    Open,
    /// A bounded number of probe calls are admitted to test recovery.
    HalfOpen,
}

/// Point-in-time view of one breaker, for introspection.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakerSnapshot {
    /// Current state.
    pub state: CircuitState,
    /// Consecutive failures observed in closed state.
    pub failure_count: u32,
    /// Probe successes observed in half-open state.
    pub success_count: u32,
    /// When the last failure was recorded, if any.
    pub last_failure_at: Option<SystemTime>,
}

/// State machine for a single downstream service.
///
/// All methods run under the registry lock; nothing here suspends.
pub(crate) struct Breaker {
    service: String,
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    half_open_inflight: u32,
    // Monotonic instant drives the recovery clock, wall time is reported.
    last_failure: Option<(Instant, SystemTime)>,
}

impl Breaker {
    pub(crate) fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            half_open_inflight: 0,
            last_failure: None,
        }
    }

    pub(crate) fn state(&self) -> CircuitState {
        self.state
    }

    pub(crate) fn snapshot(&self) -> BreakerSnapshot {
        BreakerSnapshot {
            state: self.state,
            failure_count: self.failure_count,
            success_count: self.success_count,
            last_failure_at: self.last_failure.map(|(_, wall)| wall),
        }
    }

    /// Decides whether a call may go downstream right now.
    pub(crate) fn admit(&mut self, config: &BreakerConfig) -> bool {
        match self.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let recovered = self
                    .last_failure
                    .map_or(true, |(at, _)| at.elapsed() >= config.recovery_timeout);
                if recovered {
                    self.transition_to(CircuitState::HalfOpen, config);
                    self.half_open_inflight = 1;
                    true
                } else {
                    self.notify_rejected(config);
                    false
                }
            }
            CircuitState::HalfOpen => {
                if self.half_open_inflight < config.half_open_max_calls {
                    self.half_open_inflight += 1;
                    true
                } else {
                    self.notify_rejected(config);
                    false
                }
            }
        }
    }

    pub(crate) fn record_success(&mut self, config: &BreakerConfig) {
        match self.state {
            CircuitState::HalfOpen => {
                self.success_count += 1;
                if self.success_count >= config.half_open_max_calls {
                    self.transition_to(CircuitState::Closed, config);
                }
            }
            CircuitState::Closed => {
                // A success wipes the failure streak; repeating it is a no-op.
                if self.failure_count > 0 {
                    self.failure_count = 0;
                }
            }
            CircuitState::Open => {}
        }
    }

    pub(crate) fn record_failure(&mut self, config: &BreakerConfig) {
        self.last_failure = Some((Instant::now(), SystemTime::now()));

        match self.state {
            CircuitState::HalfOpen => {
                self.transition_to(CircuitState::Open, config);
            }
            CircuitState::Closed => {
                self.failure_count += 1;
                if self.failure_count >= config.failure_threshold {
                    self.transition_to(CircuitState::Open, config);
                }
            }
            CircuitState::Open => {}
        }
    }

    fn transition_to(&mut self, state: CircuitState, config: &BreakerConfig) {
        if self.state == state {
            return;
        }

        let from_state = self.state;

        #[cfg(feature = "tracing")]
        tracing::info!(
            service = %self.service,
            from = ?from_state,
            to = ?state,
            "circuit state transition"
        );

        if let Some(hook) = &config.on_state_transition {
            hook(&self.service, from_state, state);
        }

        self.state = state;
        match state {
            CircuitState::Closed => {
                self.failure_count = 0;
                self.success_count = 0;
                self.half_open_inflight = 0;
            }
            CircuitState::Open => {
                self.success_count = 0;
                self.half_open_inflight = 0;
            }
            CircuitState::HalfOpen => {
                self.success_count = 0;
                self.half_open_inflight = 0;
            }
        }
    }

    fn notify_rejected(&self, config: &BreakerConfig) {
        if let Some(hook) = &config.on_call_rejected {
            hook(&self.service);
        }
    }
}
