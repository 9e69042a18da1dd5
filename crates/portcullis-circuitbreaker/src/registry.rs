use crate::breaker::Breaker;
use crate::config::BreakerConfig;
use crate::{BreakerSnapshot, CircuitState};
use std::collections::HashMap;
use std::sync::Mutex;

/// Breakers for every downstream service, created lazily by name.
///
/// All operations lock the registry map for the duration of the state-machine
/// step; the steps are pure CPU work, so the lock is never held across a
/// suspension point and the half-open admission cap cannot be racily
/// exceeded.
pub struct BreakerRegistry {
    config: BreakerConfig,
    breakers: Mutex<HashMap<String, Breaker>>,
}

impl BreakerRegistry {
    pub(crate) fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            breakers: Mutex::new(HashMap::new()),
        }
    }

    /// Returns whether a call to `service` may go downstream right now.
    ///
    /// In open state this is also the transition point to half-open once the
    /// recovery timeout has elapsed.
    pub fn admit(&self, service: &str) -> bool {
        self.with_breaker(service, |breaker, config| breaker.admit(config))
    }

    /// Records a successful call to `service`.
    pub fn record_success(&self, service: &str) {
        self.with_breaker(service, |breaker, config| breaker.record_success(config));
    }

    /// Records a failed call to `service`.
    pub fn record_failure(&self, service: &str) {
        self.with_breaker(service, |breaker, config| breaker.record_failure(config));
    }

    /// Current state of the breaker for `service`, if one exists.
    pub fn state(&self, service: &str) -> Option<CircuitState> {
        let breakers = self.breakers.lock().unwrap();
        breakers.get(service).map(|b| b.state())
    }

    /// Snapshots every breaker the registry has created so far.
    pub fn snapshot(&self) -> HashMap<String, BreakerSnapshot> {
        let breakers = self.breakers.lock().unwrap();
        breakers
            .iter()
            .map(|(name, breaker)| (name.clone(), breaker.snapshot()))
            .collect()
    }

    fn with_breaker<R>(&self, service: &str, f: impl FnOnce(&mut Breaker, &BreakerConfig) -> R) -> R {
        let mut breakers = self.breakers.lock().unwrap();
        let breaker = breakers
            .entry(service.to_string())
            .or_insert_with(|| Breaker::new(service));
        f(breaker, &self.config)
    }
}
