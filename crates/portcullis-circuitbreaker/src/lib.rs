//! Circuit breaking for downstream services, one breaker per service name.
//!
//! A breaker isolates a misbehaving downstream so the gateway stops paying
//! the cost of calls that cannot succeed, and so a recovering service is not
//! stampeded the moment it comes back.
//!
//! ## States
//! - **Closed**: normal operation, every call is admitted
//! - **Open**: the service is considered down, calls are rejected immediately
//! - **Half-open**: a bounded number of probe calls test recovery
//!
//! ```text
//! closed ──failure_count ≥ threshold──▶ open
//! open ──recovery timeout elapsed on admit──▶ half_open
//! half_open ──any failure──▶ open
//! half_open ──N successes──▶ closed
//! ```
//!
//! ## Basic usage
//!
//! ```rust
//! use portcullis_circuitbreaker::{BreakerConfig, CircuitState};
//! use std::time::Duration;
//!
//! let breakers = BreakerConfig::builder()
//!     .failure_threshold(5)
//!     .recovery_timeout(Duration::from_secs(60))
//!     .half_open_max_calls(3)
//!     .on_state_transition(|service, from, to| {
//!         println!("{service}: {from:?} -> {to:?}");
//!     })
//!     .build();
//!
//! assert!(breakers.admit("loan-service"));
//! breakers.record_success("loan-service");
//! assert_eq!(breakers.state("loan-service"), Some(CircuitState::Closed));
//! ```
//!
//! The breaker reacts to *reachability* only: the caller decides what counts
//! as a failure, and the gateway deliberately reports downstream 5xx
//! responses as successes — an application error is not an outage.
//!
//! ## Feature flags
//! - `tracing`: log state transitions via the `tracing` crate
//! - `serde`: serialize [`CircuitState`] for introspection bodies

use std::sync::Arc;

mod breaker;
mod config;
mod registry;

pub use breaker::{BreakerSnapshot, CircuitState};
pub use config::{BreakerConfig, BreakerConfigBuilder};
pub use registry::BreakerRegistry;

pub(crate) type TransitionHook = dyn Fn(&str, CircuitState, CircuitState) + Send + Sync;
pub(crate) type SharedTransitionHook = Arc<TransitionHook>;

pub(crate) type RejectionHook = dyn Fn(&str) + Send + Sync;
pub(crate) type SharedRejectionHook = Arc<RejectionHook>;
