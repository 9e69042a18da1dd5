//! Proactive health monitoring for a fixed set of downstream services.
//!
//! A [`HealthMonitor`] owns a periodic background task that probes every
//! registered target concurrently and keeps a rolling [`ServiceHealth`] per
//! target. Readiness aggregation ([`HealthMonitor::critical_all_healthy`])
//! answers the one question a load balancer asks: can this node take traffic?
//!
//! The monitor is *proactive* where a circuit breaker is *reactive*: it finds
//! trouble before a client request pays for it. The two complement each
//! other.
//!
//! # Examples
//!
//! ```rust
//! use portcullis_healthcheck::{HealthMonitor, HealthStatus};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let monitor = HealthMonitor::builder()
//!     .with_target("http://localhost:8001/health".to_string(), "auth-service", true)
//!     .with_target("http://localhost:8005/health".to_string(), "loan-service", true)
//!     .with_probe(|url: &String| {
//!         let url = url.clone();
//!         async move {
//!             // Your probe logic; Err(reason) marks the round failed.
//!             if url.is_empty() {
//!                 return Err("no health url configured".to_string());
//!             }
//!             Ok(())
//!         }
//!     })
//!     .with_interval(Duration::from_secs(30))
//!     .build();
//!
//! monitor.start();
//! // ...
//! monitor.stop().await;
//! # }
//! ```

mod checker;
mod config;
mod monitor;

pub use checker::HealthProbe;
pub use config::{HealthMonitorConfig, HealthMonitorConfigBuilder};
pub use monitor::{HealthMonitor, HealthMonitorBuilder, ServiceHealth};

/// Health status of a monitored service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// The last probe succeeded.
    Healthy,

    /// Recent probes failed, but fewer than the failure threshold in a row.
    Degraded,

    /// The failure threshold of consecutive probes has been reached.
    Unhealthy,

    /// Not probed yet.
    Unknown,
}

impl HealthStatus {
    /// Check if the status indicates the service can serve traffic at all.
    pub fn is_usable(&self) -> bool {
        matches!(self, HealthStatus::Healthy | HealthStatus::Degraded)
    }

    /// Check if the status is fully healthy.
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    /// Wire representation used in introspection bodies.
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
            HealthStatus::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usable_and_healthy_predicates() {
        assert!(HealthStatus::Healthy.is_usable());
        assert!(HealthStatus::Degraded.is_usable());
        assert!(!HealthStatus::Unhealthy.is_usable());
        assert!(!HealthStatus::Unknown.is_usable());

        assert!(HealthStatus::Healthy.is_healthy());
        assert!(!HealthStatus::Degraded.is_healthy());
    }

    #[test]
    fn wire_names() {
        assert_eq!(HealthStatus::Healthy.as_str(), "healthy");
        assert_eq!(HealthStatus::Degraded.as_str(), "degraded");
        assert_eq!(HealthStatus::Unhealthy.as_str(), "unhealthy");
        assert_eq!(HealthStatus::Unknown.as_str(), "unknown");
    }
}
