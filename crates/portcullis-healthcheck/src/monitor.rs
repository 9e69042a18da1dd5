//! The health monitor: registered targets, the periodic probe task, and
//! readiness aggregation.

use crate::{HealthMonitorConfig, HealthProbe, HealthStatus};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant, SystemTime};
use tokio::task::JoinHandle;

/// Rolling health of a single monitored service.
#[derive(Debug, Clone)]
pub struct ServiceHealth {
    /// Current aggregated status.
    pub status: HealthStatus,
    /// When the last probe completed.
    pub last_check_at: Option<SystemTime>,
    /// Duration of the last probe.
    pub last_latency: Option<Duration>,
    /// Failure text of the last failed probe; cleared on success.
    pub last_error: Option<String>,
    /// Consecutive failed probes; reset on success.
    pub consecutive_failures: u32,
}

impl Default for ServiceHealth {
    fn default() -> Self {
        Self {
            status: HealthStatus::Unknown,
            last_check_at: None,
            last_latency: None,
            last_error: None,
            consecutive_failures: 0,
        }
    }
}

struct Target<T> {
    resource: T,
    name: String,
    critical: bool,
    health: RwLock<ServiceHealth>,
}

/// Periodically probes a fixed set of targets and aggregates their health.
///
/// `start` and `stop` are idempotent; dropping the monitor aborts the
/// background task. The health map is written only by the probe task and read
/// by whoever holds the monitor.
pub struct HealthMonitor<T, P> {
    targets: Arc<Vec<Target<T>>>,
    probe: Arc<P>,
    config: HealthMonitorConfig,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<T, P> HealthMonitor<T, P>
where
    T: Send + Sync + 'static,
    P: HealthProbe<T> + 'static,
{
    /// Create a new builder.
    pub fn builder() -> HealthMonitorBuilder<T, P> {
        HealthMonitorBuilder::new()
    }

    /// Start the periodic probe task.
    ///
    /// The first round runs immediately, then every configured interval.
    /// Calling `start` on a running monitor is a no-op.
    pub fn start(&self) {
        let mut task = self.task.lock().unwrap();
        if task.is_some() {
            return;
        }

        let targets = Arc::clone(&self.targets);
        let probe = Arc::clone(&self.probe);
        let config = self.config.clone();

        *task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                run_round(&targets, &probe, &config).await;
            }
        }));
    }

    /// Stop the periodic probe task and wait for it to finish.
    ///
    /// Calling `stop` on a stopped monitor is a no-op.
    pub async fn stop(&self) {
        let handle = self.task.lock().unwrap().take();
        if let Some(handle) = handle {
            handle.abort();
            let _ = handle.await;
        }
    }

    /// Run a single probe round inline, outside the periodic schedule.
    pub async fn probe_once(&self) {
        run_round(&self.targets, &self.probe, &self.config).await;
    }

    /// Health of a single target by name.
    pub fn status(&self, name: &str) -> Option<ServiceHealth> {
        self.targets
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.health.read().unwrap().clone())
    }

    /// Health of every target, in registration order.
    pub fn all(&self) -> Vec<(String, ServiceHealth)> {
        self.targets
            .iter()
            .map(|t| (t.name.clone(), t.health.read().unwrap().clone()))
            .collect()
    }

    /// True iff every target registered as critical is currently healthy.
    ///
    /// Unknown counts as not healthy: a node that has not proven its critical
    /// dependencies reachable must not report ready.
    pub fn critical_all_healthy(&self) -> bool {
        self.targets
            .iter()
            .filter(|t| t.critical)
            .all(|t| t.health.read().unwrap().status.is_healthy())
    }
}

impl<T, P> Drop for HealthMonitor<T, P> {
    fn drop(&mut self) {
        if let Ok(mut task) = self.task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
            }
        }
    }
}

async fn run_round<T, P>(targets: &Arc<Vec<Target<T>>>, probe: &Arc<P>, config: &HealthMonitorConfig)
where
    T: Send + Sync + 'static,
    P: HealthProbe<T> + 'static,
{
    let mut handles = Vec::with_capacity(targets.len());

    for index in 0..targets.len() {
        let targets = Arc::clone(targets);
        let probe = Arc::clone(probe);
        let probe_timeout = config.probe_timeout;
        let failure_threshold = config.failure_threshold;

        handles.push(tokio::spawn(async move {
            let target = &targets[index];
            let started = Instant::now();

            let outcome = match tokio::time::timeout(probe_timeout, probe.probe(&target.resource))
                .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err("health probe timed out".to_string()),
            };
            let latency = started.elapsed();

            let mut health = target.health.write().unwrap();
            health.last_check_at = Some(SystemTime::now());
            health.last_latency = Some(latency);

            match outcome {
                Ok(()) => {
                    health.status = HealthStatus::Healthy;
                    health.consecutive_failures = 0;
                    health.last_error = None;

                    #[cfg(feature = "tracing")]
                    tracing::debug!(service = %target.name, latency_ms = latency.as_millis() as u64, "health probe succeeded");
                }
                Err(error) => {
                    health.consecutive_failures += 1;
                    health.status = if health.consecutive_failures >= failure_threshold {
                        HealthStatus::Unhealthy
                    } else {
                        HealthStatus::Degraded
                    };

                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        service = %target.name,
                        failures = health.consecutive_failures,
                        error = %error,
                        "health probe failed"
                    );

                    health.last_error = Some(error);
                }
            }
        }));
    }

    // One slow or panicking probe must not hide the others' results.
    for handle in handles {
        let _ = handle.await;
    }
}

/// Builder for [`HealthMonitor`].
pub struct HealthMonitorBuilder<T, P> {
    targets: Vec<Target<T>>,
    probe: Option<P>,
    config: HealthMonitorConfig,
}

impl<T, P> HealthMonitorBuilder<T, P>
where
    T: Send + Sync + 'static,
    P: HealthProbe<T> + 'static,
{
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            targets: Vec::new(),
            probe: None,
            config: HealthMonitorConfig::default(),
        }
    }

    /// Register a target to monitor. Critical targets gate readiness.
    pub fn with_target(mut self, resource: T, name: impl Into<String>, critical: bool) -> Self {
        self.targets.push(Target {
            resource,
            name: name.into(),
            critical,
            health: RwLock::new(ServiceHealth::default()),
        });
        self
    }

    /// Set the probe implementation.
    pub fn with_probe(mut self, probe: P) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Set the probe round interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    /// Set the per-probe deadline.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.config.probe_timeout = timeout;
        self
    }

    /// Set the consecutive-failure threshold for the unhealthy status.
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    /// Set the full configuration.
    pub fn with_config(mut self, config: HealthMonitorConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the monitor.
    ///
    /// # Panics
    ///
    /// Panics if no probe was provided.
    pub fn build(self) -> HealthMonitor<T, P> {
        HealthMonitor {
            targets: Arc::new(self.targets),
            probe: Arc::new(self.probe.expect("health probe must be provided")),
            config: self.config,
            task: Mutex::new(None),
        }
    }
}

impl<T, P> Default for HealthMonitorBuilder<T, P>
where
    T: Send + Sync + 'static,
    P: HealthProbe<T> + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Clone)]
    struct FlaggedTarget {
        name: String,
        up: Arc<AtomicBool>,
    }

    struct FlagProbe;

    impl HealthProbe<FlaggedTarget> for FlagProbe {
        async fn probe(&self, target: &FlaggedTarget) -> Result<(), String> {
            if target.up.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(format!("{} is down", target.name))
            }
        }
    }

    fn flagged(name: &str, up: bool) -> (FlaggedTarget, Arc<AtomicBool>) {
        let flag = Arc::new(AtomicBool::new(up));
        (
            FlaggedTarget {
                name: name.to_string(),
                up: Arc::clone(&flag),
            },
            flag,
        )
    }

    #[tokio::test]
    async fn targets_start_unknown() {
        let (target, _) = flagged("svc", true);
        let monitor = HealthMonitor::builder()
            .with_target(target, "svc", true)
            .with_probe(FlagProbe)
            .build();

        let health = monitor.status("svc").expect("registered");
        assert_eq!(health.status, HealthStatus::Unknown);
        assert!(health.last_check_at.is_none());
        assert!(monitor.status("missing").is_none());
    }

    #[tokio::test]
    async fn degrades_then_goes_unhealthy() {
        let (target, _) = flagged("svc", false);
        let monitor = HealthMonitor::builder()
            .with_target(target, "svc", true)
            .with_probe(FlagProbe)
            .with_failure_threshold(3)
            .build();

        monitor.probe_once().await;
        let health = monitor.status("svc").unwrap();
        assert_eq!(health.status, HealthStatus::Degraded);
        assert_eq!(health.consecutive_failures, 1);
        assert_eq!(health.last_error.as_deref(), Some("svc is down"));

        monitor.probe_once().await;
        assert_eq!(monitor.status("svc").unwrap().status, HealthStatus::Degraded);

        monitor.probe_once().await;
        let health = monitor.status("svc").unwrap();
        assert_eq!(health.status, HealthStatus::Unhealthy);
        assert_eq!(health.consecutive_failures, 3);
    }

    #[tokio::test]
    async fn success_resets_failures_and_error() {
        let (target, flag) = flagged("svc", false);
        let monitor = HealthMonitor::builder()
            .with_target(target, "svc", true)
            .with_probe(FlagProbe)
            .build();

        monitor.probe_once().await;
        monitor.probe_once().await;

        flag.store(true, Ordering::SeqCst);
        monitor.probe_once().await;

        let health = monitor.status("svc").unwrap();
        assert_eq!(health.status, HealthStatus::Healthy);
        assert_eq!(health.consecutive_failures, 0);
        assert!(health.last_error.is_none());
        assert!(health.last_latency.is_some());
    }

    #[tokio::test]
    async fn readiness_tracks_critical_targets_only() {
        let (critical, critical_flag) = flagged("critical", false);
        let (optional, _) = flagged("optional", false);

        let monitor = HealthMonitor::builder()
            .with_target(critical, "critical", true)
            .with_target(optional, "optional", false)
            .with_probe(FlagProbe)
            .build();

        // Nothing probed yet: unknown critical targets block readiness.
        assert!(!monitor.critical_all_healthy());

        monitor.probe_once().await;
        assert!(!monitor.critical_all_healthy());

        critical_flag.store(true, Ordering::SeqCst);
        monitor.probe_once().await;

        // The optional target is still down, but readiness only watches
        // critical ones.
        assert!(monitor.critical_all_healthy());
        assert_eq!(
            monitor.status("optional").unwrap().status,
            HealthStatus::Degraded
        );
    }

    #[tokio::test]
    async fn periodic_task_probes_and_stops_idempotently() {
        let (target, _) = flagged("svc", true);
        let monitor = HealthMonitor::builder()
            .with_target(target, "svc", true)
            .with_probe(FlagProbe)
            .with_interval(Duration::from_millis(10))
            .build();

        monitor.start();
        monitor.start(); // second start is a no-op

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(monitor.status("svc").unwrap().status, HealthStatus::Healthy);

        monitor.stop().await;
        monitor.stop().await; // second stop is a no-op
    }

    #[tokio::test]
    async fn probe_timeout_counts_as_failure() {
        struct SlowProbe;

        impl HealthProbe<String> for SlowProbe {
            async fn probe(&self, _target: &String) -> Result<(), String> {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            }
        }

        let monitor = HealthMonitor::builder()
            .with_target("svc".to_string(), "svc", true)
            .with_probe(SlowProbe)
            .with_probe_timeout(Duration::from_millis(20))
            .build();

        monitor.probe_once().await;

        let health = monitor.status("svc").unwrap();
        assert_eq!(health.status, HealthStatus::Degraded);
        assert_eq!(health.last_error.as_deref(), Some("health probe timed out"));
    }
}
