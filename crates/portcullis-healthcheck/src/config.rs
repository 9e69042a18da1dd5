use std::time::Duration;

/// Configuration for a [`crate::HealthMonitor`].
#[derive(Debug, Clone)]
pub struct HealthMonitorConfig {
    /// How often a probe round runs.
    pub interval: Duration,
    /// Deadline for an individual probe.
    pub probe_timeout: Duration,
    /// Consecutive failures at which a target flips from degraded to
    /// unhealthy.
    pub failure_threshold: u32,
}

impl Default for HealthMonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(5),
            failure_threshold: 3,
        }
    }
}

impl HealthMonitorConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> HealthMonitorConfigBuilder {
        HealthMonitorConfigBuilder::default()
    }
}

/// Builder for [`HealthMonitorConfig`].
#[derive(Debug, Default)]
pub struct HealthMonitorConfigBuilder {
    config: HealthMonitorConfig,
}

impl HealthMonitorConfigBuilder {
    /// Sets the probe round interval.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    /// Sets the per-probe deadline.
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.config.probe_timeout = timeout;
        self
    }

    /// Sets the consecutive-failure threshold for the unhealthy status.
    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> HealthMonitorConfig {
        self.config
    }
}
