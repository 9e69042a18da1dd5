//! The assembled gateway: one value owning every shared component.
//!
//! Handlers receive the gateway by reference through the router state; there
//! are no globals, and tests build one with stub downstream endpoints.

use crate::auth::TokenValidator;
use crate::config::GatewayConfig;
use crate::proxy::Forwarder;
use crate::registry::ServiceRegistry;
use jsonwebtoken::Algorithm;
use portcullis_circuitbreaker::{BreakerConfig, BreakerRegistry};
use portcullis_healthcheck::{HealthMonitor, HealthProbe};
use portcullis_ratelimiter::{RateLimiter, RateLimiterConfig};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinHandle;

/// Probes a downstream health endpoint over the shared HTTP client.
pub struct HttpHealthProbe {
    client: reqwest::Client,
}

impl HealthProbe<String> for HttpHealthProbe {
    async fn probe(&self, url: &String) -> Result<(), String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("health check returned {}", response.status()))
        }
    }
}

/// The monitor type the gateway runs.
pub type ServiceHealthMonitor = HealthMonitor<String, HttpHealthProbe>;

/// Failures while assembling a gateway from configuration.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("unsupported JWT algorithm: {0}")]
    InvalidJwtAlgorithm(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Everything a request handler needs, assembled once at startup.
pub struct Gateway {
    config: GatewayConfig,
    registry: ServiceRegistry,
    validator: TokenValidator,
    limiter: Arc<RateLimiter>,
    breakers: BreakerRegistry,
    monitor: ServiceHealthMonitor,
    forwarder: Forwarder,
    started_at: Instant,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl Gateway {
    pub fn new(config: GatewayConfig) -> Result<Self, BuildError> {
        let algorithm: Algorithm = config
            .jwt_algorithm
            .parse()
            .map_err(|_| BuildError::InvalidJwtAlgorithm(config.jwt_algorithm.clone()))?;
        let validator = TokenValidator::new(&config.jwt_secret, algorithm);

        let client = reqwest::Client::builder().build()?;

        let limiter = Arc::new(
            RateLimiterConfig::builder()
                .per_user_limit(config.rate_limits.per_user_per_minute)
                .per_tenant_limit(config.rate_limits.per_tenant_per_minute)
                .per_ip_limit(config.rate_limits.per_ip_per_minute)
                .name("gateway")
                .build(),
        );

        let breakers = BreakerConfig::builder()
            .failure_threshold(config.breaker.failure_threshold)
            .recovery_timeout(config.breaker.recovery_timeout)
            .half_open_max_calls(config.breaker.half_open_max_calls)
            .name("gateway")
            .on_call_rejected(|service| {
                tracing::warn!(service, "circuit open, rejecting call");
            })
            .build();

        let mut monitor_builder = HealthMonitor::builder()
            .with_probe(HttpHealthProbe {
                client: client.clone(),
            })
            .with_interval(config.health_check_interval)
            .with_probe_timeout(config.health_probe_timeout);
        for service in &config.services {
            monitor_builder = monitor_builder.with_target(
                service.health_url(),
                service.name.as_str(),
                service.critical,
            );
        }
        let monitor = monitor_builder.build();

        let forwarder = Forwarder::new(client, config.max_request_body, config.max_response_body);
        let registry = ServiceRegistry::new(config.services.clone());

        Ok(Self {
            config,
            registry,
            validator,
            limiter,
            breakers,
            monitor,
            forwarder,
            started_at: Instant::now(),
            sweeper: Mutex::new(None),
        })
    }

    /// Starts the health monitor and the limiter sweeper. Idempotent.
    pub fn start_background(&self) {
        self.monitor.start();

        let mut sweeper = self.sweeper.lock().unwrap();
        if sweeper.is_some() {
            return;
        }
        let limiter = Arc::clone(&self.limiter);
        let window = limiter.window();
        *sweeper = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(window);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                limiter.sweep();
            }
        }));
    }

    /// Stops the background tasks and waits for them. Idempotent.
    pub async fn shutdown(&self) {
        self.monitor.stop().await;

        let handle = self.sweeper.lock().unwrap().take();
        if let Some(handle) = handle {
            handle.abort();
            let _ = handle.await;
        }
        tracing::info!("gateway background tasks stopped");
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub fn validator(&self) -> &TokenValidator {
        &self.validator
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn breakers(&self) -> &BreakerRegistry {
        &self.breakers
    }

    pub fn monitor(&self) -> &ServiceHealthMonitor {
        &self.monitor
    }

    pub fn forwarder(&self) -> &Forwarder {
        &self.forwarder
    }

    /// Seconds since this gateway instance was assembled.
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}
