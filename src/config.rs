//! Gateway settings: environment overrides on top of built-in defaults.

use crate::registry::ServiceDescriptor;
use std::time::Duration;

/// Requests allowed per scope per window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitSettings {
    pub per_user_per_minute: u64,
    pub per_tenant_per_minute: u64,
    pub per_ip_per_minute: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            per_user_per_minute: 1000,
            per_tenant_per_minute: 100_000,
            per_ip_per_minute: 10_000,
        }
    }
}

/// Circuit breaker thresholds shared by every downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerSettings {
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
    pub half_open_max_calls: u32,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            half_open_max_calls: 3,
        }
    }
}

/// Complete gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub jwt_secret: String,
    pub jwt_algorithm: String,
    pub rate_limits: RateLimitSettings,
    pub breaker: BreakerSettings,
    pub health_check_interval: Duration,
    pub health_probe_timeout: Duration,
    pub max_request_body: usize,
    pub max_response_body: usize,
    pub services: Vec<ServiceDescriptor>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "your-secret-key-change-in-production".to_string(),
            jwt_algorithm: "HS256".to_string(),
            rate_limits: RateLimitSettings::default(),
            breaker: BreakerSettings::default(),
            health_check_interval: Duration::from_secs(30),
            health_probe_timeout: Duration::from_secs(5),
            max_request_body: 10 * 1024 * 1024,
            max_response_body: 100 * 1024 * 1024,
            services: default_services(),
        }
    }
}

impl GatewayConfig {
    /// Builds the configuration from environment variables over defaults.
    ///
    /// Service endpoints are overridden by `<STEM>_SERVICE_URL` (e.g.
    /// `LOAN_SERVICE_URL` for `loan-service`); unparsable values fall back to
    /// the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(secret) = std::env::var("JWT_SECRET_KEY") {
            config.jwt_secret = secret;
        }
        if let Ok(algorithm) = std::env::var("JWT_ALGORITHM") {
            config.jwt_algorithm = algorithm;
        }

        config.rate_limits.per_user_per_minute = env_parse(
            "RATE_LIMIT_PER_USER_PER_MINUTE",
            config.rate_limits.per_user_per_minute,
        );
        config.rate_limits.per_tenant_per_minute = env_parse(
            "RATE_LIMIT_PER_TENANT_PER_MINUTE",
            config.rate_limits.per_tenant_per_minute,
        );
        config.rate_limits.per_ip_per_minute = env_parse(
            "RATE_LIMIT_PER_IP_PER_MINUTE",
            config.rate_limits.per_ip_per_minute,
        );

        config.breaker.failure_threshold = env_parse(
            "CIRCUIT_BREAKER_FAILURE_THRESHOLD",
            config.breaker.failure_threshold,
        );
        config.breaker.recovery_timeout = Duration::from_secs(env_parse(
            "CIRCUIT_BREAKER_RECOVERY_TIMEOUT",
            config.breaker.recovery_timeout.as_secs(),
        ));
        config.breaker.half_open_max_calls = env_parse(
            "CIRCUIT_BREAKER_HALF_OPEN_MAX_CALLS",
            config.breaker.half_open_max_calls,
        );

        config.health_check_interval = Duration::from_secs(env_parse(
            "HEALTH_CHECK_INTERVAL",
            config.health_check_interval.as_secs(),
        ));

        config.max_request_body = env_parse("MAX_REQUEST_BODY_SIZE", config.max_request_body);
        config.max_response_body = env_parse("MAX_RESPONSE_BODY_SIZE", config.max_response_body);

        for service in &mut config.services {
            let stem = service
                .name
                .trim_end_matches("-service")
                .to_uppercase()
                .replace('-', "_");
            if let Ok(url) = std::env::var(format!("{stem}_SERVICE_URL")) {
                service.base_url = url;
            }
        }

        config
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn service(
    name: &str,
    default_url: &str,
    path_prefix: &str,
    timeout: Duration,
    critical: bool,
) -> ServiceDescriptor {
    ServiceDescriptor {
        name: name.to_string(),
        base_url: default_url.to_string(),
        path_prefix: path_prefix.to_string(),
        health_path: "/health".to_string(),
        timeout,
        critical,
    }
}

fn default_services() -> Vec<ServiceDescriptor> {
    let short = Duration::from_secs(5);
    let standard = Duration::from_secs(30);
    vec![
        service("auth-service", "http://localhost:3001", "/api/v1/auth", short, true),
        service("authz-service", "http://localhost:8002", "/api/v1/authz", short, true),
        service("profile-service", "http://localhost:8006", "/api/v1/profiles", standard, true),
        service("loan-service", "http://localhost:8005", "/api/v1/loans", standard, true),
        service("document-service", "http://localhost:8001", "/api/v1/documents", standard, false),
        service("notification-service", "http://localhost:8004", "/api/v1/notifications", standard, false),
        service("audit-service", "http://localhost:8008", "/api/v1/audit", standard, false),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_the_whole_fleet() {
        let config = GatewayConfig::default();
        assert_eq!(config.services.len(), 7);

        let critical: Vec<_> = config
            .services
            .iter()
            .filter(|s| s.critical)
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(
            critical,
            vec!["auth-service", "authz-service", "profile-service", "loan-service"]
        );

        assert_eq!(config.max_request_body, 10 * 1024 * 1024);
        assert_eq!(config.max_response_body, 100 * 1024 * 1024);
        assert_eq!(config.breaker.failure_threshold, 5);
        assert_eq!(config.rate_limits.per_user_per_minute, 1000);
    }

    #[test]
    fn every_prefix_is_distinct() {
        let config = GatewayConfig::default();
        let mut prefixes: Vec<_> = config
            .services
            .iter()
            .map(|s| s.path_prefix.clone())
            .collect();
        prefixes.sort();
        prefixes.dedup();
        assert_eq!(prefixes.len(), config.services.len());
    }
}
