//! The static service table: name → endpoint, prefix → service.

use std::time::Duration;

/// One downstream service, fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// Unique identifier, e.g. `loan-service`.
    pub name: String,
    /// Scheme, host and port of the downstream, without a trailing slash.
    pub base_url: String,
    /// URL-path prefix routed to this service, e.g. `/api/v1/loans`.
    pub path_prefix: String,
    /// Path of the health endpoint relative to `base_url`.
    pub health_path: String,
    /// Per-request deadline for forwards to this service.
    pub timeout: Duration,
    /// Whether this service gates the gateway's own readiness.
    pub critical: bool,
}

impl ServiceDescriptor {
    /// Absolute URL of the service's health endpoint.
    pub fn health_url(&self) -> String {
        format!("{}{}", self.base_url, self.health_path)
    }
}

/// Read-only registry resolving request paths to services.
pub struct ServiceRegistry {
    services: Vec<ServiceDescriptor>,
}

impl ServiceRegistry {
    pub fn new(services: Vec<ServiceDescriptor>) -> Self {
        Self { services }
    }

    /// Looks a service up by name.
    pub fn get(&self, name: &str) -> Option<&ServiceDescriptor> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Resolves a request path to a service by prefix match.
    ///
    /// When several prefixes match, the longest one wins, so `/api/v1/authz`
    /// never falls through to the `/api/v1/auth` service.
    pub fn resolve(&self, path: &str) -> Option<&ServiceDescriptor> {
        self.services
            .iter()
            .filter(|s| path.starts_with(&s.path_prefix))
            .max_by_key(|s| s.path_prefix.len())
    }

    /// All registered services, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ServiceDescriptor> {
        self.services.iter()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str, prefix: &str) -> ServiceDescriptor {
        ServiceDescriptor {
            name: name.to_string(),
            base_url: format!("http://{name}.internal:8080"),
            path_prefix: prefix.to_string(),
            health_path: "/health".to_string(),
            timeout: Duration::from_secs(30),
            critical: true,
        }
    }

    fn registry() -> ServiceRegistry {
        ServiceRegistry::new(vec![
            descriptor("auth-service", "/api/v1/auth"),
            descriptor("authz-service", "/api/v1/authz"),
            descriptor("loan-service", "/api/v1/loans"),
        ])
    }

    #[test]
    fn resolves_by_prefix() {
        let registry = registry();
        assert_eq!(
            registry.resolve("/api/v1/loans/l-42").unwrap().name,
            "loan-service"
        );
    }

    #[test]
    fn longest_prefix_wins() {
        let registry = registry();
        // "/api/v1/authz/check" starts with both "/api/v1/auth" and
        // "/api/v1/authz"; the longer prefix must win.
        assert_eq!(
            registry.resolve("/api/v1/authz/check").unwrap().name,
            "authz-service"
        );
        assert_eq!(
            registry.resolve("/api/v1/auth/login").unwrap().name,
            "auth-service"
        );
    }

    #[test]
    fn unknown_path_does_not_resolve() {
        let registry = registry();
        assert!(registry.resolve("/api/v1/unknown").is_none());
        assert!(registry.resolve("/").is_none());
    }

    #[test]
    fn lookup_by_name() {
        let registry = registry();
        assert!(registry.get("loan-service").is_some());
        assert!(registry.get("no-such-service").is_none());
    }

    #[test]
    fn health_url_joins_base_and_path() {
        let descriptor = descriptor("loan-service", "/api/v1/loans");
        assert_eq!(
            descriptor.health_url(),
            "http://loan-service.internal:8080/health"
        );
    }
}
