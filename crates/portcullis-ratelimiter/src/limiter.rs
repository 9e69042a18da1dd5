use crate::config::RateLimiterConfig;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::{Instant, SystemTime};

/// A rate limiting scope, ordered by evaluation priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Per client address. Checked first: it also covers unauthenticated
    /// traffic, so it is the most aggressive protection.
    Ip,
    /// Per authenticated user.
    User,
    /// Per tenant.
    Tenant,
}

impl Scope {
    /// The key-namespace prefix for this scope.
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Ip => "ip",
            Scope::User => "user",
            Scope::Tenant => "tenant",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// Permits left in the window. Zero on denial.
    pub remaining: u64,
    /// When the deciding window resets.
    pub reset_at: SystemTime,
    /// The scope that denied the request, if any.
    pub violating_scope: Option<Scope>,
}

/// Point-in-time usage of a single scope key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeUsage {
    /// Requests counted in the current window.
    pub usage: u64,
    /// When the current window started.
    pub window_start: SystemTime,
    /// When the current window resets.
    pub reset_at: SystemTime,
}

/// One fixed-window counter cell.
///
/// `started` drives expiry (monotonic); `started_at` is what callers see in
/// `reset_at` headers and bodies.
#[derive(Debug, Clone)]
struct WindowCell {
    count: u64,
    started: Instant,
    started_at: SystemTime,
}

/// Multi-scope fixed-window rate limiter.
///
/// Cells live in a single map keyed by scope string; every update happens
/// under the map mutex, so no increment is lost and no two concurrent
/// requests can both install the "first request" window for a key.
pub struct RateLimiter {
    config: RateLimiterConfig,
    cells: Mutex<HashMap<String, WindowCell>>,
}

impl RateLimiter {
    pub(crate) fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            cells: Mutex::new(HashMap::new()),
        }
    }

    /// The configured window duration.
    pub fn window(&self) -> std::time::Duration {
        self.config.window
    }

    /// Checks a single scope key against `limit`.
    ///
    /// Installs a fresh `(1, now)` cell when the key is unknown or its window
    /// has elapsed; otherwise increments, or denies without incrementing once
    /// the cell has reached `limit`.
    pub fn check(&self, scope_key: &str, limit: u64) -> Decision {
        let now = Instant::now();
        let wall = SystemTime::now();
        let window = self.config.window;

        let decision = {
            let mut cells = self.cells.lock().unwrap();
            match cells.get_mut(scope_key) {
                Some(cell) if now.duration_since(cell.started) <= window => {
                    let reset_at = cell.started_at + window;
                    if cell.count >= limit {
                        Decision {
                            allowed: false,
                            remaining: 0,
                            reset_at,
                            violating_scope: None,
                        }
                    } else {
                        cell.count += 1;
                        Decision {
                            allowed: true,
                            remaining: limit - cell.count,
                            reset_at,
                            violating_scope: None,
                        }
                    }
                }
                _ => {
                    cells.insert(
                        scope_key.to_string(),
                        WindowCell {
                            count: 1,
                            started: now,
                            started_at: wall,
                        },
                    );
                    Decision {
                        allowed: true,
                        remaining: limit.saturating_sub(1),
                        reset_at: wall + window,
                        violating_scope: None,
                    }
                }
            }
        };

        if !decision.allowed {
            self.notify_denied(scope_key, limit);
        }
        decision
    }

    /// Checks every applicable scope in the order IP → user → tenant.
    ///
    /// The first denying scope short-circuits: later scopes are neither
    /// consulted nor incremented, and the denial carries that scope. When all
    /// scopes allow, the returned `remaining`/`reset_at` belong to the scope
    /// with the least budget left.
    pub fn check_all(
        &self,
        user: Option<&str>,
        tenant: Option<&str>,
        ip: Option<&str>,
    ) -> Decision {
        let scopes = [
            (Scope::Ip, ip, self.config.per_ip_limit),
            (Scope::User, user, self.config.per_user_limit),
            (Scope::Tenant, tenant, self.config.per_tenant_limit),
        ];

        let mut tightest: Option<Decision> = None;
        for (scope, id, limit) in scopes {
            let Some(id) = id else { continue };
            let key = format!("{}:{}", scope.as_str(), id);
            let mut decision = self.check(&key, limit);
            if !decision.allowed {
                decision.violating_scope = Some(scope);
                return decision;
            }
            if tightest
                .as_ref()
                .map_or(true, |t| decision.remaining < t.remaining)
            {
                tightest = Some(decision);
            }
        }

        tightest.unwrap_or(Decision {
            allowed: true,
            remaining: 0,
            reset_at: SystemTime::now(),
            violating_scope: None,
        })
    }

    /// Returns the current usage for a key, if a cell exists.
    pub fn status(&self, scope_key: &str) -> Option<ScopeUsage> {
        let cells = self.cells.lock().unwrap();
        cells.get(scope_key).map(|cell| ScopeUsage {
            usage: cell.count,
            window_start: cell.started_at,
            reset_at: cell.started_at + self.config.window,
        })
    }

    /// Removes the cell for a key. Repeated resets are no-ops.
    pub fn reset(&self, scope_key: &str) {
        let mut cells = self.cells.lock().unwrap();
        if cells.remove(scope_key).is_some() {
            #[cfg(feature = "tracing")]
            tracing::info!(limiter = %self.config.name, key = scope_key, "rate limit reset");
        }
    }

    /// Drops every cell whose window has elapsed; returns how many went.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let window = self.config.window;

        let removed = {
            let mut cells = self.cells.lock().unwrap();
            let before = cells.len();
            cells.retain(|_, cell| now.duration_since(cell.started) <= window);
            before - cells.len()
        };

        if removed > 0 {
            #[cfg(feature = "tracing")]
            tracing::debug!(limiter = %self.config.name, removed, "swept expired rate limit cells");
        }
        removed
    }

    fn notify_denied(&self, scope_key: &str, limit: u64) {
        #[cfg(feature = "tracing")]
        tracing::warn!(
            limiter = %self.config.name,
            key = scope_key,
            limit,
            "rate limit exceeded"
        );
        if let Some(hook) = &self.config.on_limit_exceeded {
            hook(scope_key, limit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RateLimiterConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn limiter_with(per_user: u64, per_tenant: u64, per_ip: u64) -> RateLimiter {
        RateLimiterConfig::builder()
            .per_user_limit(per_user)
            .per_tenant_limit(per_tenant)
            .per_ip_limit(per_ip)
            .name("test")
            .build()
    }

    #[test]
    fn first_request_installs_window() {
        let limiter = limiter_with(10, 10, 10);

        let decision = limiter.check("user:u-1", 10);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 9);

        let usage = limiter.status("user:u-1").expect("cell exists");
        assert_eq!(usage.usage, 1);
        assert_eq!(usage.reset_at, usage.window_start + Duration::from_secs(60));
    }

    #[test]
    fn saturated_window_denies_without_consuming() {
        let limiter = limiter_with(3, 10, 10);

        for expected_remaining in [2, 1, 0] {
            let d = limiter.check("user:u-1", 3);
            assert!(d.allowed);
            assert_eq!(d.remaining, expected_remaining);
        }

        let denied = limiter.check("user:u-1", 3);
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);

        // Denials must not advance the counter.
        let denied_again = limiter.check("user:u-1", 3);
        assert!(!denied_again.allowed);
        assert_eq!(denied.reset_at, denied_again.reset_at);
        assert_eq!(limiter.status("user:u-1").unwrap().usage, 3);
    }

    #[test]
    fn expired_window_resets_the_cell() {
        let limiter = RateLimiterConfig::builder()
            .window(Duration::from_millis(20))
            .build();

        assert!(limiter.check("ip:10.0.0.1", 1).allowed);
        assert!(!limiter.check("ip:10.0.0.1", 1).allowed);

        std::thread::sleep(Duration::from_millis(30));

        let fresh = limiter.check("ip:10.0.0.1", 1);
        assert!(fresh.allowed);
        assert_eq!(fresh.remaining, 0);
        assert_eq!(limiter.status("ip:10.0.0.1").unwrap().usage, 1);
    }

    #[test]
    fn ip_scope_is_checked_first() {
        let limiter = limiter_with(100, 100, 1);

        let first = limiter.check_all(Some("u-1"), Some("t-1"), Some("10.0.0.9"));
        assert!(first.allowed);

        let second = limiter.check_all(Some("u-1"), Some("t-1"), Some("10.0.0.9"));
        assert!(!second.allowed);
        assert_eq!(second.violating_scope, Some(Scope::Ip));
    }

    #[test]
    fn denial_does_not_touch_later_scopes() {
        let limiter = limiter_with(100, 100, 1);

        limiter.check_all(None, None, Some("10.0.0.9"));
        limiter.check_all(Some("u-1"), Some("t-1"), Some("10.0.0.9"));

        // The ip scope denied before user/tenant were consulted.
        assert!(limiter.status("user:u-1").is_none());
        assert!(limiter.status("tenant:t-1").is_none());
    }

    #[test]
    fn allowed_decision_reports_minimum_remaining() {
        let limiter = limiter_with(2, 100, 100);

        let decision = limiter.check_all(Some("u-1"), Some("t-1"), Some("10.0.0.9"));
        assert!(decision.allowed);
        // user scope has the least budget: limit 2, one consumed
        assert_eq!(decision.remaining, 1);
    }

    #[test]
    fn no_scopes_is_allowed() {
        let limiter = limiter_with(10, 10, 10);
        let decision = limiter.check_all(None, None, None);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 0);
        assert_eq!(decision.violating_scope, None);
    }

    #[test]
    fn reset_is_idempotent() {
        let limiter = limiter_with(10, 10, 10);

        limiter.check("user:u-1", 10);
        limiter.reset("user:u-1");
        assert!(limiter.status("user:u-1").is_none());

        // Second reset has no further effect.
        limiter.reset("user:u-1");
        assert!(limiter.status("user:u-1").is_none());
    }

    #[test]
    fn sweep_removes_only_expired_cells() {
        let limiter = RateLimiterConfig::builder()
            .window(Duration::from_millis(20))
            .build();

        limiter.check("ip:old", 10);
        std::thread::sleep(Duration::from_millis(30));
        limiter.check("ip:fresh", 10);

        let removed = limiter.sweep();
        assert_eq!(removed, 1);
        assert!(limiter.status("ip:old").is_none());
        assert!(limiter.status("ip:fresh").is_some());
    }

    #[test]
    fn limit_exceeded_hook_fires() {
        let denials = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&denials);

        let limiter = RateLimiterConfig::builder()
            .per_user_limit(1)
            .on_limit_exceeded(move |key, limit| {
                assert_eq!(key, "user:u-1");
                assert_eq!(limit, 1);
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .build();

        limiter.check_all(Some("u-1"), None, None);
        limiter.check_all(Some("u-1"), None, None);
        assert_eq!(denials.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let limiter = Arc::new(limiter_with(1000, 1000, 1000));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move {
                for _ in 0..10 {
                    limiter.check("user:shared", 1000);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(limiter.status("user:shared").unwrap().usage, 200);
    }
}
