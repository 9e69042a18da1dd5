//! Health probe trait and blanket implementations.

use std::future::Future;

/// Trait for probing the health of a target.
///
/// Implementors define what "reachable and well" means for a target (an HTTP
/// GET against a health endpoint, a ping over an open connection, ...).
/// `Ok(())` marks the probe round successful; `Err(reason)` carries the
/// failure text surfaced in [`crate::ServiceHealth::last_error`].
///
/// # Examples
///
/// Using a closure (via the blanket impl):
///
/// ```rust
/// let probe = |url: &String| {
///     let url = url.clone();
///     async move {
///         if url.starts_with("http://") {
///             Ok(())
///         } else {
///             Err(format!("unsupported scheme in {url}"))
///         }
///     }
/// };
/// # let _ = probe;
/// ```
///
/// Implementing the trait:
///
/// ```rust
/// use portcullis_healthcheck::HealthProbe;
///
/// struct TcpProbe;
///
/// impl HealthProbe<String> for TcpProbe {
///     async fn probe(&self, addr: &String) -> Result<(), String> {
///         tokio::net::TcpStream::connect(addr.as_str())
///             .await
///             .map(|_| ())
///             .map_err(|e| e.to_string())
///     }
/// }
/// ```
pub trait HealthProbe<T>: Send + Sync {
    /// Probe the given target once.
    fn probe(&self, target: &T) -> impl Future<Output = Result<(), String>> + Send;
}

// Blanket implementation for closures - makes it easy to use
impl<T, F, Fut> HealthProbe<T> for F
where
    F: Fn(&T) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), String>> + Send,
{
    fn probe(&self, target: &T) -> impl Future<Output = Result<(), String>> + Send {
        self(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closure_probe() {
        let probe = |target: &String| {
            let ok = target == "up";
            async move {
                if ok {
                    Ok(())
                } else {
                    Err("down".to_string())
                }
            }
        };

        assert!(probe.probe(&"up".to_string()).await.is_ok());
        assert_eq!(
            probe.probe(&"other".to_string()).await,
            Err("down".to_string())
        );
    }

    struct AlwaysUp;

    impl<T: Sync> HealthProbe<T> for AlwaysUp {
        async fn probe(&self, _target: &T) -> Result<(), String> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn trait_impl_probe() {
        let probe = AlwaysUp;
        assert!(probe.probe(&"anything".to_string()).await.is_ok());
    }
}
