//! Rate limiting for every non-exempt path.

use crate::context::RequestContext;
use crate::error::GatewayError;
use crate::gateway::Gateway;
use crate::headers::{X_RATE_LIMIT_REMAINING, X_RATE_LIMIT_RESET};
use crate::middleware::is_exempt;
use axum::body::Body;
use axum::http::{HeaderValue, Request};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, SecondsFormat, Utc};
use futures::future::BoxFuture;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::SystemTime;
use tower::{Layer, Service};

/// Enforces the multi-scope limits and emits the rate-limit headers.
///
/// Runs inside the authentication layer, so the user and tenant scopes see
/// the claims of the current request.
#[derive(Clone)]
pub struct RateLimitLayer {
    gateway: Arc<Gateway>,
}

impl RateLimitLayer {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimit<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimit {
            inner,
            gateway: Arc::clone(&self.gateway),
        }
    }
}

#[derive(Clone)]
pub struct RateLimit<S> {
    inner: S,
    gateway: Arc<Gateway>,
}

impl<S> Service<Request<Body>> for RateLimit<S>
where
    S: Service<Request<Body>, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let mut inner = self.inner.clone();
        let gateway = Arc::clone(&self.gateway);

        Box::pin(async move {
            if is_exempt(req.uri().path()) {
                return inner.call(req).await;
            }

            let ctx = req.extensions().get::<RequestContext>().cloned();
            let (correlation_id, user_id, tenant_id, client_ip) = match &ctx {
                Some(ctx) => (
                    Some(ctx.correlation_id.clone()),
                    ctx.user_id.clone(),
                    ctx.tenant_id.clone(),
                    ctx.client_ip.map(|ip| ip.to_string()),
                ),
                None => (None, None, None, None),
            };

            let decision = gateway.limiter().check_all(
                user_id.as_deref(),
                tenant_id.as_deref(),
                client_ip.as_deref(),
            );
            let reset_at = format_reset(decision.reset_at);

            if !decision.allowed {
                let scope = decision
                    .violating_scope
                    .map(|s| s.as_str())
                    .unwrap_or("unknown");
                let mut error = GatewayError::rate_limited(format!(
                    "Rate limit exceeded for {scope}"
                ))
                .with_details(json!({ "reset_at": reset_at }));
                if let Some(id) = correlation_id {
                    error = error.with_correlation(id);
                }

                let mut response = error.into_response();
                set_rate_limit_headers(&mut response, 0, &reset_at);
                return Ok(response);
            }

            let mut response = inner.call(req).await?;
            set_rate_limit_headers(&mut response, decision.remaining, &reset_at);
            Ok(response)
        })
    }
}

fn set_rate_limit_headers(response: &mut Response, remaining: u64, reset_at: &str) {
    if let Ok(value) = HeaderValue::try_from(remaining.to_string()) {
        response
            .headers_mut()
            .insert(X_RATE_LIMIT_REMAINING.clone(), value);
    }
    if let Ok(value) = HeaderValue::try_from(reset_at) {
        response
            .headers_mut()
            .insert(X_RATE_LIMIT_RESET.clone(), value);
    }
}

fn format_reset(at: SystemTime) -> String {
    DateTime::<Utc>::from(at).to_rfc3339_opts(SecondsFormat::Secs, true)
}
