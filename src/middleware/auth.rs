//! Bearer authentication for every non-exempt path.

use crate::context::RequestContext;
use crate::error::GatewayError;
use crate::gateway::Gateway;
use crate::middleware::is_exempt;
use axum::body::Body;
use axum::http::{header, Request};
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Validates `Authorization: Bearer <token>` and attaches the claims to the
/// request context. Missing, malformed, and invalid credentials all end in a
/// 401 envelope; the message never says which check failed the token itself.
#[derive(Clone)]
pub struct AuthLayer {
    gateway: Arc<Gateway>,
}

impl AuthLayer {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = Auth<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Auth {
            inner,
            gateway: Arc::clone(&self.gateway),
        }
    }
}

#[derive(Clone)]
pub struct Auth<S> {
    inner: S,
    gateway: Arc<Gateway>,
}

impl<S> Service<Request<Body>> for Auth<S>
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

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let mut inner = self.inner.clone();
        let gateway = Arc::clone(&self.gateway);

        Box::pin(async move {
            if is_exempt(req.uri().path()) {
                return inner.call(req).await;
            }

            let correlation_id = req
                .extensions()
                .get::<RequestContext>()
                .map(|ctx| ctx.correlation_id.clone());

            let Some(header_value) = req
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
            else {
                return Ok(reject(correlation_id, "Missing Authorization header"));
            };

            let mut parts = header_value.split_whitespace();
            let (scheme, token) = match (parts.next(), parts.next(), parts.next()) {
                (Some(scheme), Some(token), None) => (scheme, token),
                _ => return Ok(reject(correlation_id, "Invalid Authorization header format")),
            };
            if !scheme.eq_ignore_ascii_case("bearer") {
                return Ok(reject(correlation_id, "Invalid Authorization header format"));
            }

            match gateway.validator().validate(token) {
                Ok(claims) => {
                    tracing::debug!(
                        user_id = %claims.subject,
                        tenant_id = claims.tenant.as_deref().unwrap_or(""),
                        roles = ?claims.roles,
                        "authenticated user"
                    );
                    if let Some(ctx) = req.extensions_mut().get_mut::<RequestContext>() {
                        ctx.attach_claims(claims);
                    }
                    inner.call(req).await
                }
                Err(_) => Ok(reject(correlation_id, "Invalid or expired token")),
            }
        })
    }
}

fn reject(correlation_id: Option<String>, message: &str) -> Response {
    let mut error = GatewayError::unauthorized(message);
    if let Some(id) = correlation_id {
        error = error.with_correlation(id);
    }
    error.into_response()
}
