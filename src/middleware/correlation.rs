//! Correlation layer: assigns the per-request id and builds the context.

use crate::context::RequestContext;
use crate::headers::X_CORRELATION_ID;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{HeaderValue, Request};
use axum::response::Response;
use futures::future::BoxFuture;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use uuid::Uuid;

/// Outermost layer of the pipeline.
///
/// Reads `X-Correlation-Id` from the client or generates a fresh UUID,
/// installs the [`RequestContext`] into the request extensions, and mirrors
/// the id onto the response after every inner layer has run.
#[derive(Clone, Copy, Default)]
pub struct CorrelationLayer;

impl<S> Layer<S> for CorrelationLayer {
    type Service = Correlation<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Correlation { inner }
    }
}

#[derive(Clone)]
pub struct Correlation<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for Correlation<S>
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

        Box::pin(async move {
            let correlation_id = req
                .headers()
                .get(&X_CORRELATION_ID)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned)
                .unwrap_or_else(|| Uuid::new_v4().to_string());

            let client_ip = req
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|info| info.0.ip());

            let ctx = RequestContext::new(
                correlation_id.clone(),
                req.method().clone(),
                req.uri().path().to_string(),
                client_ip,
            );
            req.extensions_mut().insert(ctx);

            let mut response = inner.call(req).await?;

            if let Ok(value) = HeaderValue::try_from(correlation_id) {
                response
                    .headers_mut()
                    .insert(X_CORRELATION_ID.clone(), value);
            }
            Ok(response)
        })
    }
}
