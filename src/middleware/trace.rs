//! Start/completion logging for every request.

use crate::context::RequestContext;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use futures::future::BoxFuture;
use std::convert::Infallible;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};

/// Logs request start and completion with method, path, status, latency and
/// correlation id, so every line for one request joins on the same id.
#[derive(Clone, Copy, Default)]
pub struct RequestLogLayer;

impl<S> Layer<S> for RequestLogLayer {
    type Service = RequestLog<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLog { inner }
    }
}

#[derive(Clone)]
pub struct RequestLog<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for RequestLog<S>
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

        Box::pin(async move {
            let method = req.method().clone();
            let path = req.uri().path().to_string();
            let (correlation_id, started) = req
                .extensions()
                .get::<RequestContext>()
                .map(|ctx| (ctx.correlation_id.clone(), ctx.started))
                .unwrap_or_else(|| ("unknown".to_string(), Instant::now()));

            tracing::info!(
                method = %method,
                path = %path,
                correlation_id = %correlation_id,
                "request started"
            );

            let response = inner.call(req).await?;

            tracing::info!(
                method = %method,
                path = %path,
                status = response.status().as_u16(),
                latency_ms = started.elapsed().as_millis() as u64,
                correlation_id = %correlation_id,
                "request completed"
            );

            Ok(response)
        })
    }
}
