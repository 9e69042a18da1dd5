//! The HTTP forwarder: builds, executes, and streams the downstream call.

use crate::context::RequestContext;
use crate::error::GatewayError;
use crate::headers::{X_CORRELATION_ID, X_TENANT_ID, X_USER_ID};
use crate::registry::ServiceDescriptor;
use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request, StatusCode};
use axum::response::Response;
use futures::StreamExt;
use http_body_util::{BodyExt, Limited};
use std::io;
use thiserror::Error;

/// How a forward attempt failed.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("request to {service} timed out")]
    Timeout { service: String },

    #[error("failed to connect to {service}")]
    Connect { service: String },

    #[error("request body exceeds the {limit}-byte limit")]
    RequestTooLarge { limit: usize },

    #[error("response from {service} exceeds the {limit}-byte limit")]
    ResponseTooLarge { service: String, limit: usize },

    #[error("error forwarding to {service}: {source}")]
    Transport {
        service: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ForwardError {
    /// Whether the breaker should count this as a reachability failure.
    ///
    /// Size-limit violations are not outages: the request-side one never left
    /// the gateway, and the response-side one means the downstream answered.
    pub fn is_breaker_failure(&self) -> bool {
        matches!(
            self,
            ForwardError::Timeout { .. }
                | ForwardError::Connect { .. }
                | ForwardError::Transport { .. }
        )
    }

    /// Renders the failure into the client-facing error.
    pub fn into_error(self, correlation_id: &str) -> GatewayError {
        let error = match &self {
            ForwardError::Timeout { .. } => {
                GatewayError::new(StatusCode::GATEWAY_TIMEOUT, self.to_string())
            }
            ForwardError::Connect { .. } | ForwardError::ResponseTooLarge { .. } => {
                GatewayError::new(StatusCode::BAD_GATEWAY, self.to_string())
            }
            ForwardError::RequestTooLarge { .. } => {
                GatewayError::new(StatusCode::PAYLOAD_TOO_LARGE, self.to_string())
            }
            ForwardError::Transport { service, source } => {
                tracing::error!(service = %service, error = %source, "unexpected forwarding error");
                GatewayError::internal("Internal server error")
            }
        };
        error.with_correlation(correlation_id)
    }
}

/// Forwards inbound requests to resolved downstream services.
///
/// One shared client: connection pooling across every forward and probe.
pub struct Forwarder {
    client: reqwest::Client,
    max_request_body: usize,
    max_response_body: usize,
}

impl Forwarder {
    pub fn new(client: reqwest::Client, max_request_body: usize, max_response_body: usize) -> Self {
        Self {
            client,
            max_request_body,
            max_response_body,
        }
    }

    /// Executes one forward: same path and query against the service's base
    /// URL, filtered headers, streamed bodies, the service's own deadline.
    pub async fn forward(
        &self,
        service: &ServiceDescriptor,
        ctx: &RequestContext,
        req: Request<Body>,
    ) -> Result<Response, ForwardError> {
        let (parts, body) = req.into_parts();

        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let target_url = format!("{}{}", service.base_url, path_and_query);

        // Reject declared-oversize bodies before a byte leaves the gateway;
        // chunked bodies are capped in-flight below.
        let declared_length = parts
            .headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        if declared_length.is_some_and(|len| len > self.max_request_body) {
            return Err(ForwardError::RequestTooLarge {
                limit: self.max_request_body,
            });
        }

        // Attach a body only when there is one; an unconditional stream would
        // turn plain GETs into chunked requests.
        let size_hint = http_body::Body::size_hint(&body);
        let has_body = size_hint.lower() > 0 || size_hint.upper().is_none();

        let headers = outbound_headers(&parts.headers, ctx);

        let mut builder = self
            .client
            .request(parts.method.clone(), &target_url)
            .headers(headers)
            .timeout(service.timeout);
        if has_body {
            let limited = Limited::new(body, self.max_request_body);
            builder = builder.body(reqwest::Body::wrap_stream(limited.into_data_stream()));
        }

        tracing::debug!(
            service = %service.name,
            method = %parts.method,
            target = %target_url,
            correlation_id = %ctx.correlation_id,
            "forwarding request"
        );

        let downstream = builder
            .send()
            .await
            .map_err(|err| self.classify(service, err))?;

        if downstream
            .content_length()
            .is_some_and(|len| len > self.max_response_body as u64)
        {
            return Err(ForwardError::ResponseTooLarge {
                service: service.name.clone(),
                limit: self.max_response_body,
            });
        }

        let mut response = Response::builder().status(downstream.status());
        for (name, value) in downstream.headers() {
            if !is_hop_by_hop(name) {
                response = response.header(name, value);
            }
        }

        // Undeclared lengths get counted on the way through; overshooting
        // aborts the stream mid-flight.
        let limit = self.max_response_body;
        let mut forwarded = 0usize;
        let capped = downstream.bytes_stream().map(move |chunk| match chunk {
            Ok(bytes) => {
                forwarded += bytes.len();
                if forwarded > limit {
                    Err(io::Error::other("response body limit exceeded"))
                } else {
                    Ok(bytes)
                }
            }
            Err(err) => Err(io::Error::other(err)),
        });

        response
            .body(Body::from_stream(capped))
            .map_err(|err| ForwardError::Transport {
                service: service.name.clone(),
                source: Box::new(err),
            })
    }

    fn classify(&self, service: &ServiceDescriptor, err: reqwest::Error) -> ForwardError {
        if err.is_timeout() {
            ForwardError::Timeout {
                service: service.name.clone(),
            }
        } else if err.is_connect() {
            ForwardError::Connect {
                service: service.name.clone(),
            }
        } else if chain_has_length_limit(&err) {
            ForwardError::RequestTooLarge {
                limit: self.max_request_body,
            }
        } else {
            ForwardError::Transport {
                service: service.name.clone(),
                source: Box::new(err),
            }
        }
    }
}

/// Inbound headers minus `Host` and hop-by-hop, plus the identity headers
/// downstreams rely on.
fn outbound_headers(inbound: &HeaderMap, ctx: &RequestContext) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(inbound.len() + 3);
    for (name, value) in inbound {
        if name == header::HOST || is_hop_by_hop(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    if let Ok(value) = HeaderValue::try_from(ctx.correlation_id.as_str()) {
        headers.insert(X_CORRELATION_ID.clone(), value);
    }
    if let Some(value) = ctx
        .user_id
        .as_deref()
        .and_then(|v| HeaderValue::try_from(v).ok())
    {
        headers.insert(X_USER_ID.clone(), value);
    }
    if let Some(value) = ctx
        .tenant_id
        .as_deref()
        .and_then(|v| HeaderValue::try_from(v).ok())
    {
        headers.insert(X_TENANT_ID.clone(), value);
    }

    headers
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
    )
}

fn chain_has_length_limit(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(current) = source {
        if current.is::<http_body_util::LengthLimitError>() {
            return true;
        }
        source = current.source();
    }
    false
}
