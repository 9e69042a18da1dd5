//! Introspection endpoints, the proxy catch-all, and router assembly.

use crate::context::RequestContext;
use crate::error::GatewayError;
use crate::gateway::Gateway;
use crate::middleware::{
    AuthLayer, CorrelationLayer, RateLimitLayer, RequestLogLayer, SecurityHeadersLayer,
};
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, SecondsFormat, Utc};
use portcullis_circuitbreaker::CircuitState;
use portcullis_healthcheck::ServiceHealth;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tower::ServiceBuilder;

/// Builds the full router: introspection routes, the proxy fallback, and the
/// middleware pipeline from the correlation layer inward.
pub fn router(gateway: Arc<Gateway>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/healthz", get(healthz))
        .route("/ready", get(ready))
        .route("/api/v1/discovery", get(discovery))
        .fallback(proxy)
        .layer(
            ServiceBuilder::new()
                .layer(CorrelationLayer)
                .layer(SecurityHeadersLayer)
                .layer(RequestLogLayer)
                .layer(AuthLayer::new(Arc::clone(&gateway)))
                .layer(RateLimitLayer::new(Arc::clone(&gateway))),
        )
        .with_state(gateway)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    uptime_seconds: u64,
}

/// Basic health of the gateway itself, for load balancers.
async fn health(State(gateway): State<Arc<Gateway>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        uptime_seconds: gateway.uptime().as_secs(),
    })
}

/// Liveness probe: static 200 regardless of downstream state.
async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "status": "OK" }))
}

#[derive(Serialize)]
struct ServiceStatusBody {
    service_name: String,
    status: &'static str,
    last_check_at: Option<String>,
    response_time_ms: Option<u64>,
    error: Option<String>,
    consecutive_failures: u32,
}

fn status_body(name: String, health: ServiceHealth) -> ServiceStatusBody {
    ServiceStatusBody {
        status: health.status.as_str(),
        last_check_at: health
            .last_check_at
            .map(|at| DateTime::<Utc>::from(at).to_rfc3339_opts(SecondsFormat::Millis, true)),
        response_time_ms: health.last_latency.map(|d| d.as_millis() as u64),
        error: health.last_error,
        consecutive_failures: health.consecutive_failures,
        service_name: name,
    }
}

#[derive(Serialize)]
struct ReadinessResponse {
    ready: bool,
    services: BTreeMap<String, ServiceStatusBody>,
}

/// Readiness probe: 200 iff every critical downstream is healthy.
async fn ready(State(gateway): State<Arc<Gateway>>) -> Response {
    let ready = gateway.monitor().critical_all_healthy();
    let services = gateway
        .monitor()
        .all()
        .into_iter()
        .map(|(name, health)| (name.clone(), status_body(name, health)))
        .collect();

    let body = ReadinessResponse { ready, services };
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body)).into_response()
}

#[derive(Serialize)]
struct ServiceInfo {
    name: String,
    description: String,
    base_path: String,
    status: &'static str,
    critical: bool,
    /// Breaker state, absent until the first call has gone downstream.
    circuit: Option<CircuitState>,
}

#[derive(Serialize)]
struct RateLimitInfo {
    per_user_per_minute: u64,
    per_tenant_per_minute: u64,
    per_ip_per_minute: u64,
}

#[derive(Serialize)]
struct DiscoveryResponse {
    services: Vec<ServiceInfo>,
    authentication_required: bool,
    rate_limits: RateLimitInfo,
}

/// Machine-readable service catalog with live health and configured limits.
async fn discovery(State(gateway): State<Arc<Gateway>>) -> Json<DiscoveryResponse> {
    let breakers = gateway.breakers().snapshot();
    let services = gateway
        .registry()
        .iter()
        .map(|descriptor| {
            let status = gateway
                .monitor()
                .status(&descriptor.name)
                .map(|health| health.status.as_str())
                .unwrap_or("unknown");
            ServiceInfo {
                name: descriptor.name.clone(),
                description: display_name(&descriptor.name),
                base_path: descriptor.path_prefix.clone(),
                status,
                critical: descriptor.critical,
                circuit: breakers.get(&descriptor.name).map(|snapshot| snapshot.state),
            }
        })
        .collect();

    let limits = &gateway.config().rate_limits;
    Json(DiscoveryResponse {
        services,
        authentication_required: true,
        rate_limits: RateLimitInfo {
            per_user_per_minute: limits.per_user_per_minute,
            per_tenant_per_minute: limits.per_tenant_per_minute,
            per_ip_per_minute: limits.per_ip_per_minute,
        },
    })
}

/// The catch-all proxy: resolve, consult the breaker, forward, report.
async fn proxy(
    State(gateway): State<Arc<Gateway>>,
    req: Request<Body>,
) -> Result<Response, GatewayError> {
    let ctx = req
        .extensions()
        .get::<RequestContext>()
        .cloned()
        .ok_or_else(|| GatewayError::internal("request context missing"))?;
    let path = req.uri().path().to_string();

    let Some(service) = gateway.registry().resolve(&path) else {
        tracing::warn!(path = %path, "no service found for path");
        return Err(
            GatewayError::not_found(format!("No service found for path: {path}"))
                .with_correlation(ctx.correlation_id.as_str()),
        );
    };

    if !gateway.breakers().admit(&service.name) {
        return Err(GatewayError::service_unavailable(format!(
            "Service {} is currently unavailable",
            service.name
        ))
        .with_correlation(ctx.correlation_id.as_str()));
    }

    match gateway.forwarder().forward(service, &ctx, req).await {
        Ok(response) => {
            gateway.breakers().record_success(&service.name);
            Ok(response)
        }
        Err(err) => {
            // Only reachability failures count against the breaker; a
            // downstream that answered, however badly, is not an outage.
            if err.is_breaker_failure() {
                gateway.breakers().record_failure(&service.name);
            }
            Err(err.into_error(&ctx.correlation_id))
        }
    }
}

/// `loan-service` → `Loan Service`.
fn display_name(name: &str) -> String {
    name.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
