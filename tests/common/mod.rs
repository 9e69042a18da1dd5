//! Shared harness: gateways wired to stub downstreams, minted tokens, and
//! request plumbing.
#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use portcullis::config::GatewayConfig;
use portcullis::gateway::Gateway;
use portcullis::registry::ServiceDescriptor;
use portcullis::routes;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret";

/// A descriptor pointing at a test downstream.
pub fn descriptor(name: &str, base_url: &str, prefix: &str, critical: bool) -> ServiceDescriptor {
    ServiceDescriptor {
        name: name.to_string(),
        base_url: base_url.to_string(),
        path_prefix: prefix.to_string(),
        health_path: "/health".to_string(),
        timeout: Duration::from_secs(5),
        critical,
    }
}

/// Default test configuration over the given services.
pub fn test_config(services: Vec<ServiceDescriptor>) -> GatewayConfig {
    GatewayConfig {
        jwt_secret: TEST_SECRET.to_string(),
        services,
        ..GatewayConfig::default()
    }
}

/// Builds the gateway and its router.
pub fn build(config: GatewayConfig) -> (Arc<Gateway>, Router) {
    let gateway = Arc::new(Gateway::new(config).expect("gateway assembly"));
    let router = routes::router(Arc::clone(&gateway));
    (gateway, router)
}

/// Mints a valid bearer header for the given identity.
pub fn bearer(user_id: &str, tenant_id: Option<&str>, roles: &[&str]) -> String {
    let claims = json!({
        "user_id": user_id,
        "tenant_id": tenant_id,
        "roles": roles,
        "exp": chrono::Utc::now().timestamp() + 3600,
    });
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .expect("token minting");
    format!("Bearer {token}")
}

/// Sends one request through the router.
pub async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router
        .clone()
        .oneshot(request)
        .await
        .expect("router call is infallible")
}

/// Convenience GET with optional bearer header.
pub async fn get(router: &Router, uri: &str, authorization: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(authorization) = authorization {
        builder = builder.header("authorization", authorization);
    }
    send(router, builder.body(Body::empty()).unwrap()).await
}

/// Collects a response body into JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body collect")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body is JSON")
}

/// Collects a response body into raw bytes.
pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("body collect")
        .to_bytes()
        .to_vec()
}

/// A base URL nothing listens on: connections are refused immediately.
pub fn dead_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind probe port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}
