//! Per-request context, established before any observable work.

use crate::auth::Claims;
use axum::http::Method;
use std::net::IpAddr;
use std::time::Instant;

/// Identity and timing for one inbound request.
///
/// Created by the correlation layer at the mouth of the pipeline, stored in
/// the request's extensions, enriched by the authentication layer, and read
/// by everything downstream. Owns nothing beyond itself.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub correlation_id: String,
    pub user_id: Option<String>,
    pub tenant_id: Option<String>,
    pub roles: Vec<String>,
    pub client_ip: Option<IpAddr>,
    pub method: Method,
    pub path: String,
    pub started: Instant,
}

impl RequestContext {
    pub fn new(
        correlation_id: String,
        method: Method,
        path: String,
        client_ip: Option<IpAddr>,
    ) -> Self {
        Self {
            correlation_id,
            user_id: None,
            tenant_id: None,
            roles: Vec::new(),
            client_ip,
            method,
            path,
            started: Instant::now(),
        }
    }

    /// Attaches validated claims after authentication.
    pub fn attach_claims(&mut self, claims: Claims) {
        self.user_id = Some(claims.subject);
        self.tenant_id = claims.tenant;
        self.roles = claims.roles;
    }
}
