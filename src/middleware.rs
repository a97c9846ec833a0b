use axum::{
    Json,
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::admission::{AdmissionGuard, Verdict};
use crate::metrics::{RATE_LIMITED, TRACKED_CLIENTS};
use crate::models::RateLimitBody;

pub struct RateLimitEnforcer {
    guard: AdmissionGuard,
    trust_forwarded_for: bool,
}

impl RateLimitEnforcer {
    pub fn new(guard: AdmissionGuard, trust_forwarded_for: bool) -> Self {
        Self {
            guard,
            trust_forwarded_for,
        }
    }

    pub fn guard(&self) -> &AdmissionGuard {
        &self.guard
    }
}

// Peer address of the connection, or the right-most X-Forwarded-For entry
// (written by the one trusted proxy) when forwarding is trusted
pub fn client_identifier(req: &Request<Body>, trust_forwarded_for: bool) -> Option<String> {
    if trust_forwarded_for {
        if let Some(forwarded) = last_forwarded_for(req.headers()) {
            return Some(forwarded);
        }
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
}

fn last_forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .last()
        .map(str::to_string)
}

pub fn rate_limited_response(max_requests: u32, window: Duration) -> Response {
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(RateLimitBody {
            error: "Rate limit exceeded".to_string(),
            message: format!(
                "Maximum of {} requests per {} seconds allowed.",
                max_requests,
                window.as_secs()
            ),
        }),
    )
        .into_response()
}

pub async fn enforce(
    State(enforcer): State<Arc<RateLimitEnforcer>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let client = client_identifier(&req, enforcer.trust_forwarded_for);
    let verdict = enforcer.guard.check(client.as_deref());
    TRACKED_CLIENTS.set(enforcer.guard.registry().len() as f64);

    if let Verdict::Limited {
        max_requests,
        window,
    } = verdict
    {
        RATE_LIMITED.inc();
        warn!(
            client = client.as_deref().unwrap_or("unknown"),
            path = %req.uri().path(),
            policy = %enforcer.guard.policy().name,
            "Rate limit exceeded"
        );
        return rate_limited_response(max_requests, window);
    }

    next.run(req).await
}
