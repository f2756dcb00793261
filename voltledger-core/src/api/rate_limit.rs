// File: voltledger-core/src/api/rate_limit.rs
//
// Fixed-window request limiter keyed by caller (user id when known, client
// address otherwise) and path.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use dashmap::DashMap;

use voltledger_common::models::Identity;
use crate::api::error::ApiError;
use crate::config::RateLimitRule;
use crate::Error;

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started: Instant,
    window: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_after: Duration,
}

#[derive(Default)]
pub struct RateLimiter {
    windows: DashMap<String, Window>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&self, key: &str, rule: RateLimitRule) -> RateDecision {
        self.check_at(key, rule, Instant::now())
    }

    fn check_at(&self, key: &str, rule: RateLimitRule, now: Instant) -> RateDecision {
        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            started: now,
            window: rule.window,
        });
        if now.duration_since(entry.started) >= rule.window {
            *entry = Window { count: 0, started: now, window: rule.window };
        }
        entry.count += 1;

        let reset_after = rule.window.saturating_sub(now.duration_since(entry.started));
        RateDecision {
            allowed: entry.count <= rule.max_requests,
            limit: rule.max_requests,
            remaining: rule.max_requests.saturating_sub(entry.count),
            reset_after,
        }
    }

    /// Drops windows that have run out. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        self.windows.retain(|_, w| {
            let keep = now.duration_since(w.started) < w.window;
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

/// Limiter plus the rule one route group is held to.
#[derive(Clone)]
pub struct RateLimitTier {
    pub limiter: Arc<RateLimiter>,
    pub rule: RateLimitRule,
    pub scope: &'static str,
}

fn client_key(request: &Request) -> String {
    if let Some(identity) = request.extensions().get::<Identity>() {
        return format!("user:{}", identity.user_id);
    }
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty());
    if let Some(ip) = forwarded {
        return format!("ip:{}", ip);
    }
    match request.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => format!("ip:{}", addr.ip()),
        None => "ip:unknown".to_string(),
    }
}

fn insert_headers(headers: &mut HeaderMap, decision: &RateDecision) {
    let reset_at = Utc::now().timestamp() + decision.reset_after.as_secs() as i64;
    headers.insert("x-ratelimit-limit", HeaderValue::from(decision.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    headers.insert("x-ratelimit-reset", HeaderValue::from(reset_at));
}

pub async fn rate_limit(State(tier): State<RateLimitTier>, request: Request, next: Next) -> Response {
    let key = format!("{}:{}:{}", tier.scope, client_key(&request), request.uri().path());

    let decision = tier.limiter.check(&key, tier.rule);

    if !decision.allowed {
        let retry_after_secs = decision.reset_after.as_secs().max(1);
        let mut response = ApiError(Error::RateLimited { retry_after_secs }).into_response();
        insert_headers(response.headers_mut(), &decision);
        return response;
    }

    let mut response = next.run(request).await;
    insert_headers(response.headers_mut(), &decision);
    response
}
