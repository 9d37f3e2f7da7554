use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{error::ProxyError, rate_limit::KeyedRateLimiter};

/// 代理入口守卫：先校验请求方法，再按客户端地址限流
#[derive(Clone)]
pub struct ProxyGuard {
    pub name: &'static str,
    pub method: Method,
    pub limiter: KeyedRateLimiter,
}

impl ProxyGuard {
    pub fn new(name: &'static str, method: Method, limiter: KeyedRateLimiter) -> Self {
        Self {
            name,
            method,
            limiter,
        }
    }
}

/// 客户端地址：优先取转发头，其次取连接地址，都没有时记为 unknown
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').map(str::trim).find(|ip| !ip.is_empty()))
        .map(str::to_string)
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .map(str::trim)
                .filter(|ip| !ip.is_empty())
                .map(str::to_string)
        })
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn proxy_guard(
    State(guard): State<ProxyGuard>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if req.method() != guard.method {
        tracing::debug!("{}: rejecting {} request", guard.name, req.method());
        return ProxyError::MethodNotAllowed.into_response();
    }

    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0);
    let ip = client_ip(req.headers(), peer);

    if !guard.limiter.check(&ip) {
        tracing::warn!(
            "{}: rate limit exceeded for {} ({} requests / {}s)",
            guard.name,
            ip,
            guard.limiter.max_calls(),
            guard.limiter.window().as_secs()
        );
        return ProxyError::RateLimited.into_response();
    }

    next.run(req).await
}
