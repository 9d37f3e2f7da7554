use axum::{Router, http::Method, routing::any};

use crate::{
    AppState,
    config::Config,
    middleware::{ProxyGuard, proxy_guard},
    rate_limit::KeyedRateLimiter,
};

mod handler;
pub mod model;

pub fn router(config: &Config) -> Router<AppState> {
    let limiter = KeyedRateLimiter::new(
        config.gemini_rate_limit_window(),
        config.gemini_rate_limit_requests,
    );
    let guard = ProxyGuard::new("generative-text proxy", Method::POST, limiter);

    Router::new()
        .route("/api/gemini", any(handler::proxy_generate))
        .route_layer(axum::middleware::from_fn_with_state(guard, proxy_guard))
}
