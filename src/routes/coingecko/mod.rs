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
        config.market_rate_limit_window(),
        config.market_rate_limit_requests,
    );
    let guard = ProxyGuard::new("market-data proxy", Method::GET, limiter);

    Router::new()
        .route("/api/coingecko", any(handler::proxy_root))
        .route("/api/coingecko/{*path}", any(handler::proxy_market_data))
        .route_layer(axum::middleware::from_fn_with_state(guard, proxy_guard))
}
