use axum::{Router, routing::get};

use crate::{AppState, middleware::log_errors};

pub mod coingecko;
pub mod gemini;

/// 两个代理各自持有独立的限流状态
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(coingecko::router(&state.config))
        .merge(gemini::router(&state.config))
        .layer(axum::middleware::from_fn(log_errors))
        .with_state(state)
}
