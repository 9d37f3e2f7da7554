use std::net::{IpAddr, SocketAddr};

use coinlens::{AppState, config::Config, routes};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if config.gemini_api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set, /api/gemini will answer missing_api_key");
    }
    tracing::info!(
        "market-data proxy: {} requests / {}s, upstream {}",
        config.market_rate_limit_requests,
        config.market_rate_limit_window_secs,
        config.coingecko_base_url
    );
    tracing::info!(
        "generative-text proxy: {} requests / {}s, model {}",
        config.gemini_rate_limit_requests,
        config.gemini_rate_limit_window_secs,
        config.gemini_model
    );

    let state = AppState::new(config);
    let router = routes::router(state.clone());

    // 开发模式下允许跨域
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(tower_http::cors::CorsLayer::permissive())
    };

    let addr = SocketAddr::new(
        state.config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        state.config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
