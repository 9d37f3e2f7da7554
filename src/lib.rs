use std::sync::Arc;

use cache::TtlCache;
use config::Config;

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod middleware;
pub mod rate_limit;
pub mod routes;
pub mod session;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub http: reqwest::Client,
    /// 行情代理的响应缓存，只在内存里
    pub market_cache: TtlCache,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            http: reqwest::Client::new(),
            market_cache: TtlCache::in_memory(),
        }
    }
}
