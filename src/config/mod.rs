use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub coingecko_base_url: String,
    pub gemini_base_url: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub market_rate_limit_window_secs: u64,
    pub market_rate_limit_requests: u32,
    pub gemini_rate_limit_window_secs: u64,
    pub gemini_rate_limit_requests: u32,
    pub market_cache_ttl_secs: u64,
    pub redis_url: Option<String>,
    pub proxy_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_host: "0.0.0.0".to_string(),
            server_port: 3000,
            coingecko_base_url: DEFAULT_COINGECKO_BASE_URL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            market_rate_limit_window_secs: 60,
            market_rate_limit_requests: 60,
            gemini_rate_limit_window_secs: 60,
            gemini_rate_limit_requests: 30,
            market_cache_ttl_secs: 30,
            redis_url: None,
            proxy_base_url: "http://127.0.0.1:3000".to_string(),
        }
    }
}

impl Config {
    /// 读取 .env 和环境变量；缺失或格式错误的数值回落到默认值
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        let defaults = Config::default();

        Config {
            server_host: env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parse_or("SERVER_PORT", defaults.server_port),
            coingecko_base_url: env::var("COINGECKO_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.coingecko_base_url),
            gemini_base_url: env::var("GEMINI_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.gemini_base_url),
            gemini_api_key: non_empty("GEMINI_API_KEY"),
            gemini_model: non_empty("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            market_rate_limit_window_secs: parse_or(
                "MARKET_RATE_LIMIT_WINDOW",
                defaults.market_rate_limit_window_secs,
            ),
            market_rate_limit_requests: parse_or(
                "MARKET_RATE_LIMIT_REQUESTS",
                defaults.market_rate_limit_requests,
            ),
            gemini_rate_limit_window_secs: parse_or(
                "GEMINI_RATE_LIMIT_WINDOW",
                defaults.gemini_rate_limit_window_secs,
            ),
            gemini_rate_limit_requests: parse_or(
                "GEMINI_RATE_LIMIT_REQUESTS",
                defaults.gemini_rate_limit_requests,
            ),
            market_cache_ttl_secs: parse_or("MARKET_CACHE_TTL", defaults.market_cache_ttl_secs),
            redis_url: non_empty("REDIS_URL"),
            proxy_base_url: env::var("PROXY_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.proxy_base_url),
        }
    }

    pub fn market_rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.market_rate_limit_window_secs)
    }

    pub fn gemini_rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.gemini_rate_limit_window_secs)
    }

    pub fn market_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.market_cache_ttl_secs)
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
