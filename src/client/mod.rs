// 客户端数据访问层
// 限流 + 缓存 + 通过代理网关取数据

pub mod fetch;
pub mod gemini;
pub mod market;
pub mod models;

#[cfg(test)]
pub(crate) mod testing;

pub use fetch::{FetchError, HttpFetcher, JsonFetcher};
pub use gemini::{GeminiClient, generated_text};
pub use market::{Fetched, MarketDataClient};
pub use models::{CoinDetail, CoinSummary, MarketChart, PricePoint, SearchResponse};
