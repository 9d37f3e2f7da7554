use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::fetch::{FetchError, JsonFetcher};
use super::models::{CoinDetail, MarketChart, SearchResponse};
use crate::cache::{TtlCache, cache_key, keys::MARKET_PREFIX};

/// 行情代理在网关上的挂载路径
pub const MARKET_PROXY_PATH: &str = "/api/coingecko";

pub const SEARCH_TTL: Duration = Duration::from_secs(5 * 60);
pub const DETAIL_TTL: Duration = Duration::from_secs(15 * 60);
pub const CHART_TTL: Duration = Duration::from_secs(15 * 60);
pub const DEFAULT_CHART_DAYS: u32 = 365;

/// 返回数据以及是否来自缓存
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fetched<T> {
    pub data: T,
    pub from_cache: bool,
}

#[derive(Clone)]
pub struct MarketDataClient {
    fetcher: Arc<dyn JsonFetcher>,
    cache: TtlCache,
}

impl MarketDataClient {
    pub fn new(fetcher: Arc<dyn JsonFetcher>, cache: TtlCache) -> Self {
        Self { fetcher, cache }
    }

    pub async fn search_coins(&self, query: &str) -> Result<Fetched<SearchResponse>, FetchError> {
        let params = vec![("query".to_string(), query.to_string())];
        let fetched = self.fetch_with_cache("/search", params, SEARCH_TTL).await?;
        decode(fetched)
    }

    pub async fn get_coin_market_data(&self, id: &str) -> Result<Fetched<CoinDetail>, FetchError> {
        let params: Vec<(String, String)> = [
            ("localization", "false"),
            ("tickers", "false"),
            ("community_data", "false"),
            ("developer_data", "false"),
            ("sparkline", "false"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let fetched = self
            .fetch_with_cache(&format!("/coins/{}", id), params, DETAIL_TTL)
            .await?;
        decode(fetched)
    }

    pub async fn get_market_chart(&self, id: &str, days: u32) -> Result<Fetched<MarketChart>, FetchError> {
        let params = vec![
            ("vs_currency".to_string(), "usd".to_string()),
            ("days".to_string(), days.to_string()),
        ];
        let fetched = self
            .fetch_with_cache(&format!("/coins/{}/market_chart", id), params, CHART_TTL)
            .await?;
        decode(fetched)
    }

    async fn fetch_with_cache(
        &self,
        path: &str,
        params: Vec<(String, String)>,
        ttl: Duration,
    ) -> Result<Fetched<Value>, FetchError> {
        let key = cache_key(MARKET_PREFIX, path, &params);
        if let Some(data) = self.cache.get_value(&key).await {
            return Ok(Fetched {
                data,
                from_cache: true,
            });
        }

        let data = self
            .fetcher
            .get_json(&format!("{}{}", MARKET_PROXY_PATH, path), &params)
            .await?;
        self.cache.set(&key, &data, ttl).await;
        Ok(Fetched {
            data,
            from_cache: false,
        })
    }
}

fn decode<T: DeserializeOwned>(fetched: Fetched<Value>) -> Result<Fetched<T>, FetchError> {
    let data = serde_json::from_value(fetched.data).map_err(|e| FetchError::Decode(e.to_string()))?;
    Ok(Fetched {
        data,
        from_cache: fetched.from_cache,
    })
}
