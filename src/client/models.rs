use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub coins: Vec<CoinSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinDetail {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub market_data: Option<MarketData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    #[serde(default)]
    pub current_price: HashMap<String, Option<f64>>,
    #[serde(default)]
    pub market_cap: HashMap<String, Option<f64>>,
    #[serde(default)]
    pub total_volume: HashMap<String, Option<f64>>,
}

impl CoinDetail {
    pub fn price_usd(&self) -> Option<f64> {
        usd(self.market_data.as_ref().map(|m| &m.current_price))
    }

    pub fn market_cap_usd(&self) -> Option<f64> {
        usd(self.market_data.as_ref().map(|m| &m.market_cap))
    }

    pub fn volume_usd(&self) -> Option<f64> {
        usd(self.market_data.as_ref().map(|m| &m.total_volume))
    }
}

fn usd(values: Option<&HashMap<String, Option<f64>>>) -> Option<f64> {
    values?.get("usd").copied().flatten()
}

/// (时间戳毫秒, 价格)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint(pub f64, pub f64);

impl PricePoint {
    pub fn timestamp_ms(&self) -> i64 {
        self.0 as i64
    }

    pub fn price(&self) -> f64 {
        self.1
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketChart {
    #[serde(default)]
    pub prices: Vec<PricePoint>,
}

impl MarketChart {
    /// 首尾价格的涨跌幅 (%)，少于两个点时没有意义
    pub fn change_pct(&self) -> Option<f64> {
        if self.prices.len() < 2 {
            return None;
        }
        let first = self.prices.first()?.price();
        let last = self.prices.last()?.price();
        if first == 0.0 {
            return None;
        }
        Some((last - first) / first * 100.0)
    }
}
