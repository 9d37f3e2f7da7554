use serde::Serialize;

use super::status::OperationStatus;
use crate::client::{CoinDetail, MarketChart};

/// 报告里每个币种要补的数据，先详情后图表
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportTask {
    Detail,
    Chart,
}

impl ReportTask {
    /// 只补本地还没有的数据
    pub fn plan(has_detail: bool, has_chart: bool) -> Vec<ReportTask> {
        let mut tasks = Vec::with_capacity(2);
        if !has_detail {
            tasks.push(ReportTask::Detail);
        }
        if !has_chart {
            tasks.push(ReportTask::Chart);
        }
        tasks
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoinReport {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub price_usd: Option<f64>,
    pub market_cap_usd: Option<f64>,
    pub volume_usd: Option<f64>,
    pub change_pct: Option<f64>,
    pub chart_points: usize,
    pub detail_from_cache: bool,
    pub detail_status: OperationStatus,
    pub chart_status: OperationStatus,
}

impl CoinReport {
    pub fn build(
        id: &str,
        detail: Option<&CoinDetail>,
        chart: Option<&MarketChart>,
        detail_from_cache: bool,
        detail_status: OperationStatus,
        chart_status: OperationStatus,
    ) -> Self {
        CoinReport {
            id: id.to_string(),
            name: detail.map(|d| d.name.clone()).unwrap_or_else(|| id.to_string()),
            symbol: detail.map(|d| d.symbol.to_uppercase()).unwrap_or_default(),
            price_usd: detail.and_then(CoinDetail::price_usd),
            market_cap_usd: detail.and_then(CoinDetail::market_cap_usd),
            volume_usd: detail.and_then(CoinDetail::volume_usd),
            change_pct: chart.and_then(MarketChart::change_pct),
            chart_points: chart.map(|c| c.prices.len()).unwrap_or(0),
            detail_from_cache,
            detail_status,
            chart_status,
        }
    }

    pub fn status(&self) -> OperationStatus {
        OperationStatus::combine([self.detail_status, self.chart_status])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub coins: Vec<CoinReport>,
    pub status: OperationStatus,
}

impl Report {
    pub fn new(coins: Vec<CoinReport>) -> Self {
        let status = OperationStatus::combine(coins.iter().map(CoinReport::status));
        Self { coins, status }
    }
}
