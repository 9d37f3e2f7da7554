use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::{StreamExt, stream};
use serde::Serialize;
use tokio::task::JoinHandle;

use super::report::{CoinReport, Report, ReportTask};
use super::selection::Selection;
use super::status::{OperationStatus, ReportStatus, StatusCell};
use crate::client::{CoinDetail, CoinSummary, MarketChart, MarketDataClient, market::DEFAULT_CHART_DAYS};
use crate::rate_limit::RateLimiter;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub search_debounce: Duration,
    pub revert_delay: Duration,
    pub report_done_delay: Duration,
    pub min_query_len: usize,
    pub max_search_results: usize,
    pub chart_days: u32,
    pub report_concurrency: usize,
    pub search_limit: (Duration, u32),
    pub detail_limit: (Duration, u32),
    pub chart_limit: (Duration, u32),
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            search_debounce: Duration::from_millis(500),
            revert_delay: Duration::from_millis(1000),
            report_done_delay: Duration::from_millis(2000),
            min_query_len: 2,
            max_search_results: 10,
            chart_days: DEFAULT_CHART_DAYS,
            report_concurrency: 2,
            search_limit: (Duration::from_millis(1000), 2),
            detail_limit: (Duration::from_millis(1000), 1),
            chart_limit: (Duration::from_millis(1500), 1),
        }
    }
}

/// 每种操作一个限流器，互不影响
#[derive(Debug, Clone)]
pub struct SessionLimiters {
    pub search: RateLimiter,
    pub detail: RateLimiter,
    pub chart: RateLimiter,
}

impl SessionLimiters {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            search: RateLimiter::new(config.search_limit.0, config.search_limit.1),
            detail: RateLimiter::new(config.detail_limit.0, config.detail_limit.1),
            chart: RateLimiter::new(config.chart_limit.0, config.chart_limit.1),
        }
    }
}

/// 交互触发的请求被限流就直接失败；报告流程则等到窗口有空位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gate {
    Admit,
    Wait,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Detail,
    Chart,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum StatusTarget {
    Search,
    Detail,
    Chart,
    Coin(String, Operation),
}

#[derive(Debug, Default)]
struct CoinEntry {
    detail: Option<CoinDetail>,
    detail_from_cache: bool,
    chart: Option<MarketChart>,
    detail_status: StatusCell<OperationStatus>,
    chart_status: StatusCell<OperationStatus>,
}

#[derive(Debug, Default)]
struct Inner {
    selection: Selection,
    coins: HashMap<String, CoinEntry>,
    query: String,
    search_generation: u64,
    search_results: Vec<CoinSummary>,
    search_from_cache: bool,
    search_status: StatusCell<OperationStatus>,
    detail_status: StatusCell<OperationStatus>,
    chart_status: StatusCell<OperationStatus>,
    report_status: StatusCell<ReportStatus>,
}

impl Inner {
    fn cell(&mut self, target: &StatusTarget) -> Option<&mut StatusCell<OperationStatus>> {
        match target {
            StatusTarget::Search => Some(&mut self.search_status),
            StatusTarget::Detail => Some(&mut self.detail_status),
            StatusTarget::Chart => Some(&mut self.chart_status),
            StatusTarget::Coin(id, Operation::Detail) => {
                self.coins.get_mut(id).map(|c| &mut c.detail_status)
            }
            StatusTarget::Coin(id, Operation::Chart) => {
                self.coins.get_mut(id).map(|c| &mut c.chart_status)
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchSnapshot {
    pub query: String,
    pub results: Vec<CoinSummary>,
    pub from_cache: bool,
    pub status: OperationStatus,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CoinSnapshot {
    pub id: String,
    pub detail: Option<CoinDetail>,
    pub detail_from_cache: bool,
    pub chart: Option<MarketChart>,
    pub detail_status: OperationStatus,
    pub chart_status: OperationStatus,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionSnapshot {
    pub selection: Vec<String>,
    pub coins: Vec<CoinSnapshot>,
    pub search: SearchSnapshot,
    pub detail_status: OperationStatus,
    pub chart_status: OperationStatus,
    pub report_status: ReportStatus,
}

/// 一次浏览会话：搜索、最多 3 个选中币种、各自的详情和图表
///
/// 所有状态都在一把锁后面，锁从不跨 await 持有。
#[derive(Clone)]
pub struct Session {
    inner: Arc<Mutex<Inner>>,
    market: MarketDataClient,
    limiters: SessionLimiters,
    config: Arc<SessionConfig>,
}

impl Session {
    pub fn new(market: MarketDataClient, config: SessionConfig) -> Self {
        let limiters = SessionLimiters::from_config(&config);
        Self::with_limiters(market, config, limiters)
    }

    pub fn with_limiters(market: MarketDataClient, config: SessionConfig, limiters: SessionLimiters) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            market,
            limiters,
            config: Arc::new(config),
        }
    }

    /// 更新搜索词。短于最小长度时清空结果，否则在防抖延迟后发起搜索。
    /// 每次调用都会让之前还没触发的防抖和还在路上的请求作废。
    pub fn set_query(&self, query: &str) -> Option<JoinHandle<()>> {
        let trimmed = query.trim().to_string();
        let generation = {
            let mut inner = self.lock();
            inner.query = query.to_string();
            inner.search_generation += 1;
            if trimmed.chars().count() < self.config.min_query_len {
                inner.search_results.clear();
                inner.search_status.set(OperationStatus::Idle);
                return None;
            }
            inner.search_status.set(OperationStatus::Loading);
            inner.search_generation
        };

        let session = self.clone();
        Some(tokio::spawn(async move {
            session.run_search(generation, trimmed).await;
        }))
    }

    async fn run_search(&self, generation: u64, query: String) {
        tokio::time::sleep(self.config.search_debounce).await;
        if self.lock().search_generation != generation {
            return;
        }

        if !self.limiters.search.admit() {
            tracing::debug!("search for {:?} rate limited locally", query);
            self.set_status(StatusTarget::Search, OperationStatus::RateLimited);
            return;
        }

        let result = self.market.search_coins(&query).await;

        let outcome = {
            let mut inner = self.lock();
            if inner.search_generation != generation {
                tracing::debug!("dropping stale search response for {:?}", query);
                return;
            }
            match result {
                Ok(fetched) => {
                    let mut coins = fetched.data.coins;
                    coins.truncate(self.config.max_search_results);
                    inner.search_results = coins;
                    inner.search_from_cache = fetched.from_cache;
                    OperationStatus::Idle
                }
                Err(e) => {
                    tracing::warn!("search for {:?} failed: {}", query, e);
                    OperationStatus::from_error(&e)
                }
            }
        };
        self.set_status(StatusTarget::Search, outcome);
    }

    /// 选中一个币种，随后依次拉取详情和图表。重复或已满时什么都不做。
    pub async fn select(&self, coin_id: &str) -> bool {
        {
            let mut inner = self.lock();
            if !inner.selection.insert(coin_id) {
                return false;
            }
            inner.coins.entry(coin_id.to_string()).or_default();
        }
        tracing::info!("selected {}", coin_id);

        self.fetch_coin_details(coin_id).await;
        self.fetch_market_chart(coin_id).await;
        true
    }

    pub fn remove(&self, coin_id: &str) -> bool {
        let mut inner = self.lock();
        let removed = inner.selection.remove(coin_id);
        inner.coins.remove(coin_id);
        removed
    }

    pub async fn fetch_coin_details(&self, coin_id: &str) -> OperationStatus {
        self.fetch(coin_id, Operation::Detail, Gate::Admit).await
    }

    pub async fn fetch_market_chart(&self, coin_id: &str) -> OperationStatus {
        self.fetch(coin_id, Operation::Chart, Gate::Admit).await
    }

    async fn fetch(&self, coin_id: &str, operation: Operation, gate: Gate) -> OperationStatus {
        let (limiter, top_level) = match operation {
            Operation::Detail => (&self.limiters.detail, StatusTarget::Detail),
            Operation::Chart => (&self.limiters.chart, StatusTarget::Chart),
        };
        let coin_target = StatusTarget::Coin(coin_id.to_string(), operation);

        let admitted = match gate {
            Gate::Admit => limiter.admit(),
            Gate::Wait => limiter.acquire().await,
        };
        if !admitted {
            tracing::debug!("{:?} for {} rate limited locally", operation, coin_id);
            self.set_status(top_level, OperationStatus::RateLimited);
            self.set_status(coin_target, OperationStatus::RateLimited);
            return OperationStatus::RateLimited;
        }

        self.set_status(top_level.clone(), OperationStatus::Loading);
        self.set_status(coin_target.clone(), OperationStatus::Loading);

        let outcome = match operation {
            Operation::Detail => match self.market.get_coin_market_data(coin_id).await {
                Ok(fetched) => {
                    if let Some(coin) = self.lock().coins.get_mut(coin_id) {
                        coin.detail = Some(fetched.data);
                        coin.detail_from_cache = fetched.from_cache;
                    }
                    OperationStatus::Idle
                }
                Err(e) => {
                    tracing::warn!("detail for {} failed: {}", coin_id, e);
                    OperationStatus::from_error(&e)
                }
            },
            Operation::Chart => match self.market.get_market_chart(coin_id, self.config.chart_days).await {
                Ok(fetched) => {
                    if let Some(coin) = self.lock().coins.get_mut(coin_id) {
                        coin.chart = Some(fetched.data);
                    }
                    OperationStatus::Idle
                }
                Err(e) => {
                    tracing::warn!("chart for {} failed: {}", coin_id, e);
                    OperationStatus::from_error(&e)
                }
            },
        };

        self.set_status(top_level, outcome);
        self.set_status(coin_target, outcome);
        outcome
    }

    /// 为所有选中币种补齐缺失的详情和图表，按限流窗口排队而不是被拒绝
    pub async fn build_report(&self) -> Option<Report> {
        let plans: Vec<(String, Vec<ReportTask>)> = {
            let mut inner = self.lock();
            if inner.selection.is_empty() {
                return None;
            }
            inner.report_status.set(ReportStatus::Loading);
            inner.detail_status.set(OperationStatus::Loading);
            inner.chart_status.set(OperationStatus::Loading);
            inner
                .selection
                .ids()
                .iter()
                .map(|id| {
                    let coin = inner.coins.get(id);
                    let tasks = ReportTask::plan(
                        coin.is_some_and(|c| c.detail.is_some()),
                        coin.is_some_and(|c| c.chart.is_some()),
                    );
                    (id.clone(), tasks)
                })
                .collect()
        };
        tracing::info!("building report for {} coins", plans.len());

        stream::iter(plans.iter())
            .map(|(id, tasks)| async move {
                for task in tasks {
                    let operation = match task {
                        ReportTask::Detail => Operation::Detail,
                        ReportTask::Chart => Operation::Chart,
                    };
                    self.fetch(id, operation, Gate::Wait).await;
                }
            })
            .buffered(self.config.report_concurrency.max(1))
            .collect::<Vec<()>>()
            .await;

        let (report, revision) = {
            let mut inner = self.lock();
            inner.detail_status.set(OperationStatus::Idle);
            inner.chart_status.set(OperationStatus::Idle);
            let revision = inner.report_status.set(ReportStatus::Done);
            let coins = plans
                .iter()
                .filter_map(|(id, _)| {
                    let coin = inner.coins.get(id)?;
                    Some(CoinReport::build(
                        id,
                        coin.detail.as_ref(),
                        coin.chart.as_ref(),
                        coin.detail_from_cache,
                        coin.detail_status.get(),
                        coin.chart_status.get(),
                    ))
                })
                .collect();
            (Report::new(coins), revision)
        };

        let session = self.clone();
        let delay = self.config.report_done_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            session.lock().report_status.revert_if_unchanged(revision);
        });

        Some(report)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.lock();
        let coins = inner
            .selection
            .ids()
            .iter()
            .map(|id| {
                let coin = inner.coins.get(id);
                CoinSnapshot {
                    id: id.clone(),
                    detail: coin.and_then(|c| c.detail.clone()),
                    detail_from_cache: coin.is_some_and(|c| c.detail_from_cache),
                    chart: coin.and_then(|c| c.chart.clone()),
                    detail_status: coin.map(|c| c.detail_status.get()).unwrap_or_default(),
                    chart_status: coin.map(|c| c.chart_status.get()).unwrap_or_default(),
                }
            })
            .collect();

        SessionSnapshot {
            selection: inner.selection.ids().to_vec(),
            coins,
            search: SearchSnapshot {
                query: inner.query.clone(),
                results: inner.search_results.clone(),
                from_cache: inner.search_from_cache,
                status: inner.search_status.get(),
            },
            detail_status: inner.detail_status.get(),
            chart_status: inner.chart_status.get(),
            report_status: inner.report_status.get(),
        }
    }

    /// 设置状态；限流和错误状态在延迟后自动回到 idle
    fn set_status(&self, target: StatusTarget, status: OperationStatus) {
        let revision = {
            let mut inner = self.lock();
            match inner.cell(&target) {
                Some(cell) => cell.set(status),
                None => return,
            }
        };
        if !status.reverts() {
            return;
        }

        let session = self.clone();
        let delay = self.config.revert_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(cell) = session.lock().cell(&target) {
                cell.revert_if_unchanged(revision);
            }
        });
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
