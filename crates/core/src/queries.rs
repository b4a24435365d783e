//! Market query presets: one [`QueryCache`] per request kind, all served by
//! a shared [`MarketService`].

use std::time::Duration;

use coinboard_common::error::CoinboardResult;
use coinboard_common::types::{ChartPoint, Coin, CoinDetails, MarketChartData, TimeRange};
use coinboard_types::config::QueryConfig;
use coinboard_utils::transform::transform_market_chart;

use crate::query::{QueryCache, QueryOptions, RefreshHandle};
use crate::retry::RetryConfig;
use crate::service::MarketService;

/// `(page, per_page)`.
pub type ListKey = (u32, u32);
/// `(coin id, range)`.
pub type ChartKey = (String, TimeRange);

pub fn list_options(config: &QueryConfig) -> QueryOptions {
    QueryOptions {
        stale_time: Duration::from_secs(config.stale_secs),
        refetch_interval: refresh(config.list_refresh_secs),
        retry: RetryConfig::with_retries(config.list_retries),
    }
}

pub fn detail_options(config: &QueryConfig) -> QueryOptions {
    QueryOptions {
        stale_time: Duration::from_secs(config.stale_secs),
        refetch_interval: refresh(config.detail_refresh_secs),
        retry: RetryConfig::with_retries(config.detail_retries),
    }
}

fn refresh(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

#[derive(Clone)]
pub struct MarketQueries {
    service: MarketService,
    pub coins: QueryCache<ListKey, Vec<Coin>>,
    pub search: QueryCache<String, Vec<Coin>>,
    pub details: QueryCache<String, CoinDetails>,
    /// One series per `(id, range)`, shared by the chart and the trading-history panel.
    pub charts: QueryCache<ChartKey, MarketChartData>,
}

impl MarketQueries {
    pub fn new(service: MarketService, config: &QueryConfig) -> Self {
        let list = list_options(config);
        let detail = detail_options(config);
        Self {
            service,
            coins: QueryCache::new("coins", list.clone()),
            search: QueryCache::new("search", QueryOptions { refetch_interval: None, ..list }),
            details: QueryCache::new("details", detail.clone()),
            charts: QueryCache::new("chart", detail),
        }
    }

    pub fn service(&self) -> &MarketService {
        &self.service
    }

    pub async fn coins(&self, page: u32, per_page: u32) -> CoinboardResult<Vec<Coin>> {
        self.coins.fetch((page, per_page), self.coins_fetcher(page, per_page)).await
    }

    pub async fn search(&self, query: &str) -> CoinboardResult<Vec<Coin>> {
        let key = query.trim().to_lowercase();
        let svc = self.service.clone();
        let q = key.clone();
        self.search
            .fetch(key, move || {
                let svc = svc.clone();
                let q = q.clone();
                async move { svc.search_coins(&q).await }
            })
            .await
    }

    pub async fn details(&self, id: &str) -> CoinboardResult<CoinDetails> {
        self.details.fetch(id.to_string(), self.details_fetcher(id)).await
    }

    pub async fn chart_data(&self, id: &str, range: TimeRange) -> CoinboardResult<MarketChartData> {
        self.charts
            .fetch((id.to_string(), range), self.chart_fetcher(id, range))
            .await
    }

    pub async fn chart(&self, id: &str, range: TimeRange) -> CoinboardResult<Vec<ChartPoint>> {
        let data = self.chart_data(id, range).await?;
        Ok(transform_market_chart(&data.prices))
    }

    /// Manual refresh of everything shown for one coin.
    pub fn invalidate_coin(&self, id: &str, range: TimeRange) {
        self.details.invalidate(&id.to_string());
        self.charts.invalidate(&(id.to_string(), range));
    }

    pub fn refresh_coins(&self, page: u32, per_page: u32) -> Option<RefreshHandle> {
        self.coins
            .spawn_refresh((page, per_page), self.coins_fetcher(page, per_page))
    }

    /// Background refresh for the coin screen. Handles abort on drop.
    pub fn refresh_coin(&self, id: &str, range: TimeRange) -> Vec<RefreshHandle> {
        [
            self.details.spawn_refresh(id.to_string(), self.details_fetcher(id)),
            self.charts
                .spawn_refresh((id.to_string(), range), self.chart_fetcher(id, range)),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn coins_fetcher(
        &self,
        page: u32,
        per_page: u32,
    ) -> impl Fn() -> futures::future::BoxFuture<'static, CoinboardResult<Vec<Coin>>> + Clone + Send + Sync + 'static
    {
        let svc = self.service.clone();
        move || {
            let svc = svc.clone();
            Box::pin(async move { svc.fetch_coins(page, per_page).await })
        }
    }

    fn details_fetcher(
        &self,
        id: &str,
    ) -> impl Fn() -> futures::future::BoxFuture<'static, CoinboardResult<CoinDetails>> + Clone + Send + Sync + 'static
    {
        let svc = self.service.clone();
        let id = id.to_string();
        move || {
            let svc = svc.clone();
            let id = id.clone();
            Box::pin(async move { svc.fetch_coin_details(&id).await })
        }
    }

    fn chart_fetcher(
        &self,
        id: &str,
        range: TimeRange,
    ) -> impl Fn() -> futures::future::BoxFuture<'static, CoinboardResult<MarketChartData>> + Clone + Send + Sync + 'static
    {
        let svc = self.service.clone();
        let id = id.to_string();
        move || {
            let svc = svc.clone();
            let id = id.clone();
            Box::pin(async move { svc.fetch_market_chart(&id, range.days()).await })
        }
    }
}
