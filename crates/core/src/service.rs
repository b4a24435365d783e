//! Market data access: coin lists go through the [`SourceChain`]
//! (store → API), details and charts go straight to the market API.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use coinboard_common::constants::SEARCH_LIMIT;
use coinboard_common::error::{CoinboardError, CoinboardResult};
use coinboard_common::traits::{CoinSource, MarketDataApi};
use coinboard_common::types::{ChartDays, Coin, CoinDetails, MarketChartData, PageRequest};
use coinboard_mod_coingecko::CoinGeckoClient;
use coinboard_types::config::AppConfig;

use crate::db::{CoinDb, CoinStore};
use crate::source::SourceChain;

#[derive(Clone)]
pub struct MarketService {
    sources: SourceChain,
    api: Arc<dyn MarketDataApi>,
    vs_currency: String,
}

impl MarketService {
    pub fn new(sources: SourceChain, api: Arc<dyn MarketDataApi>, vs_currency: impl Into<String>) -> Self {
        Self {
            sources,
            api,
            vs_currency: vs_currency.into(),
        }
    }

    /// Wire the CoinGecko client and, when it exists, the local store.
    ///
    /// The store is only read here; a missing file means "not synced yet"
    /// and the chain starts at the API.
    pub fn from_config(config: &AppConfig, store_path: &Path) -> CoinboardResult<Self> {
        config.validate()?;
        let client = Arc::new(CoinGeckoClient::new(&config.api)?);

        let mut sources = SourceChain::new();
        if config.store.enabled && store_path.is_file() {
            match CoinDb::open(store_path) {
                Ok(db) => sources = sources.with(Arc::new(CoinStore::new(db))),
                Err(e) => warn!("store unavailable at {}: {e:#}", store_path.display()),
            }
        }
        let api_source: Arc<dyn CoinSource> = client.clone();
        sources = sources.with(api_source);
        info!(sources = ?sources.names(), "market service ready");

        Ok(Self::new(sources, client, config.api.vs_currency.clone()))
    }

    pub fn sources(&self) -> &SourceChain {
        &self.sources
    }

    pub fn vs_currency(&self) -> &str {
        &self.vs_currency
    }

    pub fn api(&self) -> &Arc<dyn MarketDataApi> {
        &self.api
    }

    /// One page of coins ordered by market-cap rank.
    pub async fn fetch_coins(&self, page: u32, per_page: u32) -> CoinboardResult<Vec<Coin>> {
        let request = PageRequest::new(page, per_page)?.with_currency(self.vs_currency.clone());
        let coins = self.sources.coins_page(&request).await?;
        debug!(page, per_page, rows = coins.len(), "fetched coins");
        Ok(coins)
    }

    /// Substring search over name and symbol.
    pub async fn search_coins(&self, query: &str) -> CoinboardResult<Vec<Coin>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CoinboardError::Validation("search query is empty".into()));
        }
        self.sources.search(query, SEARCH_LIMIT).await
    }

    pub async fn fetch_coin_details(&self, id: &str) -> CoinboardResult<CoinDetails> {
        let id = require_id(id)?;
        self.api.coin_details(id).await
    }

    /// Chart series for `id`. An empty `prices` series is an error.
    pub async fn fetch_market_chart(&self, id: &str, days: ChartDays) -> CoinboardResult<MarketChartData> {
        let id = require_id(id)?;
        let chart = self.api.market_chart(id, days).await?;
        if chart.prices.is_empty() {
            return Err(CoinboardError::Validation(format!(
                "market chart for '{id}' (days={days}) has no prices"
            )));
        }
        Ok(chart)
    }

    pub async fn ping(&self) -> CoinboardResult<()> {
        self.api.ping().await
    }
}

fn require_id(id: &str) -> CoinboardResult<&str> {
    let id = id.trim();
    if id.is_empty() {
        Err(CoinboardError::Validation("coin id is required".into()))
    } else {
        Ok(id)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::source::tests::FixedSource;

    /// Market API double with scripted chart/detail outcomes.
    pub(crate) struct FakeApi {
        pub chart: Mutex<CoinboardResult<MarketChartData>>,
        pub details: Mutex<CoinboardResult<CoinDetails>>,
        /// Errors returned, in order, before `details` is served.
        pub detail_failures: Mutex<Vec<CoinboardError>>,
        pub chart_calls: AtomicUsize,
        pub detail_calls: AtomicUsize,
    }

    impl FakeApi {
        pub fn new() -> Self {
            let mut details = CoinDetails::default();
            details.coin.id = "bitcoin".into();
            details.coin.name = "Bitcoin".into();
            Self {
                chart: Mutex::new(Ok(MarketChartData {
                    prices: vec![[1.0, 10.0], [2.0, 11.0]],
                    ..Default::default()
                })),
                details: Mutex::new(Ok(details)),
                detail_failures: Mutex::new(Vec::new()),
                chart_calls: AtomicUsize::new(0),
                detail_calls: AtomicUsize::new(0),
            }
        }

        pub fn set_chart(&self, result: CoinboardResult<MarketChartData>) {
            *self.chart.lock().unwrap() = result;
        }

        pub fn set_details(&self, result: CoinboardResult<CoinDetails>) {
            *self.details.lock().unwrap() = result;
        }

        pub fn fail_details(&self, times: usize, err: CoinboardError) {
            *self.detail_failures.lock().unwrap() = vec![err; times];
        }
    }

    #[async_trait]
    impl MarketDataApi for FakeApi {
        async fn coin_details(&self, _id: &str) -> CoinboardResult<CoinDetails> {
            self.detail_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.detail_failures.lock().unwrap().pop() {
                return Err(err);
            }
            self.details.lock().unwrap().clone()
        }

        async fn market_chart(&self, _id: &str, _days: ChartDays) -> CoinboardResult<MarketChartData> {
            self.chart_calls.fetch_add(1, Ordering::SeqCst);
            self.chart.lock().unwrap().clone()
        }

        async fn ping(&self) -> CoinboardResult<()> {
            Ok(())
        }
    }

    fn service(store: Arc<dyn CoinSource>, fallback: Arc<dyn CoinSource>, api: Arc<FakeApi>) -> MarketService {
        MarketService::new(SourceChain::new().with(store).with(fallback), api, "usd")
    }

    #[tokio::test]
    async fn test_fetch_coins_empty_store_uses_api() {
        let store = Arc::new(CoinStore::new(CoinDb::open_in_memory().unwrap()));
        let api_source = FixedSource::ok("api", &["bitcoin", "ethereum"]);
        let svc = service(store, api_source.clone(), Arc::new(FakeApi::new()));

        let coins = svc.fetch_coins(1, 100).await.unwrap();
        assert_eq!(coins.len(), 2);
        assert_eq!(coins[0].id, "bitcoin");
        assert_eq!(api_source.calls(), 1);
    }

    #[tokio::test]
    async fn test_fetch_coins_prefers_synced_store() {
        let db = CoinDb::open_in_memory().unwrap();
        db.upsert_coins(&[Coin {
            id: "solana".into(),
            market_cap_rank: 5,
            ..Default::default()
        }])
        .unwrap();
        let api_source = FixedSource::ok("api", &["bitcoin"]);
        let svc = service(Arc::new(CoinStore::new(db)), api_source.clone(), Arc::new(FakeApi::new()));

        let coins = svc.fetch_coins(1, 100).await.unwrap();
        assert_eq!(coins[0].id, "solana");
        assert_eq!(api_source.calls(), 0);
    }

    #[tokio::test]
    async fn test_fetch_coins_rejects_bad_paging() {
        let svc = service(FixedSource::ok("store", &[]), FixedSource::ok("api", &[]), Arc::new(FakeApi::new()));
        assert!(matches!(svc.fetch_coins(0, 100).await, Err(CoinboardError::Validation(_))));
        assert!(matches!(svc.fetch_coins(1, 251).await, Err(CoinboardError::Validation(_))));
    }

    #[tokio::test]
    async fn test_search_requires_query() {
        let svc = service(FixedSource::ok("store", &[]), FixedSource::ok("api", &["bitcoin"]), Arc::new(FakeApi::new()));
        assert!(matches!(svc.search_coins("  ").await, Err(CoinboardError::Validation(_))));
        let hits = svc.search_coins(" BIT ").await.unwrap();
        assert_eq!(hits[0].id, "bitcoin");
    }

    #[tokio::test]
    async fn test_details_require_id_and_propagate_not_found() {
        let api = Arc::new(FakeApi::new());
        let svc = service(FixedSource::ok("store", &[]), FixedSource::ok("api", &[]), api.clone());

        assert!(matches!(svc.fetch_coin_details("").await, Err(CoinboardError::Validation(_))));
        assert_eq!(api.detail_calls.load(Ordering::SeqCst), 0);

        assert_eq!(svc.fetch_coin_details("bitcoin").await.unwrap().coin.name, "Bitcoin");

        api.set_details(Err(CoinboardError::NotFound("nope".into())));
        assert!(matches!(svc.fetch_coin_details("nope").await, Err(CoinboardError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_empty_chart_prices_is_validation_error() {
        let api = Arc::new(FakeApi::new());
        api.set_chart(Ok(MarketChartData::default()));
        let svc = service(FixedSource::ok("store", &[]), FixedSource::ok("api", &[]), api);

        let err = svc.fetch_market_chart("bitcoin", ChartDays::Days(7)).await.unwrap_err();
        assert!(matches!(err, CoinboardError::Validation(_)));
        assert!(matches!(
            svc.fetch_market_chart(" ", ChartDays::Max).await,
            Err(CoinboardError::Validation(_))
        ));
    }
}
