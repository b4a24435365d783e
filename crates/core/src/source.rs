//! Prioritized coin sources: the local store first, the market API last.

use std::sync::Arc;

use tracing::{debug, warn};

use coinboard_common::error::{CoinboardError, CoinboardResult};
use coinboard_common::traits::CoinSource;
use coinboard_common::types::{Coin, PageRequest};

/// Ordered list of [`CoinSource`]s.
///
/// The first non-empty, non-error result wins. Errors and empty results
/// from earlier sources are logged and skipped; when every source is
/// exhausted the last source's outcome is returned as-is.
#[derive(Clone, Default)]
pub struct SourceChain {
    sources: Vec<Arc<dyn CoinSource>>,
}

impl SourceChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: Arc<dyn CoinSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub async fn coins_page(&self, page: &PageRequest) -> CoinboardResult<Vec<Coin>> {
        let mut last = None;
        for (i, source) in self.sources.iter().enumerate() {
            let result = source.coins_page(page).await;
            if self.accept(i, source.name(), &result) {
                return result;
            }
            last = Some(result);
        }
        last.unwrap_or_else(|| Err(no_sources()))
    }

    pub async fn search(&self, query: &str, limit: usize) -> CoinboardResult<Vec<Coin>> {
        let mut last = None;
        for (i, source) in self.sources.iter().enumerate() {
            let result = source.search(query, limit).await;
            if self.accept(i, source.name(), &result) {
                return result;
            }
            last = Some(result);
        }
        last.unwrap_or_else(|| Err(no_sources()))
    }

    fn accept(&self, index: usize, name: &str, result: &CoinboardResult<Vec<Coin>>) -> bool {
        let is_last = index + 1 == self.sources.len();
        match result {
            Ok(coins) if !coins.is_empty() => {
                debug!(source = name, rows = coins.len(), "source hit");
                true
            }
            Ok(_) if is_last => true,
            Ok(_) => {
                warn!("{name} returned no rows, falling back");
                false
            }
            Err(_) if is_last => true,
            Err(e) => {
                warn!("{name} failed ({e}), falling back");
                false
            }
        }
    }
}

fn no_sources() -> CoinboardError {
    CoinboardError::Config("no coin sources configured".into())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    /// Test double returning a fixed outcome and counting calls.
    pub(crate) struct FixedSource {
        pub name: &'static str,
        pub result: CoinboardResult<Vec<Coin>>,
        pub calls: AtomicUsize,
    }

    impl FixedSource {
        pub fn ok(name: &'static str, ids: &[&str]) -> Arc<Self> {
            let coins = ids
                .iter()
                .enumerate()
                .map(|(i, id)| Coin {
                    id: (*id).into(),
                    name: (*id).into(),
                    market_cap_rank: i as u32 + 1,
                    ..Default::default()
                })
                .collect();
            Arc::new(Self {
                name,
                result: Ok(coins),
                calls: AtomicUsize::new(0),
            })
        }

        pub fn err(name: &'static str, err: CoinboardError) -> Arc<Self> {
            Arc::new(Self {
                name,
                result: Err(err),
                calls: AtomicUsize::new(0),
            })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CoinSource for FixedSource {
        fn name(&self) -> &str {
            self.name
        }

        async fn coins_page(&self, _page: &PageRequest) -> CoinboardResult<Vec<Coin>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }

        async fn search(&self, query: &str, limit: usize) -> CoinboardResult<Vec<Coin>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let needle = query.to_lowercase();
            self.result.clone().map(|coins| {
                coins
                    .into_iter()
                    .filter(|c| c.matches(&needle))
                    .take(limit)
                    .collect()
            })
        }
    }

    fn ids(coins: &[Coin]) -> Vec<&str> {
        coins.iter().map(|c| c.id.as_str()).collect()
    }

    fn page() -> PageRequest {
        PageRequest::new(1, 100).unwrap()
    }

    #[tokio::test]
    async fn test_first_non_empty_source_wins() {
        let store = FixedSource::ok("store", &["bitcoin"]);
        let api = FixedSource::ok("api", &["ethereum"]);
        let chain = SourceChain::new().with(store.clone()).with(api.clone());

        let coins = chain.coins_page(&page()).await.unwrap();
        assert_eq!(ids(&coins), vec!["bitcoin"]);
        assert_eq!(api.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_store_falls_back() {
        let store = FixedSource::ok("store", &[]);
        let api = FixedSource::ok("api", &["ethereum"]);
        let chain = SourceChain::new().with(store.clone()).with(api.clone());

        let coins = chain.coins_page(&page()).await.unwrap();
        assert_eq!(ids(&coins), vec!["ethereum"]);
        assert_eq!(store.calls(), 1);
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test]
    async fn test_store_error_falls_back() {
        let store = FixedSource::err("store", CoinboardError::Transport("locked".into()));
        let api = FixedSource::ok("api", &["ethereum"]);
        let chain = SourceChain::new().with(store).with(api);
        assert_eq!(ids(&chain.coins_page(&page()).await.unwrap()), vec!["ethereum"]);
    }

    #[tokio::test]
    async fn test_last_outcome_returned_when_exhausted() {
        let store = FixedSource::ok("store", &[]);
        let api = FixedSource::err("api", CoinboardError::upstream(500, "boom"));
        let chain = SourceChain::new().with(store).with(api);
        let err = chain.coins_page(&page()).await.unwrap_err();
        assert_eq!(err, CoinboardError::upstream(500, "boom"));

        let chain = SourceChain::new()
            .with(FixedSource::err("store", CoinboardError::Transport("x".into())))
            .with(FixedSource::ok("api", &[]));
        assert!(chain.coins_page(&page()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_falls_back_on_miss() {
        let store = FixedSource::ok("store", &["bitcoin"]);
        let api = FixedSource::ok("api", &["ethereum", "solana"]);
        let chain = SourceChain::new().with(store).with(api);
        assert_eq!(ids(&chain.search("sol", 50).await.unwrap()), vec!["solana"]);
    }

    #[tokio::test]
    async fn test_empty_chain_is_config_error() {
        let chain = SourceChain::new();
        assert!(chain.is_empty());
        assert!(matches!(
            chain.coins_page(&page()).await,
            Err(CoinboardError::Config(_))
        ));
    }
}
