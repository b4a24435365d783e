//! Collaborator traits: the seams between the pipeline and its data sources.
//!
//! The data-access layer is written against these traits only. The SQLite
//! store and the CoinGecko client implement them, and tests substitute
//! in-memory doubles.

use async_trait::async_trait;

use crate::error::CoinboardResult;
use crate::types::{ChartDays, Coin, CoinDetails, MarketChartData, PageRequest};

/// Anything that can serve pages of the market-cap ordered coin list.
#[async_trait]
pub trait CoinSource: Send + Sync {
    /// Short identifier used in logs ("store", "coingecko").
    fn name(&self) -> &str;

    /// One page, ordered by market-cap rank ascending.
    async fn coins_page(&self, page: &PageRequest) -> CoinboardResult<Vec<Coin>>;

    /// Case-insensitive substring search over name and symbol, rank ordered.
    async fn search(&self, query: &str, limit: usize) -> CoinboardResult<Vec<Coin>>;
}

/// Per-coin endpoints only the remote API can serve.
#[async_trait]
pub trait MarketDataApi: Send + Sync {
    async fn coin_details(&self, id: &str) -> CoinboardResult<CoinDetails>;

    async fn market_chart(&self, id: &str, days: ChartDays) -> CoinboardResult<MarketChartData>;

    /// Liveness probe.
    async fn ping(&self) -> CoinboardResult<()>;
}
