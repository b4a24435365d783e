//! CoinGecko v3 REST client.
//!
//! Supports the public API (no key), the Demo API (`x-cg-demo-api-key`) and
//! the Pro API (`x-cg-pro-api-key` on the pro host). Rate-limit aware with
//! bounded exponential backoff on 429 responses.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

use coinboard_common::error::{CoinboardError, CoinboardResult};
use coinboard_common::traits::{CoinSource, MarketDataApi};
use coinboard_common::types::{ChartDays, Coin, CoinDetails, MarketChartData, PageRequest};
use coinboard_types::config::{ApiConfig, ApiTier};

use crate::convert;
use crate::wire;

/// Page size used when searching without a store.
const SEARCH_PAGE_SIZE: u32 = 100;

/// Longest response body quoted back in an upstream error.
const MAX_ERROR_BODY: usize = 200;

/// Cap on a single 429 backoff.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// CoinGecko HTTP client with rate-limit handling.
#[derive(Clone)]
pub struct CoinGeckoClient {
    http: Client,
    base_url: String,
    tier: ApiTier,
    api_key: Option<String>,
    vs_currency: String,
    rate_limit_retries: u32,
    backoff: Duration,
}

impl std::fmt::Debug for CoinGeckoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoinGeckoClient")
            .field("base_url", &self.base_url)
            .field("tier", &self.tier)
            .field("has_key", &self.api_key.is_some())
            .finish()
    }
}

impl CoinGeckoClient {
    /// Build a client from the `[api]` config section.
    pub fn new(config: &ApiConfig) -> CoinboardResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("coinboard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CoinboardError::Config(format!("build HTTP client: {e}")))?;

        let client = Self {
            http,
            base_url: config.resolved_base_url(),
            tier: config.tier,
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            vs_currency: config.vs_currency.clone(),
            rate_limit_retries: config.rate_limit_retries,
            backoff: Duration::from_secs(1),
        };
        info!(base_url = %client.base_url, tier = %client.tier, "CoinGecko client initialized");
        Ok(client)
    }

    /// Point the client at another host (mirrors, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// First 429 backoff; doubles on every further attempt.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn vs_currency(&self) -> &str {
        &self.vs_currency
    }

    /// Auth header name, if the tier sends one.
    fn auth_header(&self) -> Option<&'static str> {
        match self.tier {
            ApiTier::Public => None,
            ApiTier::Demo => Some("x-cg-demo-api-key"),
            ApiTier::Pro => Some("x-cg-pro-api-key"),
        }
    }

    /// Endpoint URL from path segments. Each segment is percent-encoded, so
    /// a coin id can never add path, query or fragment parts.
    fn endpoint(&self, segments: &[&str]) -> CoinboardResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| CoinboardError::Config(format!("base url '{}': {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| CoinboardError::Config(format!("base url '{}' cannot take a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Backoff before 429 retry `attempt` (1-based): doubles each time, capped.
    fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.backoff.saturating_mul(factor).min(MAX_BACKOFF)
    }

    /// Execute a GET request with retry on 429.
    async fn get<T: DeserializeOwned>(&self, segments: &[&str], query: &[(&str, &str)]) -> CoinboardResult<T> {
        let url = self.endpoint(segments)?;
        let path = url.path().to_string();
        let mut retries = 0u32;

        loop {
            let mut request = self.http.get(url.clone()).query(query);
            if let (Some(header), Some(key)) = (self.auth_header(), &self.api_key) {
                request = request.header(header, key);
            }

            let resp = request
                .send()
                .await
                .map_err(|e| CoinboardError::Transport(format!("GET {path}: {e}")))?;
            let status = resp.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                retries += 1;
                if retries > self.rate_limit_retries {
                    return Err(CoinboardError::RateLimited(format!(
                        "CoinGecko rate limited after {} retries",
                        self.rate_limit_retries
                    )));
                }
                let wait = self.backoff_for(retries);
                warn!(
                    "CoinGecko 429, retrying in {:?} (attempt {retries}/{})",
                    wait, self.rate_limit_retries
                );
                tokio::time::sleep(wait).await;
                continue;
            }

            let body = resp
                .text()
                .await
                .map_err(|e| CoinboardError::Transport(format!("read {path}: {e}")))?;

            if !status.is_success() {
                let snippet: String = body.chars().take(MAX_ERROR_BODY).collect();
                return Err(CoinboardError::upstream(status.as_u16(), snippet));
            }

            debug!(%path, status = status.as_u16(), bytes = body.len(), "CoinGecko response");
            return serde_json::from_str(&body)
                .map_err(|e| CoinboardError::malformed(format!("decode {path}: {e}")));
        }
    }

    // ── Endpoints ───────────────────────────────────────────────

    /// `/coins/markets`, ordered by market cap.
    pub async fn markets(&self, page: &PageRequest) -> CoinboardResult<Vec<Coin>> {
        let page_s = page.page.to_string();
        let per_page_s = page.per_page.to_string();
        let rows: Vec<wire::CoinMarket> = self
            .get(
                &["coins", "markets"],
                &[
                    ("vs_currency", page.vs_currency.as_str()),
                    ("order", "market_cap_desc"),
                    ("per_page", per_page_s.as_str()),
                    ("page", page_s.as_str()),
                    ("sparkline", "false"),
                    ("price_change_percentage", "24h"),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(convert::coin_from_market).collect())
    }

    /// `/coins/{id}` with market, community and developer data.
    pub async fn coin(&self, id: &str) -> CoinboardResult<CoinDetails> {
        let detail: wire::CoinDetail = self
            .get(
                &["coins", id],
                &[
                    ("localization", "false"),
                    ("tickers", "false"),
                    ("market_data", "true"),
                    ("community_data", "true"),
                    ("developer_data", "true"),
                ],
            )
            .await
            .map_err(|e| not_found_as(e, id))?;
        Ok(convert::details_from_wire(detail, &self.vs_currency))
    }

    /// `/coins/{id}/market_chart`.
    pub async fn chart(&self, id: &str, days: ChartDays) -> CoinboardResult<MarketChartData> {
        let days_s = days.to_string();
        let chart: wire::MarketChart = self
            .get(&["coins", id, "market_chart"], &[("vs_currency", self.vs_currency.as_str()), ("days", days_s.as_str())])
            .await
            .map_err(|e| not_found_as(e, id))?;
        convert::chart_from_wire(chart)
    }
}

/// An upstream 404 on a per-coin endpoint means the id is unknown.
fn not_found_as(err: CoinboardError, id: &str) -> CoinboardError {
    match err {
        CoinboardError::Upstream {
            status: Some(404), ..
        } => CoinboardError::NotFound(id.to_string()),
        other => other,
    }
}

#[async_trait]
impl CoinSource for CoinGeckoClient {
    fn name(&self) -> &str {
        "coingecko"
    }

    async fn coins_page(&self, page: &PageRequest) -> CoinboardResult<Vec<Coin>> {
        self.markets(page).await
    }

    /// No search endpoint is used: the first market page is filtered locally.
    async fn search(&self, query: &str, limit: usize) -> CoinboardResult<Vec<Coin>> {
        let page = PageRequest::new(1, SEARCH_PAGE_SIZE)?.with_currency(self.vs_currency.clone());
        let needle = query.trim().to_lowercase();
        let mut coins: Vec<Coin> = self
            .markets(&page)
            .await?
            .into_iter()
            .filter(|c| c.matches(&needle))
            .collect();
        coins.truncate(limit);
        Ok(coins)
    }
}

#[async_trait]
impl MarketDataApi for CoinGeckoClient {
    async fn coin_details(&self, id: &str) -> CoinboardResult<CoinDetails> {
        self.coin(id).await
    }

    async fn market_chart(&self, id: &str, days: ChartDays) -> CoinboardResult<MarketChartData> {
        self.chart(id, days).await
    }

    async fn ping(&self) -> CoinboardResult<()> {
        let resp: wire::PingResponse = self.get(&["ping"], &[]).await?;
        debug!(gecko_says = %resp.gecko_says, "ping");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(server: &mockito::ServerGuard, config: ApiConfig) -> CoinGeckoClient {
        CoinGeckoClient::new(&config)
            .unwrap()
            .with_base_url(server.url())
            .with_backoff(Duration::from_millis(1))
    }

    fn markets_body() -> String {
        serde_json::json!([
            { "id": "bitcoin", "symbol": "btc", "name": "Bitcoin", "current_price": 64000.0,
              "market_cap": 1.26e12, "market_cap_rank": 1, "total_volume": 3.1e10 },
            { "id": "ethereum", "symbol": "eth", "name": "Ethereum", "current_price": 3100.0,
              "market_cap": null, "market_cap_rank": 2, "total_volume": null },
            { "id": "tether", "symbol": "usdt", "name": "Tether", "current_price": 1.0,
              "market_cap_rank": 3 }
        ])
        .to_string()
    }

    #[tokio::test]
    async fn test_markets_sends_paging_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/coins/markets")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("vs_currency".into(), "usd".into()),
                Matcher::UrlEncoded("order".into(), "market_cap_desc".into()),
                Matcher::UrlEncoded("per_page".into(), "50".into()),
                Matcher::UrlEncoded("page".into(), "2".into()),
                Matcher::UrlEncoded("sparkline".into(), "false".into()),
                Matcher::UrlEncoded("price_change_percentage".into(), "24h".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(markets_body())
            .create_async()
            .await;

        let cg = client(&server, ApiConfig::default());
        let coins = cg.markets(&PageRequest::new(2, 50).unwrap()).await.unwrap();
        mock.assert_async().await;
        assert_eq!(coins.len(), 3);
        assert_eq!(coins[1].market_cap, 0.0);
        assert_eq!(coins[1].total_volume, 0.0);
    }

    #[tokio::test]
    async fn test_demo_tier_sends_key_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ping")
            .match_header("x-cg-demo-api-key", "CG-demo")
            .with_status(200)
            .with_body(r#"{"gecko_says":"(V3) To the Moon!"}"#)
            .create_async()
            .await;

        let config = ApiConfig {
            tier: ApiTier::Demo,
            api_key: Some("CG-demo".into()),
            ..Default::default()
        };
        client(&server, config).ping().await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unknown_coin_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/coins/bitcoinz")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"error":"coin not found"}"#)
            .create_async()
            .await;

        let err = client(&server, ApiConfig::default())
            .coin_details("bitcoinz")
            .await
            .unwrap_err();
        assert_eq!(err, CoinboardError::NotFound("bitcoinz".into()));
    }

    #[tokio::test]
    async fn test_server_error_is_upstream() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/coins/bitcoin/market_chart")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let err = client(&server, ApiConfig::default())
            .market_chart("bitcoin", ChartDays::Days(7))
            .await
            .unwrap_err();
        assert_eq!(err, CoinboardError::upstream(503, "maintenance"));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried() {
        let mut server = mockito::Server::new_async().await;
        let limited = server
            .mock("GET", "/ping")
            .with_status(429)
            .expect(1)
            .create_async()
            .await;
        let ok = server
            .mock("GET", "/ping")
            .with_status(200)
            .with_body(r#"{"gecko_says":"ok"}"#)
            .expect(1)
            .create_async()
            .await;

        // mockito serves the first matching mock until its expectation is met
        client(&server, ApiConfig::default()).ping().await.unwrap();
        limited.assert_async().await;
        ok.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limit_exhausted() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ping")
            .with_status(429)
            .expect(3)
            .create_async()
            .await;

        let config = ApiConfig {
            rate_limit_retries: 2,
            ..Default::default()
        };
        let err = client(&server, config).ping().await.unwrap_err();
        assert!(matches!(err, CoinboardError::RateLimited(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_malformed_json_is_upstream() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/coins/markets")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let err = client(&server, ApiConfig::default())
            .coins_page(&PageRequest::new(1, 10).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, CoinboardError::Upstream { status: None, .. }));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_chart_days_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/coins/bitcoin/market_chart")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("vs_currency".into(), "usd".into()),
                Matcher::UrlEncoded("days".into(), "max".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"prices":[[1700000000000,100.0]],"market_caps":[],"total_volumes":[]}"#)
            .create_async()
            .await;

        let chart = client(&server, ApiConfig::default())
            .market_chart("bitcoin", ChartDays::Max)
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(chart.prices, vec![[1.7e12, 100.0]]);
    }

    #[tokio::test]
    async fn test_search_filters_first_page() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/coins/markets")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("per_page".into(), "100".into()),
                Matcher::UrlEncoded("page".into(), "1".into()),
            ]))
            .with_status(200)
            .with_body(markets_body())
            .create_async()
            .await;

        let coins = client(&server, ApiConfig::default())
            .search("  ETH ", 50)
            .await
            .unwrap();
        mock.assert_async().await;
        let ids: Vec<_> = coins.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["ethereum", "tether"]);
    }

    #[test]
    fn test_coin_id_is_one_path_segment() {
        let cg = CoinGeckoClient::new(&ApiConfig::default())
            .unwrap()
            .with_base_url("https://api.example.com/api/v3/");
        let url = cg.endpoint(&["coins", "a/b?c#d", "market_chart"]).unwrap();
        assert_eq!(url.path(), "/api/v3/coins/a%2Fb%3Fc%23d/market_chart");
        assert!(url.query().is_none());
        assert!(url.fragment().is_none());
    }

    #[tokio::test]
    async fn test_encoded_id_reaches_coin_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/coins/wrapped%2Fbtc")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"error":"coin not found"}"#)
            .create_async()
            .await;

        let err = client(&server, ApiConfig::default())
            .coin_details("wrapped/btc")
            .await
            .unwrap_err();
        mock.assert_async().await;
        assert_eq!(err, CoinboardError::NotFound("wrapped/btc".into()));
    }

    #[test]
    fn test_backoff_doubles_and_saturates() {
        let cg = CoinGeckoClient::new(&ApiConfig::default())
            .unwrap()
            .with_backoff(Duration::from_secs(1));
        assert_eq!(cg.backoff_for(1), Duration::from_secs(1));
        assert_eq!(cg.backoff_for(3), Duration::from_secs(4));
        assert_eq!(cg.backoff_for(33), MAX_BACKOFF);
        assert_eq!(cg.backoff_for(u32::MAX), MAX_BACKOFF);
    }
}
