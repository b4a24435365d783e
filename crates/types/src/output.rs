//! Structured output types for JSON/table rendering.
//!
//! Every data-producing command returns one of these types. They derive
//! `Serialize` for JSON output and implement `TableDisplay` (in
//! `coinboard-utils`) for the human-readable table. Display values are
//! formatted once, when the row is built.

use serde::Serialize;

// ─── Coin list ──────────────────────────────────────────────────────

/// One screen of the coin table (list, search, gainers, trending, recent).
///
/// ```json
/// {
///   "title": "Top coins",
///   "page": 1,
///   "per_page": 100,
///   "sort": "market_cap_rank asc",
///   "coins": [{ "rank": 1, "id": "bitcoin", "symbol": "BTC", "price": "$64,210.00", ... }]
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct CoinsOutput {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    pub sort: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    pub coins: Vec<CoinRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoinRow {
    /// `"-"` for unranked coins.
    pub rank: String,
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub price: String,
    pub change_24h: String,
    pub market_cap: String,
    pub volume_24h: String,
}

// ─── Coin details ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct CoinDetailOutput {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub rank: String,
    pub price: String,
    pub change_24h: String,
    pub high_24h: String,
    pub low_24h: String,
    /// Position of the current price inside the 24h range, 0..=100.
    pub range_position: f64,
    pub market_cap: String,
    pub market_cap_change_24h: String,
    pub volume_24h: String,
    pub circulating_supply: String,
    pub total_supply: String,
    pub max_supply: String,
    pub ath: String,
    pub ath_change: String,
    pub atl: String,
    pub atl_change: String,
    pub categories: Vec<String>,
    pub links: Vec<String>,
    pub description: String,
    pub last_updated: String,
}

// ─── Chart ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ChartOutput {
    pub id: String,
    pub range: String,
    pub days: String,
    pub points: usize,
    pub open: String,
    pub close: String,
    pub high: String,
    pub low: String,
    pub change: String,
    pub series: Vec<ChartRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartRow {
    pub timestamp: i64,
    pub time: String,
    pub price: String,
}

// ─── Trading history ────────────────────────────────────────────────

/// Synthetic trade list derived from the latest chart points.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryOutput {
    pub id: String,
    pub range: String,
    pub trades: Vec<TradeRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TradeRow {
    pub side: String,
    pub amount: String,
    pub price: String,
    pub time: String,
}

// ─── Store ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct StoreStatusOutput {
    pub path: String,
    pub enabled: bool,
    pub exists: bool,
    pub coins: u64,
    /// UTC time of the last `store sync`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncOutput {
    pub path: String,
    pub pages: u32,
    pub coins_written: usize,
}

// ─── Config ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ConfigOutput {
    pub config_path: String,
    pub tier: String,
    /// Masked, never the raw key.
    pub api_key: String,
    pub base_url: String,
    pub vs_currency: String,
    pub timeout_secs: u64,
    pub store_enabled: bool,
    pub store_path: String,
    pub stale_secs: u64,
    pub per_page: u32,
}

// ─── Doctor ─────────────────────────────────────────────────────────

/// One doctor check result.
///
/// Status is "ok" or "fail". On failure, `fix` contains the actionable hint.
#[derive(Debug, Clone, Serialize)]
pub struct DoctorCheck {
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
}

impl DoctorCheck {
    pub fn ok(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: "ok".into(),
            value: Some(value.into()),
            fix: None,
        }
    }

    pub fn fail(name: impl Into<String>, fix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: "fail".into(),
            value: None,
            fix: Some(fix.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorOutput {
    pub checks: Vec<DoctorCheck>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coins_output_serializes() {
        let output = CoinsOutput {
            title: "Top coins".into(),
            page: Some(1),
            per_page: Some(100),
            sort: "market_cap_rank asc".into(),
            filter: None,
            coins: vec![CoinRow {
                rank: "1".into(),
                id: "bitcoin".into(),
                symbol: "BTC".into(),
                name: "Bitcoin".into(),
                price: "$64,210.00".into(),
                change_24h: "+1.20%".into(),
                market_cap: "$1.26T".into(),
                volume_24h: "$31.4B".into(),
            }],
        };
        let json = serde_json::to_string(&output).unwrap();
        assert!(json.contains("\"id\":\"bitcoin\""));
        assert!(json.contains("\"page\":1"));
        assert!(!json.contains("\"filter\""));
    }

    #[test]
    fn test_doctor_check_constructors() {
        let ok = DoctorCheck::ok("api", "42ms");
        assert!(ok.is_ok());
        assert_eq!(ok.value.as_deref(), Some("42ms"));

        let fail = DoctorCheck::fail("store", "Run: coinboard store sync");
        assert!(!fail.is_ok());
        let json = serde_json::to_string(&fail).unwrap();
        assert!(json.contains("\"fix\""));
        assert!(!json.contains("\"value\""));
    }
}
