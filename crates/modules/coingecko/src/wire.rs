//! Raw CoinGecko v3 response shapes.
//!
//! Every numeric field is optional: CoinGecko sends `null` for unknown
//! supplies, unranked coins and fresh listings. `convert` turns these into
//! the coerced domain types.

use std::collections::HashMap;

use serde::Deserialize;

use coinboard_common::types::{CoinLinks, Description};

#[derive(Deserialize, Debug, Clone)]
pub struct PingResponse {
    pub gecko_says: String,
}

/// Row of `/coins/markets`.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct CoinMarket {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub image: Option<String>,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub market_cap_rank: Option<u32>,
    pub total_volume: Option<f64>,
    pub high_24h: Option<f64>,
    pub low_24h: Option<f64>,
    pub price_change_24h: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
    pub market_cap_change_24h: Option<f64>,
    pub market_cap_change_percentage_24h: Option<f64>,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
    pub max_supply: Option<f64>,
    pub ath: Option<f64>,
    pub ath_change_percentage: Option<f64>,
    pub ath_date: Option<String>,
    pub atl: Option<f64>,
    pub atl_change_percentage: Option<f64>,
    pub atl_date: Option<String>,
    pub last_updated: Option<String>,
}

/// `/coins/{id}` with `market_data=true`.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct CoinDetail {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub image: Option<CoinImage>,
    /// CoinGecko occasionally puts `null` entries in this list.
    pub categories: Option<Vec<Option<String>>>,
    pub description: Option<Description>,
    pub links: Option<CoinLinks>,
    pub market_cap_rank: Option<u32>,
    pub market_data: Option<MarketData>,
    pub community_data: Option<serde_json::Value>,
    pub developer_data: Option<serde_json::Value>,
    pub last_updated: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct CoinImage {
    pub thumb: Option<String>,
    pub small: Option<String>,
    pub large: Option<String>,
}

/// Values keyed by quote currency (`{"usd": 64210.0, "eur": ...}`).
pub type CurrencyMap<T> = HashMap<String, Option<T>>;

#[derive(Deserialize, Debug, Clone, Default)]
pub struct MarketData {
    pub current_price: Option<CurrencyMap<f64>>,
    pub market_cap: Option<CurrencyMap<f64>>,
    pub market_cap_rank: Option<u32>,
    pub total_volume: Option<CurrencyMap<f64>>,
    pub high_24h: Option<CurrencyMap<f64>>,
    pub low_24h: Option<CurrencyMap<f64>>,
    pub price_change_24h: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
    pub price_change_24h_in_currency: Option<CurrencyMap<f64>>,
    pub price_change_percentage_24h_in_currency: Option<CurrencyMap<f64>>,
    pub market_cap_change_24h: Option<f64>,
    pub market_cap_change_percentage_24h: Option<f64>,
    pub market_cap_change_24h_in_currency: Option<CurrencyMap<f64>>,
    pub market_cap_change_percentage_24h_in_currency: Option<CurrencyMap<f64>>,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
    pub max_supply: Option<f64>,
    pub ath: Option<CurrencyMap<f64>>,
    pub ath_change_percentage: Option<CurrencyMap<f64>>,
    pub ath_date: Option<CurrencyMap<String>>,
    pub atl: Option<CurrencyMap<f64>>,
    pub atl_change_percentage: Option<CurrencyMap<f64>>,
    pub atl_date: Option<CurrencyMap<String>>,
    pub last_updated: Option<String>,
}

/// `/coins/{id}/market_chart`. Tuples are kept untyped until validated.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct MarketChart {
    pub prices: Option<Vec<serde_json::Value>>,
    pub market_caps: Option<Vec<serde_json::Value>>,
    pub total_volumes: Option<Vec<serde_json::Value>>,
}
