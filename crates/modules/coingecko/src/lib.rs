//! CoinGecko v3 data provider.
//!
//! [`CoinGeckoClient`] implements both [`CoinSource`](coinboard_common::traits::CoinSource)
//! (paged market list, local search) and
//! [`MarketDataApi`](coinboard_common::traits::MarketDataApi) (details, charts, ping).

pub mod client;
pub mod convert;
pub mod wire;

pub use client::CoinGeckoClient;
