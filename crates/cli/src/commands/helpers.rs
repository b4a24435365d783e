//! Shared helpers for CLI commands.

use anyhow::Result;
use coinboard_core::workspace;
use coinboard_core::{MarketQueries, MarketService};
use coinboard_types::config::AppConfig;

/// Market service wired from config: store (if synced) then CoinGecko.
pub fn market_service(config: &AppConfig) -> Result<MarketService> {
    let store_path = workspace::store_path(config)?;
    Ok(MarketService::from_config(config, &store_path)?)
}

/// The service behind the query presets, so commands retry transient failures.
pub fn market_queries(config: &AppConfig) -> Result<MarketQueries> {
    Ok(MarketQueries::new(market_service(config)?, &config.query))
}

/// Show only the first and last 4 characters of a secret.
pub fn mask_secret(secret: Option<&str>) -> String {
    match secret {
        None | Some("") => "(not set)".to_string(),
        Some(s) if s.chars().count() <= 8 => "****".to_string(),
        Some(s) => {
            let chars: Vec<char> = s.chars().collect();
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[chars.len() - 4..].iter().collect();
            format!("{head}…{tail}")
        }
    }
}
