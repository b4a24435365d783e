//! Universal constants for coinboard.

/// Public (keyless) CoinGecko v3 endpoint.
pub const COINGECKO_PUBLIC_API: &str = "https://api.coingecko.com/api/v3";

/// Pro CoinGecko v3 endpoint.
pub const COINGECKO_PRO_API: &str = "https://pro-api.coingecko.com/api/v3";

/// Quote currency used when none is configured.
pub const DEFAULT_VS_CURRENCY: &str = "usd";

/// Rows per page on the market table.
pub const DEFAULT_PER_PAGE: u32 = 100;

/// Upper bound CoinGecko accepts for `per_page`.
pub const MAX_PER_PAGE: u32 = 250;

/// Upper bound for `api.rate_limit_retries`.
pub const MAX_RATE_LIMIT_RETRIES: u32 = 10;

/// Row cap for store-side substring search.
pub const SEARCH_LIMIT: usize = 50;

/// Sentinel rendered for missing or non-numeric values.
pub const NOT_AVAILABLE: &str = "N/A";
