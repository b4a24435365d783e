use serde::{Deserialize, Serialize};

use coinboard_common::constants::{
    COINGECKO_PRO_API, COINGECKO_PUBLIC_API, DEFAULT_PER_PAGE, DEFAULT_VS_CURRENCY, MAX_PER_PAGE,
    MAX_RATE_LIMIT_RETRIES,
};
use coinboard_common::error::{CoinboardError, CoinboardResult};

/// Top-level configuration stored in `$HOME/.coinboard/config.toml`.
///
/// Every section falls back to its defaults when missing, so a partial
/// file written by hand still loads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub system: SystemConfig,
    pub api: ApiConfig,
    pub store: StoreConfig,
    pub query: QueryConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Raise the default log filter to `debug`.
    pub verbose: bool,
}

/// CoinGecko access tier. Decides the base URL and the auth header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiTier {
    /// No key, strict rate limits.
    #[default]
    Public,
    /// Free demo key, sent as `x-cg-demo-api-key`.
    Demo,
    /// Paid key, sent as `x-cg-pro-api-key` to the pro host.
    Pro,
}

impl std::fmt::Display for ApiTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiTier::Public => write!(f, "public"),
            ApiTier::Demo => write!(f, "demo"),
            ApiTier::Pro => write!(f, "pro"),
        }
    }
}

impl std::str::FromStr for ApiTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" => Ok(ApiTier::Public),
            "demo" => Ok(ApiTier::Demo),
            "pro" => Ok(ApiTier::Pro),
            other => Err(format!("unknown tier '{other}' (expected public, demo or pro)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub tier: ApiTier,
    /// Overridden by `COINGECKO_API_KEY` when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Custom base URL (proxies, mirrors). Defaults per tier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub vs_currency: String,
    pub timeout_secs: u64,
    /// How many times a 429 is retried inside the client.
    pub rate_limit_retries: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            tier: ApiTier::Public,
            api_key: None,
            base_url: None,
            vs_currency: DEFAULT_VS_CURRENCY.to_string(),
            timeout_secs: 30,
            rate_limit_retries: 3,
        }
    }
}

impl ApiConfig {
    pub fn resolved_base_url(&self) -> String {
        match (&self.base_url, self.tier) {
            (Some(url), _) => url.trim_end_matches('/').to_string(),
            (None, ApiTier::Pro) => COINGECKO_PRO_API.to_string(),
            (None, _) => COINGECKO_PUBLIC_API.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Read the local SQLite store before calling the API.
    pub enabled: bool,
    /// Database file. Defaults to `<workspace>/data/coins.db`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

/// Freshness and refresh cadence of the query cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub stale_secs: u64,
    pub list_refresh_secs: u64,
    pub detail_refresh_secs: u64,
    pub list_retries: u32,
    pub detail_retries: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            stale_secs: 30,
            list_refresh_secs: 30,
            detail_refresh_secs: 60,
            list_retries: 1,
            detail_retries: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub per_page: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl AppConfig {
    /// Reject values the rest of the pipeline cannot work with.
    pub fn validate(&self) -> CoinboardResult<()> {
        if let Some(raw) = &self.api.base_url {
            let parsed = url::Url::parse(raw)
                .map_err(|e| CoinboardError::Config(format!("api.base_url '{raw}': {e}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(CoinboardError::Config(format!(
                    "api.base_url must be http(s), got '{}'",
                    parsed.scheme()
                )));
            }
        }
        if self.api.tier != ApiTier::Public && self.api.api_key.is_none() {
            return Err(CoinboardError::Config(format!(
                "tier '{}' requires an API key",
                self.api.tier
            )));
        }
        if self.api.vs_currency.trim().is_empty() {
            return Err(CoinboardError::Config("api.vs_currency is empty".into()));
        }
        if self.api.rate_limit_retries > MAX_RATE_LIMIT_RETRIES {
            return Err(CoinboardError::Config(format!(
                "api.rate_limit_retries must be at most {MAX_RATE_LIMIT_RETRIES}"
            )));
        }
        if self.display.per_page == 0 || self.display.per_page > MAX_PER_PAGE {
            return Err(CoinboardError::Config(format!(
                "display.per_page must be between 1 and {MAX_PER_PAGE}"
            )));
        }
        Ok(())
    }
}
