//! Domain types shared by the store, the API client, the pipeline and the views.
//!
//! Every source converts its own representation into these types before
//! anything downstream sees the data. Numeric fields are plain `f64` by the
//! time they land here: missing or unparseable values have already been
//! coerced to `0.0`.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_VS_CURRENCY, MAX_PER_PAGE};
use crate::error::{CoinboardError, CoinboardResult};

// ── Coin snapshot ──────────────────────────────────────────────────────

/// Market snapshot of one tracked coin.
///
/// Replaced wholesale on every fetch, never patched in place.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Coin {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub image: String,

    pub current_price: f64,
    pub market_cap: f64,
    /// `0` means unranked.
    pub market_cap_rank: u32,
    pub total_volume: f64,
    pub high_24h: f64,
    pub low_24h: f64,
    pub price_change_24h: f64,
    pub price_change_percentage_24h: f64,
    pub market_cap_change_24h: f64,
    pub market_cap_change_percentage_24h: f64,

    pub circulating_supply: f64,
    pub total_supply: f64,
    pub max_supply: f64,

    pub ath: f64,
    pub ath_change_percentage: f64,
    #[serde(default)]
    pub ath_date: String,
    pub atl: f64,
    pub atl_change_percentage: f64,
    #[serde(default)]
    pub atl_date: String,
    #[serde(default)]
    pub last_updated: String,
}

impl Coin {
    /// Value used by client-side sorting. `None` is the "null" bucket:
    /// non-finite numbers and the unranked rank `0`.
    pub fn sort_value(&self, key: SortKey) -> Option<f64> {
        let value = match key {
            SortKey::MarketCapRank => {
                if self.market_cap_rank == 0 {
                    return None;
                }
                f64::from(self.market_cap_rank)
            }
            SortKey::CurrentPrice => self.current_price,
            SortKey::PriceChangePercentage24h => self.price_change_percentage_24h,
            SortKey::MarketCap => self.market_cap,
            SortKey::TotalVolume => self.total_volume,
        };
        value.is_finite().then_some(value)
    }

    /// Case-insensitive substring match over name and symbol.
    /// `needle` must already be lowercased.
    pub fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle) || self.symbol.to_lowercase().contains(needle)
    }
}

// ── Coin details ───────────────────────────────────────────────────────

/// A coin plus its descriptive metadata, fetched per id.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CoinDetails {
    #[serde(flatten)]
    pub coin: Coin,
    #[serde(default)]
    pub description: Description,
    #[serde(default)]
    pub links: CoinLinks,
    #[serde(default, deserialize_with = "null_as_default")]
    pub categories: Vec<String>,
    /// Passed through unmodified.
    #[serde(default)]
    pub developer_data: serde_json::Value,
    /// Passed through unmodified.
    #[serde(default)]
    pub community_data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Description {
    #[serde(default, deserialize_with = "null_as_default")]
    pub en: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinLinks {
    #[serde(deserialize_with = "null_as_default")]
    pub homepage: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub blockchain_site: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub official_forum_url: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub chat_url: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub announcement_url: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub twitter_screen_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub facebook_username: String,
    #[serde(deserialize_with = "null_as_default")]
    pub telegram_channel_identifier: String,
    #[serde(deserialize_with = "null_as_default")]
    pub subreddit_url: String,
    pub repos_url: ReposUrl,
}

impl CoinLinks {
    /// Non-empty entries across every URL list, in display order.
    pub fn urls(&self) -> Vec<&str> {
        self.homepage
            .iter()
            .chain(&self.blockchain_site)
            .chain(&self.official_forum_url)
            .chain(&self.chat_url)
            .chain(&self.announcement_url)
            .chain(&self.repos_url.github)
            .chain(&self.repos_url.bitbucket)
            .map(String::as_str)
            .chain(std::iter::once(self.subreddit_url.as_str()))
            .filter(|u| !u.trim().is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReposUrl {
    #[serde(deserialize_with = "null_as_default")]
    pub github: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub bitbucket: Vec<String>,
}

/// Treats an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ── Charts ─────────────────────────────────────────────────────────────

/// One point of a price chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    /// Unix millis.
    pub timestamp: i64,
    pub price: f64,
}

/// Parallel `[timestamp, value]` series over the requested window.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MarketChartData {
    pub prices: Vec<[f64; 2]>,
    #[serde(default)]
    pub market_caps: Vec<[f64; 2]>,
    #[serde(default)]
    pub total_volumes: Vec<[f64; 2]>,
}

/// Day-count parameter of the market-chart endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartDays {
    Days(u32),
    Max,
}

impl std::fmt::Display for ChartDays {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChartDays::Days(d) => write!(f, "{d}"),
            ChartDays::Max => write!(f, "max"),
        }
    }
}

/// User-selectable chart window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "1d")]
    Day,
    #[default]
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
    #[serde(rename = "1y")]
    Year,
    #[serde(rename = "max")]
    Max,
}

impl TimeRange {
    pub const ALL: [TimeRange; 6] = [
        TimeRange::Day,
        TimeRange::Week,
        TimeRange::Month,
        TimeRange::Quarter,
        TimeRange::Year,
        TimeRange::Max,
    ];

    pub fn token(self) -> &'static str {
        match self {
            TimeRange::Day => "1d",
            TimeRange::Week => "7d",
            TimeRange::Month => "30d",
            TimeRange::Quarter => "90d",
            TimeRange::Year => "1y",
            TimeRange::Max => "max",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.token() == token)
    }

    pub fn days(self) -> ChartDays {
        match self {
            TimeRange::Day => ChartDays::Days(1),
            TimeRange::Week => ChartDays::Days(7),
            TimeRange::Month => ChartDays::Days(30),
            TimeRange::Quarter => ChartDays::Days(90),
            TimeRange::Year => ChartDays::Days(365),
            TimeRange::Max => ChartDays::Max,
        }
    }

    /// Next range in display order, wrapping around.
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|r| *r == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

impl std::str::FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_token(s).ok_or_else(|| {
            format!("unknown time range '{s}' (expected 1d, 7d, 30d, 90d, 1y or max)")
        })
    }
}

// ── Sorting ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    MarketCapRank,
    CurrentPrice,
    #[serde(rename = "price_change_percentage_24h")]
    PriceChangePercentage24h,
    MarketCap,
    TotalVolume,
}

impl SortKey {
    pub const ALL: [SortKey; 5] = [
        SortKey::MarketCapRank,
        SortKey::CurrentPrice,
        SortKey::PriceChangePercentage24h,
        SortKey::MarketCap,
        SortKey::TotalVolume,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::MarketCapRank => "market_cap_rank",
            SortKey::CurrentPrice => "current_price",
            SortKey::PriceChangePercentage24h => "price_change_percentage_24h",
            SortKey::MarketCap => "market_cap",
            SortKey::TotalVolume => "total_volume",
        }
    }

    /// Column header label.
    pub fn label(self) -> &'static str {
        match self {
            SortKey::MarketCapRank => "#",
            SortKey::CurrentPrice => "Price",
            SortKey::PriceChangePercentage24h => "24h %",
            SortKey::MarketCap => "Market Cap",
            SortKey::TotalVolume => "Volume (24h)",
        }
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown sort key '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn arrow(self) -> &'static str {
        match self {
            SortDirection::Asc => "▲",
            SortDirection::Desc => "▼",
        }
    }
}

impl std::str::FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("unknown sort direction '{other}'")),
        }
    }
}

/// Active table sort. Session-local, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortState {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortState {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Selecting the active ascending key flips it to descending; any other
    /// selection sorts ascending.
    pub fn select(self, key: SortKey) -> Self {
        let direction = if self.key == key && self.direction == SortDirection::Asc {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        Self { key, direction }
    }
}

// ── Paging ─────────────────────────────────────────────────────────────

/// One page of the market-cap ordered coin list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
    pub vs_currency: String,
}

impl PageRequest {
    /// Validated page request in the default quote currency.
    pub fn new(page: u32, per_page: u32) -> CoinboardResult<Self> {
        if page == 0 {
            return Err(CoinboardError::Validation("page must be >= 1".into()));
        }
        if per_page == 0 || per_page > MAX_PER_PAGE {
            return Err(CoinboardError::Validation(format!(
                "per_page must be between 1 and {MAX_PER_PAGE}"
            )));
        }
        Ok(Self {
            page,
            per_page,
            vs_currency: DEFAULT_VS_CURRENCY.to_string(),
        })
    }

    pub fn with_currency(mut self, vs_currency: impl Into<String>) -> Self {
        self.vs_currency = vs_currency.into();
        self
    }

    /// Row offset of the first coin on this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }
}

// ── Synthetic trades ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "buy"),
            TradeSide::Sell => write!(f, "sell"),
        }
    }
}

/// Placeholder trade derived from chart points for the history panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: usize,
    pub side: TradeSide,
    pub amount: f64,
    pub price: f64,
    pub timestamp: i64,
}
