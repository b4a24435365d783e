//! Unified output rendering: JSON or human-readable table.
//!
//! Usage:
//! ```ignore
//! use coinboard_utils::output::{OutputFormat, render};
//!
//! let data = coins_output("Top coins", &rows, ...);
//! render(format, &data)?;
//! ```

use anyhow::Result;
use serde::Serialize;

use coinboard_common::types::{ChartPoint, Coin, CoinDetails, SortState, TimeRange, TradeRecord};
use coinboard_types::output::*;

use crate::format::{
    format_currency, format_date, format_number, format_percentage, format_timestamp_ms,
};
use crate::transform::{price_range_position, transform_market_chart, ChartSummary};

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable table (default).
    #[default]
    Table,
    /// Compact JSON (for piping to jq, scripts).
    Json,
    /// Pretty-printed JSON (for reading).
    JsonPretty,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "json-pretty" => Ok(OutputFormat::JsonPretty),
            other => Err(format!("unknown output format '{other}' (table, json, json-pretty)")),
        }
    }
}

impl OutputFormat {
    pub fn is_json(self) -> bool {
        !matches!(self, OutputFormat::Table)
    }
}

/// Trait for types that can render as a human-readable table.
pub trait TableDisplay {
    fn print_table(&self);
}

/// Render structured output as JSON or a table depending on format.
pub fn render<T: Serialize + TableDisplay>(format: OutputFormat, data: &T) -> Result<()> {
    if !render_json_or(format, data)? {
        data.print_table();
    }
    Ok(())
}

/// Render just the JSON formats (for types that handle their own table display).
/// Returns true if JSON was rendered, false if table mode was requested.
pub fn render_json_or<T: Serialize>(format: OutputFormat, data: &T) -> Result<bool> {
    let json = match format {
        OutputFormat::Table => return Ok(false),
        OutputFormat::Json => serde_json::to_string(data)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(data)?,
    };
    println!("{json}");
    Ok(true)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

// ─── Builders ───────────────────────────────────────────────────────

pub fn coin_row(coin: &Coin) -> CoinRow {
    CoinRow {
        rank: if coin.market_cap_rank == 0 {
            "-".into()
        } else {
            coin.market_cap_rank.to_string()
        },
        id: coin.id.clone(),
        symbol: coin.symbol.to_uppercase(),
        name: coin.name.clone(),
        price: format_currency(coin.current_price, false),
        change_24h: format_percentage(coin.price_change_percentage_24h),
        market_cap: format_currency(coin.market_cap, true),
        volume_24h: format_currency(coin.total_volume, true),
    }
}

pub fn coins_output(
    title: impl Into<String>,
    coins: &[Coin],
    sort: SortState,
    filter: Option<&str>,
    paging: Option<(u32, u32)>,
) -> CoinsOutput {
    CoinsOutput {
        title: title.into(),
        page: paging.map(|(page, _)| page),
        per_page: paging.map(|(_, per_page)| per_page),
        sort: format!("{} {:?}", sort.key, sort.direction).to_lowercase(),
        filter: filter.filter(|q| !q.trim().is_empty()).map(str::to_string),
        coins: coins.iter().map(coin_row).collect(),
    }
}

pub fn detail_output(details: &CoinDetails) -> CoinDetailOutput {
    let c = &details.coin;
    let supply = |v: f64| {
        if v > 0.0 {
            format_number(v, true)
        } else {
            "∞".to_string()
        }
    };
    CoinDetailOutput {
        id: c.id.clone(),
        name: c.name.clone(),
        symbol: c.symbol.to_uppercase(),
        rank: c.market_cap_rank.to_string(),
        price: format_currency(c.current_price, false),
        change_24h: format_percentage(c.price_change_percentage_24h),
        high_24h: format_currency(c.high_24h, false),
        low_24h: format_currency(c.low_24h, false),
        range_position: price_range_position(c.low_24h, c.high_24h, c.current_price),
        market_cap: format_currency(c.market_cap, true),
        market_cap_change_24h: format_percentage(c.market_cap_change_percentage_24h),
        volume_24h: format_currency(c.total_volume, true),
        circulating_supply: format_number(c.circulating_supply, true),
        total_supply: supply(c.total_supply),
        max_supply: supply(c.max_supply),
        ath: format_currency(c.ath, false),
        ath_change: format_percentage(c.ath_change_percentage),
        atl: format_currency(c.atl, false),
        atl_change: format_percentage(c.atl_change_percentage),
        categories: details.categories.clone(),
        links: details.links.urls().into_iter().map(str::to_string).collect(),
        description: details.description.en.clone(),
        last_updated: format_date(&c.last_updated),
    }
}

pub fn chart_output(id: &str, range: TimeRange, points: &[ChartPoint]) -> ChartOutput {
    let summary = ChartSummary::from_points(points);
    let field = |f: fn(&ChartSummary) -> f64| format_currency(summary.as_ref().map(f), false);
    ChartOutput {
        id: id.to_string(),
        range: range.to_string(),
        days: range.days().to_string(),
        points: points.len(),
        open: field(|s| s.open),
        close: field(|s| s.close),
        high: field(|s| s.high),
        low: field(|s| s.low),
        change: format_percentage(summary.and_then(|s| s.change_pct)),
        series: points
            .iter()
            .map(|p| ChartRow {
                timestamp: p.timestamp,
                time: format_timestamp_ms(p.timestamp),
                price: format_currency(p.price, false),
            })
            .collect(),
    }
}

/// Chart output straight from raw `[timestamp, price]` pairs.
pub fn chart_output_from_pairs(id: &str, range: TimeRange, prices: &[[f64; 2]]) -> ChartOutput {
    chart_output(id, range, &transform_market_chart(prices))
}

pub fn history_output(id: &str, range: TimeRange, trades: &[TradeRecord]) -> HistoryOutput {
    HistoryOutput {
        id: id.to_string(),
        range: range.to_string(),
        trades: trades
            .iter()
            .map(|t| TradeRow {
                side: t.side.to_string(),
                amount: format!("{:.3}", t.amount),
                price: format_currency(t.price, false),
                time: format_timestamp_ms(t.timestamp),
            })
            .collect(),
    }
}

// ─── TableDisplay implementations for output types ──────────────────

impl TableDisplay for CoinsOutput {
    fn print_table(&self) {
        let mut header = format!("{} (sort: {}", self.title, self.sort);
        if let (Some(page), Some(per_page)) = (self.page, self.per_page) {
            header.push_str(&format!(", page {page}, {per_page}/page"));
        }
        if let Some(filter) = &self.filter {
            header.push_str(&format!(", filter: \"{filter}\""));
        }
        header.push(')');
        println!("{header}");

        if self.coins.is_empty() {
            println!("No coins found.");
            return;
        }

        println!("┌───────┬────────────────────────┬────────┬──────────────────┬──────────┬────────────┬──────────────┐");
        println!("│ #     │ Name                   │ Symbol │ Price            │ 24h %    │ Market Cap │ Volume (24h) │");
        println!("├───────┼────────────────────────┼────────┼──────────────────┼──────────┼────────────┼──────────────┤");
        for c in &self.coins {
            println!(
                "│ {:<5} │ {:<22} │ {:<6} │ {:>16} │ {:>8} │ {:>10} │ {:>12} │",
                c.rank,
                truncate(&c.name, 22),
                truncate(&c.symbol, 6),
                c.price,
                c.change_24h,
                c.market_cap,
                c.volume_24h,
            );
        }
        println!("└───────┴────────────────────────┴────────┴──────────────────┴──────────┴────────────┴──────────────┘");
    }
}

impl TableDisplay for CoinDetailOutput {
    fn print_table(&self) {
        println!("╔══════════════════════════════════════════════════════════╗");
        println!("║  {:<56}║", truncate(&format!("{} ({}) #{}", self.name, self.symbol, self.rank), 56));
        println!("╠══════════════════════════════════════════════════════════╣");
        println!("║  Price        : {:<41}║", format!("{} {}", self.price, self.change_24h));
        println!("║  24h Low      : {:<41}║", self.low_24h);
        println!("║  24h High     : {:<41}║", self.high_24h);
        println!("║  24h Range    : {:<41}║", range_bar(self.range_position, 30));
        println!("╠══════════════════════════════════════════════════════════╣");
        println!("║  Market Cap   : {:<41}║", format!("{} {}", self.market_cap, self.market_cap_change_24h));
        println!("║  Volume (24h) : {:<41}║", self.volume_24h);
        println!("║  Circulating  : {:<41}║", self.circulating_supply);
        println!("║  Total Supply : {:<41}║", self.total_supply);
        println!("║  Max Supply   : {:<41}║", self.max_supply);
        println!("║  ATH          : {:<41}║", format!("{} {}", self.ath, self.ath_change));
        println!("║  ATL          : {:<41}║", format!("{} {}", self.atl, self.atl_change));
        println!("║  Updated      : {:<41}║", self.last_updated);
        println!("╚══════════════════════════════════════════════════════════╝");

        if !self.categories.is_empty() {
            println!("Categories: {}", self.categories.join(", "));
        }
        for link in self.links.iter().take(5) {
            println!("  {link}");
        }
        if !self.description.is_empty() {
            println!();
            println!("{}", truncate(&self.description, 600));
        }
    }
}

/// `[────●──────]` marker for the 24h range panel.
fn range_bar(position: f64, width: usize) -> String {
    let slot = ((position / 100.0) * (width.saturating_sub(1)) as f64).round() as usize;
    let bar: String = (0..width)
        .map(|i| if i == slot { '●' } else { '─' })
        .collect();
    format!("[{bar}] {position:.0}%")
}

impl TableDisplay for ChartOutput {
    fn print_table(&self) {
        println!(
            "{} · {} ({} days) · {} points",
            self.id, self.range, self.days, self.points
        );
        println!(
            "Open {}  Close {}  High {}  Low {}  Change {}",
            self.open, self.close, self.high, self.low, self.change
        );
        if self.series.is_empty() {
            return;
        }
        // Table mode shows an evenly spaced sample; JSON carries the full series.
        let step = (self.series.len() / 20).max(1);
        println!("┌─────────────────────┬──────────────────┐");
        println!("│ Time (UTC)          │ Price            │");
        println!("├─────────────────────┼──────────────────┤");
        for row in self.series.iter().step_by(step) {
            println!("│ {:<19} │ {:>16} │", row.time, row.price);
        }
        println!("└─────────────────────┴──────────────────┘");
    }
}

impl TableDisplay for HistoryOutput {
    fn print_table(&self) {
        if self.trades.is_empty() {
            println!("Not enough price data for {} ({}).", self.id, self.range);
            return;
        }
        println!("┌──────┬──────────┬──────────────────┬─────────────────────┐");
        println!("│ Side │ Amount   │ Price            │ Time (UTC)          │");
        println!("├──────┼──────────┼──────────────────┼─────────────────────┤");
        for t in &self.trades {
            let amount = if t.side == "buy" {
                format!("+{}", t.amount)
            } else {
                format!("-{}", t.amount)
            };
            println!(
                "│ {:<4} │ {:>8} │ {:>16} │ {:<19} │",
                t.side.to_uppercase(),
                amount,
                t.price,
                t.time
            );
        }
        println!("└──────┴──────────┴──────────────────┴─────────────────────┘");
    }
}

impl TableDisplay for StoreStatusOutput {
    fn print_table(&self) {
        println!("Store   : {}", self.path);
        println!("Enabled : {}", if self.enabled { "yes" } else { "no" });
        if self.exists {
            println!("Coins   : {}", self.coins);
            println!("Synced  : {}", self.last_sync.as_deref().unwrap_or("never"));
        } else {
            println!("Coins   : — (not created; run `coinboard store sync`)");
        }
    }
}

impl TableDisplay for SyncOutput {
    fn print_table(&self) {
        println!(
            "✓ Synced {} coins ({} pages) into {}",
            self.coins_written, self.pages, self.path
        );
    }
}

impl TableDisplay for ConfigOutput {
    fn print_table(&self) {
        println!("╔══════════════════════════════════════════════════════════╗");
        println!("║  COINBOARD CONFIGURATION                                 ║");
        println!("╠══════════════════════════════════════════════════════════╣");
        println!("║  Config     : {:<43}║", truncate(&self.config_path, 43));
        println!("║  Tier       : {:<43}║", self.tier);
        println!("║  API Key    : {:<43}║", self.api_key);
        println!("║  Base URL   : {:<43}║", truncate(&self.base_url, 43));
        println!("║  Currency   : {:<43}║", self.vs_currency);
        println!("║  Timeout    : {:<43}║", format!("{}s", self.timeout_secs));
        println!("║  Store      : {:<43}║", if self.store_enabled { "enabled" } else { "disabled" });
        println!("║  Store Path : {:<43}║", truncate(&self.store_path, 43));
        println!("║  Fresh For  : {:<43}║", format!("{}s", self.stale_secs));
        println!("║  Per Page   : {:<43}║", self.per_page);
        println!("╚══════════════════════════════════════════════════════════╝");
    }
}

impl TableDisplay for DoctorOutput {
    fn print_table(&self) {
        println!("┌─────────────────────────────────────────────────────────┐");
        println!("│  COINBOARD DOCTOR                                       │");
        println!("├─────────────────────────────────────────────────────────┤");
        for check in &self.checks {
            let mark = if check.is_ok() { "✓" } else { "✗" };
            let detail = check
                .value
                .as_deref()
                .or(check.fix.as_deref())
                .unwrap_or("");
            println!("│  {mark} {:<12}: {:<40}│", check.name, truncate(detail, 40));
        }
        println!("└─────────────────────────────────────────────────────────┘");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinboard_common::types::{SortDirection, SortKey, TradeSide};

    fn bitcoin() -> Coin {
        Coin {
            id: "bitcoin".into(),
            symbol: "btc".into(),
            name: "Bitcoin".into(),
            current_price: 64_210.0,
            market_cap: 1.26e12,
            market_cap_rank: 1,
            total_volume: 31_400_000_000.0,
            high_24h: 65_000.0,
            low_24h: 63_000.0,
            price_change_percentage_24h: 1.2,
            ..Default::default()
        }
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("json-pretty".parse::<OutputFormat>().unwrap(), OutputFormat::JsonPretty);
        assert!("yaml".parse::<OutputFormat>().is_err());
        assert!(OutputFormat::Json.is_json());
        assert!(!OutputFormat::default().is_json());
    }

    #[test]
    fn test_render_json() {
        let data = coins_output("Top coins", &[bitcoin()], SortState::default(), None, Some((1, 100)));
        render(OutputFormat::Json, &data).unwrap();
        render(OutputFormat::JsonPretty, &data).unwrap();
    }

    #[test]
    fn test_render_table() {
        let data = coins_output("Top coins", &[], SortState::default(), Some(""), None);
        assert!(data.filter.is_none());
        render(OutputFormat::Table, &data).unwrap();
    }

    #[test]
    fn test_render_json_or() {
        let data = DoctorOutput { checks: vec![] };
        assert!(!render_json_or(OutputFormat::Table, &data).unwrap());
        assert!(render_json_or(OutputFormat::Json, &data).unwrap());
    }

    #[test]
    fn test_coin_row_formatting() {
        let row = coin_row(&bitcoin());
        assert_eq!(row.rank, "1");
        assert_eq!(row.symbol, "BTC");
        assert_eq!(row.price, "$64,210.00");
        assert_eq!(row.change_24h, "+1.20%");
        assert_eq!(row.market_cap, "$1.26T");
        assert_eq!(row.volume_24h, "$31.4B");

        let unranked = Coin { market_cap_rank: 0, ..bitcoin() };
        assert_eq!(coin_row(&unranked).rank, "-");
    }

    #[test]
    fn test_coins_output_sort_label() {
        let sort = SortState::new(SortKey::CurrentPrice, SortDirection::Desc);
        let out = coins_output("x", &[], sort, Some("eth"), None);
        assert_eq!(out.sort, "current_price desc");
        assert_eq!(out.filter.as_deref(), Some("eth"));
    }

    #[test]
    fn test_detail_output() {
        let details = CoinDetails {
            coin: Coin {
                current_price: 64_500.0,
                ..bitcoin()
            },
            ..Default::default()
        };
        let out = detail_output(&details);
        assert_eq!(out.range_position, 75.0);
        assert_eq!(out.max_supply, "∞");
        assert_eq!(out.last_updated, "N/A");
    }

    #[test]
    fn test_chart_output_empty_series() {
        let out = chart_output("bitcoin", TimeRange::Week, &[]);
        assert_eq!(out.points, 0);
        assert_eq!(out.open, "N/A");
        assert_eq!(out.change, "N/A");
        assert_eq!(out.days, "7");
    }

    #[test]
    fn test_chart_output_from_pairs() {
        let out = chart_output_from_pairs("bitcoin", TimeRange::Max, &[[0.0, 100.0], [60_000.0, 110.0]]);
        assert_eq!(out.points, 2);
        assert_eq!(out.change, "+10.00%");
        assert_eq!(out.days, "max");
        assert_eq!(out.series[1].time, "1970-01-01 00:01:00");
    }

    #[test]
    fn test_history_output() {
        let trades = vec![TradeRecord {
            id: 0,
            side: TradeSide::Sell,
            amount: 0.1,
            price: 10.0,
            timestamp: 0,
        }];
        let out = history_output("bitcoin", TimeRange::Day, &trades);
        assert_eq!(out.trades[0].side, "sell");
        assert_eq!(out.trades[0].amount, "0.100");
        assert_eq!(out.trades[0].price, "$10.00");
    }
}
