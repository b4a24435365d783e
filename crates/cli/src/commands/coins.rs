//! `coinboard coins`: coin table, search, details, chart, history, market lists.

use anyhow::Result;
use coinboard_common::constants::DEFAULT_PER_PAGE;
use coinboard_common::types::{Coin, SortDirection, SortKey, SortState, TimeRange};
use coinboard_types::config::AppConfig;
use coinboard_utils::output::{
    chart_output, coins_output, detail_output, history_output, render, OutputFormat,
};
use coinboard_utils::table::CoinTableView;
use coinboard_utils::transform::{
    biggest_gainers, recently_added, synthetic_trades, trending as trending_coins,
    MARKET_LIST_LIMIT,
};
use tracing::info;

use super::helpers::market_queries;

/// `coinboard coins list [--page] [--per-page] [--sort] [--dir] [--filter]`
pub async fn list(
    config: &AppConfig,
    page: u32,
    per_page: Option<u32>,
    sort: SortKey,
    dir: SortDirection,
    filter: Option<&str>,
    fmt: OutputFormat,
) -> Result<()> {
    let per_page = per_page.unwrap_or(config.display.per_page);
    let queries = market_queries(config)?;
    let coins = queries.coins(page, per_page).await?;
    info!(page, per_page, rows = coins.len(), "coin page loaded");

    let mut view = CoinTableView::new(coins);
    view.set_sort(SortState::new(sort, dir));
    if let Some(q) = filter {
        view.set_query(q);
    }

    let output = coins_output("Top coins", view.rows(), view.sort(), filter, Some((page, per_page)));
    render(fmt, &output)
}

/// `coinboard coins search <query>`
pub async fn search(config: &AppConfig, query: &str, fmt: OutputFormat) -> Result<()> {
    let queries = market_queries(config)?;
    let coins = queries.search(query).await?;
    let output = coins_output(format!("Search \"{}\"", query.trim()), &coins, SortState::default(), None, None);
    render(fmt, &output)
}

/// `coinboard coins show <id>`
pub async fn show(config: &AppConfig, id: &str, fmt: OutputFormat) -> Result<()> {
    let queries = market_queries(config)?;
    let details = queries.details(id).await?;
    render(fmt, &detail_output(&details))
}

/// `coinboard coins chart <id> [--range]`
pub async fn chart(config: &AppConfig, id: &str, range: TimeRange, fmt: OutputFormat) -> Result<()> {
    let queries = market_queries(config)?;
    let points = queries.chart(id, range).await?;
    render(fmt, &chart_output(id, range, &points))
}

/// `coinboard coins history <id> [--range]`
pub async fn history(config: &AppConfig, id: &str, range: TimeRange, fmt: OutputFormat) -> Result<()> {
    let queries = market_queries(config)?;
    let chart = queries.chart_data(id, range).await?;
    let trades = synthetic_trades(&chart.prices, &mut rand::thread_rng());
    render(fmt, &history_output(id, range, &trades))
}

/// `coinboard coins gainers`
pub async fn gainers(config: &AppConfig, fmt: OutputFormat) -> Result<()> {
    market_list(config, "Biggest gainers (24h)", biggest_gainers, fmt).await
}

/// `coinboard coins trending`
pub async fn trending(config: &AppConfig, fmt: OutputFormat) -> Result<()> {
    market_list(config, "Trending", trending_coins, fmt).await
}

/// `coinboard coins recent`
pub async fn recent(config: &AppConfig, fmt: OutputFormat) -> Result<()> {
    market_list(config, "Recently added", recently_added, fmt).await
}

async fn market_list(
    config: &AppConfig,
    title: &str,
    select: fn(&[Coin], usize) -> Vec<Coin>,
    fmt: OutputFormat,
) -> Result<()> {
    let queries = market_queries(config)?;
    let page = queries.coins(1, DEFAULT_PER_PAGE).await?;
    let coins = select(&page, MARKET_LIST_LIMIT);
    render(fmt, &coins_output(title, &coins, SortState::default(), None, None))
}
