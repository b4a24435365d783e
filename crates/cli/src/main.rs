mod commands;
mod tui;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use coinboard_common::error::CoinboardError;
use coinboard_common::types::{SortDirection, SortKey, TimeRange};
use coinboard_types::config::{ApiTier, AppConfig};
use coinboard_utils::output::OutputFormat;
use coinboard_utils::transform::resolve_time_range;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "coinboard",
    about = "Crypto market dashboard.\nCoin tables, charts and stats from CoinGecko, with an optional local SQLite store.",
    version,
    propagate_version = true
)]
struct Cli {
    #[arg(long, short = 'o', global = true, default_value = "table")]
    output: CliOutputFormat,

    /// Debug logging on stderr.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOutputFormat { Table, Json, JsonPretty }

impl From<CliOutputFormat> for OutputFormat {
    fn from(f: CliOutputFormat) -> OutputFormat {
        match f {
            CliOutputFormat::Table => OutputFormat::Table,
            CliOutputFormat::Json => OutputFormat::Json,
            CliOutputFormat::JsonPretty => OutputFormat::JsonPretty,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  TOP-LEVEL
// ═══════════════════════════════════════════════════════════════════════

#[derive(Subcommand)]
enum Commands {
    /// Market data: coin table, search, details, charts.
    Coins {
        #[command(subcommand)]
        action: CoinsAction,
    },

    /// Local SQLite store: sync from CoinGecko, inspect.
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },

    /// Show or change configuration.
    Configure {
        #[command(subcommand)]
        action: ConfigureAction,
    },

    /// Check config, store and API connectivity.
    Doctor,

    /// Launch interactive Terminal UI.
    Tui,
}

// ═══════════════════════════════════════════════════════════════════════
//  COINS
// ═══════════════════════════════════════════════════════════════════════

#[derive(Subcommand)]
enum CoinsAction {
    /// One page of coins by market cap, sorted and filtered locally.
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Defaults to `display.per_page`.
        #[arg(long)]
        per_page: Option<u32>,
        /// market_cap_rank, current_price, price_change_percentage_24h, market_cap, total_volume.
        #[arg(long, default_value = "market_cap_rank")]
        sort: SortKey,
        #[arg(long, default_value = "asc")]
        dir: SortDirection,
        /// Substring match on name or symbol.
        #[arg(long)]
        filter: Option<String>,
    },
    /// Search coins by name or symbol.
    Search { query: String },
    /// Details for one coin id (e.g. `bitcoin`).
    Show { id: String },
    /// Price chart summary and series.
    Chart {
        id: String,
        /// 1d, 7d, 30d, 90d, 1y, max. Anything else means 7d.
        #[arg(long, default_value = "7d", value_parser = parse_range)]
        range: TimeRange,
    },
    /// Trading history panel (synthetic, from the latest prices).
    History {
        id: String,
        #[arg(long, default_value = "7d", value_parser = parse_range)]
        range: TimeRange,
    },
    /// Top 24h gainers of the first page.
    Gainers,
    /// Head of the first page.
    Trending,
    /// Tail of the first page.
    Recent,
}

// ═══════════════════════════════════════════════════════════════════════
//  STORE
// ═══════════════════════════════════════════════════════════════════════

#[derive(Subcommand)]
enum StoreAction {
    /// Fetch coin pages from CoinGecko and write them to the store.
    Sync {
        #[arg(long, default_value_t = 2)]
        pages: u32,
        #[arg(long, default_value_t = 250)]
        per_page: u32,
    },
    /// Path, row count and last sync time.
    Status,
}

// ═══════════════════════════════════════════════════════════════════════
//  CONFIGURE
// ═══════════════════════════════════════════════════════════════════════

#[derive(Subcommand)]
enum ConfigureAction {
    /// Show all current configuration.
    Show,
    /// Set the CoinGecko API key.
    ApiKey { key: String },
    /// Set the API tier: public, demo, pro.
    Tier { tier: ApiTier },
    /// Quote currency (usd, eur, btc, ...).
    Currency { vs: String },
    /// Enable/disable reading the local store, optionally moving it.
    Store {
        #[arg(long, action = clap::ArgAction::Set)]
        enabled: bool,
        #[arg(long)]
        path: Option<String>,
    },
    /// Debug logging by default.
    Verbose {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
}

// ═══════════════════════════════════════════════════════════════════════
//  ENTRYPOINT
// ═══════════════════════════════════════════════════════════════════════

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let fmt: OutputFormat = cli.output.into();

    match run(cli, fmt).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = report_error(&e, fmt);
            ExitCode::from(code)
        }
    }
}

async fn run(cli: Cli, fmt: OutputFormat) -> Result<()> {
    let report = coinboard_core::init_workspace()?;
    // Doctor reports a broken config instead of failing on it.
    let (config, config_error) = match coinboard_core::workspace::load_config() {
        Ok(config) => (config, None),
        Err(e) if matches!(cli.command, Commands::Doctor) => (AppConfig::default(), Some(e)),
        Err(e) => return Err(e),
    };

    if matches!(cli.command, Commands::Tui) {
        tui::init_logging(&config, cli.verbose)?;
    } else {
        init_logging(&config, cli.verbose);
    }
    report.log();

    match cli.command {
        Commands::Coins { action } => match action {
            CoinsAction::List { page, per_page, sort, dir, filter } => {
                commands::coins::list(&config, page, per_page, sort, dir, filter.as_deref(), fmt).await
            }
            CoinsAction::Search { query } => commands::coins::search(&config, &query, fmt).await,
            CoinsAction::Show { id } => commands::coins::show(&config, &id, fmt).await,
            CoinsAction::Chart { id, range } => commands::coins::chart(&config, &id, range, fmt).await,
            CoinsAction::History { id, range } => commands::coins::history(&config, &id, range, fmt).await,
            CoinsAction::Gainers => commands::coins::gainers(&config, fmt).await,
            CoinsAction::Trending => commands::coins::trending(&config, fmt).await,
            CoinsAction::Recent => commands::coins::recent(&config, fmt).await,
        },

        Commands::Store { action } => match action {
            StoreAction::Sync { pages, per_page } => commands::store::sync(&config, pages, per_page, fmt).await,
            StoreAction::Status => commands::store::status(&config, fmt),
        },

        Commands::Configure { action } => match action {
            ConfigureAction::Show => commands::configure::run(fmt),
            ConfigureAction::ApiKey { key } => commands::configure::set_api_key(&key),
            ConfigureAction::Tier { tier } => commands::configure::set_tier(tier),
            ConfigureAction::Currency { vs } => commands::configure::set_currency(&vs),
            ConfigureAction::Store { enabled, path } => commands::configure::set_store(enabled, path),
            ConfigureAction::Verbose { enabled } => commands::configure::set_verbose(enabled),
        },

        Commands::Doctor => commands::doctor::run(&config, config_error, fmt).await,
        Commands::Tui => tui::run(&config).await,
    }
}

/// Unknown range tokens fall back to the default window.
fn parse_range(token: &str) -> Result<TimeRange, String> {
    Ok(resolve_time_range(token))
}

/// Stderr logging so JSON on stdout stays clean.
fn init_logging(config: &AppConfig, verbose: bool) {
    let default_level = if verbose || config.system.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Print the failure and pick the exit code.
fn report_error(err: &anyhow::Error, fmt: OutputFormat) -> u8 {
    let typed = err.downcast_ref::<CoinboardError>();

    if fmt.is_json() {
        let json = match typed {
            Some(e) => e.to_json(),
            None => serde_json::json!({
                "error": { "code": "INTERNAL_ERROR", "message": format!("{err:#}"), "category": "system" }
            }),
        };
        println!("{json}");
    } else {
        eprintln!("✗ {err:#}");
        if let Some(e) = typed {
            for hint in e.detail().hints {
                eprintln!("  → {hint}");
            }
        }
    }

    typed.map(|e| e.exit_code()).unwrap_or(1).clamp(1, 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart_range(args: &[&str]) -> TimeRange {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Coins {
                action: CoinsAction::Chart { range, .. } | CoinsAction::History { range, .. },
            } => range,
            _ => panic!("expected a chart or history command"),
        }
    }

    #[test]
    fn test_range_flag_is_lenient() {
        assert_eq!(chart_range(&["coinboard", "coins", "chart", "bitcoin"]), TimeRange::Week);
        assert_eq!(
            chart_range(&["coinboard", "coins", "chart", "bitcoin", "--range", "1y"]),
            TimeRange::Year
        );
        assert_eq!(
            chart_range(&["coinboard", "coins", "history", "bitcoin", "--range", "2w"]),
            TimeRange::Week
        );
    }
}
