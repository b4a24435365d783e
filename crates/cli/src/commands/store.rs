//! `coinboard store`: the only writer of the local coin store.

use anyhow::Result;
use coinboard_common::traits::CoinSource;
use coinboard_common::types::PageRequest;
use coinboard_core::workspace;
use coinboard_core::CoinDb;
use coinboard_mod_coingecko::CoinGeckoClient;
use coinboard_types::config::AppConfig;
use coinboard_types::output::{StoreStatusOutput, SyncOutput};
use coinboard_utils::format::format_timestamp_ms;
use coinboard_utils::output::{render, OutputFormat};
use tracing::info;

const LAST_SYNC_KEY: &str = "last_sync_ms";

/// `coinboard store sync [--pages] [--per-page]`
pub async fn sync(config: &AppConfig, pages: u32, per_page: u32, fmt: OutputFormat) -> Result<()> {
    config.validate()?;
    let client = CoinGeckoClient::new(&config.api)?;
    let path = workspace::store_path(config)?;
    let db = CoinDb::open(&path)?;

    let mut synced_pages = 0;
    let mut written = 0;
    for page in 1..=pages {
        let request = PageRequest::new(page, per_page)?.with_currency(config.api.vs_currency.clone());
        let coins = client.coins_page(&request).await?;
        if coins.is_empty() {
            break;
        }
        written += db.upsert_coins(&coins)?;
        synced_pages += 1;
        info!(page, rows = coins.len(), "synced page");
    }
    db.set_sync_state(LAST_SYNC_KEY, &chrono::Utc::now().timestamp_millis().to_string())?;

    let output = SyncOutput {
        path: path.display().to_string(),
        pages: synced_pages,
        coins_written: written,
    };
    render(fmt, &output)
}

/// `coinboard store status`
pub fn status(config: &AppConfig, fmt: OutputFormat) -> Result<()> {
    let path = workspace::store_path(config)?;
    let exists = path.is_file();

    let (coins, last_sync) = if exists {
        let db = CoinDb::open(&path)?;
        let last_sync = db
            .get_sync_state(LAST_SYNC_KEY)?
            .and_then(|ms| ms.parse::<i64>().ok())
            .map(format_timestamp_ms);
        (db.count()?, last_sync)
    } else {
        (0, None)
    };

    let output = StoreStatusOutput {
        path: path.display().to_string(),
        enabled: config.store.enabled,
        exists,
        coins,
        last_sync,
    };
    render(fmt, &output)
}
