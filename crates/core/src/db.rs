//! Local SQLite coin store.
//!
//! Mirrors the `/coins/markets` snapshot columns. Numeric columns carry no
//! declared type, so rows imported by other tools may hold numbers as TEXT;
//! every read coerces them back to `f64` (unparseable or NULL → `0.0`).
//! Uses WAL mode for concurrent read safety.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{params, Connection, Row};
use tracing::debug;

use coinboard_common::error::{CoinboardError, CoinboardResult};
use coinboard_common::traits::CoinSource;
use coinboard_common::types::{Coin, PageRequest};
use coinboard_types::db::CoinFilter;

const COIN_COLUMNS: &str = "id, symbol, name, image, current_price, market_cap, market_cap_rank, \
     total_volume, high_24h, low_24h, price_change_24h, price_change_percentage_24h, \
     market_cap_change_24h, market_cap_change_percentage_24h, circulating_supply, total_supply, \
     max_supply, ath, ath_change_percentage, ath_date, atl, atl_change_percentage, atl_date, \
     last_updated";

/// Local SQLite database handle.
pub struct CoinDb {
    conn: Connection,
}

impl CoinDb {
    /// Open (or create) the database at `path`.
    /// Enables WAL mode and creates tables if they don't exist.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        let db = Self { conn };
        db.init_tables()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init_tables()?;
        Ok(db)
    }

    fn init_tables(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
            CREATE TABLE IF NOT EXISTS coins (
                id TEXT PRIMARY KEY,
                symbol TEXT NOT NULL,
                name TEXT NOT NULL,
                image TEXT,
                current_price,
                market_cap,
                market_cap_rank,
                total_volume,
                high_24h,
                low_24h,
                price_change_24h,
                price_change_percentage_24h,
                market_cap_change_24h,
                market_cap_change_percentage_24h,
                circulating_supply,
                total_supply,
                max_supply,
                ath,
                ath_change_percentage,
                ath_date TEXT,
                atl,
                atl_change_percentage,
                atl_date TEXT,
                last_updated TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_coins_rank ON coins(market_cap_rank);

            CREATE TABLE IF NOT EXISTS sync_state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_ms INTEGER NOT NULL
            );
            ",
            )
            .context("Failed to initialize database tables")?;
        Ok(())
    }

    /// Access to the raw connection for imports and tests.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    // ─── Coins ──────────────────────────────────────────────────────

    /// Replace snapshots by id. Returns the number of rows written.
    pub fn upsert_coins(&self, coins: &[Coin]) -> Result<usize> {
        let mut written = 0usize;
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(&format!(
                "INSERT OR REPLACE INTO coins ({COIN_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                         ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)"
            ))?;
            for c in coins {
                // 0 is the in-memory "unranked" marker; the table keeps NULL
                let rank = (c.market_cap_rank > 0).then_some(c.market_cap_rank);
                written += stmt.execute(params![
                    c.id,
                    c.symbol,
                    c.name,
                    c.image,
                    c.current_price,
                    c.market_cap,
                    rank,
                    c.total_volume,
                    c.high_24h,
                    c.low_24h,
                    c.price_change_24h,
                    c.price_change_percentage_24h,
                    c.market_cap_change_24h,
                    c.market_cap_change_percentage_24h,
                    c.circulating_supply,
                    c.total_supply,
                    c.max_supply,
                    c.ath,
                    c.ath_change_percentage,
                    c.ath_date,
                    c.atl,
                    c.atl_change_percentage,
                    c.atl_date,
                    c.last_updated,
                ])?;
            }
        }
        tx.commit()?;
        Ok(written)
    }

    /// Read coins ordered by market-cap rank ascending, unranked last.
    pub fn query_coins(&self, filter: &CoinFilter) -> Result<Vec<Coin>> {
        let mut sql = format!("SELECT {COIN_COLUMNS} FROM coins WHERE 1=1");
        let mut bind_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            sql.push_str(
                " AND (LOWER(name) LIKE ? ESCAPE '\\' OR LOWER(symbol) LIKE ? ESCAPE '\\')",
            );
            let pattern = format!("%{}%", escape_like(&search.to_lowercase()));
            bind_values.push(Box::new(pattern.clone()));
            bind_values.push(Box::new(pattern));
        }

        sql.push_str(
            " ORDER BY (market_cap_rank IS NULL OR CAST(market_cap_rank AS REAL) <= 0),
                       CAST(market_cap_rank AS REAL) ASC, id ASC",
        );

        let limit = filter.limit.map(|l| l as i64).unwrap_or(-1);
        sql.push_str(" LIMIT ? OFFSET ?");
        bind_values.push(Box::new(limit));
        bind_values.push(Box::new(filter.offset as i64));

        let params_refs: Vec<&dyn rusqlite::types::ToSql> =
            bind_values.iter().map(|b| b.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_refs.as_slice(), coin_from_row)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        debug!(rows = results.len(), offset = filter.offset, "store query");
        Ok(results)
    }

    pub fn count(&self) -> Result<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM coins", [], |row| row.get(0))?;
        Ok(n.max(0) as u64)
    }

    // ─── Sync state ─────────────────────────────────────────────────

    pub fn get_sync_state(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT value FROM sync_state WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    pub fn set_sync_state(&self, key: &str, value: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        self.conn.execute(
            "INSERT OR REPLACE INTO sync_state (key, value, updated_ms) VALUES (?1, ?2, ?3)",
            params![key, value, now],
        )?;
        Ok(())
    }
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

// ─── Coercion ───────────────────────────────────────────────────────

fn number(value: Value) -> f64 {
    let n = match value {
        Value::Integer(i) => i as f64,
        Value::Real(f) => f,
        Value::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        Value::Null | Value::Blob(_) => 0.0,
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

fn rank(value: Value) -> u32 {
    let n = number(value);
    if n >= 1.0 && n <= f64::from(u32::MAX) {
        n as u32
    } else {
        0
    }
}

fn text(value: Value) -> String {
    match value {
        Value::Text(s) => s,
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Null | Value::Blob(_) => String::new(),
    }
}

fn coin_from_row(row: &Row<'_>) -> rusqlite::Result<Coin> {
    let v = |i: usize| row.get::<_, Value>(i);
    Ok(Coin {
        id: text(v(0)?),
        symbol: text(v(1)?),
        name: text(v(2)?),
        image: text(v(3)?),
        current_price: number(v(4)?),
        market_cap: number(v(5)?),
        market_cap_rank: rank(v(6)?),
        total_volume: number(v(7)?),
        high_24h: number(v(8)?),
        low_24h: number(v(9)?),
        price_change_24h: number(v(10)?),
        price_change_percentage_24h: number(v(11)?),
        market_cap_change_24h: number(v(12)?),
        market_cap_change_percentage_24h: number(v(13)?),
        circulating_supply: number(v(14)?),
        total_supply: number(v(15)?),
        max_supply: number(v(16)?),
        ath: number(v(17)?),
        ath_change_percentage: number(v(18)?),
        ath_date: text(v(19)?),
        atl: number(v(20)?),
        atl_change_percentage: number(v(21)?),
        atl_date: text(v(22)?),
        last_updated: text(v(23)?),
    })
}

// ─── Async source ───────────────────────────────────────────────────

/// Shared store handle exposed as a [`CoinSource`].
///
/// Queries run on the blocking pool; the connection is serialized by a mutex.
#[derive(Clone)]
pub struct CoinStore {
    db: Arc<Mutex<CoinDb>>,
}

impl CoinStore {
    pub fn new(db: CoinDb) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    /// Run `f` against the database on the blocking pool.
    pub async fn with_db<T, F>(&self, f: F) -> CoinboardResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&CoinDb) -> Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let guard = db
                .lock()
                .map_err(|_| CoinboardError::Internal("store mutex poisoned".into()))?;
            f(&guard).map_err(|e| CoinboardError::Transport(format!("store: {e:#}")))
        })
        .await
        .map_err(|e| CoinboardError::Internal(format!("store task failed: {e}")))?
    }
}

#[async_trait]
impl CoinSource for CoinStore {
    fn name(&self) -> &str {
        "store"
    }

    async fn coins_page(&self, page: &PageRequest) -> CoinboardResult<Vec<Coin>> {
        let filter = CoinFilter::page(page.offset(), page.per_page as usize);
        self.with_db(move |db| db.query_coins(&filter)).await
    }

    async fn search(&self, query: &str, limit: usize) -> CoinboardResult<Vec<Coin>> {
        let filter = CoinFilter::search(query, limit);
        self.with_db(move |db| db.query_coins(&filter)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin(id: &str, name: &str, symbol: &str, rank: u32, price: f64) -> Coin {
        Coin {
            id: id.into(),
            name: name.into(),
            symbol: symbol.into(),
            market_cap_rank: rank,
            current_price: price,
            ..Default::default()
        }
    }

    fn seeded() -> CoinDb {
        let db = CoinDb::open_in_memory().unwrap();
        db.upsert_coins(&[
            coin("tether", "Tether", "usdt", 3, 1.0),
            coin("bitcoin", "Bitcoin", "btc", 1, 64_000.0),
            coin("fresh", "Fresh Listing", "frsh", 0, 0.2),
            coin("ethereum", "Ethereum", "eth", 2, 3_100.0),
        ])
        .unwrap();
        db
    }

    #[test]
    fn test_open_in_memory() {
        let db = CoinDb::open_in_memory().unwrap();
        assert_eq!(db.count().unwrap(), 0);
        assert!(db.query_coins(&CoinFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn test_query_orders_by_rank_unranked_last() {
        let db = seeded();
        let coins = db.query_coins(&CoinFilter::default()).unwrap();
        let ids: Vec<_> = coins.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["bitcoin", "ethereum", "tether", "fresh"]);
        assert_eq!(coins[3].market_cap_rank, 0);
    }

    #[test]
    fn test_query_paging() {
        let db = seeded();
        let page = db.query_coins(&CoinFilter::page(1, 2)).unwrap();
        let ids: Vec<_> = page.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["ethereum", "tether"]);
        assert!(db.query_coins(&CoinFilter::page(10, 2)).unwrap().is_empty());
    }

    #[test]
    fn test_upsert_replaces_by_id() {
        let db = seeded();
        db.upsert_coins(&[coin("bitcoin", "Bitcoin", "btc", 1, 70_000.0)]).unwrap();
        assert_eq!(db.count().unwrap(), 4);
        let coins = db.query_coins(&CoinFilter::page(0, 1)).unwrap();
        assert_eq!(coins[0].current_price, 70_000.0);
    }

    #[test]
    fn test_search_name_and_symbol() {
        let db = seeded();
        let hits = db.query_coins(&CoinFilter::search("ETH", 50)).unwrap();
        let ids: Vec<_> = hits.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["ethereum", "tether"]);

        let hits = db.query_coins(&CoinFilter::search("usdt", 50)).unwrap();
        assert_eq!(hits.len(), 1);
        assert!(db.query_coins(&CoinFilter::search("100%", 50)).unwrap().is_empty());
    }

    #[test]
    fn test_heterogeneous_numeric_columns_are_coerced() {
        let db = CoinDb::open_in_memory().unwrap();
        db.connection()
            .execute(
                "INSERT INTO coins (id, symbol, name, current_price, market_cap, market_cap_rank,
                                    total_volume, max_supply, ath)
                 VALUES ('odd', 'odd', 'Odd Coin', '42.5', 1000, '7', 'n/a', NULL, 3.25)",
                [],
            )
            .unwrap();
        let coins = db.query_coins(&CoinFilter::default()).unwrap();
        let c = &coins[0];
        assert_eq!(c.current_price, 42.5);
        assert_eq!(c.market_cap, 1000.0);
        assert_eq!(c.market_cap_rank, 7);
        assert_eq!(c.total_volume, 0.0);
        assert_eq!(c.max_supply, 0.0);
        assert_eq!(c.ath, 3.25);
        assert_eq!(c.high_24h, 0.0);
        assert!(c.image.is_empty());
    }

    #[test]
    fn test_sync_state() {
        let db = CoinDb::open_in_memory().unwrap();
        assert!(db.get_sync_state("last_sync_ms").unwrap().is_none());
        db.set_sync_state("last_sync_ms", "1700000000000").unwrap();
        assert_eq!(
            db.get_sync_state("last_sync_ms").unwrap().as_deref(),
            Some("1700000000000")
        );
    }

    #[tokio::test]
    async fn test_store_source_pages() {
        let store = CoinStore::new(seeded());
        let page = PageRequest::new(2, 2).unwrap();
        let coins = store.coins_page(&page).await.unwrap();
        let ids: Vec<_> = coins.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["tether", "fresh"]);
        assert_eq!(store.name(), "store");

        let hits = store.search("bit", 50).await.unwrap();
        assert_eq!(hits.len(), 1);
    }
}
