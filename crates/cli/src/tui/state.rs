use coinboard_common::error::CoinboardResult;
use coinboard_common::types::{
    ChartPoint, Coin, CoinDetails, MarketChartData, SortKey, TimeRange, TradeRecord,
};
use coinboard_core::queries::{ChartKey, ListKey};
use coinboard_core::query::{QueryState, RefreshHandle, Ticket};
use coinboard_core::{ErrorNotifier, MarketQueries, RequestGuard};
use coinboard_types::config::AppConfig;
use coinboard_utils::table::CoinTableView;
use coinboard_utils::transform::{synthetic_trades, transform_market_chart};
use tokio::sync::mpsc;
use tracing::debug;

pub const TAB_MARKETS: usize = 0;
pub const TAB_COIN: usize = 1;
pub const TABS: [&str; 2] = ["Markets", "Coin"];

/// Notice lifetime (200ms per tick → 25 ticks = 5s).
const NOTICE_TICKS: u64 = 25;

/// Result of an explicit fetch, tagged with the ticket of the view slot
/// that asked for it.
pub enum Update {
    Coins {
        ticket: Ticket,
        key: ListKey,
        result: CoinboardResult<Vec<Coin>>,
    },
    Details {
        ticket: Ticket,
        id: String,
        result: CoinboardResult<CoinDetails>,
    },
    /// One series feeds both the price chart and the trading history.
    Chart {
        ticket: Ticket,
        key: ChartKey,
        result: CoinboardResult<MarketChartData>,
    },
}

/// All state the TUI renders. Fetches run on spawned tasks and come back
/// through the update channel; background refreshes land in the query
/// caches and are picked up by version on each tick.
pub struct App {
    pub tab: usize,
    pub show_help: bool,
    pub tick_count: u64,
    pub vs_currency: String,
    pub sources: String,

    queries: MarketQueries,
    tx: mpsc::UnboundedSender<Update>,
    rx: mpsc::UnboundedReceiver<Update>,
    notifier: ErrorNotifier<String>,

    // ── Markets ─────────────────────────────────────────────────
    pub table: CoinTableView,
    pub page: u32,
    pub per_page: u32,
    pub selected: usize,
    pub filter_editing: bool,
    pub filter_input: String,
    pub list_loading: bool,
    pub list_error: Option<String>,
    list_guard: RequestGuard,
    list_version: u64,
    list_refresh: Option<RefreshHandle>,

    // ── Coin ────────────────────────────────────────────────────
    pub coin_id: Option<String>,
    pub range: TimeRange,
    pub details: Option<CoinDetails>,
    pub chart: Vec<ChartPoint>,
    pub trades: Vec<TradeRecord>,
    pub details_loading: bool,
    pub chart_loading: bool,
    pub details_error: Option<String>,
    pub chart_error: Option<String>,
    /// Scroll offset for the description panel.
    pub scroll: u16,
    details_guard: RequestGuard,
    chart_guard: RequestGuard,
    details_version: u64,
    chart_version: u64,
    coin_refresh: Vec<RefreshHandle>,

    // ── Status ──────────────────────────────────────────────────
    pub notice: Option<String>,
    notice_tick: u64,
    pub last_refresh: String,
}

impl App {
    pub fn new(queries: MarketQueries, config: &AppConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let sources = queries.service().sources().names().join(" → ");
        Self {
            tab: TAB_MARKETS,
            show_help: false,
            tick_count: 0,
            vs_currency: config.api.vs_currency.to_uppercase(),
            sources,

            queries,
            tx,
            rx,
            notifier: ErrorNotifier::new(),

            table: CoinTableView::default(),
            page: 1,
            per_page: config.display.per_page,
            selected: 0,
            filter_editing: false,
            filter_input: String::new(),
            list_loading: false,
            list_error: None,
            list_guard: RequestGuard::new(),
            list_version: 0,
            list_refresh: None,

            coin_id: None,
            range: TimeRange::default(),
            details: None,
            chart: Vec::new(),
            trades: Vec::new(),
            details_loading: false,
            chart_loading: false,
            details_error: None,
            chart_error: None,
            scroll: 0,
            details_guard: RequestGuard::new(),
            chart_guard: RequestGuard::new(),
            details_version: 0,
            chart_version: 0,
            coin_refresh: Vec::new(),

            notice: None,
            notice_tick: 0,
            last_refresh: String::from("never"),
        }
    }

    /// Load the first page and start its background refresh.
    pub fn start(&mut self) {
        self.load_page();
    }

    // ── Fetching ────────────────────────────────────────────────

    fn load_page(&mut self) {
        let key = (self.page, self.per_page);
        let ticket = self.list_guard.issue();
        self.list_loading = true;
        self.list_refresh = self.queries.refresh_coins(key.0, key.1);

        let queries = self.queries.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = queries.coins(key.0, key.1).await;
            let _ = tx.send(Update::Coins { ticket, key, result });
        });
    }

    fn load_details(&mut self) {
        let Some(id) = self.coin_id.clone() else {
            return;
        };
        let ticket = self.details_guard.issue();
        self.details_loading = true;

        let queries = self.queries.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = queries.details(&id).await;
            let _ = tx.send(Update::Details { ticket, id, result });
        });
    }

    fn load_chart(&mut self) {
        let Some(id) = self.coin_id.clone() else {
            return;
        };
        let key: ChartKey = (id, self.range);
        let ticket = self.chart_guard.issue();
        self.chart_loading = true;

        let queries = self.queries.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = queries.chart_data(&key.0, key.1).await;
            let _ = tx.send(Update::Chart { ticket, key, result });
        });
    }

    fn restart_coin_refresh(&mut self) {
        self.coin_refresh = match &self.coin_id {
            Some(id) => self.queries.refresh_coin(id, self.range),
            None => Vec::new(),
        };
    }

    /// Manual refresh of the active view, bypassing the freshness window.
    pub fn refresh(&mut self) {
        match (self.coin_id.clone(), self.tab) {
            (Some(id), TAB_COIN) => {
                self.queries.invalidate_coin(&id, self.range);
                self.load_details();
                self.load_chart();
            }
            _ => {
                self.queries.coins.invalidate(&(self.page, self.per_page));
                self.load_page();
            }
        }
    }

    // ── Results ─────────────────────────────────────────────────

    /// Apply a fetch result unless its slot has moved on since it was issued.
    pub fn apply(&mut self, update: Update) {
        match update {
            Update::Coins { ticket, key, result } => {
                if !self.list_guard.is_current(ticket) {
                    debug!(?key, "dropping superseded coin page");
                    return;
                }
                self.list_loading = false;
                match result {
                    Ok(coins) => {
                        self.list_error = None;
                        self.list_version = self.queries.coins.state(&key).data_version;
                        self.set_coins(coins);
                    }
                    Err(e) => {
                        let state = self.queries.coins.state(&key);
                        self.mark_reported(list_label(key), &state);
                        self.list_error = Some(e.to_string());
                    }
                }
            }
            Update::Details { ticket, id, result } => {
                if !self.details_guard.is_current(ticket) {
                    debug!(%id, "dropping superseded details");
                    return;
                }
                self.details_loading = false;
                match result {
                    Ok(details) => {
                        self.details_error = None;
                        self.details_version = self.queries.details.state(&id).data_version;
                        self.details = Some(details);
                    }
                    Err(e) => {
                        let state = self.queries.details.state(&id);
                        self.mark_reported(details_label(&id), &state);
                        self.details_error = Some(e.to_string());
                    }
                }
            }
            Update::Chart { ticket, key, result } => {
                if !self.chart_guard.is_current(ticket) {
                    debug!(?key, "dropping superseded chart");
                    return;
                }
                self.chart_loading = false;
                match result {
                    Ok(data) => {
                        self.chart_error = None;
                        self.chart_version = self.queries.charts.state(&key).data_version;
                        self.set_chart(&data);
                    }
                    Err(e) => {
                        let state = self.queries.charts.state(&key);
                        self.mark_reported(chart_label(&key), &state);
                        self.chart_error = Some(e.to_string());
                    }
                }
            }
        }
    }

    fn set_coins(&mut self, coins: Vec<Coin>) {
        self.table.set_coins(coins);
        self.clamp_selection();
        self.last_refresh = chrono::Local::now().format("%H:%M:%S").to_string();
    }

    fn set_chart(&mut self, data: &MarketChartData) {
        self.chart = transform_market_chart(&data.prices);
        self.trades = synthetic_trades(&data.prices, &mut rand::thread_rng());
    }

    /// Pick up background refreshes from the caches and surface new errors once.
    ///
    /// Errors from an explicit fetch are shown in the panel instead, so a key
    /// with a fetch in flight is not reported here.
    fn poll_cache(&mut self) {
        let key = (self.page, self.per_page);
        let state = self.queries.coins.state(&key);
        if state.data_version > self.list_version {
            self.list_version = state.data_version;
            if let Some(coins) = state.data.clone() {
                self.list_error = None;
                self.set_coins(coins);
            }
        }
        if !self.list_loading {
            self.notify(list_label(key), "Coin list", &state);
        }

        let Some(id) = self.coin_id.clone() else {
            return;
        };

        let state = self.queries.details.state(&id);
        if state.data_version > self.details_version {
            self.details_version = state.data_version;
            if let Some(details) = state.data.clone() {
                self.details_error = None;
                self.details = Some(details);
            }
        }
        if !self.details_loading {
            self.notify(details_label(&id), &id, &state);
        }

        let chart_key = (id.clone(), self.range);
        let state = self.queries.charts.state(&chart_key);
        if state.data_version > self.chart_version {
            self.chart_version = state.data_version;
            if let Some(data) = state.data.as_ref() {
                self.chart_error = None;
                self.set_chart(data);
            }
        }
        if !self.chart_loading {
            self.notify(chart_label(&chart_key), &format!("{id} chart"), &state);
        }
    }

    fn notify<V>(&mut self, label: String, what: &str, state: &QueryState<V>) {
        if let Some(e) = self.notifier.check(&label, state) {
            self.show_notice(format!("{what}: {e}"));
        }
    }

    /// The panel already shows this error; keep the notifier from repeating it.
    fn mark_reported<V>(&mut self, label: String, state: &QueryState<V>) {
        let _ = self.notifier.check(&label, state);
    }

    pub fn tick(&mut self) {
        self.tick_count += 1;
        while let Ok(update) = self.rx.try_recv() {
            self.apply(update);
        }
        self.poll_cache();
        if self.notice.is_some() && self.tick_count.saturating_sub(self.notice_tick) > NOTICE_TICKS {
            self.notice = None;
        }
    }

    fn show_notice(&mut self, message: String) {
        self.notice = Some(message);
        self.notice_tick = self.tick_count;
    }

    // ── Navigation ──────────────────────────────────────────────

    pub fn set_tab(&mut self, idx: usize) {
        if idx < TABS.len() {
            self.tab = idx;
        }
    }

    pub fn next_tab(&mut self) {
        self.tab = (self.tab + 1) % TABS.len();
    }

    pub fn prev_tab(&mut self) {
        self.tab = (self.tab + TABS.len() - 1) % TABS.len();
    }

    pub fn scroll_up(&mut self) {
        if self.tab == TAB_MARKETS {
            self.selected = self.selected.saturating_sub(1);
        } else {
            self.scroll = self.scroll.saturating_sub(1);
        }
    }

    pub fn scroll_down(&mut self) {
        if self.tab == TAB_MARKETS {
            if !self.table.is_empty() {
                self.selected = (self.selected + 1).min(self.table.rows().len() - 1);
            }
        } else {
            self.scroll = self.scroll.saturating_add(1);
        }
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Whether the active view has a background refresh running.
    pub fn auto_refresh(&self) -> bool {
        match self.tab {
            TAB_COIN if self.coin_id.is_some() => !self.coin_refresh.is_empty(),
            _ => self.list_refresh.is_some(),
        }
    }

    pub fn selected_coin(&self) -> Option<&Coin> {
        self.table.rows().get(self.selected)
    }

    pub fn open_selected(&mut self) {
        if let Some(id) = self.selected_coin().map(|c| c.id.clone()) {
            self.open_coin(id);
        }
    }

    pub fn open_coin(&mut self, id: String) {
        if self.coin_id.as_deref() != Some(id.as_str()) {
            self.clear_coin();
            self.range = TimeRange::default();
        }
        self.coin_id = Some(id);
        self.tab = TAB_COIN;
        self.load_details();
        self.load_chart();
        self.restart_coin_refresh();
    }

    /// Leave the coin screen. Outstanding coin requests are dropped on arrival.
    pub fn back(&mut self) {
        self.details_guard.cancel();
        self.chart_guard.cancel();
        self.coin_refresh.clear();
        self.coin_id = None;
        self.clear_coin();
        self.tab = TAB_MARKETS;
    }

    fn clear_coin(&mut self) {
        self.details = None;
        self.chart.clear();
        self.trades.clear();
        self.details_loading = false;
        self.chart_loading = false;
        self.details_error = None;
        self.chart_error = None;
        self.scroll = 0;
        self.details_version = 0;
        self.chart_version = 0;
    }

    pub fn next_range(&mut self) {
        if self.coin_id.is_none() {
            return;
        }
        self.range = self.range.next();
        self.chart.clear();
        self.trades.clear();
        self.chart_error = None;
        self.chart_version = 0;
        self.load_chart();
        self.restart_coin_refresh();
    }

    pub fn next_page(&mut self) {
        self.page += 1;
        self.change_page();
    }

    pub fn prev_page(&mut self) {
        if self.page > 1 {
            self.page -= 1;
            self.change_page();
        }
    }

    fn change_page(&mut self) {
        self.selected = 0;
        self.list_version = 0;
        self.list_error = None;
        self.load_page();
    }

    // ── Sort / filter ───────────────────────────────────────────

    pub fn sort(&mut self, key: SortKey) {
        self.table.select_sort(key);
        self.selected = 0;
    }

    pub fn start_filter(&mut self) {
        self.filter_editing = true;
        self.filter_input = self.table.query().to_string();
    }

    pub fn filter_input(&mut self, c: char) {
        self.filter_input.push(c);
        self.apply_filter();
    }

    pub fn filter_backspace(&mut self) {
        self.filter_input.pop();
        self.apply_filter();
    }

    pub fn commit_filter(&mut self) {
        self.filter_editing = false;
    }

    pub fn cancel_filter(&mut self) {
        self.filter_editing = false;
        self.filter_input.clear();
        self.apply_filter();
    }

    fn apply_filter(&mut self) {
        self.table.set_query(self.filter_input.clone());
        self.selected = 0;
    }

    fn clamp_selection(&mut self) {
        let len = self.table.rows().len();
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }
}

fn list_label(key: ListKey) -> String {
    format!("coins {}/{}", key.0, key.1)
}

fn details_label(id: &str) -> String {
    format!("details {id}")
}

fn chart_label(key: &ChartKey) -> String {
    format!("chart {} {}", key.0, key.1)
}
