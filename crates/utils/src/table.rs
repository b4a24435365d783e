//! Client-side sorting and filtering of the loaded coin page.
//!
//! Operates on whatever page is currently loaded; never triggers a fetch.

use std::cmp::Ordering;

use coinboard_common::types::{Coin, SortDirection, SortKey, SortState};

/// Three-way comparison of sort values. `None` sorts first ascending and
/// last descending, except for rank where unranked coins always sort last.
fn compare(a: Option<f64>, b: Option<f64>, state: SortState) -> Ordering {
    let ordering = match (a, b) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) if state.key == SortKey::MarketCapRank => return Ordering::Greater,
        (Some(_), None) if state.key == SortKey::MarketCapRank => return Ordering::Less,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.total_cmp(&y),
    };
    match state.direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

/// Stable sort by `state`. Ties keep their current relative order.
pub fn sort_coins(coins: &mut [Coin], state: SortState) {
    coins.sort_by(|a, b| compare(a.sort_value(state.key), b.sort_value(state.key), state));
}

/// Case-insensitive substring filter over name and symbol.
/// A blank query returns the list unchanged.
pub fn filter_coins(coins: &[Coin], query: &str) -> Vec<Coin> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return coins.to_vec();
    }
    coins.iter().filter(|c| c.matches(&needle)).cloned().collect()
}

/// The loaded page plus the active filter and sort.
///
/// The active sort is applied on every refresh, so re-filtering never
/// changes the order of the rows that remain.
#[derive(Debug, Clone, Default)]
pub struct CoinTableView {
    source: Vec<Coin>,
    rows: Vec<Coin>,
    query: String,
    sort: SortState,
}

impl CoinTableView {
    pub fn new(coins: Vec<Coin>) -> Self {
        let mut view = Self {
            source: coins,
            ..Default::default()
        };
        view.refresh();
        view
    }

    /// Replace the page; the active filter and sort are re-applied.
    pub fn set_coins(&mut self, coins: Vec<Coin>) {
        self.source = coins;
        self.refresh();
    }

    /// Re-filter from the full page, keeping the active sort.
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.refresh();
    }

    /// Sort the visible rows only.
    pub fn set_sort(&mut self, sort: SortState) {
        self.sort = sort;
        sort_coins(&mut self.rows, sort);
    }

    /// Header-click behaviour: same ascending key flips, anything else sorts ascending.
    pub fn select_sort(&mut self, key: SortKey) {
        self.set_sort(self.sort.select(key));
    }

    pub fn rows(&self) -> &[Coin] {
        &self.rows
    }

    pub fn source(&self) -> &[Coin] {
        &self.source
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn sort(&self) -> SortState {
        self.sort
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn refresh(&mut self) {
        self.rows = filter_coins(&self.source, &self.query);
        sort_coins(&mut self.rows, self.sort);
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
            market_cap: price * 1000.0,
            ..Default::default()
        }
    }

    fn sample() -> Vec<Coin> {
        vec![
            coin("bitcoin", "Bitcoin", "btc", 1, 64_000.0),
            coin("ethereum", "Ethereum", "eth", 2, 3_100.0),
            coin("tether", "Tether", "usdt", 3, 1.0),
            coin("mystery", "Mystery", "mys", 4, f64::NAN),
            coin("ethena", "Ethena", "ena", 5, 1.0),
        ]
    }

    fn ids(coins: &[Coin]) -> Vec<&str> {
        coins.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_sort_by_price_asc() {
        let mut coins = sample();
        sort_coins(&mut coins, SortState::new(SortKey::CurrentPrice, SortDirection::Asc));
        assert_eq!(ids(&coins), vec!["mystery", "tether", "ethena", "ethereum", "bitcoin"]);
    }

    #[test]
    fn test_null_at_opposite_ends() {
        let mut asc = sample();
        sort_coins(&mut asc, SortState::new(SortKey::CurrentPrice, SortDirection::Asc));
        let mut desc = sample();
        sort_coins(&mut desc, SortState::new(SortKey::CurrentPrice, SortDirection::Desc));
        assert_eq!(asc.first().map(|c| c.id.as_str()), Some("mystery"));
        assert_eq!(desc.last().map(|c| c.id.as_str()), Some("mystery"));
    }

    #[test]
    fn test_sort_is_stable() {
        let state = SortState::new(SortKey::CurrentPrice, SortDirection::Desc);
        let mut once = sample();
        sort_coins(&mut once, state);
        let mut twice = once.clone();
        sort_coins(&mut twice, state);
        assert_eq!(ids(&once), ids(&twice));
        // tether and ethena tie at 1.0 and keep page order
        assert_eq!(ids(&once), vec!["bitcoin", "ethereum", "tether", "ethena", "mystery"]);
    }

    #[test]
    fn test_unranked_is_null() {
        let mut coins = sample();
        coins[1].market_cap_rank = 0;
        sort_coins(&mut coins, SortState::new(SortKey::MarketCapRank, SortDirection::Desc));
        assert_eq!(coins.last().map(|c| c.id.as_str()), Some("ethereum"));
    }

    #[test]
    fn test_filter_blank_query_is_identity() {
        let coins = sample();
        assert_eq!(ids(&filter_coins(&coins, "")), ids(&coins));
        assert_eq!(ids(&filter_coins(&coins, "   \t")), ids(&coins));
    }

    #[test]
    fn test_filter_name_and_symbol() {
        let coins = sample();
        assert_eq!(ids(&filter_coins(&coins, "ETH")), vec!["ethereum", "tether", "ethena"]);
        assert_eq!(ids(&filter_coins(&coins, "usdt")), vec!["tether"]);
        assert!(filter_coins(&coins, "doge").is_empty());
    }

    #[test]
    fn test_view_sort_after_filter_only_reorders_subset() {
        let mut view = CoinTableView::new(sample());
        view.set_query("eth");
        view.set_sort(SortState::new(SortKey::CurrentPrice, SortDirection::Asc));
        assert_eq!(ids(view.rows()), vec!["tether", "ethena", "ethereum"]);
    }

    #[test]
    fn test_view_filter_after_sort_keeps_order() {
        let mut view = CoinTableView::new(sample());
        view.set_sort(SortState::new(SortKey::CurrentPrice, SortDirection::Asc));
        view.set_query("et");
        assert_eq!(ids(view.rows()), vec!["tether", "ethena", "ethereum"]);
        view.set_query("");
        assert_eq!(view.rows().len(), 5);
        assert_eq!(view.rows()[0].id, "mystery");
    }

    #[test]
    fn test_view_new_page_reapplies_sort_and_filter() {
        let mut view = CoinTableView::new(sample());
        view.set_query("et");
        view.select_sort(SortKey::MarketCap);
        let mut next = sample();
        next.reverse();
        view.set_coins(next);
        assert_eq!(view.sort(), SortState::new(SortKey::MarketCap, SortDirection::Asc));
        assert_eq!(ids(view.rows()), vec!["ethena", "tether", "ethereum"]);
    }

    #[test]
    fn test_unranked_last_in_both_directions() {
        let mut coins = sample();
        coins[0].market_cap_rank = 0;
        sort_coins(&mut coins, SortState::new(SortKey::MarketCapRank, SortDirection::Asc));
        assert_eq!(coins.last().map(|c| c.id.as_str()), Some("bitcoin"));
        assert_eq!(coins[0].id, "ethereum");
    }

    #[test]
    fn test_view_refilter_keeps_order_after_sort_reset() {
        let mut view = CoinTableView::new(vec![
            coin("btc", "Bitcoin", "btc", 1, 64_000.0),
            coin("eth", "Ethereum", "eth", 2, 3_100.0),
            coin("unr", "Unranked", "unr", 0, 2.0),
        ]);
        view.select_sort(SortKey::CurrentPrice);
        view.set_sort(SortState::default());
        let sorted: Vec<String> = view.rows().iter().map(|c| c.id.clone()).collect();
        assert_eq!(sorted, vec!["btc", "eth", "unr"]);
        view.set_query("");
        assert_eq!(ids(view.rows()), sorted);
    }

    #[test]
    fn test_view_default_sort_keeps_source_order() {
        let mut coins = sample();
        coins.push(coin("unranked", "Unranked", "unr", 0, 2.0));
        let view = CoinTableView::new(coins);
        assert_eq!(view.rows().last().map(|c| c.id.as_str()), Some("unranked"));
    }
}
