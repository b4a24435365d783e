//! Shaping raw market data for the views.

use rand::Rng;

use coinboard_common::types::{ChartDays, ChartPoint, Coin, TimeRange, TradeRecord, TradeSide};

/// Size of the market-list pages (gainers, trending, recently added).
pub const MARKET_LIST_LIMIT: usize = 50;

/// Number of chart points the trading-history panel is built from.
pub const TRADE_HISTORY_POINTS: usize = 5;

/// Map a time-range token to the chart endpoint's day count.
///
/// Unrecognized tokens fall back to the default `7d` window.
pub fn calculate_timeframe(token: &str) -> ChartDays {
    resolve_time_range(token).days()
}

/// Lenient token parse: unrecognized tokens become the default range.
pub fn resolve_time_range(token: &str) -> TimeRange {
    TimeRange::from_token(token.trim()).unwrap_or_default()
}

/// `[timestamp, price]` pairs → chart points. Order and duplicates preserved.
pub fn transform_market_chart(pairs: &[[f64; 2]]) -> Vec<ChartPoint> {
    pairs
        .iter()
        .map(|[timestamp, price]| ChartPoint {
            timestamp: *timestamp as i64,
            price: *price,
        })
        .collect()
}

/// Where `current` sits inside `[low, high]`, as a percentage clamped to
/// `0..=100`. A missing or degenerate range puts it in the middle.
pub fn price_range_position(low: f64, high: f64, current: f64) -> f64 {
    let span = high - low;
    if !span.is_finite() || span <= 0.0 || !current.is_finite() {
        return 50.0;
    }
    ((current - low) / span * 100.0).clamp(0.0, 100.0)
}

/// Biggest 24h gainers first. Missing changes count as 0; ties keep page order.
pub fn biggest_gainers(coins: &[Coin], limit: usize) -> Vec<Coin> {
    let change = |c: &Coin| {
        let v = c.price_change_percentage_24h;
        if v.is_finite() {
            v
        } else {
            0.0
        }
    };
    let mut sorted = coins.to_vec();
    sorted.sort_by(|a, b| change(b).total_cmp(&change(a)));
    sorted.truncate(limit);
    sorted
}

/// Head of the rank-ordered page.
pub fn trending(coins: &[Coin], limit: usize) -> Vec<Coin> {
    coins.iter().take(limit).cloned().collect()
}

/// Tail of the rank-ordered page.
pub fn recently_added(coins: &[Coin], limit: usize) -> Vec<Coin> {
    coins[coins.len().saturating_sub(limit)..].to_vec()
}

/// Placeholder trade list for the history panel.
///
/// Needs at least [`TRADE_HISTORY_POINTS`] prices; uses the latest ones,
/// alternating buy/sell from the oldest, and returns them newest first.
/// Amounts are random in `[0.05, 0.25)` rounded to 3 decimals.
pub fn synthetic_trades<R: Rng + ?Sized>(prices: &[[f64; 2]], rng: &mut R) -> Vec<TradeRecord> {
    if prices.len() < TRADE_HISTORY_POINTS {
        return Vec::new();
    }
    let latest = &prices[prices.len() - TRADE_HISTORY_POINTS..];
    let mut trades: Vec<TradeRecord> = latest
        .iter()
        .enumerate()
        .map(|(i, [timestamp, price])| {
            let amount: f64 = rng.gen_range(0.05..0.25);
            TradeRecord {
                id: i,
                side: if i % 2 == 0 {
                    TradeSide::Buy
                } else {
                    TradeSide::Sell
                },
                amount: (amount * 1000.0).round() / 1000.0,
                price: *price,
                timestamp: *timestamp as i64,
            }
        })
        .collect();
    trades.reverse();
    trades
}

/// Open/close/extrema of a price series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartSummary {
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    /// Close vs open, in percent. `None` when the open is zero.
    pub change_pct: Option<f64>,
}

impl ChartSummary {
    pub fn from_points(points: &[ChartPoint]) -> Option<Self> {
        let first = points.first()?;
        let last = points.last()?;
        let (low, high) = points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.price), hi.max(p.price))
        });
        let change_pct =
            (first.price != 0.0).then(|| (last.price - first.price) / first.price * 100.0);
        Some(Self {
            open: first.price,
            close: last.price,
            high,
            low,
            change_pct,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn coin(id: &str, change: f64) -> Coin {
        Coin {
            id: id.into(),
            price_change_percentage_24h: change,
            ..Default::default()
        }
    }

    #[test]
    fn test_calculate_timeframe() {
        assert_eq!(calculate_timeframe("1d"), ChartDays::Days(1));
        assert_eq!(calculate_timeframe("7d"), ChartDays::Days(7));
        assert_eq!(calculate_timeframe("30d"), ChartDays::Days(30));
        assert_eq!(calculate_timeframe("90d"), ChartDays::Days(90));
        assert_eq!(calculate_timeframe("1y"), ChartDays::Days(365));
        assert_eq!(calculate_timeframe("max"), ChartDays::Max);
    }

    #[test]
    fn test_calculate_timeframe_unknown_defaults_to_week() {
        assert_eq!(calculate_timeframe("2w"), calculate_timeframe("7d"));
        assert_eq!(calculate_timeframe(""), ChartDays::Days(7));
        assert_eq!(calculate_timeframe("MAX"), ChartDays::Days(7));
    }

    #[test]
    fn test_transform_market_chart_preserves_order() {
        let points = transform_market_chart(&[[3.0, 30.0], [1.0, 10.0], [1.0, 10.0]]);
        assert_eq!(points.len(), 3);
        assert_eq!(points[0], ChartPoint { timestamp: 3, price: 30.0 });
        assert_eq!(points[2].timestamp, 1);
        assert!(transform_market_chart(&[]).is_empty());
    }

    #[test]
    fn test_price_range_position() {
        assert_eq!(price_range_position(100.0, 200.0, 150.0), 50.0);
        assert_eq!(price_range_position(100.0, 200.0, 125.0), 25.0);
        assert_eq!(price_range_position(100.0, 200.0, 250.0), 100.0);
        assert_eq!(price_range_position(100.0, 200.0, 50.0), 0.0);
        assert_eq!(price_range_position(0.0, 0.0, 10.0), 50.0);
        assert_eq!(price_range_position(200.0, 100.0, 150.0), 50.0);
    }

    #[test]
    fn test_market_lists() {
        let coins = vec![coin("a", 1.0), coin("b", f64::NAN), coin("c", 9.0), coin("d", -2.0)];
        let gainers = biggest_gainers(&coins, 3);
        let ids: Vec<_> = gainers.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);

        let ids: Vec<_> = trending(&coins, 2).into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["a", "b"]);

        let ids: Vec<_> = recently_added(&coins, 2).into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["c", "d"]);
        assert_eq!(recently_added(&coins, 50).len(), 4);
    }

    #[test]
    fn test_synthetic_trades_needs_five_points() {
        let mut rng = StdRng::seed_from_u64(7);
        let prices = [[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]];
        assert!(synthetic_trades(&prices, &mut rng).is_empty());
    }

    #[test]
    fn test_synthetic_trades_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let prices: Vec<[f64; 2]> = (0..8).map(|i| [i as f64 * 1000.0, 10.0 + i as f64]).collect();
        let trades = synthetic_trades(&prices, &mut rng);
        assert_eq!(trades.len(), 5);
        // newest first
        assert_eq!(trades[0].timestamp, 7000);
        assert_eq!(trades[4].timestamp, 3000);
        assert_eq!(trades[4].side, TradeSide::Buy);
        assert_eq!(trades[3].side, TradeSide::Sell);
        assert_eq!(trades[0].side, TradeSide::Buy);
        for t in &trades {
            assert!(t.amount >= 0.05 && t.amount <= 0.25);
            assert_eq!((t.amount * 1000.0).round() / 1000.0, t.amount);
        }
    }

    #[test]
    fn test_chart_summary() {
        let points = transform_market_chart(&[[0.0, 100.0], [1.0, 90.0], [2.0, 130.0], [3.0, 110.0]]);
        let s = ChartSummary::from_points(&points).unwrap();
        assert_eq!(s.open, 100.0);
        assert_eq!(s.close, 110.0);
        assert_eq!(s.high, 130.0);
        assert_eq!(s.low, 90.0);
        assert!((s.change_pct.unwrap() - 10.0).abs() < 1e-9);
        assert!(ChartSummary::from_points(&[]).is_none());
    }
}
