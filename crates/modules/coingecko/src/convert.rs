//! Wire → domain conversion. Missing or non-finite numbers become `0.0`.

use coinboard_common::error::{CoinboardError, CoinboardResult};
use coinboard_common::types::{Coin, CoinDetails, MarketChartData};

use crate::wire;

fn num(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

fn in_currency(map: &Option<wire::CurrencyMap<f64>>, vs: &str) -> Option<f64> {
    map.as_ref().and_then(|m| m.get(vs).copied().flatten())
}

fn text_in_currency(map: &Option<wire::CurrencyMap<String>>, vs: &str) -> String {
    map.as_ref()
        .and_then(|m| m.get(vs).cloned().flatten())
        .unwrap_or_default()
}

pub fn coin_from_market(w: wire::CoinMarket) -> Coin {
    Coin {
        id: w.id,
        symbol: w.symbol,
        name: w.name,
        image: w.image.unwrap_or_default(),
        current_price: num(w.current_price),
        market_cap: num(w.market_cap),
        market_cap_rank: w.market_cap_rank.unwrap_or(0),
        total_volume: num(w.total_volume),
        high_24h: num(w.high_24h),
        low_24h: num(w.low_24h),
        price_change_24h: num(w.price_change_24h),
        price_change_percentage_24h: num(w.price_change_percentage_24h),
        market_cap_change_24h: num(w.market_cap_change_24h),
        market_cap_change_percentage_24h: num(w.market_cap_change_percentage_24h),
        circulating_supply: num(w.circulating_supply),
        total_supply: num(w.total_supply),
        max_supply: num(w.max_supply),
        ath: num(w.ath),
        ath_change_percentage: num(w.ath_change_percentage),
        ath_date: w.ath_date.unwrap_or_default(),
        atl: num(w.atl),
        atl_change_percentage: num(w.atl_change_percentage),
        atl_date: w.atl_date.unwrap_or_default(),
        last_updated: w.last_updated.unwrap_or_default(),
    }
}

/// Flatten `/coins/{id}` into a coin snapshot quoted in `vs`.
///
/// The `*_in_currency` maps win over CoinGecko's USD-only scalars.
pub fn details_from_wire(w: wire::CoinDetail, vs: &str) -> CoinDetails {
    let md = w.market_data.unwrap_or_default();
    let image = w
        .image
        .and_then(|i| i.large.or(i.small).or(i.thumb))
        .unwrap_or_default();

    let coin = Coin {
        id: w.id,
        symbol: w.symbol,
        name: w.name,
        image,
        current_price: num(in_currency(&md.current_price, vs)),
        market_cap: num(in_currency(&md.market_cap, vs)),
        market_cap_rank: w.market_cap_rank.or(md.market_cap_rank).unwrap_or(0),
        total_volume: num(in_currency(&md.total_volume, vs)),
        high_24h: num(in_currency(&md.high_24h, vs)),
        low_24h: num(in_currency(&md.low_24h, vs)),
        price_change_24h: num(in_currency(&md.price_change_24h_in_currency, vs).or(md.price_change_24h)),
        price_change_percentage_24h: num(
            in_currency(&md.price_change_percentage_24h_in_currency, vs)
                .or(md.price_change_percentage_24h),
        ),
        market_cap_change_24h: num(
            in_currency(&md.market_cap_change_24h_in_currency, vs).or(md.market_cap_change_24h),
        ),
        market_cap_change_percentage_24h: num(
            in_currency(&md.market_cap_change_percentage_24h_in_currency, vs)
                .or(md.market_cap_change_percentage_24h),
        ),
        circulating_supply: num(md.circulating_supply),
        total_supply: num(md.total_supply),
        max_supply: num(md.max_supply),
        ath: num(in_currency(&md.ath, vs)),
        ath_change_percentage: num(in_currency(&md.ath_change_percentage, vs)),
        ath_date: text_in_currency(&md.ath_date, vs),
        atl: num(in_currency(&md.atl, vs)),
        atl_change_percentage: num(in_currency(&md.atl_change_percentage, vs)),
        atl_date: text_in_currency(&md.atl_date, vs),
        last_updated: md.last_updated.or(w.last_updated).unwrap_or_default(),
    };

    CoinDetails {
        coin,
        description: w.description.unwrap_or_default(),
        links: w.links.unwrap_or_default(),
        categories: w
            .categories
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .collect(),
        developer_data: w.developer_data.unwrap_or_default(),
        community_data: w.community_data.unwrap_or_default(),
    }
}

fn pair(value: &serde_json::Value) -> Option<[f64; 2]> {
    match value.as_array()?.as_slice() {
        [t, v] => Some([t.as_f64()?, v.as_f64()?]),
        _ => None,
    }
}

/// Validate the `prices` series strictly; the secondary series drop bad entries.
pub fn chart_from_wire(w: wire::MarketChart) -> CoinboardResult<MarketChartData> {
    let raw_prices = w
        .prices
        .ok_or_else(|| CoinboardError::Validation("market chart response has no prices".into()))?;
    let prices = raw_prices
        .iter()
        .enumerate()
        .map(|(i, v)| {
            pair(v).ok_or_else(|| {
                CoinboardError::Validation(format!("malformed price entry at index {i}: {v}"))
            })
        })
        .collect::<CoinboardResult<Vec<_>>>()?;

    let lenient = |series: Option<Vec<serde_json::Value>>| -> Vec<[f64; 2]> {
        series.unwrap_or_default().iter().filter_map(pair).collect()
    };

    Ok(MarketChartData {
        prices,
        market_caps: lenient(w.market_caps),
        total_volumes: lenient(w.total_volumes),
    })
}
