//! Built-in market statistics.

use crate::aggregator::{AggregationWindow, MarketResultsAggregator};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const TRADED_ENERGY_KWH: &str = "traded_energy_kwh";
pub const TRADE_COUNT: &str = "trade_count";
pub const MIN_TRADE_PRICE: &str = "min_trade_price";
pub const MAX_TRADE_PRICE: &str = "max_trade_price";
pub const AVG_TRADE_PRICE: &str = "avg_trade_price";
pub const BID_COUNT: &str = "bid_count";
pub const OFFER_COUNT: &str = "offer_count";
pub const ACCUMULATED_TRADED_ENERGY_KWH: &str = "accumulated_traded_energy_kwh";
pub const ACCUMULATED_TRADE_COST: &str = "accumulated_trade_cost";
pub const ACCUMULATED_TRADE_COUNT: &str = "accumulated_trade_count";

/// A bid, offer or trade of energy at a price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketRecord {
    /// Energy in kWh.
    pub energy_kwh: f64,
    /// Price per kWh.
    pub price: f64,
}

impl MarketRecord {
    pub fn new(energy_kwh: f64, price: f64) -> Self {
        Self { energy_kwh, price }
    }

    /// Total cost of the record.
    #[inline]
    pub fn cost(&self) -> f64 {
        self.energy_kwh * self.price
    }
}

/// Price range and mean over a set of trades.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl PriceSummary {
    /// Summarize the trade prices of a window. `None` without trades.
    pub fn of(window: &AggregationWindow<MarketRecord>) -> Option<Self> {
        let prices: Vec<f64> = window.trades().map(|trade| trade.price).collect();
        let min = prices.iter().copied().map(OrderedFloat).min()?;
        let max = prices.iter().copied().map(OrderedFloat).max()?;
        Some(Self {
            min: min.into_inner(),
            max: max.into_inner(),
            mean: statrs::statistics::Statistics::mean(&prices),
        })
    }
}

/// Energy traded within a window, in kWh.
pub fn traded_energy(window: &AggregationWindow<MarketRecord>) -> f64 {
    window.trades().map(|trade| trade.energy_kwh).sum()
}

/// Total cost of the trades within a window.
pub fn trade_cost(window: &AggregationWindow<MarketRecord>) -> f64 {
    window.trades().map(MarketRecord::cost).sum()
}

fn price_stat(window: &AggregationWindow<MarketRecord>, pick: fn(&PriceSummary) -> f64) -> Value {
    PriceSummary::of(window).map_or(Value::Null, |summary| json!(pick(&summary)))
}

fn add_f64(prior: Option<&Value>, delta: f64) -> Value {
    json!(prior.and_then(Value::as_f64).unwrap_or(0.0) + delta)
}

impl MarketResultsAggregator<MarketRecord> {
    /// Register the built-in per-window and accumulated market statistics.
    pub fn with_market_statistics(mut self) -> Self {
        self.register_aggregator(TRADED_ENERGY_KWH, |window| json!(traded_energy(window)));
        self.register_aggregator(TRADE_COUNT, |window| json!(window.trades().count()));
        self.register_aggregator(MIN_TRADE_PRICE, |window| price_stat(window, |s| s.min));
        self.register_aggregator(MAX_TRADE_PRICE, |window| price_stat(window, |s| s.max));
        self.register_aggregator(AVG_TRADE_PRICE, |window| price_stat(window, |s| s.mean));
        self.register_aggregator(BID_COUNT, |window| json!(window.bids().count()));
        self.register_aggregator(OFFER_COUNT, |window| json!(window.offers().count()));

        self.register_accumulator(ACCUMULATED_TRADED_ENERGY_KWH, |prior, window| {
            add_f64(prior, traded_energy(window))
        });
        self.register_accumulator(ACCUMULATED_TRADE_COST, |prior, window| {
            add_f64(prior, trade_cost(window))
        });
        self.register_accumulator(ACCUMULATED_TRADE_COUNT, |prior, window| {
            let count = window.trades().count() as u64;
            json!(prior.and_then(Value::as_u64).unwrap_or(0) + count)
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::MarketSlotData;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone, Utc};
    use ecosim_core::{SlotLength, Timestamp};
    use std::collections::BTreeMap;

    fn t(minutes: i64) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn slot(trades: Vec<MarketRecord>) -> BTreeMap<String, MarketSlotData<MarketRecord>> {
        let data = MarketSlotData {
            bids: vec![MarketRecord::new(1.0, 0.30)],
            offers: vec![MarketRecord::new(2.0, 0.20), MarketRecord::new(1.0, 0.25)],
            trades,
        };
        [("house-1".to_string(), data)].into_iter().collect()
    }

    fn aggregator() -> MarketResultsAggregator<MarketRecord> {
        MarketResultsAggregator::new(
            Duration::minutes(30),
            SlotLength::from_minutes(15).unwrap(),
            None,
        )
        .unwrap()
        .with_market_statistics()
    }

    #[test]
    fn test_window_statistics() {
        let mut aggregator = aggregator();
        aggregator.update(t(0), slot(vec![MarketRecord::new(2.0, 0.20)]));
        aggregator.update(t(15), slot(vec![MarketRecord::new(1.0, 0.35), MarketRecord::new(1.0, 0.26)]));

        let result = aggregator.generate().next().unwrap().unwrap();
        let stat = |name: &str| result.aggregated[name].as_f64().unwrap();

        assert_relative_eq!(stat(TRADED_ENERGY_KWH), 4.0);
        assert_eq!(result.aggregated[TRADE_COUNT], json!(3));
        assert_relative_eq!(stat(MIN_TRADE_PRICE), 0.20);
        assert_relative_eq!(stat(MAX_TRADE_PRICE), 0.35);
        assert_relative_eq!(stat(AVG_TRADE_PRICE), (0.20 + 0.35 + 0.26) / 3.0, epsilon = 1e-12);
        assert_eq!(result.aggregated[BID_COUNT], json!(2));
        assert_eq!(result.aggregated[OFFER_COUNT], json!(4));
    }

    #[test]
    fn test_prices_null_without_trades() {
        let mut aggregator = aggregator();
        aggregator.update(t(0), slot(vec![]));
        aggregator.update(t(15), slot(vec![]));

        let result = aggregator.generate().next().unwrap().unwrap();
        assert_eq!(result.aggregated[MIN_TRADE_PRICE], Value::Null);
        assert_eq!(result.aggregated[AVG_TRADE_PRICE], Value::Null);
        assert_eq!(result.aggregated[TRADE_COUNT], json!(0));
    }

    #[test]
    fn test_accumulated_statistics() {
        let mut aggregator = aggregator();
        for minutes in [0, 15, 30, 45] {
            aggregator.update(t(minutes), slot(vec![MarketRecord::new(1.5, 0.20)]));
        }
        let results: Vec<_> = aggregator
            .generate()
            .collect::<ecosim_core::Result<_>>()
            .unwrap();

        let last = &results[1].accumulated;
        assert_relative_eq!(last[ACCUMULATED_TRADED_ENERGY_KWH].as_f64().unwrap(), 6.0);
        assert_relative_eq!(last[ACCUMULATED_TRADE_COST].as_f64().unwrap(), 1.2, epsilon = 1e-12);
        assert_eq!(last[ACCUMULATED_TRADE_COUNT], json!(4));
    }
}
