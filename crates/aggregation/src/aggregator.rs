//! Windowed aggregation of per-slot market results.
//!
//! Raw market data is buffered per base slot. Once every slot of an
//! aggregation window is present, registered statistics are computed over the
//! window and the processed slots are purged from the buffer.

use chrono::Duration;
use ecosim_core::{format_timestamp, Config, Error, Result, SlotLength, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Raw market data of one slot.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSlotData<R> {
    pub bids: Vec<R>,
    pub offers: Vec<R>,
    pub trades: Vec<R>,
}

impl<R> Default for MarketSlotData<R> {
    fn default() -> Self {
        Self {
            bids: Vec::new(),
            offers: Vec::new(),
            trades: Vec::new(),
        }
    }
}

impl<R> MarketSlotData<R> {
    /// Append all records of `other`.
    pub fn extend(&mut self, other: MarketSlotData<R>) {
        self.bids.extend(other.bids);
        self.offers.extend(other.offers);
        self.trades.extend(other.trades);
    }
}

/// A complete window of buffered slots handed to statistics functions.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationWindow<R> {
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub slots: BTreeMap<Timestamp, MarketSlotData<R>>,
}

impl<R> AggregationWindow<R> {
    /// All bids in the window, in slot order.
    pub fn bids(&self) -> impl Iterator<Item = &R> {
        self.slots.values().flat_map(|slot| slot.bids.iter())
    }

    /// All offers in the window, in slot order.
    pub fn offers(&self) -> impl Iterator<Item = &R> {
        self.slots.values().flat_map(|slot| slot.offers.iter())
    }

    /// All trades in the window, in slot order.
    pub fn trades(&self) -> impl Iterator<Item = &R> {
        self.slots.values().flat_map(|slot| slot.trades.iter())
    }
}

/// Statistics computed for one aggregation window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    /// Per-window statistics by name.
    #[serde(rename = "aggregated_results")]
    pub aggregated: BTreeMap<String, Value>,
    /// Running statistics by name, carried across windows.
    #[serde(rename = "accumulated_results")]
    pub accumulated: BTreeMap<String, Value>,
}

type AggregatorFn<R> = Box<dyn Fn(&AggregationWindow<R>) -> Value>;
type AccumulatorFn<R> = Box<dyn Fn(Option<&Value>, &AggregationWindow<R>) -> Value>;

/// Buffers per-slot market results and emits windowed statistics.
pub struct MarketResultsAggregator<R> {
    resolution: Duration,
    slot_length: SlotLength,
    slots_per_window: usize,
    buffer: BTreeMap<Timestamp, MarketSlotData<R>>,
    aggregators: BTreeMap<String, AggregatorFn<R>>,
    accumulators: BTreeMap<String, AccumulatorFn<R>>,
    /// Most recent result, seeded from a previous run when resuming.
    last_result: Option<AggregatedResult>,
}

impl<R> MarketResultsAggregator<R> {
    /// Create an aggregator emitting windows of `resolution`.
    ///
    /// `resolution` must be a whole, non-zero multiple of `slot_length`.
    /// `last_accumulated` seeds the accumulators and the continuity check.
    pub fn new(
        resolution: Duration,
        slot_length: SlotLength,
        last_accumulated: Option<AggregatedResult>,
    ) -> Result<Self> {
        let resolution_secs = resolution.num_seconds();
        if resolution_secs < slot_length.as_secs() {
            return Err(Error::config(format!(
                "aggregation resolution of {resolution_secs}s is shorter than the {slot_length} slot"
            )));
        }
        if resolution_secs % slot_length.as_secs() != 0 {
            return Err(Error::config(format!(
                "aggregation resolution of {resolution_secs}s is not a multiple of the {slot_length} slot"
            )));
        }

        Ok(Self {
            resolution,
            slot_length,
            slots_per_window: slot_length.slots_in(resolution),
            buffer: BTreeMap::new(),
            aggregators: BTreeMap::new(),
            accumulators: BTreeMap::new(),
            last_result: last_accumulated,
        })
    }

    /// Create an aggregator from the configured resolution and slot length.
    pub fn from_config(config: &Config, last_accumulated: Option<AggregatedResult>) -> Result<Self> {
        Self::new(
            config.aggregation.resolution(),
            config.simulation.slot_length()?,
            last_accumulated,
        )
    }

    /// Register a per-window statistic under `name`.
    pub fn register_aggregator<F>(&mut self, name: impl Into<String>, aggregator: F)
    where
        F: Fn(&AggregationWindow<R>) -> Value + 'static,
    {
        self.aggregators.insert(name.into(), Box::new(aggregator));
    }

    /// Register a running statistic under `name`.
    ///
    /// The function receives the previous value (if any) and the new window.
    pub fn register_accumulator<F>(&mut self, name: impl Into<String>, accumulator: F)
    where
        F: Fn(Option<&Value>, &AggregationWindow<R>) -> Value + 'static,
    {
        self.accumulators.insert(name.into(), Box::new(accumulator));
    }

    /// Buffer the results of every market for `slot`.
    ///
    /// Calling this twice for the same slot appends the records twice.
    pub fn update(&mut self, slot: Timestamp, markets: BTreeMap<String, MarketSlotData<R>>) {
        if markets.is_empty() {
            return;
        }
        let entry = self.buffer.entry(slot).or_default();
        for data in markets.into_values() {
            entry.extend(data);
        }
    }

    /// Emit results for every complete window in the buffer.
    ///
    /// Iteration stops at the first incomplete window. An inconsistent
    /// window yields an error and ends the iteration; its slots stay
    /// buffered.
    pub fn generate(&mut self) -> impl Iterator<Item = Result<AggregatedResult>> + '_ {
        let mut failed = false;
        std::iter::from_fn(move || {
            if failed {
                return None;
            }
            let next = self.next_window()?;
            failed = next.is_err();
            Some(next)
        })
    }

    /// Number of slots waiting in the buffer.
    pub fn pending_slots(&self) -> usize {
        self.buffer.len()
    }

    /// The most recently emitted (or seeded) result.
    pub fn last_result(&self) -> Option<&AggregatedResult> {
        self.last_result.as_ref()
    }

    pub fn resolution(&self) -> Duration {
        self.resolution
    }

    fn next_window(&mut self) -> Option<Result<AggregatedResult>> {
        let start_time = *self.buffer.keys().next()?;
        let end_time = start_time + self.resolution;

        let last_expected = end_time - self.slot_length.duration();
        self.buffer.range(last_expected..).next()?;

        let slot_count = self.buffer.range(start_time..end_time).count();
        if slot_count != self.slots_per_window {
            return Some(Err(Error::aggregation_consistency(format!(
                "window {} holds {slot_count} slots, expected {}",
                format_timestamp(start_time),
                self.slots_per_window
            ))));
        }

        if let Some(previous) = &self.last_result {
            let expected_start = previous.start_time + self.resolution;
            if start_time != expected_start {
                return Some(Err(Error::aggregation_consistency(format!(
                    "window {} does not follow the previous window at {}",
                    format_timestamp(start_time),
                    format_timestamp(previous.start_time)
                ))));
            }
        }

        let remaining = self.buffer.split_off(&end_time);
        let window = AggregationWindow {
            start_time,
            end_time,
            slots: std::mem::replace(&mut self.buffer, remaining),
        };

        let aggregated = self
            .aggregators
            .iter()
            .map(|(name, aggregator)| (name.clone(), aggregator(&window)))
            .collect();
        let previous = self.last_result.as_ref().map(|result| &result.accumulated);
        let accumulated = self
            .accumulators
            .iter()
            .map(|(name, accumulator)| {
                let prior = previous.and_then(|values| values.get(name));
                (name.clone(), accumulator(prior, &window))
            })
            .collect();

        let result = AggregatedResult {
            start_time,
            end_time,
            aggregated,
            accumulated,
        };
        debug!(
            start = %format_timestamp(start_time),
            slots = slot_count,
            pending = self.buffer.len(),
            "emitted aggregation window"
        );
        self.last_result = Some(result.clone());
        Some(Ok(result))
    }
}
