//! Market results aggregation for the ecosim pipeline.
//!
//! This crate handles:
//! - Buffering per-slot market data
//! - Emitting statistics over fixed-resolution windows
//! - Built-in traded energy and price statistics
//! - Scheduling which windows are due

pub mod aggregator;
pub mod statistics;
pub mod time_manager;

pub use aggregator::{AggregatedResult, AggregationWindow, MarketResultsAggregator, MarketSlotData};
pub use statistics::{MarketRecord, PriceSummary};
pub use time_manager::{AggregationTimeManager, TimeWindow};
