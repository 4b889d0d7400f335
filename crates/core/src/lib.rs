//! Core types and configuration for the ecosim profile pipeline.
//!
//! This crate provides shared types used across all other crates:
//! - Timestamps, profiles and slot lengths
//! - Power/energy unit conversions
//! - Simulation and aggregation configuration
//! - Common error types

pub mod config;
pub mod error;
pub mod types;
pub mod units;

pub use config::{AggregationConfig, Config, SimulationConfig};
pub use error::{Error, Result};
pub use types::*;
