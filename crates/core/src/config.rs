//! Configuration structures for the ecosim profile and aggregation core.

use crate::error::{Error, Result};
use crate::types::{floor_to_slot, slot_sequence, SlotLength, Timestamp};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default simulation start: 2024-01-01T00:00Z.
const DEFAULT_START_EPOCH_SECS: i64 = 1_704_067_200;

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Simulation timing.
    pub simulation: SimulationConfig,
    /// Market results aggregation.
    pub aggregation: AggregationConfig,
}

impl Config {
    /// Parse a configuration from a JSON string and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file and validate it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Validate all sections.
    pub fn validate(&self) -> Result<()> {
        self.simulation.validate()?;
        self.aggregation.validate(&self.simulation)
    }
}

/// Simulation timing configuration.
///
/// Read by the profile pipeline to determine the canonical slot set and
/// whether short profiles are replicated over several days. Never mutated
/// by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Simulation start date (UTC).
    pub start_date: Timestamp,
    /// Market slot length in seconds.
    pub slot_length_secs: i64,
    /// Tick length in seconds.
    pub tick_length_secs: i64,
    /// Total simulation duration in seconds.
    pub sim_duration_secs: i64,
    /// Continuously replaying live deployment.
    pub is_canary_network: bool,
    /// Days a profile is expanded over in canary mode.
    pub canary_expansion_days: u32,
    /// Extra horizon covered for future markets, in seconds.
    pub future_market_duration_secs: i64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start_date: DateTime::<Utc>::from_timestamp(DEFAULT_START_EPOCH_SECS, 0)
                .unwrap_or_default(),
            slot_length_secs: 15 * 60,
            tick_length_secs: 15,
            sim_duration_secs: 24 * 60 * 60,
            is_canary_network: false,
            canary_expansion_days: 7,
            future_market_duration_secs: 0,
        }
    }
}

impl SimulationConfig {
    /// Market slot length.
    pub fn slot_length(&self) -> Result<SlotLength> {
        SlotLength::from_secs(self.slot_length_secs)
    }

    /// Tick length.
    pub fn tick_length(&self) -> Duration {
        Duration::seconds(self.tick_length_secs)
    }

    /// Total simulation duration.
    pub fn sim_duration(&self) -> Duration {
        Duration::seconds(self.sim_duration_secs)
    }

    /// Number of ticks in one market slot.
    pub fn ticks_per_slot(&self) -> Result<i64> {
        if self.tick_length_secs <= 0 {
            return Err(Error::config(format!(
                "tick length must be positive, got {}s",
                self.tick_length_secs
            )));
        }
        Ok(self.slot_length()?.as_secs() / self.tick_length_secs)
    }

    /// Span covered by the canonical slot set.
    pub fn horizon(&self) -> Duration {
        let base = if self.is_canary_network {
            Duration::days(i64::from(self.canary_expansion_days))
        } else {
            self.sim_duration()
        };
        base + Duration::seconds(self.future_market_duration_secs)
    }

    /// Whether a profile shorter than a day must be replicated across days.
    pub fn requires_multi_day_profiles(&self) -> bool {
        self.is_canary_network || self.sim_duration() > Duration::days(1)
    }

    /// The canonical, gap-free slot set for a run.
    ///
    /// Starts at `current_timestamp` (rounded down to the slot) when given,
    /// otherwise at the configured start date.
    pub fn market_slots(&self, current_timestamp: Option<Timestamp>) -> Result<Vec<Timestamp>> {
        let slot_length = self.slot_length()?;
        let start = match current_timestamp {
            Some(ts) => floor_to_slot(ts, slot_length),
            None => self.start_date,
        };
        let count = slot_length.slots_in(self.horizon());
        Ok(slot_sequence(start, count, slot_length))
    }

    /// Validate timing parameters.
    pub fn validate(&self) -> Result<()> {
        let slot_length = self.slot_length()?;
        let ticks = self.ticks_per_slot()?;
        if ticks == 0 || slot_length.as_secs() % self.tick_length_secs != 0 {
            return Err(Error::config(format!(
                "slot length {slot_length} is not a whole multiple of the {}s tick",
                self.tick_length_secs
            )));
        }
        if self.sim_duration_secs < slot_length.as_secs() {
            return Err(Error::config(format!(
                "simulation duration of {}s is shorter than one slot",
                self.sim_duration_secs
            )));
        }
        if self.future_market_duration_secs < 0 {
            return Err(Error::config("future market duration must not be negative"));
        }
        if self.is_canary_network && self.canary_expansion_days == 0 {
            return Err(Error::config("canary expansion must cover at least one day"));
        }
        Ok(())
    }
}

/// Market results aggregation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Aggregation window width in seconds.
    pub resolution_secs: i64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            resolution_secs: 60 * 60,
        }
    }
}

impl AggregationConfig {
    /// Aggregation window width.
    pub fn resolution(&self) -> Duration {
        Duration::seconds(self.resolution_secs)
    }

    /// The resolution must cover at least one base slot.
    pub fn validate(&self, simulation: &SimulationConfig) -> Result<()> {
        let slot_length = simulation.slot_length()?;
        if self.resolution_secs < slot_length.as_secs() {
            return Err(Error::config(format!(
                "aggregation resolution of {}s is shorter than the {slot_length} slot",
                self.resolution_secs
            )));
        }
        Ok(())
    }
}
