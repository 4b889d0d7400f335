//! Core data types for ecosim profiles.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Timezone-aware point in time. UTC is the canonical timezone.
pub type Timestamp = DateTime<Utc>;

/// Ordered mapping from slot timestamp to value.
pub type Profile<V = f64> = BTreeMap<Timestamp, V>;

/// Canonical string format for timestamp keys (`YYYY-MM-DDTHH:mm`).
pub const CANONICAL_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Seconds in one hour.
pub const SECONDS_PER_HOUR: i64 = 3_600;

/// Format a timestamp in the canonical key format.
pub fn format_timestamp(ts: Timestamp) -> String {
    ts.format(CANONICAL_TIME_FORMAT).to_string()
}

/// Round a timestamp down to the enclosing slot boundary (epoch aligned).
pub fn floor_to_slot(ts: Timestamp, slot_length: SlotLength) -> Timestamp {
    let remainder = ts.timestamp().rem_euclid(slot_length.as_secs());
    ts - Duration::seconds(remainder) - Duration::nanoseconds(ts.timestamp_subsec_nanos() as i64)
}

/// Generate `count` consecutive slot starts beginning at `start`.
pub fn slot_sequence(start: Timestamp, count: usize, slot_length: SlotLength) -> Vec<Timestamp> {
    let step = slot_length.duration();
    let mut slots = Vec::with_capacity(count);
    let mut current = start;
    for _ in 0..count {
        slots.push(current);
        current += step;
    }
    slots
}

/// Fixed slot width of a profile's canonical domain, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotLength(i64);

impl SlotLength {
    /// Create a slot length from seconds. Must be positive.
    pub fn from_secs(secs: i64) -> Result<Self> {
        if secs <= 0 {
            return Err(Error::config(format!(
                "slot length must be positive, got {secs}s"
            )));
        }
        Ok(Self(secs))
    }

    /// Create a slot length from minutes.
    pub fn from_minutes(minutes: i64) -> Result<Self> {
        Self::from_secs(minutes.saturating_mul(60))
    }

    /// Create a slot length from a duration with no sub-second part.
    pub fn from_duration(duration: Duration) -> Result<Self> {
        if duration.subsec_nanos() != 0 {
            return Err(Error::config(format!(
                "slot length must be a whole number of seconds, got {duration}"
            )));
        }
        Self::from_secs(duration.num_seconds())
    }

    /// Slot length in seconds.
    #[inline]
    pub fn as_secs(self) -> i64 {
        self.0
    }

    /// Slot length as a duration.
    #[inline]
    pub fn duration(self) -> Duration {
        Duration::seconds(self.0)
    }

    /// Slot length in (fractional) hours.
    #[inline]
    pub fn hours(self) -> f64 {
        self.0 as f64 / SECONDS_PER_HOUR as f64
    }

    /// Number of whole slots that fit into `span`.
    pub fn slots_in(self, span: Duration) -> usize {
        let secs = span.num_seconds();
        if secs <= 0 {
            0
        } else {
            (secs / self.0) as usize
        }
    }

    /// Reject slot lengths that cannot resample hourly source data.
    ///
    /// The slot must evenly divide one hour or be a whole multiple of it.
    pub fn ensure_hour_compatible(self) -> Result<()> {
        if SECONDS_PER_HOUR % self.0 == 0 || self.0 % SECONDS_PER_HOUR == 0 {
            Ok(())
        } else {
            Err(Error::config(format!(
                "slot length of {}s neither divides nor is a multiple of one hour",
                self.0
            )))
        }
    }
}

impl fmt::Display for SlotLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % 60 == 0 {
            write!(f, "{}min", self.0 / 60)
        } else {
            write!(f, "{}s", self.0)
        }
    }
}

/// A value that can occupy a profile slot.
///
/// `Default` is the zero value used when gap filling has nothing to carry.
pub trait SlotValue: Copy + Default + PartialEq + fmt::Debug {
    /// Convert a JSON-like raw value. Returns `None` for non-numeric input.
    fn from_json(value: &Value) -> Option<Self>;

    /// Whether every component is a finite number.
    fn is_finite(&self) -> bool;
}

impl SlotValue for f64 {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    fn is_finite(&self) -> bool {
        f64::is_finite(*self)
    }
}

impl SlotValue for (f64, f64) {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) if items.len() == 2 => {
                Some((f64::from_json(&items[0])?, f64::from_json(&items[1])?))
            }
            _ => None,
        }
    }

    fn is_finite(&self) -> bool {
        self.0.is_finite() && self.1.is_finite()
    }
}

/// Semantic type of an input profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProfileType {
    /// Values are used as given.
    Identity,
    /// Instantaneous power in W, integrated to energy per slot.
    PowerW,
    /// Instantaneous power in W, rebased to average kW per slot.
    RebaseW,
    /// Energy per slot in kWh.
    EnergyKwh,
    /// Carbon intensity in g/kWh; a ratio, never zero-filled.
    CarbonRatioGKwh,
}

impl ProfileType {
    /// Whether the profile goes through slot interpolation.
    pub fn is_power_like(self) -> bool {
        matches!(
            self,
            ProfileType::PowerW | ProfileType::RebaseW | ProfileType::EnergyKwh
        )
    }
}

impl fmt::Display for ProfileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProfileType::Identity => "IDENTITY",
            ProfileType::PowerW => "POWER_W",
            ProfileType::RebaseW => "REBASE_W",
            ProfileType::EnergyKwh => "ENERGY_KWH",
            ProfileType::CarbonRatioGKwh => "CARBON_RATIO_G_KWH",
        };
        f.write_str(name)
    }
}
