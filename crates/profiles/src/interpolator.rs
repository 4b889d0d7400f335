//! Resampling of power series into fixed-width energy slots.
//!
//! Each input value holds until the next input point (a step function over
//! whole seconds). A slot takes the power found at its starting second.
//! This is a piecewise-constant approximation, not a true average over the
//! slot: power changes inside a slot are ignored.

use chrono::DateTime;
use ecosim_core::units::{power_kw_to_energy_kwh, watts_to_kilowatts};
use ecosim_core::{Error, Profile, Result, SlotLength};

/// Per-slot output of [`SlotInterpolator::interpolate`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotSeries {
    /// Slot start times in epoch seconds.
    pub slot_starts: Vec<i64>,
    /// Power at the start of each slot, in kW.
    pub average_power_kw: Vec<f64>,
    /// Energy per slot, in kWh: the slot power times the slot length in
    /// hours. For 15-minute slots this is a quarter of `average_power_kw`.
    pub energy_kwh: Vec<f64>,
}

impl SlotSeries {
    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slot_starts.len()
    }

    /// Whether no slot was produced.
    pub fn is_empty(&self) -> bool {
        self.slot_starts.is_empty()
    }

    /// Energy values keyed by slot start.
    pub fn energy_profile(&self) -> Profile<f64> {
        self.keyed(&self.energy_kwh)
    }

    /// Power values keyed by slot start.
    pub fn power_profile(&self) -> Profile<f64> {
        self.keyed(&self.average_power_kw)
    }

    fn keyed(&self, values: &[f64]) -> Profile<f64> {
        self.slot_starts
            .iter()
            .zip(values)
            .filter_map(|(&secs, &value)| DateTime::from_timestamp(secs, 0).map(|ts| (ts, value)))
            .collect()
    }
}

/// Power step function relative to the first input point.
struct StepFunction {
    /// Seconds since the first point, ascending; first entry is 0.
    offsets: Vec<i64>,
    /// Power held from the matching offset on.
    values: Vec<f64>,
    /// Epoch seconds of the first point.
    origin: i64,
}

impl StepFunction {
    fn from_profile(power_w: &Profile<f64>, slot_length: SlotLength) -> Option<Self> {
        let origin = power_w.keys().next()?.timestamp();
        let mut offsets: Vec<i64> = power_w.keys().map(|ts| ts.timestamp() - origin).collect();
        let mut values: Vec<f64> = power_w.values().copied().collect();

        // Synthetic trailing point so the last slot is fully covered
        let last_offset = *offsets.last()?;
        let last_value = *values.last()?;
        offsets.push(last_offset + slot_length.as_secs());
        values.push(last_value);

        Some(Self {
            offsets,
            values,
            origin,
        })
    }

    /// Seconds covered by the function.
    fn span(&self) -> i64 {
        self.offsets.last().copied().unwrap_or_default()
    }

    fn value_at(&self, offset: i64) -> f64 {
        let idx = self.offsets.partition_point(|&o| o <= offset);
        idx.checked_sub(1)
            .and_then(|i| self.values.get(i))
            .copied()
            .unwrap_or_default()
    }
}

/// Converts power profiles (W) into per-slot power and energy.
#[derive(Debug, Clone, Copy)]
pub struct SlotInterpolator {
    slot_length: SlotLength,
}

impl SlotInterpolator {
    /// Create an interpolator for the given output slot width.
    pub fn new(slot_length: SlotLength) -> Self {
        Self { slot_length }
    }

    /// Output slot width.
    pub fn slot_length(&self) -> SlotLength {
        self.slot_length
    }

    /// Resample `power_w` into slots starting at its first timestamp.
    ///
    /// Requires at least two input points.
    pub fn interpolate(&self, power_w: &Profile<f64>) -> Result<SlotSeries> {
        if power_w.len() < 2 {
            return Err(Error::insufficient_data(format!(
                "interpolation needs at least 2 points, got {}",
                power_w.len()
            )));
        }
        let steps = StepFunction::from_profile(power_w, self.slot_length)
            .ok_or_else(|| Error::insufficient_data("empty power profile"))?;

        let step = self.slot_length.as_secs();
        let slot_count = (steps.span() + step - 1) / step;
        let mut series = SlotSeries {
            slot_starts: Vec::with_capacity(slot_count as usize),
            average_power_kw: Vec::with_capacity(slot_count as usize),
            energy_kwh: Vec::with_capacity(slot_count as usize),
        };

        for k in 0..slot_count {
            let offset = k * step;
            let power_kw = watts_to_kilowatts(steps.value_at(offset));
            series.slot_starts.push(steps.origin + offset);
            series.average_power_kw.push(power_kw);
            series.energy_kwh.push(power_kw_to_energy_kwh(power_kw, self.slot_length));
        }

        Ok(series)
    }
}
