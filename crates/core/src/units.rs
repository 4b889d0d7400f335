//! Power and energy unit conversions.

use crate::types::SlotLength;

/// Convert W to kW.
#[inline]
pub fn watts_to_kilowatts(power_w: f64) -> f64 {
    power_w / 1000.0
}

/// Convert kW to W.
#[inline]
pub fn kilowatts_to_watts(power_kw: f64) -> f64 {
    power_kw * 1000.0
}

/// Energy delivered in one slot at constant power: kW × slot hours.
#[inline]
pub fn power_kw_to_energy_kwh(power_kw: f64, slot_length: SlotLength) -> f64 {
    power_kw * slot_length.hours()
}

/// Constant power that delivers `energy_kwh` over one slot, in kW.
#[inline]
pub fn energy_kwh_to_power_kw(energy_kwh: f64, slot_length: SlotLength) -> f64 {
    energy_kwh / slot_length.hours()
}

/// Constant power that delivers `energy_kwh` over one slot, in W.
#[inline]
pub fn energy_kwh_to_power_w(energy_kwh: f64, slot_length: SlotLength) -> f64 {
    kilowatts_to_watts(energy_kwh_to_power_kw(energy_kwh, slot_length))
}
