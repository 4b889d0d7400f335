//! PyO3 bindings for the ecosim profile and aggregation components.
//!
//! Exposes to Python:
//! - Simulation configuration and the canonical slot set
//! - Profile reading and conversion
//! - Market results aggregation
//!
//! Timestamps cross the boundary as UTC epoch seconds.

use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use chrono::{DateTime, Duration};
use ecosim_aggregation::{
    MarketRecord as RustMarketRecord, MarketResultsAggregator, MarketSlotData,
};
use ecosim_core::{
    Error, Profile, ProfileType, SimulationConfig as RustSimulationConfig, SlotLength, Timestamp,
};
use ecosim_ingestion::ProfileInput;
use ecosim_profiles::{read_profile_without_config as read_standalone, ProfileReader};

// ============================================================================
// Conversions
// ============================================================================

fn to_py_err(err: Error) -> PyErr {
    match err {
        Error::Io(err) => PyIOError::new_err(err.to_string()),
        other => PyValueError::new_err(other.to_string()),
    }
}

fn to_timestamp(secs: i64) -> PyResult<Timestamp> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| PyValueError::new_err(format!("timestamp {secs} is out of range")))
}

fn parse_profile_type(name: &str) -> PyResult<ProfileType> {
    serde_json::from_value(serde_json::Value::String(name.to_uppercase()))
        .map_err(|_| PyValueError::new_err(format!("unknown profile type {name:?}")))
}

fn profile_input(profile: &str, is_file: bool) -> ProfileInput<f64> {
    if is_file {
        ProfileInput::File(PathBuf::from(profile))
    } else {
        ProfileInput::Serialized(profile.to_string())
    }
}

fn to_epoch_map(profile: Profile<f64>) -> BTreeMap<i64, f64> {
    profile
        .into_iter()
        .map(|(ts, value)| (ts.timestamp(), value))
        .collect()
}

// ============================================================================
// Python-exposed Types
// ============================================================================

/// A bid, offer or trade of energy at a price.
#[pyclass]
#[derive(Clone)]
pub struct MarketRecord {
    #[pyo3(get, set)]
    pub energy_kwh: f64,
    #[pyo3(get, set)]
    pub price: f64,
}

#[pymethods]
impl MarketRecord {
    #[new]
    fn new(energy_kwh: f64, price: f64) -> Self {
        MarketRecord { energy_kwh, price }
    }

    fn __repr__(&self) -> String {
        format!("MarketRecord(energy_kwh={}, price={})", self.energy_kwh, self.price)
    }
}

impl From<MarketRecord> for RustMarketRecord {
    fn from(r: MarketRecord) -> Self {
        RustMarketRecord::new(r.energy_kwh, r.price)
    }
}

/// Simulation timing configuration.
#[pyclass]
#[derive(Clone)]
pub struct SimulationConfig {
    inner: RustSimulationConfig,
}

#[pymethods]
impl SimulationConfig {
    #[new]
    #[pyo3(signature = (
        start_date,
        slot_length_secs = 900,
        tick_length_secs = 15,
        sim_duration_secs = 86_400,
        is_canary_network = false,
        canary_expansion_days = 7,
        future_market_duration_secs = 0
    ))]
    fn new(
        start_date: i64,
        slot_length_secs: i64,
        tick_length_secs: i64,
        sim_duration_secs: i64,
        is_canary_network: bool,
        canary_expansion_days: u32,
        future_market_duration_secs: i64,
    ) -> PyResult<Self> {
        let inner = RustSimulationConfig {
            start_date: to_timestamp(start_date)?,
            slot_length_secs,
            tick_length_secs,
            sim_duration_secs,
            is_canary_network,
            canary_expansion_days,
            future_market_duration_secs,
        };
        inner.validate().map_err(to_py_err)?;
        Ok(SimulationConfig { inner })
    }

    /// Parse a `{"simulation": {...}}` JSON document.
    #[staticmethod]
    fn from_json(json: &str) -> PyResult<Self> {
        let config = ecosim_core::Config::from_json_str(json).map_err(to_py_err)?;
        Ok(SimulationConfig {
            inner: config.simulation,
        })
    }

    /// Canonical slot starts, optionally anchored at `current_timestamp`.
    #[pyo3(signature = (current_timestamp = None))]
    fn market_slots(&self, current_timestamp: Option<i64>) -> PyResult<Vec<i64>> {
        let current = current_timestamp.map(to_timestamp).transpose()?;
        let slots = self.inner.market_slots(current).map_err(to_py_err)?;
        Ok(slots.into_iter().map(|ts| ts.timestamp()).collect())
    }

    #[getter]
    fn slot_length_secs(&self) -> i64 {
        self.inner.slot_length_secs
    }

    fn __repr__(&self) -> String {
        format!(
            "SimulationConfig(start_date={}, slot_length_secs={}, sim_duration_secs={})",
            self.inner.start_date.timestamp(),
            self.inner.slot_length_secs,
            self.inner.sim_duration_secs
        )
    }
}

// ============================================================================
// Profile Functions
// ============================================================================

/// Read a serialized profile (or file path) and convert it by profile type.
#[pyfunction]
#[pyo3(signature = (config, profile_type, profile, current_timestamp = None, is_file = false))]
fn read_arbitrary_profile(
    config: &SimulationConfig,
    profile_type: &str,
    profile: &str,
    current_timestamp: Option<i64>,
    is_file: bool,
) -> PyResult<BTreeMap<i64, f64>> {
    let profile_type = parse_profile_type(profile_type)?;
    let mut reader = ProfileReader::new(&config.inner);
    if let Some(ts) = current_timestamp {
        reader = reader.at(to_timestamp(ts)?);
    }
    reader
        .read_arbitrary_profile(profile_type, profile_input(profile, is_file))
        .map(to_epoch_map)
        .map_err(to_py_err)
}

/// Read a power profile into energy per slot without a simulation config.
#[pyfunction]
#[pyo3(signature = (profile, slot_length_secs, is_file = false))]
fn read_profile_without_config(
    profile: &str,
    slot_length_secs: i64,
    is_file: bool,
) -> PyResult<BTreeMap<i64, f64>> {
    let slot_length = SlotLength::from_secs(slot_length_secs).map_err(to_py_err)?;
    read_standalone(profile_input(profile, is_file), slot_length)
        .map(to_epoch_map)
        .map_err(to_py_err)
}

// ============================================================================
// Aggregation
// ============================================================================

/// Market results aggregator with the built-in market statistics.
#[pyclass(unsendable)]
pub struct PyMarketResultsAggregator {
    inner: MarketResultsAggregator<RustMarketRecord>,
}

#[pymethods]
impl PyMarketResultsAggregator {
    /// `last_accumulated` is a JSON result from a previous run.
    #[new]
    #[pyo3(signature = (resolution_secs, slot_length_secs, last_accumulated = None))]
    fn new(
        resolution_secs: i64,
        slot_length_secs: i64,
        last_accumulated: Option<&str>,
    ) -> PyResult<Self> {
        let slot_length = SlotLength::from_secs(slot_length_secs).map_err(to_py_err)?;
        let last = last_accumulated
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        let inner = MarketResultsAggregator::new(Duration::seconds(resolution_secs), slot_length, last)
            .map_err(to_py_err)?
            .with_market_statistics();
        Ok(PyMarketResultsAggregator { inner })
    }

    /// Buffer `{market_id: (bids, offers, trades)}` for one slot.
    fn update(
        &mut self,
        slot: i64,
        markets: HashMap<String, (Vec<MarketRecord>, Vec<MarketRecord>, Vec<MarketRecord>)>,
    ) -> PyResult<()> {
        let convert = |records: Vec<MarketRecord>| records.into_iter().map(Into::into).collect();
        let markets = markets
            .into_iter()
            .map(|(market_id, (bids, offers, trades))| {
                let data = MarketSlotData {
                    bids: convert(bids),
                    offers: convert(offers),
                    trades: convert(trades),
                };
                (market_id, data)
            })
            .collect();
        self.inner.update(to_timestamp(slot)?, markets);
        Ok(())
    }

    /// Emit all complete windows as JSON strings.
    fn generate(&mut self) -> PyResult<Vec<String>> {
        self.inner
            .generate()
            .map(|result| {
                let result = result.map_err(to_py_err)?;
                serde_json::to_string(&result).map_err(|e| PyValueError::new_err(e.to_string()))
            })
            .collect()
    }

    /// Number of slots waiting in the buffer.
    fn pending_slots(&self) -> usize {
        self.inner.pending_slots()
    }
}

// ============================================================================
// Module Definition
// ============================================================================

#[pymodule]
fn ecosim(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Types
    m.add_class::<MarketRecord>()?;
    m.add_class::<SimulationConfig>()?;

    // Engine classes
    m.add_class::<PyMarketResultsAggregator>()?;

    // Functions
    m.add_function(wrap_pyfunction!(read_arbitrary_profile, m)?)?;
    m.add_function(wrap_pyfunction!(read_profile_without_config, m)?)?;

    Ok(())
}
