//! Profile normalization pipeline.
//!
//! Ingests a raw profile, replicates short profiles over multiple days,
//! fills gaps against the canonical slot set and converts the result by
//! profile type.

use crate::interpolator::{SlotInterpolator, SlotSeries};
use crate::replication::{copy_profile_to_multiple_days, profile_span};
use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use ecosim_core::units::energy_kwh_to_power_w;
use ecosim_core::{
    floor_to_slot, slot_sequence, Error, Profile, ProfileType, Result, SimulationConfig,
    SlotLength, SlotValue, Timestamp,
};
use ecosim_ingestion::{fill_gaps, Ingested, ProfileIngestor, ProfileInput, SourceKind};
use tracing::{debug, warn};

/// A converted profile with ingestion details.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadReport {
    pub profile: Profile<f64>,
    /// File rows that could not be read as `(time, number)`.
    pub dropped_rows: usize,
    /// Shape the input was decoded from. `None` for a missing input.
    pub source: Option<SourceKind>,
}

/// Reads raw profiles into slot-aligned profiles for one simulation.
#[derive(Debug, Clone)]
pub struct ProfileReader<'a> {
    config: &'a SimulationConfig,
    /// Start of the canonical slot set, when not the configured start date.
    current_timestamp: Option<Timestamp>,
    /// Day hourly inputs are offset from. Defaults to the current UTC day.
    today: Option<NaiveDate>,
}

impl<'a> ProfileReader<'a> {
    pub fn new(config: &'a SimulationConfig) -> Self {
        Self {
            config,
            current_timestamp: None,
            today: None,
        }
    }

    /// Anchor the canonical slot set at `current_timestamp`.
    pub fn at(mut self, current_timestamp: Timestamp) -> Self {
        self.current_timestamp = Some(current_timestamp);
        self
    }

    /// Override the day hourly inputs are offset from.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// The canonical slot set this reader normalizes onto.
    pub fn market_slots(&self) -> Result<Vec<Timestamp>> {
        self.config.market_slots(self.current_timestamp)
    }

    /// Read a profile and convert it according to `profile_type`.
    ///
    /// A missing input, or one that yields no data points, gives an empty
    /// profile. Carbon ratio profiles are returned as ingested, without gap
    /// filling.
    pub fn read_arbitrary_profile(
        &self,
        profile_type: ProfileType,
        input: impl Into<Option<ProfileInput<f64>>>,
    ) -> Result<Profile<f64>> {
        self.read_arbitrary_profile_with_report(profile_type, input)
            .map(|report| report.profile)
    }

    /// [`Self::read_arbitrary_profile`], also reporting the input shape and
    /// the file rows dropped during ingestion.
    pub fn read_arbitrary_profile_with_report(
        &self,
        profile_type: ProfileType,
        input: impl Into<Option<ProfileInput<f64>>>,
    ) -> Result<ReadReport> {
        let Some(input) = non_empty(input.into()) else {
            return Ok(ReadReport::default());
        };
        let slot_length = self.config.slot_length()?;
        let slots = self.market_slots()?;
        let ingested = self.ingest(input, &slots, slot_length)?;
        let mut report = ReadReport {
            profile: Profile::new(),
            dropped_rows: ingested.dropped_rows,
            source: Some(ingested.source),
        };

        if ingested.profile.is_empty() {
            return Ok(report);
        }
        if profile_type == ProfileType::CarbonRatioGKwh {
            report.profile = ingested.profile;
            return Ok(report);
        }

        let source = ingested.source;
        let mut filled = self.fill(ingested.profile, &slots);

        report.profile = match profile_type {
            ProfileType::Identity | ProfileType::CarbonRatioGKwh => filled,
            ProfileType::PowerW => {
                interpolate(&filled, slot_length, profile_type, source)?.energy_profile()
            }
            ProfileType::RebaseW => {
                interpolate(&filled, slot_length, profile_type, source)?.power_profile()
            }
            ProfileType::EnergyKwh => {
                for value in filled.values_mut() {
                    *value = energy_kwh_to_power_w(*value, slot_length);
                }
                interpolate(&filled, slot_length, profile_type, source)?.energy_profile()
            }
        };
        Ok(report)
    }

    /// Read a profile onto the canonical slot set without conversion.
    pub fn read_identity_profile<V: SlotValue>(
        &self,
        input: impl Into<Option<ProfileInput<V>>>,
    ) -> Result<Profile<V>> {
        let Some(input) = non_empty(input.into()) else {
            return Ok(Profile::new());
        };
        let slot_length = self.config.slot_length()?;
        let slots = self.market_slots()?;
        let ingested = self.ingest(input, &slots, slot_length)?;
        if ingested.profile.is_empty() {
            return Ok(Profile::new());
        }
        Ok(self.fill(ingested.profile, &slots))
    }

    /// Identity pipeline over plain numbers, e.g. a price given as `"30.4"`.
    pub fn read_and_convert_identity_profile_to_float(
        &self,
        input: impl Into<Option<ProfileInput<f64>>>,
    ) -> Result<Profile<f64>> {
        let input: Option<ProfileInput<f64>> = input.into();
        self.read_identity_profile::<f64>(input)
    }

    fn ingest<V: SlotValue>(
        &self,
        input: ProfileInput<V>,
        slots: &[Timestamp],
        slot_length: SlotLength,
    ) -> Result<Ingested<V>> {
        let mut ingestor =
            ProfileIngestor::new(self.config.start_date).with_scalar_slots(slots.to_vec());
        if let Some(today) = self.today {
            ingestor = ingestor.with_today(today);
        }
        let ingested = ingestor.ingest(input)?;
        if ingested.source == SourceKind::Hourly {
            slot_length.ensure_hour_compatible()?;
        }
        Ok(ingested)
    }

    /// Replicate a sub-day profile when the run spans several days, then
    /// fill gaps against `slots`.
    fn fill<V: SlotValue>(&self, profile: Profile<V>, slots: &[Timestamp]) -> Profile<V> {
        let profile = if profile_span(&profile) < Duration::days(1)
            && self.config.requires_multi_day_profiles()
        {
            debug!(
                points = profile.len(),
                slots = slots.len(),
                "replicating daily profile over multiple days"
            );
            copy_profile_to_multiple_days(&profile, slots)
        } else {
            profile
        };
        fill_gaps(&profile, slots.iter().copied())
    }
}

/// Read a power profile (W) into energy per slot (kWh) without a running
/// simulation.
///
/// Slots run from the first timestamp, rounded down to `slot_length`,
/// through the last one. Source points between slot boundaries are kept for
/// interpolation. `HH:mm` keys are anchored at the start of the current UTC
/// day.
pub fn read_profile_without_config(
    input: impl Into<Option<ProfileInput<f64>>>,
    slot_length: SlotLength,
) -> Result<Profile<f64>> {
    let Some(input) = non_empty(input.into()) else {
        return Ok(Profile::new());
    };
    let today = Utc.from_utc_datetime(&Utc::now().date_naive().and_time(NaiveTime::MIN));
    let ingested = ProfileIngestor::new(today).ingest(input)?;
    if ingested.source == SourceKind::Hourly {
        slot_length.ensure_hour_compatible()?;
    }

    let profile = ingested.profile;
    let (Some(&first), Some(&last)) = (profile.keys().next(), profile.keys().next_back()) else {
        return Ok(Profile::new());
    };
    let start = floor_to_slot(first, slot_length);
    let count = slot_length.slots_in(last - start) + 1;

    let mut targets = slot_sequence(start, count, slot_length);
    targets.extend(profile.keys().copied());
    targets.sort_unstable();
    targets.dedup();

    let filled = fill_gaps(&profile, targets);
    Ok(interpolate(&filled, slot_length, ProfileType::PowerW, ingested.source)?.energy_profile())
}

fn non_empty<V>(input: Option<ProfileInput<V>>) -> Option<ProfileInput<V>> {
    input.filter(|input| !input.is_empty())
}

fn interpolate(
    power_w: &Profile<f64>,
    slot_length: SlotLength,
    profile_type: ProfileType,
    source: SourceKind,
) -> Result<SlotSeries> {
    SlotInterpolator::new(slot_length)
        .interpolate(power_w)
        .map_err(|err| {
            warn!(%profile_type, %source, error = %err, "profile interpolation failed");
            Error::profile_format(format!(
                "cannot convert {profile_type} profile read from {source}: {err}"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::{json, Map, Value};
    use std::collections::BTreeMap;

    fn keyed(value: Value) -> ProfileInput<f64> {
        let Value::Object(map) = value else {
            panic!("expected object");
        };
        ProfileInput::Keyed(map)
    }

    fn start(config: &SimulationConfig) -> Timestamp {
        config.start_date
    }

    #[test]
    fn test_scalar_string_covers_one_day() {
        let config = SimulationConfig::default();
        let reader = ProfileReader::new(&config);
        let profile = reader
            .read_and_convert_identity_profile_to_float(ProfileInput::<f64>::from("30.4"))
            .unwrap();

        assert_eq!(profile.len(), 96);
        assert_eq!(profile.keys().next(), Some(&start(&config)));
        assert!(profile.values().all(|&v| v == 30.4));
    }

    #[test]
    fn test_short_profile_replicated_over_three_days() {
        let config = SimulationConfig {
            sim_duration_secs: 3 * 86_400,
            ..Default::default()
        };
        let reader = ProfileReader::new(&config);
        let profile = reader
            .read_arbitrary_profile(
                ProfileType::Identity,
                keyed(json!({"00:00": 10, "12:00": 20})),
            )
            .unwrap();

        assert_eq!(profile.len(), 3 * 96);
        for day in 0..3 {
            let midnight = start(&config) + Duration::days(day);
            assert_eq!(profile[&midnight], 10.0);
            assert_eq!(profile[&(midnight + Duration::minutes(15))], 10.0);
            assert_eq!(profile[&(midnight + Duration::hours(12))], 20.0);
            assert_eq!(profile[&(midnight + Duration::hours(23))], 20.0);
        }
    }

    #[test]
    fn test_power_profile_to_energy() {
        let config = SimulationConfig::default();
        let reader = ProfileReader::new(&config);
        let profile = reader
            .read_arbitrary_profile(ProfileType::PowerW, keyed(json!({"00:00": 1000})))
            .unwrap();

        assert_eq!(profile.len(), 96);
        for value in profile.values() {
            assert_relative_eq!(*value, 0.25);
        }
    }

    #[test]
    fn test_rebase_profile_to_kilowatts() {
        let config = SimulationConfig::default();
        let reader = ProfileReader::new(&config);
        let profile = reader
            .read_arbitrary_profile(ProfileType::RebaseW, keyed(json!({"00:00": 1500})))
            .unwrap();
        for value in profile.values() {
            assert_relative_eq!(*value, 1.5);
        }
    }

    #[test]
    fn test_energy_profile_survives_conversion() {
        let config = SimulationConfig::default();
        let reader = ProfileReader::new(&config);
        let profile = reader
            .read_arbitrary_profile(
                ProfileType::EnergyKwh,
                keyed(json!({"00:00": 0.5, "06:00": 1.25})),
            )
            .unwrap();

        assert_eq!(profile.len(), 96);
        assert_relative_eq!(profile[&start(&config)], 0.5);
        assert_relative_eq!(profile[&(start(&config) + Duration::hours(7))], 1.25);
    }

    #[test]
    fn test_carbon_ratio_passthrough() {
        let config = SimulationConfig::default();
        let reader = ProfileReader::new(&config);
        let profile = reader
            .read_arbitrary_profile(
                ProfileType::CarbonRatioGKwh,
                keyed(json!({"00:00": 350, "01:00": 280})),
            )
            .unwrap();

        assert_eq!(profile.len(), 2);
        assert_eq!(profile[&(start(&config) + Duration::hours(1))], 280.0);
    }

    #[test]
    fn test_empty_inputs() {
        let config = SimulationConfig::default();
        let reader = ProfileReader::new(&config);
        assert!(reader
            .read_arbitrary_profile(ProfileType::PowerW, None::<ProfileInput<f64>>)
            .unwrap()
            .is_empty());
        assert!(reader
            .read_arbitrary_profile(ProfileType::PowerW, ProfileInput::<f64>::Keyed(Map::new()))
            .unwrap()
            .is_empty());
        assert!(reader
            .read_identity_profile(ProfileInput::<f64>::from("{}"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_inputs_without_data_points_read_empty() {
        let config = SimulationConfig::default();
        let reader = ProfileReader::new(&config);
        assert!(reader
            .read_arbitrary_profile(ProfileType::Identity, ProfileInput::<f64>::from("{'filename': 'load.csv'}"))
            .unwrap()
            .is_empty());
        assert!(reader
            .read_identity_profile(keyed(json!({"filename": "load.csv"})))
            .unwrap()
            .is_empty());

        let path = std::env::temp_dir().join(format!("ecosim-{}-header-only.csv", std::process::id()));
        std::fs::write(&path, "time;power\n").unwrap();
        let report = reader
            .read_arbitrary_profile_with_report(ProfileType::PowerW, ProfileInput::<f64>::File(path.clone()))
            .unwrap();
        let standalone =
            read_profile_without_config(ProfileInput::<f64>::File(path.clone()), SlotLength::from_minutes(15).unwrap());
        std::fs::remove_file(path).ok();

        assert!(report.profile.is_empty());
        assert_eq!(report.dropped_rows, 1);
        assert_eq!(report.source, Some(SourceKind::File));
        assert!(standalone.unwrap().is_empty());
    }

    #[test]
    fn test_report_counts_dropped_rows() {
        let config = SimulationConfig::default();
        let reader = ProfileReader::new(&config);
        let path = std::env::temp_dir().join(format!("ecosim-{}-report.csv", std::process::id()));
        std::fs::write(&path, "time;power\n00:00;1000\n00:15;bad\n").unwrap();
        let report = reader
            .read_arbitrary_profile_with_report(ProfileType::PowerW, ProfileInput::<f64>::File(path.clone()))
            .unwrap();
        std::fs::remove_file(path).ok();

        assert_eq!(report.dropped_rows, 2);
        assert_eq!(report.profile.len(), 96);
        assert_relative_eq!(report.profile[&start(&config)], 0.25);
        assert_eq!(
            reader.read_arbitrary_profile_with_report(ProfileType::PowerW, None::<ProfileInput<f64>>).unwrap(),
            ReadReport::default()
        );
    }

    #[test]
    fn test_single_slot_power_profile_rejected() {
        let config = SimulationConfig {
            sim_duration_secs: 900,
            ..Default::default()
        };
        let reader = ProfileReader::new(&config);
        let result = reader.read_arbitrary_profile(ProfileType::PowerW, keyed(json!({"00:00": 1})));
        assert!(matches!(result, Err(Error::ProfileFormat(_))));
    }

    #[test]
    fn test_pair_profile_identity() {
        let config = SimulationConfig::default();
        let reader = ProfileReader::new(&config);
        let profile = reader
            .read_identity_profile::<(f64, f64)>(ProfileInput::<(f64, f64)>::from("{'00:00': (1, 2)}"))
            .unwrap();
        assert_eq!(profile.len(), 96);
        assert!(profile.values().all(|&v| v == (1.0, 2.0)));
    }

    #[test]
    fn test_current_timestamp_moves_slot_set() {
        let config = SimulationConfig::default();
        let now = start(&config) + Duration::minutes(70);
        let reader = ProfileReader::new(&config).at(now);
        let profile = reader
            .read_and_convert_identity_profile_to_float(ProfileInput::<f64>::Scalar(2.0))
            .unwrap();
        assert_eq!(
            profile.keys().next(),
            Some(&(start(&config) + Duration::hours(1)))
        );
    }

    #[test]
    fn test_hourly_input_with_incompatible_slot_rejected() {
        let config = SimulationConfig {
            slot_length_secs: 420,
            ..Default::default()
        };
        let reader = ProfileReader::new(&config);
        let hourly: BTreeMap<u32, f64> = [(0, 1.0), (1, 2.0)].into_iter().collect();
        let result = reader.read_arbitrary_profile(ProfileType::PowerW, ProfileInput::Hourly(hourly));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_hourly_input_offsets_from_today() {
        let config = SimulationConfig::default();
        let today = config.start_date.date_naive();
        let reader = ProfileReader::new(&config).with_today(today);
        let hourly: BTreeMap<u32, f64> = [(0, 4.0), (12, 8.0)].into_iter().collect();
        let profile = reader
            .read_arbitrary_profile(ProfileType::Identity, ProfileInput::Hourly(hourly))
            .unwrap();
        assert_eq!(profile[&(start(&config) + Duration::hours(11))], 4.0);
        assert_eq!(profile[&(start(&config) + Duration::hours(12))], 8.0);
    }

    #[test]
    fn test_standalone_reader() {
        let t0 = start(&SimulationConfig::default());
        let source: Profile = [
            (t0 + Duration::minutes(5), 1000.0),
            (t0 + Duration::minutes(20), 2000.0),
            (t0 + Duration::minutes(40), 1000.0),
        ]
        .into_iter()
        .collect();
        let energy =
            read_profile_without_config(ProfileInput::from(source), SlotLength::from_minutes(15).unwrap()).unwrap();

        let values: Vec<f64> = energy.values().copied().collect();
        assert_eq!(energy.keys().next(), Some(&t0));
        assert_eq!(values.len(), 4);
        for (actual, expected) in values.iter().zip([0.0, 0.25, 0.5, 0.25]) {
            assert_relative_eq!(*actual, expected);
        }
    }
}
