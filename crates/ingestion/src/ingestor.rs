//! Profile ingestion from heterogeneous sources.
//!
//! Turns files, mappings, literal strings and scalars into a
//! timestamp-keyed profile. No gap filling happens here.

use crate::literal::{parse_literal, Literal};
use crate::time_keys::TimeKeyNormalizer;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use ecosim_core::{Error, Profile, Result, SlotValue, Timestamp};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Reserved key carrying the upload file name in web-stored profiles.
pub const FILENAME_KEY: &str = "filename";

/// A raw profile in any of the accepted shapes.
#[derive(Debug, Clone)]
pub enum ProfileInput<V> {
    /// Two-column delimited file (`time,value` or `time;value`).
    File(PathBuf),
    /// Already keyed by timestamp; passed through unchanged.
    Timestamped(Profile<V>),
    /// String time keys with JSON-like values.
    Keyed(Map<String, Value>),
    /// Hour offsets from the start of the current day.
    Hourly(BTreeMap<u32, V>),
    /// Literal-encoded mapping or scalar.
    Serialized(String),
    /// One value for every canonical slot.
    Scalar(V),
}

impl<V> ProfileInput<V> {
    /// Shape of this input.
    pub fn kind(&self) -> SourceKind {
        match self {
            ProfileInput::File(_) => SourceKind::File,
            ProfileInput::Timestamped(_) => SourceKind::Timestamped,
            ProfileInput::Keyed(_) => SourceKind::Keyed,
            ProfileInput::Hourly(_) => SourceKind::Hourly,
            ProfileInput::Serialized(_) => SourceKind::Serialized,
            ProfileInput::Scalar(_) => SourceKind::Scalar,
        }
    }

    /// Whether the input carries no data at all.
    pub fn is_empty(&self) -> bool {
        match self {
            ProfileInput::File(_) | ProfileInput::Scalar(_) => false,
            ProfileInput::Timestamped(p) => p.is_empty(),
            ProfileInput::Keyed(m) => m.is_empty(),
            ProfileInput::Hourly(m) => m.is_empty(),
            ProfileInput::Serialized(s) => {
                let s = s.trim();
                s.is_empty() || s == "{}" || s == "None"
            }
        }
    }
}

impl<V> From<Profile<V>> for ProfileInput<V> {
    fn from(profile: Profile<V>) -> Self {
        ProfileInput::Timestamped(profile)
    }
}

impl<V> From<Map<String, Value>> for ProfileInput<V> {
    fn from(map: Map<String, Value>) -> Self {
        ProfileInput::Keyed(map)
    }
}

impl<V> From<BTreeMap<u32, V>> for ProfileInput<V> {
    fn from(map: BTreeMap<u32, V>) -> Self {
        ProfileInput::Hourly(map)
    }
}

impl<V> From<&str> for ProfileInput<V> {
    fn from(s: &str) -> Self {
        ProfileInput::Serialized(s.to_string())
    }
}

impl<V> From<&Path> for ProfileInput<V> {
    fn from(path: &Path) -> Self {
        ProfileInput::File(path.to_path_buf())
    }
}

impl From<f64> for ProfileInput<f64> {
    fn from(value: f64) -> Self {
        ProfileInput::Scalar(value)
    }
}

/// Shape an ingested profile came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    File,
    Timestamped,
    Keyed,
    Hourly,
    Serialized,
    Scalar,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::File => "file",
            SourceKind::Timestamped => "timestamped mapping",
            SourceKind::Keyed => "string-keyed mapping",
            SourceKind::Hourly => "hourly mapping",
            SourceKind::Serialized => "serialized string",
            SourceKind::Scalar => "scalar",
        };
        f.write_str(name)
    }
}

/// Result of ingesting one profile.
#[derive(Debug, Clone)]
pub struct Ingested<V> {
    /// Timestamp-keyed values, covering at least the source's span.
    pub profile: Profile<V>,
    /// File rows that could not be read as `(time, number)`.
    pub dropped_rows: usize,
    /// Shape the data was decoded from. Serialized inputs report the shape
    /// they decoded to.
    pub source: SourceKind,
}

impl<V> Ingested<V> {
    fn new(profile: Profile<V>, source: SourceKind) -> Self {
        Self {
            profile,
            dropped_rows: 0,
            source,
        }
    }
}

/// Reads raw profiles into timestamp-keyed profiles.
#[derive(Debug, Clone)]
pub struct ProfileIngestor {
    /// Normalizer for string time keys.
    normalizer: TimeKeyNormalizer,
    /// Day that hourly keys are offset from.
    today: NaiveDate,
    /// Slots a scalar input expands over.
    scalar_slots: Option<Vec<Timestamp>>,
}

impl ProfileIngestor {
    /// Create an ingestor anchoring `HH:mm` keys at `start_date`.
    pub fn new(start_date: Timestamp) -> Self {
        Self {
            normalizer: TimeKeyNormalizer::new(start_date),
            today: Utc::now().date_naive(),
            scalar_slots: None,
        }
    }

    /// Override the day hourly keys are offset from.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Set the canonical slots a scalar input expands over.
    pub fn with_scalar_slots(mut self, slots: Vec<Timestamp>) -> Self {
        self.scalar_slots = Some(slots);
        self
    }

    /// Ingest any supported input.
    pub fn ingest<V: SlotValue>(&self, input: ProfileInput<V>) -> Result<Ingested<V>> {
        match input {
            ProfileInput::File(path) => self.read_file(&path),
            ProfileInput::Timestamped(profile) => {
                Ok(Ingested::new(profile, SourceKind::Timestamped))
            }
            ProfileInput::Keyed(map) => self.read_keyed(map),
            ProfileInput::Hourly(map) => Ok(self.read_hourly(map)),
            ProfileInput::Serialized(text) => self.read_serialized(&text),
            ProfileInput::Scalar(value) => self.expand_scalar(value),
        }
    }

    /// Read a two-column delimited file.
    ///
    /// Blank lines are rejected. Rows that do not parse as `(time, number)`,
    /// such as a header row, are dropped and counted.
    fn read_file<V: SlotValue>(&self, path: &Path) -> Result<Ingested<V>> {
        let contents = std::fs::read_to_string(path)?;

        if let Some(line_no) = contents.lines().position(|line| line.trim().is_empty()) {
            return Err(Error::profile_format(format!(
                "empty line {} in profile file {}",
                line_no + 1,
                path.display()
            )));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(contents.as_bytes());

        let mut entries = Vec::new();
        let mut dropped_rows = 0;
        for record in reader.records() {
            let parsed = record.ok().and_then(|record| {
                let (key, raw) = split_row(&record)?;
                let value = V::from_json(&Value::String(raw))?;
                Some((key, value))
            });
            match parsed {
                Some(entry) => entries.push(entry),
                None => dropped_rows += 1,
            }
        }

        if dropped_rows > 0 {
            tracing::warn!(
                path = %path.display(),
                dropped_rows,
                "dropped unparseable rows from profile file"
            );
        }

        let profile = self.normalizer.normalize(&entries)?;
        Ok(Ingested {
            profile,
            dropped_rows,
            source: SourceKind::File,
        })
    }

    /// Strip the filename key and header rows, then normalize time keys.
    fn read_keyed<V: SlotValue>(&self, mut map: Map<String, Value>) -> Result<Ingested<V>> {
        map.remove(FILENAME_KEY);
        let total = map.len();
        let entries: Vec<(String, V)> = map
            .into_iter()
            .filter_map(|(key, value)| V::from_json(&value).map(|v| (key, v)))
            .collect();
        if entries.len() < total {
            tracing::debug!(headers = total - entries.len(), "stripped non-numeric header rows");
        }
        let profile = self.normalizer.normalize(&entries)?;
        Ok(Ingested::new(profile, SourceKind::Keyed))
    }

    /// Offset hourly keys from the start of `today`.
    fn read_hourly<V: SlotValue>(&self, map: BTreeMap<u32, V>) -> Ingested<V> {
        let day_start = Utc.from_utc_datetime(&self.today.and_time(chrono::NaiveTime::MIN));
        let profile = map
            .into_iter()
            .map(|(hour, value)| (day_start + Duration::hours(i64::from(hour)), value))
            .collect();
        Ingested::new(profile, SourceKind::Hourly)
    }

    /// Decode a literal string and dispatch on the decoded shape.
    fn read_serialized<V: SlotValue>(&self, text: &str) -> Result<Ingested<V>> {
        match parse_literal(text)? {
            Literal::Dict(entries) => self.read_literal_dict(entries),
            other => {
                let value = V::from_json(&other.to_json()).ok_or_else(|| {
                    Error::profile_format(format!(
                        "serialized profile is neither a mapping nor a value: {text:?}"
                    ))
                })?;
                self.expand_scalar(value)
            }
        }
    }

    fn read_literal_dict<V: SlotValue>(&self, mut entries: Vec<(Literal, Literal)>) -> Result<Ingested<V>> {
        entries.retain(|(key, _)| !matches!(key, Literal::Str(k) if k == FILENAME_KEY));
        if entries.iter().all(|(key, _)| matches!(key, Literal::Str(_))) {
            let map = entries
                .into_iter()
                .filter_map(|(key, value)| match key {
                    Literal::Str(key) => Some((key, value.to_json())),
                    _ => None,
                })
                .collect();
            return self.read_keyed(map);
        }

        let mut hourly = BTreeMap::new();
        for (key, value) in entries {
            let hour = match key {
                Literal::Int(h) => u32::try_from(h).map_err(|_| {
                    Error::profile_format(format!("hour key {h} is out of range"))
                })?,
                other => {
                    return Err(Error::profile_format(format!(
                        "serialized profile mixes key types; unexpected key {other:?}"
                    )))
                }
            };
            if let Some(value) = V::from_json(&value.to_json()) {
                hourly.insert(hour, value);
            }
        }
        Ok(self.read_hourly(hourly))
    }

    fn expand_scalar<V: SlotValue>(&self, value: V) -> Result<Ingested<V>> {
        let slots = self.scalar_slots.as_ref().ok_or_else(|| {
            Error::profile_format("a scalar profile needs a canonical slot set to expand over")
        })?;
        let profile = slots.iter().map(|&slot| (slot, value)).collect();
        Ok(Ingested::new(profile, SourceKind::Scalar))
    }
}

/// Split a record into `(time, value)`, accepting `;` inside a single field.
fn split_row(record: &csv::StringRecord) -> Option<(String, String)> {
    if record.len() == 2 {
        return Some((record.get(0)?.to_string(), record.get(1)?.to_string()));
    }
    let mut parts = record.get(0)?.split(';');
    let key = parts.next()?.trim().to_string();
    let value = parts.next()?.trim().to_string();
    if parts.next().is_some() {
        return None;
    }
    Some((key, value))
}
