//! Time key format detection and parsing.
//!
//! Profile keys arrive as strings in one of a few admissible encodings. All
//! keys of one profile must share a single format; the first candidate that
//! parses every key wins.

use chrono::{Duration, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use ecosim_core::{Error, Profile, Result, Timestamp};

/// Admissible time key encodings, in detection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeKeyFormat {
    /// `HH:mm`, anchored to the simulation start date.
    TimeOfDay,
    /// `YYYY-MM-DDTHH:mm`
    DateTimeMinutes,
    /// `YYYY-MM-DDTHH:mm:ss`
    DateTimeSeconds,
    /// `YYYY-MM-DD HH:mm:ss`
    DateTimeSpaced,
}

impl TimeKeyFormat {
    /// Candidate formats in the order they are attempted.
    pub const CANDIDATES: [TimeKeyFormat; 4] = [
        TimeKeyFormat::TimeOfDay,
        TimeKeyFormat::DateTimeMinutes,
        TimeKeyFormat::DateTimeSeconds,
        TimeKeyFormat::DateTimeSpaced,
    ];

    /// chrono format pattern.
    pub fn pattern(self) -> &'static str {
        match self {
            TimeKeyFormat::TimeOfDay => "%H:%M",
            TimeKeyFormat::DateTimeMinutes => "%Y-%m-%dT%H:%M",
            TimeKeyFormat::DateTimeSeconds => "%Y-%m-%dT%H:%M:%S",
            TimeKeyFormat::DateTimeSpaced => "%Y-%m-%d %H:%M:%S",
        }
    }

    /// Human readable format name.
    pub fn label(self) -> &'static str {
        match self {
            TimeKeyFormat::TimeOfDay => "HH:mm",
            TimeKeyFormat::DateTimeMinutes => "YYYY-MM-DDTHH:mm",
            TimeKeyFormat::DateTimeSeconds => "YYYY-MM-DDTHH:mm:ss",
            TimeKeyFormat::DateTimeSpaced => "YYYY-MM-DD HH:mm:ss",
        }
    }

    /// Parse one key. `anchor` is only used by [`TimeKeyFormat::TimeOfDay`].
    pub fn parse(self, key: &str, anchor: Timestamp) -> Option<Timestamp> {
        let key = key.trim();
        match self {
            TimeKeyFormat::TimeOfDay => {
                let time = NaiveTime::parse_from_str(key, self.pattern()).ok()?;
                Some(
                    anchor
                        + Duration::hours(i64::from(time.hour()))
                        + Duration::minutes(i64::from(time.minute())),
                )
            }
            _ => NaiveDateTime::parse_from_str(key, self.pattern())
                .ok()
                .map(|naive| Utc.from_utc_datetime(&naive)),
        }
    }

    /// Parse every entry, or `None` as soon as one key does not match.
    fn parse_all<V: Copy>(self, entries: &[(String, V)], anchor: Timestamp) -> Option<Profile<V>> {
        entries
            .iter()
            .map(|(key, value)| self.parse(key, anchor).map(|ts| (ts, *value)))
            .collect()
    }
}

fn attempted_formats() -> String {
    TimeKeyFormat::CANDIDATES
        .iter()
        .map(|f| f.label())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Converts string-keyed entries into a timestamp-keyed profile.
#[derive(Debug, Clone, Copy)]
pub struct TimeKeyNormalizer {
    /// Date that bare `HH:mm` keys are offset from.
    anchor: Timestamp,
}

impl TimeKeyNormalizer {
    /// Create a normalizer anchoring time-of-day keys at `start_date`.
    pub fn new(start_date: Timestamp) -> Self {
        Self { anchor: start_date }
    }

    /// Anchor used for `HH:mm` keys.
    pub fn anchor(&self) -> Timestamp {
        self.anchor
    }

    /// Find the first format that parses every key.
    pub fn detect<'k, I>(&self, keys: I) -> Option<TimeKeyFormat>
    where
        I: IntoIterator<Item = &'k str> + Clone,
    {
        TimeKeyFormat::CANDIDATES.into_iter().find(|format| {
            keys.clone()
                .into_iter()
                .all(|key| format.parse(key, self.anchor).is_some())
        })
    }

    /// Parse all keys with the single format they share.
    pub fn normalize<V: Copy>(&self, entries: &[(String, V)]) -> Result<Profile<V>> {
        for format in TimeKeyFormat::CANDIDATES {
            if let Some(profile) = format.parse_all(entries, self.anchor) {
                tracing::debug!(format = format.label(), keys = entries.len(), "detected time key format");
                return Ok(profile);
            }
        }

        let sample = entries.first().map(|(key, _)| key.as_str()).unwrap_or_default();
        Err(Error::profile_format(format!(
            "time keys match none of the formats ({}); first key: {sample:?}",
            attempted_formats()
        )))
    }
}
