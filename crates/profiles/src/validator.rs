//! Validation of normalized profiles.
//!
//! A validated profile is non-empty, steps by exactly one slot between
//! consecutive keys and holds only finite values.

use ecosim_core::{format_timestamp, Error, Profile, Result, SlotLength, SlotValue, Timestamp};

/// Checks a profile against the slot grid it should lie on.
#[derive(Debug, Clone)]
pub struct ProfileValidator {
    slot_length: SlotLength,
    /// First and last slot start that must be present.
    coverage: Option<(Timestamp, Timestamp)>,
}

impl ProfileValidator {
    pub fn new(slot_length: SlotLength) -> Self {
        Self {
            slot_length,
            coverage: None,
        }
    }

    /// Also require slots from `first` through `last` to be present.
    pub fn covering(mut self, first: Timestamp, last: Timestamp) -> Self {
        self.coverage = Some((first, last));
        self
    }

    /// Validate `profile`, reporting the first violation found.
    pub fn validate<V: SlotValue>(&self, profile: &Profile<V>) -> Result<()> {
        let (Some(&first), Some(&last)) = (profile.keys().next(), profile.keys().next_back())
        else {
            return Err(Error::profile_validation("profile is empty"));
        };

        if let Some((ts, value)) = profile.iter().find(|(_, value)| !value.is_finite()) {
            return Err(Error::profile_validation(format!(
                "non-finite value {value:?} at {}",
                format_timestamp(*ts)
            )));
        }

        let step = self.slot_length.duration();
        let keys: Vec<Timestamp> = profile.keys().copied().collect();
        if let Some(pair) = keys.windows(2).find(|pair| pair[1] - pair[0] != step) {
            return Err(Error::profile_validation(format!(
                "expected a {} step after {}, next key is {}",
                self.slot_length,
                format_timestamp(pair[0]),
                format_timestamp(pair[1])
            )));
        }

        if let Some((start, end)) = self.coverage {
            if first > start || last < end {
                return Err(Error::profile_validation(format!(
                    "profile covers {}..{} but {}..{} is required",
                    format_timestamp(first),
                    format_timestamp(last),
                    format_timestamp(start),
                    format_timestamp(end)
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use ecosim_core::slot_sequence;

    fn ts(h: u32, m: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 2, h, m, 0).unwrap()
    }

    fn quarter_hour() -> SlotLength {
        SlotLength::from_minutes(15).unwrap()
    }

    fn contiguous(count: usize) -> Profile {
        slot_sequence(ts(0, 0), count, quarter_hour())
            .into_iter()
            .map(|slot| (slot, 1.0))
            .collect()
    }

    #[test]
    fn test_contiguous_profile_passes() {
        let validator = ProfileValidator::new(quarter_hour()).covering(ts(0, 0), ts(0, 45));
        assert!(validator.validate(&contiguous(4)).is_ok());
    }

    #[test]
    fn test_empty_rejected() {
        let result = ProfileValidator::new(quarter_hour()).validate(&Profile::<f64>::new());
        assert!(matches!(result, Err(Error::ProfileValidation(_))));
    }

    #[test]
    fn test_gap_rejected() {
        let mut profile = contiguous(4);
        profile.remove(&ts(0, 30));
        assert!(ProfileValidator::new(quarter_hour()).validate(&profile).is_err());
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut profile = contiguous(2);
        profile.insert(ts(0, 15), f64::NAN);
        assert!(ProfileValidator::new(quarter_hour()).validate(&profile).is_err());
    }

    #[test]
    fn test_short_coverage_rejected() {
        let validator = ProfileValidator::new(quarter_hour()).covering(ts(0, 0), ts(1, 0));
        assert!(validator.validate(&contiguous(4)).is_err());
    }
}
