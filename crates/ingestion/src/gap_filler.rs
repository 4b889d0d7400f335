//! Gap filling against a target slot set.
//!
//! Missing data is expected in user profiles, so filling never fails: a
//! missing slot takes a same-weekday/same-time value from the source if one
//! exists, otherwise it repeats the last value emitted (initially zero).

use chrono::{Datelike, Timelike};
use ecosim_core::{Profile, SlotValue, Timestamp};
use std::collections::HashMap;

/// Weekday (0 = Monday) and second of day.
type WeeklyKey = (u32, u32);

fn weekly_key(ts: Timestamp) -> WeeklyKey {
    (ts.weekday().num_days_from_monday(), ts.num_seconds_from_midnight())
}

/// Source values grouped by weekday and time of day.
struct WeeklyAnalogs<V> {
    by_key: HashMap<WeeklyKey, Vec<(Timestamp, V)>>,
}

impl<V: SlotValue> WeeklyAnalogs<V> {
    fn build(source: &Profile<V>) -> Self {
        let mut by_key: HashMap<WeeklyKey, Vec<(Timestamp, V)>> = HashMap::new();
        // BTreeMap iteration keeps every bucket sorted by time
        for (&ts, &value) in source {
            by_key.entry(weekly_key(ts)).or_default().push((ts, value));
        }
        Self { by_key }
    }

    /// Most recent analog before `slot`, else the earliest one after it.
    fn lookup(&self, slot: Timestamp) -> Option<V> {
        let bucket = self.by_key.get(&weekly_key(slot))?;
        let idx = bucket.partition_point(|(ts, _)| *ts < slot);
        if idx > 0 {
            Some(bucket[idx - 1].1)
        } else {
            bucket.first().map(|(_, value)| *value)
        }
    }
}

/// Produce a profile covering exactly `target_slots`.
///
/// Slots present in `source` keep their value unchanged.
pub fn fill_gaps<V, I>(source: &Profile<V>, target_slots: I) -> Profile<V>
where
    V: SlotValue,
    I: IntoIterator<Item = Timestamp>,
{
    let analogs = WeeklyAnalogs::build(source);
    let mut current = V::default();
    let mut filled = Profile::new();

    for slot in target_slots {
        if let Some(&value) = source.get(&slot) {
            current = value;
        } else if let Some(value) = analogs.lookup(slot) {
            current = value;
        }
        filled.insert(slot, current);
    }

    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use ecosim_core::{slot_sequence, SlotLength};

    // 2024-03-04 is a Monday
    fn monday(h: u32, m: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 4, h, m, 0).unwrap()
    }

    fn quarter_hours(start: Timestamp, count: usize) -> Vec<Timestamp> {
        slot_sequence(start, count, SlotLength::from_minutes(15).unwrap())
    }

    #[test]
    fn test_totality_and_non_overwrite() {
        let source: Profile = [(monday(0, 15), 4.0), (monday(0, 45), 7.0)].into_iter().collect();
        let slots = quarter_hours(monday(0, 0), 6);
        let filled = fill_gaps(&source, slots.clone());

        assert_eq!(filled.keys().copied().collect::<Vec<_>>(), slots);
        for (ts, value) in &source {
            assert_eq!(filled[ts], *value);
        }
    }

    #[test]
    fn test_carries_last_value_starting_at_zero() {
        let source: Profile = [(monday(0, 15), 4.0)].into_iter().collect();
        let filled = fill_gaps(&source, quarter_hours(monday(0, 0), 4));
        let values: Vec<f64> = filled.values().copied().collect();
        assert_eq!(values, vec![0.0, 4.0, 4.0, 4.0]);
    }

    #[test]
    fn test_same_weekday_analog() {
        // Source covers one Monday; the next Monday borrows its values
        let source: Profile = [(monday(8, 0), 3.0), (monday(8, 15), 9.0)].into_iter().collect();
        let next_monday = monday(8, 0) + Duration::days(7);
        let filled = fill_gaps(&source, quarter_hours(next_monday, 3));
        let values: Vec<f64> = filled.values().copied().collect();
        assert_eq!(values, vec![3.0, 9.0, 9.0]);
    }

    #[test]
    fn test_other_weekday_not_used_as_analog() {
        let source: Profile = [(monday(8, 0), 3.0)].into_iter().collect();
        let tuesday = monday(8, 0) + Duration::days(1);
        let filled = fill_gaps(&source, quarter_hours(tuesday, 2));
        assert!(filled.values().all(|&v| v == 0.0));
    }

    #[test]
    fn test_pair_values_start_at_zero_tuple() {
        let source: Profile<(f64, f64)> = [(monday(0, 30), (1.0, 2.0))].into_iter().collect();
        let filled = fill_gaps(&source, quarter_hours(monday(0, 0), 3));
        let values: Vec<(f64, f64)> = filled.values().copied().collect();
        assert_eq!(values, vec![(0.0, 0.0), (0.0, 0.0), (1.0, 2.0)]);
    }

    #[test]
    fn test_empty_source() {
        let source: Profile = Profile::new();
        let filled = fill_gaps(&source, quarter_hours(monday(0, 0), 4));
        assert_eq!(filled.len(), 4);
        assert!(filled.values().all(|&v| v == 0.0));
    }
}
