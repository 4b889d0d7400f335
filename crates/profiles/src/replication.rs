//! Multi-day replication of sub-day profiles.

use chrono::{Duration, Timelike};
use ecosim_core::{Profile, SlotValue, Timestamp};
use std::collections::HashMap;

/// Time between the first and last key; zero for fewer than two keys.
pub fn profile_span<V>(profile: &Profile<V>) -> Duration {
    match (profile.keys().next(), profile.keys().next_back()) {
        (Some(first), Some(last)) => *last - *first,
        _ => Duration::zero(),
    }
}

/// Copy a daily profile onto every slot with a matching hour and minute.
///
/// Slots whose time of day does not occur in `source` are left out; gap
/// filling covers them afterwards.
pub fn copy_profile_to_multiple_days<V: SlotValue>(
    source: &Profile<V>,
    slots: &[Timestamp],
) -> Profile<V> {
    let by_time_of_day: HashMap<(u32, u32), V> = source
        .iter()
        .map(|(ts, value)| ((ts.hour(), ts.minute()), *value))
        .collect();

    slots
        .iter()
        .filter_map(|&slot| {
            by_time_of_day
                .get(&(slot.hour(), slot.minute()))
                .map(|&value| (slot, value))
        })
        .collect()
}
