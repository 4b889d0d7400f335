//! Scheduling of aggregation windows.

use chrono::Duration;
use ecosim_core::{Error, Result, Timestamp};
use serde::{Deserialize, Serialize};

/// A half-open `[start_time, end_time)` aggregation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start_time: Timestamp,
    pub end_time: Timestamp,
}

/// Decides which aggregation windows are due.
#[derive(Debug, Clone, Copy)]
pub struct AggregationTimeManager {
    simulation_start: Timestamp,
}

impl AggregationTimeManager {
    pub fn new(simulation_start: Timestamp) -> Self {
        Self { simulation_start }
    }

    /// Windows that have fully elapsed by `current_time`.
    ///
    /// Windows are laid out from `last_aggregation_time`, or from the
    /// simulation start when nothing was aggregated yet.
    pub fn get_aggregation_windows(
        &self,
        current_time: Timestamp,
        last_aggregation_time: Option<Timestamp>,
        resolution: Duration,
    ) -> Result<Vec<TimeWindow>> {
        if resolution <= Duration::zero() {
            return Err(Error::config(format!(
                "aggregation resolution must be positive, got {}s",
                resolution.num_seconds()
            )));
        }

        let mut start_time = last_aggregation_time.unwrap_or(self.simulation_start);
        let mut windows = Vec::new();
        while start_time + resolution <= current_time {
            windows.push(TimeWindow {
                start_time,
                end_time: start_time + resolution,
            });
            start_time += resolution;
        }
        Ok(windows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn t(minutes: i64) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    #[test]
    fn test_windows_since_simulation_start() {
        let manager = AggregationTimeManager::new(t(0));
        let windows = manager
            .get_aggregation_windows(t(150), None, Duration::hours(1))
            .unwrap();
        assert_eq!(
            windows,
            vec![
                TimeWindow { start_time: t(0), end_time: t(60) },
                TimeWindow { start_time: t(60), end_time: t(120) },
            ]
        );
    }

    #[test]
    fn test_windows_since_last_aggregation() {
        let manager = AggregationTimeManager::new(t(0));
        let windows = manager
            .get_aggregation_windows(t(120), Some(t(60)), Duration::hours(1))
            .unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].start_time, t(60));
    }

    #[test]
    fn test_nothing_due() {
        let manager = AggregationTimeManager::new(t(0));
        let windows = manager
            .get_aggregation_windows(t(59), None, Duration::hours(1))
            .unwrap();
        assert!(windows.is_empty());
    }

    #[test]
    fn test_non_positive_resolution_rejected() {
        let manager = AggregationTimeManager::new(t(0));
        assert!(manager
            .get_aggregation_windows(t(60), None, Duration::zero())
            .is_err());
    }
}
