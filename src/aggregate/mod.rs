//! Sample aggregation and sleep reconstruction.
//!
//! This module contains:
//! - The sample aggregator (unit normalization and day bucketing)
//! - The sleep session reconstructor (interval merging and night selection)
//! - Local-time helpers for day bounds and the fixed sleep fetch window

pub mod samples;
pub mod sleep;

use chrono::{DateTime, LocalResult, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

// Re-export commonly used types
pub use samples::{Aggregator, MetricBatch};
pub use sleep::{merge_sessions, reconstruct_night, DailySleepRecord, SleepSession};

/// Hour the sleep fetch window opens on the previous day.
pub const FETCH_WINDOW_OPEN_HOUR: u32 = 20;

/// Hour the sleep fetch window closes on the current day.
pub const FETCH_WINDOW_CLOSE_HOUR: u32 = 12;

/// Resolve a wall-clock hour on a calendar day in the given timezone.
///
/// DST ambiguity resolves to the earlier instant; a nonexistent wall-clock
/// time (spring-forward gap) falls back to reading the naive time as UTC.
fn at_local_hour(day: NaiveDate, hour: u32, tz: Tz) -> DateTime<Utc> {
    let naive = day
        .and_hms_opt(hour, 0, 0)
        .expect("hour below 24 is a valid wall-clock time");
    let local = match tz.from_local_datetime(&naive) {
        LocalResult::Single(t) => t,
        LocalResult::Ambiguous(earlier, _) => earlier,
        LocalResult::None => tz.from_utc_datetime(&naive),
    };
    local.with_timezone(&Utc)
}

/// Bounds of one local calendar day: `[00:00 day, 00:00 next day)`.
pub fn day_bounds(day: NaiveDate, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let next = day.succ_opt().unwrap_or(day);
    (at_local_hour(day, 0, tz), at_local_hour(next, 0, tz))
}

/// The fixed fetch window bounding one night's sleep for `day`:
/// 20:00 the previous day through 12:00 the current day.
pub fn fetch_window(day: NaiveDate, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let prev = day.pred_opt().unwrap_or(day);
    (
        at_local_hour(prev, FETCH_WINDOW_OPEN_HOUR, tz),
        at_local_hour(day, FETCH_WINDOW_CLOSE_HOUR, tz),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_day_bounds_utc() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let (start, end) = day_bounds(day, chrono_tz::UTC);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_fetch_window_spans_previous_evening() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let (start, end) = fetch_window(day, chrono_tz::UTC);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 3, 20, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_day_bounds_respect_timezone_offset() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let (start, _) = day_bounds(day, chrono_tz::Europe::Helsinki);
        // Helsinki is UTC+2 in March (before the DST switch)
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 3, 22, 0, 0).unwrap());
    }

    #[test]
    fn test_fetch_window_hours_in_local_time() {
        let tz = chrono_tz::America::New_York;
        let day = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let (start, end) = fetch_window(day, tz);
        assert_eq!(start.with_timezone(&tz).hour(), FETCH_WINDOW_OPEN_HOUR);
        assert_eq!(end.with_timezone(&tz).hour(), FETCH_WINDOW_CLOSE_HOUR);
    }
}
