//! Temporal sampling for weather timelines
//!
//! Generates the evenly spaced instants a timeline view fetches observations
//! for. Pure and deterministic.

use chrono::{DateTime, Duration, Utc};

/// Default timeline window half-width in hours
pub const DEFAULT_RANGE_HOURS: u32 = 3;

/// Default timeline step in minutes
pub const DEFAULT_INTERVAL_MINUTES: u32 = 30;

/// Generates a symmetric window of instants around `center`.
///
/// The sequence starts at `center - range_hours`, steps by
/// `interval_minutes`, and contains
/// `floor(2 * range_hours * 60 / interval_minutes) + 1` instants, so both
/// window edges are included whenever they land on the interval grid. A zero
/// interval degenerates to the center alone.
pub fn sample_window(
    center: DateTime<Utc>,
    range_hours: u32,
    interval_minutes: u32,
) -> Vec<DateTime<Utc>> {
    if interval_minutes == 0 {
        return vec![center];
    }

    let count = (2 * range_hours * 60 / interval_minutes) as usize + 1;
    let start = center - Duration::hours(i64::from(range_hours));

    (0..count)
        .map(|i| start + Duration::minutes(i as i64 * i64::from(interval_minutes)))
        .collect()
}
