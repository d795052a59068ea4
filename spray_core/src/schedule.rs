//! Daily schedule expansion.
//!
//! Turns a start/end/interval configuration into the concrete list of
//! dose times for the calendar day of a reference instant.

use crate::{Error, Result, ScheduleConfig};
use chrono::{DateTime, Duration, Utc};

/// Expand a schedule into the ordered dose times for the reference day.
///
/// Pure in `(config, calendar day of reference)`. A disabled schedule
/// expands to nothing. Windows where the end time precedes the start
/// time cross midnight, so the end rolls to the next day.
///
/// Returns `InvalidConfig` for a zero-length interval while enabled;
/// expansion would otherwise never terminate.
pub fn expand_schedule(
    config: &ScheduleConfig,
    reference: DateTime<Utc>,
) -> Result<Vec<DateTime<Utc>>> {
    if !config.enabled {
        return Ok(Vec::new());
    }

    let step_minutes = config.interval_total_minutes();
    if step_minutes == 0 {
        return Err(Error::InvalidConfig(
            "interval must be greater than 0".into(),
        ));
    }

    let day = reference.date_naive();
    let mut current = day.and_time(config.start_time).and_utc();
    let mut end = day.and_time(config.end_time).and_utc();

    // End before start means the window runs past midnight
    if end < current {
        end += Duration::days(1);
    }

    let step = Duration::minutes(step_minutes);
    let mut times = Vec::new();
    while current <= end {
        times.push(current);
        current += step;
    }

    tracing::debug!(
        "Expanded schedule for {} into {} dose times",
        day,
        times.len()
    );
    Ok(times)
}
