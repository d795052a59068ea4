//! Schedule matching.
//!
//! Classifies each scheduled dose time as completed or pending against
//! the dose history, and derives the single next relevant time together
//! with its overdue flag. Derivation is total: any reachable input
//! produces a status, never an error.

use crate::{DoseEvent, ScheduleConfig, ScheduleStatus};
use chrono::{DateTime, Utc};

/// Match expanded dose times against the dose history.
///
/// A slot counts as completed when some dose from the same calendar day
/// as `now` lies within `tolerance_minutes` (inclusive) of it. The next
/// relevant time is the earliest uncompleted slot in schedule order: a
/// past one is overdue, a future one is simply pending. No uncompleted
/// slot means the day is fully caught up.
pub fn match_times(
    scheduled_times: &[DateTime<Utc>],
    history: &[DoseEvent],
    now: DateTime<Utc>,
    tolerance_minutes: i64,
) -> ScheduleStatus {
    let today = now.date_naive();
    let today_doses: Vec<DateTime<Utc>> = history
        .iter()
        .filter(|e| e.timestamp.date_naive() == today)
        .map(|e| e.timestamp)
        .collect();

    let completed_times: Vec<DateTime<Utc>> = scheduled_times
        .iter()
        .copied()
        .filter(|&slot| {
            today_doses
                .iter()
                .any(|&dose| (dose - slot).num_minutes().abs() <= tolerance_minutes)
        })
        .collect();

    // Scheduled times arrive ascending, so the first uncompleted slot
    // is the earliest; a missed slot outranks any later pending one.
    let next_dose_time = scheduled_times
        .iter()
        .copied()
        .find(|slot| !completed_times.contains(slot));
    let is_overdue = next_dose_time.map(|slot| slot <= now).unwrap_or(false);

    let minutes_until_next = next_dose_time.map(|slot| {
        if is_overdue {
            (now - slot).num_minutes()
        } else {
            (slot - now).num_minutes()
        }
    });

    ScheduleStatus {
        enabled: true,
        scheduled_times: scheduled_times.to_vec(),
        completed_times,
        next_dose_time,
        is_overdue,
        minutes_until_next,
    }
}

/// Derive today's full schedule status from the configuration.
///
/// Disabled schedules yield an inert status. A config that fails to
/// expand (possible only if an invalid one bypassed validation) is
/// treated as an empty schedule rather than an error, so the
/// recomputation loop can never crash.
pub fn evaluate_status(
    config: &ScheduleConfig,
    history: &[DoseEvent],
    now: DateTime<Utc>,
    tolerance_minutes: i64,
) -> ScheduleStatus {
    if !config.enabled {
        return ScheduleStatus::default();
    }

    let scheduled_times = match crate::schedule::expand_schedule(config, now) {
        Ok(times) => times,
        Err(e) => {
            tracing::warn!("Schedule expansion failed, treating as empty: {}", e);
            Vec::new()
        }
    };

    match_times(&scheduled_times, history, now, tolerance_minutes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LocationId;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn dose_at(time: DateTime<Utc>) -> DoseEvent {
        DoseEvent {
            id: Uuid::new_v4(),
            location_id: LocationId::LeftOfMouth,
            location_name: "Left of Mouth".into(),
            timestamp: time,
            cycle: 1,
        }
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, h, m, 0).unwrap()
    }

    #[test]
    fn test_dose_within_tolerance_completes_slot() {
        let scheduled = vec![at(10, 0)];
        let history = vec![dose_at(at(10, 20))];

        let status = match_times(&scheduled, &history, at(10, 30), 30);
        assert_eq!(status.completed_times, vec![at(10, 0)]);
        assert_eq!(status.next_dose_time, None);
        assert!(!status.is_overdue);
    }

    #[test]
    fn test_dose_outside_tolerance_does_not_complete() {
        let scheduled = vec![at(10, 0)];
        let history = vec![dose_at(at(10, 31))];

        let status = match_times(&scheduled, &history, at(10, 45), 30);
        assert!(status.completed_times.is_empty());
        assert_eq!(status.next_dose_time, Some(at(10, 0)));
        assert!(status.is_overdue);
    }

    #[test]
    fn test_tolerance_boundary_is_inclusive() {
        let scheduled = vec![at(10, 0)];
        let history = vec![dose_at(at(10, 30))];

        let status = match_times(&scheduled, &history, at(11, 0), 30);
        assert_eq!(status.completed_times, vec![at(10, 0)]);
    }

    #[test]
    fn test_completed_slot_yields_to_next_pending() {
        // 09:00 completed, 14:00 still ahead
        let scheduled = vec![at(9, 0), at(14, 0)];
        let history = vec![dose_at(at(9, 5))];

        let status = match_times(&scheduled, &history, at(10, 3), 30);
        assert_eq!(status.next_dose_time, Some(at(14, 0)));
        assert!(!status.is_overdue);
        assert_eq!(status.minutes_until_next, Some(237));
    }

    #[test]
    fn test_missed_slot_is_overdue() {
        let scheduled = vec![at(9, 0), at(14, 0)];
        let history = vec![];

        let status = match_times(&scheduled, &history, at(9, 10), 30);
        assert_eq!(status.next_dose_time, Some(at(9, 0)));
        assert!(status.is_overdue);
        assert_eq!(status.minutes_until_next, Some(10));
    }

    #[test]
    fn test_all_caught_up() {
        let scheduled = vec![at(9, 0)];
        let history = vec![dose_at(at(9, 2))];

        let status = match_times(&scheduled, &history, at(23, 0), 30);
        assert_eq!(status.next_dose_time, None);
        assert!(!status.is_overdue);
        assert_eq!(status.minutes_until_next, None);
    }

    #[test]
    fn test_yesterdays_dose_does_not_complete_today() {
        let scheduled = vec![at(9, 0)];
        let history = vec![dose_at(at(9, 0) - Duration::days(1))];

        let status = match_times(&scheduled, &history, at(9, 10), 30);
        assert!(status.completed_times.is_empty());
        assert!(status.is_overdue);
    }

    #[test]
    fn test_earliest_overdue_slot_wins() {
        let scheduled = vec![at(7, 0), at(11, 0), at(15, 0)];
        let history = vec![];

        let status = match_times(&scheduled, &history, at(12, 0), 30);
        assert_eq!(status.next_dose_time, Some(at(7, 0)));
        assert!(status.is_overdue);
    }

    #[test]
    fn test_disabled_config_yields_inert_status() {
        let config = ScheduleConfig::default();
        let status = evaluate_status(&config, &[], at(12, 0), 30);

        assert!(!status.enabled);
        assert!(status.scheduled_times.is_empty());
        assert_eq!(status.next_dose_time, None);
    }

    #[test]
    fn test_evaluate_status_end_to_end() {
        let config = ScheduleConfig {
            enabled: true,
            ..ScheduleConfig::default()
        };
        let history = vec![dose_at(at(7, 10))];

        let status = evaluate_status(&config, &history, at(8, 0), 30);
        assert!(status.enabled);
        assert_eq!(status.completed_times, vec![at(7, 0)]);
        assert_eq!(status.next_dose_time, Some(at(11, 0)));
        assert!(!status.is_overdue);
    }
}
