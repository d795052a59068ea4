//! Reminder alerting.
//!
//! Decides when the user should be notified about a scheduled dose, with
//! exactly-once-per-slot semantics: each scheduled time is keyed by its
//! RFC 3339 serialization and never re-fires while that key matches the
//! last alerted one. Snoozing suppresses alerting for a delay and then
//! releases the key so the same slot may fire once more if still due.
//!
//! One machine instance lives for the app session and owns all alert
//! state; nothing here is global.

use crate::{config::AlertsConfig, ScheduleStatus};
use chrono::{DateTime, Utc};

/// What the notification collaborator should show
#[derive(Clone, Debug, PartialEq)]
pub struct AlertNotice {
    pub title: String,
    pub body: String,
    pub is_overdue: bool,
}

/// Deduplicated alert state machine
#[derive(Debug)]
pub struct AlertMachine {
    last_alerted_key: Option<String>,
    suppress_until: Option<DateTime<Utc>>,
    active: Option<AlertNotice>,
    lead_minutes: i64,
    snooze_minutes: i64,
}

impl AlertMachine {
    pub fn new(alerts: &AlertsConfig) -> Self {
        Self {
            last_alerted_key: None,
            suppress_until: None,
            active: None,
            lead_minutes: alerts.lead_minutes,
            snooze_minutes: alerts.snooze_minutes,
        }
    }

    /// Recompute against the latest status and fire at most one notice.
    ///
    /// Fires when the schedule is enabled, a next dose exists, and it is
    /// either overdue or within the lead window. A slot that already
    /// alerted stays silent until its key is released by a snooze.
    pub fn tick(&mut self, status: &ScheduleStatus, now: DateTime<Utc>) -> Option<AlertNotice> {
        // A lapsed snooze releases the key so the slot can re-alert
        if let Some(until) = self.suppress_until {
            if now < until {
                return None;
            }
            tracing::debug!("Snooze elapsed, re-arming alert");
            self.suppress_until = None;
            self.last_alerted_key = None;
        }

        if !status.enabled {
            return None;
        }
        let next = status.next_dose_time?;

        let minutes_until = (next - now).num_minutes();
        let due = status.is_overdue || (0..=self.lead_minutes).contains(&minutes_until);
        if !due {
            return None;
        }

        let key = next.to_rfc3339();
        if self.last_alerted_key.as_deref() == Some(key.as_str()) {
            return None;
        }

        self.last_alerted_key = Some(key);
        let notice = build_notice(next, status.is_overdue);
        self.active = Some(notice.clone());
        tracing::info!("Alert fired: {}", notice.title);
        Some(notice)
    }

    /// Clear the visible alert. The slot key is retained, so the same
    /// scheduled time will not alert again.
    pub fn dismiss(&mut self) {
        self.active = None;
    }

    /// Dismiss and suppress alerting; once the delay passes, the current
    /// slot may alert one more time if it is still due.
    pub fn snooze(&mut self, now: DateTime<Utc>) {
        self.dismiss();
        let until = now + chrono::Duration::minutes(self.snooze_minutes);
        self.suppress_until = Some(until);
        tracing::info!("Alert snoozed until {}", until);
    }

    /// The notice currently awaiting dismissal, if any
    pub fn active(&self) -> Option<&AlertNotice> {
        self.active.as_ref()
    }
}

fn build_notice(next: DateTime<Utc>, is_overdue: bool) -> AlertNotice {
    let time = next.format("%H:%M");
    if is_overdue {
        AlertNotice {
            title: "Spray Overdue!".into(),
            body: format!(
                "Your scheduled spray at {} is overdue. Time to take your medication!",
                time
            ),
            is_overdue: true,
        }
    } else {
        AlertNotice {
            title: "Spray Reminder".into(),
            body: format!("Time for your scheduled spray at {}!", time),
            is_overdue: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn machine() -> AlertMachine {
        AlertMachine::new(&AlertsConfig::default())
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, h, m, 0).unwrap()
    }

    fn status_with_next(next: DateTime<Utc>, is_overdue: bool) -> ScheduleStatus {
        ScheduleStatus {
            enabled: true,
            scheduled_times: vec![next],
            completed_times: vec![],
            next_dose_time: Some(next),
            is_overdue,
            minutes_until_next: None,
        }
    }

    #[test]
    fn test_fires_within_lead_window() {
        let mut m = machine();
        let status = status_with_next(at(10, 0), false);

        let notice = m.tick(&status, at(9, 57)).unwrap();
        assert_eq!(notice.title, "Spray Reminder");
        assert!(!notice.is_overdue);
    }

    #[test]
    fn test_silent_outside_lead_window() {
        let mut m = machine();
        let status = status_with_next(at(10, 0), false);

        assert!(m.tick(&status, at(9, 30)).is_none());
    }

    #[test]
    fn test_overdue_fires_regardless_of_distance() {
        let mut m = machine();
        let status = status_with_next(at(7, 0), true);

        let notice = m.tick(&status, at(12, 0)).unwrap();
        assert_eq!(notice.title, "Spray Overdue!");
        assert!(notice.is_overdue);
    }

    #[test]
    fn test_same_slot_alerts_exactly_once() {
        let mut m = machine();
        let status = status_with_next(at(10, 0), false);

        assert!(m.tick(&status, at(9, 57)).is_some());
        assert!(m.tick(&status, at(9, 58)).is_none());
        assert!(m.tick(&status, at(9, 59)).is_none());
    }

    #[test]
    fn test_new_slot_alerts_again() {
        let mut m = machine();

        assert!(m.tick(&status_with_next(at(10, 0), false), at(9, 57)).is_some());
        // Next slot arrives with a different key
        assert!(m.tick(&status_with_next(at(14, 0), false), at(13, 56)).is_some());
    }

    #[test]
    fn test_dismiss_keeps_slot_silent() {
        let mut m = machine();
        let status = status_with_next(at(10, 0), false);

        m.tick(&status, at(9, 57)).unwrap();
        assert!(m.active().is_some());

        m.dismiss();
        assert!(m.active().is_none());
        // Dismiss does not release the key
        assert!(m.tick(&status, at(9, 58)).is_none());
    }

    #[test]
    fn test_snooze_realerts_once_after_delay() {
        let mut m = machine();
        let status = status_with_next(at(10, 0), true);

        assert!(m.tick(&status, at(10, 1)).is_some());
        m.snooze(at(10, 1));

        // Within the snooze window: silent
        assert!(m.tick(&status, at(10, 4)).is_none());

        // Past the snooze window: exactly one more alert for the slot
        assert!(m.tick(&status, at(10, 7)).is_some());
        assert!(m.tick(&status, at(10, 8)).is_none());
    }

    #[test]
    fn test_snooze_with_nothing_due_stays_quiet() {
        let mut m = machine();
        m.snooze(at(9, 0));

        let status = status_with_next(at(14, 0), false);
        assert!(m.tick(&status, at(9, 10)).is_none());
    }

    #[test]
    fn test_disabled_status_never_fires() {
        let mut m = machine();
        let mut status = status_with_next(at(10, 0), true);
        status.enabled = false;

        assert!(m.tick(&status, at(10, 1)).is_none());
    }

    #[test]
    fn test_no_next_dose_never_fires() {
        let mut m = machine();
        let status = ScheduleStatus {
            enabled: true,
            ..ScheduleStatus::default()
        };

        assert!(m.tick(&status, at(10, 0)).is_none());
    }

    #[test]
    fn test_custom_lead_window() {
        let mut m = AlertMachine::new(&AlertsConfig {
            lead_minutes: 15,
            ..AlertsConfig::default()
        });
        let status = status_with_next(at(10, 0), false);

        assert!(m.tick(&status, at(9, 50)).is_some());
    }
}
