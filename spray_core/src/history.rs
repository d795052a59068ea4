//! Dose history loading.
//!
//! Merges the active dose log with the CSV archive to reconstruct
//! recent history, deduplicating events that appear in both.

use crate::{csv_rollup::CsvRow, DoseEvent, Result};
use chrono::{DateTime, Duration, Utc};
use csv::ReaderBuilder;
use std::collections::HashSet;
use std::path::Path;

/// Load dose events from the last N days from both the log and the CSV archive
///
/// Returns events sorted oldest first (insertion order of the log), so
/// the result can feed the schedule matcher directly. Events present in
/// both sources are deduplicated by id.
pub fn load_recent_events(
    wal_path: &Path,
    csv_path: &Path,
    days: i64,
    now: DateTime<Utc>,
) -> Result<Vec<DoseEvent>> {
    let cutoff = now - Duration::days(days);
    let mut events = Vec::new();
    let mut seen_ids = HashSet::new();

    if wal_path.exists() {
        let wal_events = crate::wal::read_events(wal_path)?;
        for event in wal_events {
            if event.timestamp >= cutoff {
                seen_ids.insert(event.id);
                events.push(event);
            }
        }
        tracing::debug!("Loaded {} dose events from log", events.len());
    }

    if csv_path.exists() {
        let csv_events = load_events_from_csv(csv_path)?;
        let mut csv_count = 0;
        for event in csv_events {
            if event.timestamp >= cutoff && !seen_ids.contains(&event.id) {
                seen_ids.insert(event.id);
                events.push(event);
                csv_count += 1;
            }
        }
        tracing::debug!("Loaded {} dose events from CSV", csv_count);
    }

    events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    tracing::info!(
        "Loaded {} total dose events from last {} days",
        events.len(),
        days
    );

    Ok(events)
}

/// Load all dose events from a CSV archive
fn load_events_from_csv(path: &Path) -> Result<Vec<DoseEvent>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;

    let mut events = Vec::new();
    for result in reader.deserialize::<CsvRow>() {
        match result {
            Ok(row) => match DoseEvent::try_from(row) {
                Ok(event) => events.push(event),
                Err(e) => {
                    tracing::warn!("Failed to parse CSV row: {}", e);
                }
            },
            Err(e) => {
                tracing::warn!("Failed to deserialize CSV row: {}", e);
            }
        }
    }

    Ok(events)
}

/// Events recorded on the calendar day of `now`
pub fn events_today(events: &[DoseEvent], now: DateTime<Utc>) -> Vec<&DoseEvent> {
    let today = now.date_naive();
    events
        .iter()
        .filter(|e| e.timestamp.date_naive() == today)
        .collect()
}

/// The most recent `n` events, newest first
pub fn last_n(events: &[DoseEvent], n: usize) -> Vec<&DoseEvent> {
    events.iter().rev().take(n).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wal::{DoseSink, JsonlSink};
    use crate::LocationId;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn test_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap()
    }

    fn event_days_ago(days: i64) -> DoseEvent {
        DoseEvent {
            id: Uuid::new_v4(),
            location_id: LocationId::LeftOfMouth,
            location_name: "Left of Mouth".into(),
            timestamp: test_now() - Duration::days(days),
            cycle: 1,
        }
    }

    #[test]
    fn test_load_recent_events_filters_window() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("doses.log");
        let csv_path = temp_dir.path().join("doses.csv");

        let mut sink = JsonlSink::new(&wal_path);
        sink.append(&event_days_ago(1)).unwrap();
        sink.append(&event_days_ago(5)).unwrap();
        sink.append(&event_days_ago(40)).unwrap(); // Too old

        let events = load_recent_events(&wal_path, &csv_path, 30, test_now()).unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_deduplication_across_log_and_csv() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("doses.log");
        let csv_path = temp_dir.path().join("doses.csv");

        let event = event_days_ago(1);
        let event_id = event.id;
        let mut sink = JsonlSink::new(&wal_path);
        sink.append(&event).unwrap();

        // Roll up to CSV, then recreate the same event in a fresh log
        crate::csv_rollup::wal_to_csv_and_archive(&wal_path, &csv_path).unwrap();
        let mut sink = JsonlSink::new(&wal_path);
        sink.append(&event).unwrap();

        let events = load_recent_events(&wal_path, &csv_path, 30, test_now()).unwrap();
        let count = events.iter().filter(|e| e.id == event_id).count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_events_sorted_oldest_first() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("doses.log");
        let csv_path = temp_dir.path().join("doses.csv");

        let mut sink = JsonlSink::new(&wal_path);
        let newer = event_days_ago(1);
        let older = event_days_ago(3);
        sink.append(&newer).unwrap();
        sink.append(&older).unwrap();

        let events = load_recent_events(&wal_path, &csv_path, 30, test_now()).unwrap();
        assert_eq!(events[0].id, older.id);
        assert_eq!(events[1].id, newer.id);
    }

    #[test]
    fn test_csv_roundtrip_preserves_events() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("doses.log");
        let csv_path = temp_dir.path().join("doses.csv");

        let event = event_days_ago(2);
        let mut sink = JsonlSink::new(&wal_path);
        sink.append(&event).unwrap();
        crate::csv_rollup::wal_to_csv_and_archive(&wal_path, &csv_path).unwrap();

        let events = load_recent_events(
            &temp_dir.path().join("nonexistent.log"),
            &csv_path,
            30,
            test_now(),
        )
        .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, event.id);
        assert_eq!(events[0].location_id, event.location_id);
        assert_eq!(events[0].cycle, event.cycle);
    }

    #[test]
    fn test_events_today() {
        let events = vec![event_days_ago(0), event_days_ago(1), event_days_ago(0)];
        assert_eq!(events_today(&events, test_now()).len(), 2);
    }

    #[test]
    fn test_last_n_newest_first() {
        let events = vec![event_days_ago(3), event_days_ago(2), event_days_ago(1)];
        let recent = last_n(&events, 2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, events[2].id);
    }
}
