//! CSV rollup for archiving logged dose events.
//!
//! Converts the append-only dose log into a long-term CSV archive
//! atomically, so events are never lost mid-rollup.

use crate::{DoseEvent, LocationId, Result};
use std::fs::OpenOptions;
use std::path::Path;

/// A row in the CSV archive
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub(crate) struct CsvRow {
    pub id: String,
    pub location_id: u8,
    pub location_name: String,
    pub timestamp: String,
    pub cycle: u32,
}

impl From<&DoseEvent> for CsvRow {
    fn from(event: &DoseEvent) -> Self {
        CsvRow {
            id: event.id.to_string(),
            location_id: event.location_id.as_u8(),
            location_name: event.location_name.clone(),
            timestamp: event.timestamp.to_rfc3339(),
            cycle: event.cycle,
        }
    }
}

impl TryFrom<CsvRow> for DoseEvent {
    type Error = crate::Error;

    fn try_from(row: CsvRow) -> Result<Self> {
        let id = uuid::Uuid::parse_str(&row.id)
            .map_err(|e| crate::Error::Other(format!("Invalid UUID: {}", e)))?;

        let timestamp = chrono::DateTime::parse_from_rfc3339(&row.timestamp)
            .map_err(|e| crate::Error::Other(format!("Invalid date: {}", e)))?
            .with_timezone(&chrono::Utc);

        Ok(DoseEvent {
            id,
            location_id: LocationId::try_from(row.location_id)?,
            location_name: row.location_name,
            timestamp,
            cycle: row.cycle,
        })
    }
}

/// Roll up logged dose events into CSV and archive the log atomically
///
/// This function:
/// 1. Reads all events from the dose log
/// 2. Appends them to the CSV file (creates with headers if needed)
/// 3. Syncs the CSV to disk
/// 4. Renames the log to .processed
/// 5. Returns the number of events processed
///
/// # Safety
/// - CSV is fsynced before the log is renamed
/// - The log is renamed (not deleted) to allow manual recovery if needed
pub fn wal_to_csv_and_archive(wal_path: &Path, csv_path: &Path) -> Result<usize> {
    let events = crate::wal::read_events(wal_path)?;

    if events.is_empty() {
        tracing::info!("No dose events in log to roll up");
        return Ok(0);
    }

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new().create(true).append(true).open(csv_path)?;

    // Only a brand-new archive gets a header row
    let needs_headers = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    for event in &events {
        let row = CsvRow::from(event);
        writer.serialize(row)?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    file.sync_all()?;

    tracing::info!("Wrote {} dose events to CSV", events.len());

    let processed_path = wal_path.with_extension("log.processed");
    std::fs::rename(wal_path, &processed_path)?;

    tracing::info!("Archived dose log to {:?}", processed_path);

    Ok(events.len())
}

/// Clean up old processed log files
///
/// This removes all .log.processed files in the given directory.
pub fn cleanup_processed_wals(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.ends_with(".log.processed"))
            .unwrap_or(false)
        {
            std::fs::remove_file(&path)?;
            count += 1;
            tracing::debug!("Removed processed log {:?}", path);
        }
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wal::{DoseSink, JsonlSink};
    use chrono::Utc;
    use uuid::Uuid;

    fn create_test_event() -> DoseEvent {
        DoseEvent {
            id: Uuid::new_v4(),
            location_id: LocationId::RightOfMouth,
            location_name: "Right of Mouth".into(),
            timestamp: Utc::now(),
            cycle: 2,
        }
    }

    #[test]
    fn test_rollup_archives_log() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("doses.log");
        let csv_path = temp_dir.path().join("doses.csv");

        let mut sink = JsonlSink::new(&wal_path);
        for _ in 0..3 {
            sink.append(&create_test_event()).unwrap();
        }

        let count = wal_to_csv_and_archive(&wal_path, &csv_path).unwrap();
        assert_eq!(count, 3);

        assert!(!wal_path.exists());
        assert!(wal_path.with_extension("log.processed").exists());
        assert!(csv_path.exists());

        let contents = std::fs::read_to_string(&csv_path).unwrap();
        assert!(contents.starts_with("id,location_id,location_name,timestamp,cycle"));
        assert_eq!(contents.lines().count(), 4); // header + 3 rows
    }

    #[test]
    fn test_rollup_appends_without_duplicate_headers() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("doses.log");
        let csv_path = temp_dir.path().join("doses.csv");

        let mut sink = JsonlSink::new(&wal_path);
        sink.append(&create_test_event()).unwrap();
        wal_to_csv_and_archive(&wal_path, &csv_path).unwrap();

        // Second batch appends to the same archive
        std::fs::remove_file(wal_path.with_extension("log.processed")).unwrap();
        let mut sink = JsonlSink::new(&wal_path);
        sink.append(&create_test_event()).unwrap();
        wal_to_csv_and_archive(&wal_path, &csv_path).unwrap();

        let contents = std::fs::read_to_string(&csv_path).unwrap();
        let header_count = contents.lines().filter(|l| l.starts_with("id,")).count();
        assert_eq!(header_count, 1);
        assert_eq!(contents.lines().count(), 3);
    }

    #[test]
    fn test_rollup_empty_log_is_noop() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("missing.log");
        let csv_path = temp_dir.path().join("doses.csv");

        let count = wal_to_csv_and_archive(&wal_path, &csv_path).unwrap();
        assert_eq!(count, 0);
        assert!(!csv_path.exists());
    }

    #[test]
    fn test_cleanup_processed_logs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("doses.log");
        let csv_path = temp_dir.path().join("doses.csv");

        let mut sink = JsonlSink::new(&wal_path);
        sink.append(&create_test_event()).unwrap();
        wal_to_csv_and_archive(&wal_path, &csv_path).unwrap();

        let cleaned = cleanup_processed_wals(temp_dir.path()).unwrap();
        assert_eq!(cleaned, 1);
        assert!(!wal_path.with_extension("log.processed").exists());
    }
}
