//! Append-only dose event log.
//!
//! Dose events are appended to a JSONL (JSON Lines) file with file
//! locking to ensure safe concurrent access. The log is the source of
//! truth for dose history; events are never rewritten in place.

use crate::{DoseEvent, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Dose sink trait for persisting events
pub trait DoseSink {
    fn append(&mut self, event: &DoseEvent) -> Result<()>;
}

/// JSONL-based dose sink with file locking
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    /// Create a new JSONL sink for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl DoseSink for JsonlSink {
    fn append(&mut self, event: &DoseEvent) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        // Exclusive lock serializes concurrent writers
        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(event)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        file.unlock()?;

        tracing::debug!("Appended dose event {} to log", event.id);
        Ok(())
    }
}

/// Read all dose events from a log file.
///
/// Malformed lines are skipped with a warning; a partially corrupt log
/// never blocks reading the rest of the history.
pub fn read_events(path: &Path) -> Result<Vec<DoseEvent>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut events = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<DoseEvent>(&line) {
            Ok(event) => events.push(event),
            Err(e) => {
                tracing::warn!("Failed to parse dose event at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} dose events from log", events.len());
    Ok(events)
}
