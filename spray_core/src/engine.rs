//! The tracker engine.
//!
//! [`Tracker`] is the single canonical engine behind every front end: it
//! owns the persistent state, today's dose history, and the alert
//! machine, and exposes the operations a UI or CLI needs. Dose recording
//! mutates state, appends to the log, and saves, all synchronously, so a
//! concurrently firing poll observes either the pre-dose or the fully
//! post-dose state, never a partial update.

use crate::{
    alert::{AlertMachine, AlertNotice},
    clock::Clock,
    history,
    status::evaluate_status,
    wal::{DoseSink, JsonlSink},
    AppState, Config, DoseEvent, Location, LocationId, Result, ScheduleConfig, ScheduleStatus,
};
use std::path::{Path, PathBuf};

/// Canonical file locations under a data directory
#[derive(Clone, Debug)]
pub struct DataPaths {
    pub state: PathBuf,
    pub dose_log: PathBuf,
    pub csv: PathBuf,
}

impl DataPaths {
    pub fn new(data_dir: &Path) -> Self {
        let wal_dir = data_dir.join("wal");
        Self {
            state: wal_dir.join("state.json"),
            dose_log: wal_dir.join("dose_events.log"),
            csv: data_dir.join("doses.csv"),
        }
    }
}

/// Schedule and rotation engine with persistence
pub struct Tracker<C: Clock> {
    paths: DataPaths,
    state: AppState,
    history: Vec<DoseEvent>,
    alerts: AlertMachine,
    tolerance_minutes: i64,
    clock: C,
}

impl<C: Clock> Tracker<C> {
    /// Open (or initialize) a tracker rooted at the given data directory
    pub fn open(data_dir: &Path, config: &Config, clock: C) -> Result<Self> {
        let paths = DataPaths::new(data_dir);
        if let Some(parent) = paths.state.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let state = AppState::load(&paths.state)?;
        let history = history::load_recent_events(
            &paths.dose_log,
            &paths.csv,
            config.history.recent_days,
            clock.now(),
        )?;

        Ok(Self {
            paths,
            state,
            history,
            alerts: AlertMachine::new(&config.alerts),
            tolerance_minutes: config.alerts.tolerance_minutes,
            clock,
        })
    }

    /// Record a dose from a raw numeric location id (1-3).
    ///
    /// An unknown id fails with `InvalidLocation` before any state is
    /// touched.
    pub fn record_dose(&mut self, raw_id: u8) -> Result<DoseEvent> {
        let id = LocationId::try_from(raw_id)?;
        self.record_dose_at(id)
    }

    /// Record a dose at a known location: mutate, append, save, in that
    /// order, before any recomputation can run.
    pub fn record_dose_at(&mut self, id: LocationId) -> Result<DoseEvent> {
        let now = self.clock.now();
        let event = self.state.record_dose(id, now)?;

        let mut sink = JsonlSink::new(&self.paths.dose_log);
        sink.append(&event)?;
        self.state.save(&self.paths.state)?;

        self.history.push(event.clone());
        Ok(event)
    }

    /// Reset the rotation to a fresh cycle
    pub fn reset_cycle(&mut self) -> Result<()> {
        self.state.reset_cycle();
        self.state.save(&self.paths.state)
    }

    /// Replace the schedule configuration.
    ///
    /// Validation happens before assignment; on rejection the previous
    /// schedule stays active and persisted.
    pub fn set_schedule(&mut self, schedule: ScheduleConfig) -> Result<()> {
        self.state.set_schedule(schedule)?;
        self.state.save(&self.paths.state)
    }

    /// Derive today's schedule status from history
    pub fn status(&self) -> ScheduleStatus {
        evaluate_status(
            &self.state.schedule,
            &self.history,
            self.clock.now(),
            self.tolerance_minutes,
        )
    }

    /// Recompute status and run one alert tick
    pub fn poll_alert(&mut self) -> Option<AlertNotice> {
        let status = self.status();
        self.alerts.tick(&status, self.clock.now())
    }

    /// Dismiss the active alert (the slot will not re-alert)
    pub fn dismiss_alert(&mut self) {
        self.alerts.dismiss();
    }

    /// Snooze the active alert for the configured delay
    pub fn snooze_alert(&mut self) {
        let now = self.clock.now();
        self.alerts.snooze(now);
    }

    /// The location the next dose should go to
    pub fn next_location(&self) -> &Location {
        let id = self.state.peek_next_location();
        self.state
            .location(id)
            .expect("built-in locations always present")
    }

    /// The most recent `n` history entries, newest first
    pub fn recent_history(&self, n: usize) -> Vec<&DoseEvent> {
        history::last_n(&self.history, n)
    }

    /// Doses recorded today
    pub fn doses_today(&self) -> usize {
        history::events_today(&self.history, self.clock.now()).len()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn history(&self) -> &[DoseEvent] {
        &self.history
    }

    pub fn paths(&self) -> &DataPaths {
        &self.paths
    }
}
