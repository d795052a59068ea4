#![forbid(unsafe_code)]

//! Core domain model and business logic for the Spray Tracker system.
//!
//! This crate provides:
//! - Domain types (locations, dose events, schedule config/status)
//! - Location rotation with cycle tracking
//! - Daily schedule expansion and matching
//! - Deduplicated alerting with dismiss/snooze
//! - Persistence (dose log, CSV archive, state)

pub mod types;
pub mod error;
pub mod clock;
pub mod config;
pub mod logging;
pub mod wal;
pub mod csv_rollup;
pub mod state;
pub mod rotation;
pub mod schedule;
pub mod status;
pub mod alert;
pub mod history;
pub mod engine;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use wal::{DoseSink, JsonlSink};
pub use schedule::expand_schedule;
pub use status::evaluate_status;
pub use alert::{AlertMachine, AlertNotice};
pub use history::load_recent_events;
pub use engine::Tracker;
