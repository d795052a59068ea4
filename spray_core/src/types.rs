//! Core domain types for the Spray Tracker system.
//!
//! This module defines the fundamental types used throughout the system:
//! - Spray locations and their rotation flags
//! - Dose events (the append-only history record)
//! - Schedule configuration and derived schedule status
//! - Persistent application state

use crate::{Error, Result};
use chrono::{DateTime, NaiveTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Location Types
// ============================================================================

/// Identifier for one of the three fixed spray locations.
///
/// The set is closed: locations are never created or destroyed, only
/// their rotation flags change.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "u8", into = "u8")]
pub enum LocationId {
    LeftOfMouth = 1,
    RightOfMouth = 2,
    UnderTongue = 3,
}

impl LocationId {
    /// All locations in rotation order (lowest number first)
    pub const ALL: [LocationId; 3] = [
        LocationId::LeftOfMouth,
        LocationId::RightOfMouth,
        LocationId::UnderTongue,
    ];

    /// Numeric id as shown to the user (1-3)
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Built-in display name for this location
    pub fn default_name(self) -> &'static str {
        match self {
            LocationId::LeftOfMouth => "Left of Mouth",
            LocationId::RightOfMouth => "Right of Mouth",
            LocationId::UnderTongue => "Under the Tongue",
        }
    }
}

impl TryFrom<u8> for LocationId {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(LocationId::LeftOfMouth),
            2 => Ok(LocationId::RightOfMouth),
            3 => Ok(LocationId::UnderTongue),
            other => Err(Error::InvalidLocation(other)),
        }
    }
}

impl From<LocationId> for u8 {
    fn from(id: LocationId) -> u8 {
        id.as_u8()
    }
}

impl std::fmt::Display for LocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// A spray location with its per-cycle rotation state
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    #[serde(default)]
    pub used: bool,
    #[serde(default)]
    pub last_used: Option<DateTime<Utc>>,
}

/// Cached default location set - built once and reused
static DEFAULT_LOCATIONS: Lazy<Vec<Location>> = Lazy::new(build_default_locations);

/// The built-in set of three rotation locations, all unused
pub fn default_locations() -> Vec<Location> {
    DEFAULT_LOCATIONS.clone()
}

fn build_default_locations() -> Vec<Location> {
    LocationId::ALL
        .iter()
        .map(|&id| Location {
            id,
            name: id.default_name().to_string(),
            used: false,
            last_used: None,
        })
        .collect()
}

// ============================================================================
// Dose Event Type
// ============================================================================

/// A recorded dose, immutable once appended to the log.
///
/// `location_name` is a denormalized snapshot so history stays readable
/// even if display names change later.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DoseEvent {
    pub id: Uuid,
    pub location_id: LocationId,
    pub location_name: String,
    pub timestamp: DateTime<Utc>,
    pub cycle: u32,
}

// ============================================================================
// Schedule Types
// ============================================================================

/// Daily reminder schedule configuration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ScheduleConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_start_time")]
    pub start_time: NaiveTime,

    #[serde(default = "default_end_time")]
    pub end_time: NaiveTime,

    #[serde(default = "default_interval_hours")]
    pub interval_hours: u32,

    #[serde(default)]
    pub interval_minutes: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            start_time: default_start_time(),
            end_time: default_end_time(),
            interval_hours: default_interval_hours(),
            interval_minutes: 0,
        }
    }
}

fn default_start_time() -> NaiveTime {
    NaiveTime::from_hms_opt(7, 0, 0).unwrap_or_default()
}

fn default_end_time() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 0).unwrap_or_default()
}

fn default_interval_hours() -> u32 {
    4
}

impl ScheduleConfig {
    /// Total step between scheduled doses, in minutes
    pub fn interval_total_minutes(&self) -> i64 {
        i64::from(self.interval_hours) * 60 + i64::from(self.interval_minutes)
    }

    /// Reject a zero-length interval while the schedule is enabled.
    ///
    /// A zero interval would make expansion loop forever, so it is
    /// refused at update time and the previous config is retained.
    pub fn validate(&self) -> Result<()> {
        if self.enabled && self.interval_total_minutes() == 0 {
            return Err(Error::InvalidConfig(
                "interval must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Derived schedule status for "today" - recomputed on demand, never persisted
#[derive(Clone, Debug, Serialize, Default)]
pub struct ScheduleStatus {
    pub enabled: bool,
    pub scheduled_times: Vec<DateTime<Utc>>,
    pub completed_times: Vec<DateTime<Utc>>,
    pub next_dose_time: Option<DateTime<Utc>>,
    pub is_overdue: bool,
    pub minutes_until_next: Option<i64>,
}

// ============================================================================
// Persistent State
// ============================================================================

/// Persistent application state (dose history lives in the append-only log)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppState {
    #[serde(default = "default_locations")]
    pub locations: Vec<Location>,

    #[serde(default)]
    pub total_doses: u64,

    #[serde(default = "default_cycle")]
    pub current_cycle: u32,

    #[serde(default)]
    pub schedule: ScheduleConfig,
}

fn default_cycle() -> u32 {
    1
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            locations: default_locations(),
            total_doses: 0,
            current_cycle: 1,
            schedule: ScheduleConfig::default(),
        }
    }
}

impl AppState {
    /// Look up a location by id
    pub fn location(&self, id: LocationId) -> Option<&Location> {
        self.locations.iter().find(|l| l.id == id)
    }

    /// Ensure all three built-in locations exist, backfilling any that a
    /// partial or older state file is missing.
    pub fn backfill_locations(&mut self) {
        for &id in &LocationId::ALL {
            if !self.locations.iter().any(|l| l.id == id) {
                tracing::warn!("State file missing location {}, restoring default", id);
                self.locations.push(Location {
                    id,
                    name: id.default_name().to_string(),
                    used: false,
                    last_used: None,
                });
            }
        }
        self.locations.sort_by_key(|l| l.id);
    }
}
