//! Location rotation logic.
//!
//! Doses rotate through the three fixed locations in numeric order; a
//! cycle completes once every location has been used, at which point the
//! flags clear and the cycle counter advances.
//!
//! The rotation query is deliberately split from the cycle advance:
//! `peek_next_location` never mutates, and the rollover happens exactly
//! once, inside `record_dose` (or an explicit `reset_cycle`).

use crate::{AppState, DoseEvent, LocationId, Result};
use chrono::{DateTime, Utc};
use uuid::Uuid;

impl AppState {
    /// The location the next dose should go to.
    ///
    /// Pure query: the lowest-numbered unused location, or location 1
    /// when the rotation is complete (a fresh cycle starts there).
    pub fn peek_next_location(&self) -> LocationId {
        self.locations
            .iter()
            .filter(|l| !l.used)
            .map(|l| l.id)
            .min()
            .unwrap_or(LocationId::LeftOfMouth)
    }

    /// Roll the rotation over if every location has been used.
    ///
    /// Clears all `used` flags and increments the cycle counter.
    /// Returns whether a rollover happened.
    pub fn advance_cycle_if_needed(&mut self) -> bool {
        if self.locations.iter().all(|l| l.used) {
            for location in &mut self.locations {
                location.used = false;
            }
            self.current_cycle += 1;
            tracing::info!("Rotation complete, starting cycle {}", self.current_cycle);
            true
        } else {
            false
        }
    }

    /// Record a dose at the given location.
    ///
    /// Rolls the cycle over first if the previous rotation is complete,
    /// so the event carries the cycle it actually belongs to. Marks the
    /// location used, stamps its last-use time, and returns the event to
    /// be appended to the dose log.
    pub fn record_dose(&mut self, id: LocationId, now: DateTime<Utc>) -> Result<DoseEvent> {
        self.advance_cycle_if_needed();

        let cycle = self.current_cycle;
        let location = self
            .locations
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or(crate::Error::InvalidLocation(id.as_u8()))?;

        location.used = true;
        location.last_used = Some(now);

        let event = DoseEvent {
            id: Uuid::new_v4(),
            location_id: id,
            location_name: location.name.clone(),
            timestamp: now,
            cycle,
        };

        self.total_doses += 1;
        tracing::info!(
            "Recorded dose at {} (cycle {}, total {})",
            event.location_name,
            cycle,
            self.total_doses
        );

        Ok(event)
    }

    /// Start a fresh cycle: clear all `used` flags and bump the counter.
    ///
    /// Safe to call at any point in the rotation.
    pub fn reset_cycle(&mut self) {
        for location in &mut self.locations {
            location.used = false;
        }
        self.current_cycle += 1;
        tracing::info!("Cycle reset, now on cycle {}", self.current_cycle);
    }

    /// Number of locations used so far this cycle
    pub fn used_count(&self) -> usize {
        self.locations.iter().filter(|l| l.used).count()
    }
}
