//! Per-callsign derived state.
//!
//! Every radiosonde seen since startup gets an [`EntityState`] holding its last
//! altitude fix and a short window of climb-rate samples. The smoothed climb
//! rate is the mean of that window.

use std::collections::{HashMap, VecDeque};

use chrono::NaiveDateTime;
use tracing::trace;

/// Number of climb-rate samples averaged into the smoothed value.
pub const CLIMB_WINDOW: usize = 6;

/// Live state for one callsign.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityState {
    callsign: String,
    last_altitude: f64,
    last_seen: NaiveDateTime,
    samples: VecDeque<f64>,
}

impl EntityState {
    fn new(callsign: &str, altitude: f64, now: NaiveDateTime) -> Self {
        Self {
            callsign: callsign.to_string(),
            last_altitude: altitude,
            last_seen: now,
            samples: VecDeque::with_capacity(CLIMB_WINDOW),
        }
    }

    /// The callsign this state belongs to.
    #[must_use]
    pub fn callsign(&self) -> &str {
        &self.callsign
    }

    /// Altitude of the most recent observation.
    #[must_use]
    pub fn last_altitude(&self) -> f64 {
        self.last_altitude
    }

    /// Time of the most recent observation.
    #[must_use]
    pub fn last_seen(&self) -> NaiveDateTime {
        self.last_seen
    }

    /// Climb-rate samples currently in the window, oldest first.
    #[must_use]
    pub fn samples(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }

    /// Mean of the sample window, `None` while it is empty.
    #[must_use]
    pub fn climb_rate(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let len = self.samples.len() as f64;
        Some(self.samples.iter().sum::<f64>() / len)
    }

    fn update(&mut self, altitude: f64, now: NaiveDateTime) -> Option<f64> {
        let elapsed_ms = (now - self.last_seen).num_milliseconds();

        // Duplicate or out-of-order timestamps carry no rate information.
        if elapsed_ms > 0 {
            #[allow(clippy::cast_precision_loss)]
            let minutes = elapsed_ms as f64 / 60_000.0;
            let sample = (altitude - self.last_altitude) / minutes;

            if self.samples.len() == CLIMB_WINDOW {
                self.samples.pop_front();
            }
            self.samples.push_back(sample);
        } else {
            trace!(
                "Discarding climb sample for {} (elapsed {} ms)",
                self.callsign,
                elapsed_ms
            );
        }

        self.last_altitude = altitude;
        self.last_seen = now;
        self.climb_rate()
    }
}

/// Owner of all [`EntityState`] entries.
///
/// Entries are created on first sighting and live for the lifetime of the
/// store. Access is `&mut self`; callers serialize observations.
#[derive(Debug, Default)]
pub struct EntityStore {
    entities: HashMap<String, EntityState>,
}

impl EntityStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an altitude fix and return the smoothed climb rate.
    ///
    /// The rate is in altitude units per minute. The first observation of a
    /// callsign returns `None`. A fix whose timestamp is not strictly after the
    /// previous one contributes no sample; the current window mean is returned
    /// instead. The stored altitude and time always move to this observation.
    pub fn observe(&mut self, callsign: &str, altitude: f64, now: NaiveDateTime) -> Option<f64> {
        if let Some(state) = self.entities.get_mut(callsign) {
            return state.update(altitude, now);
        }

        self.entities
            .insert(callsign.to_string(), EntityState::new(callsign, altitude, now));
        None
    }

    /// Look up the state of a callsign.
    #[must_use]
    pub fn get(&self, callsign: &str) -> Option<&EntityState> {
        self.entities.get(callsign)
    }

    /// Number of callsigns seen.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if no callsign has been seen yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
