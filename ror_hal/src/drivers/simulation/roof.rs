//! Roof travel model.
//!
//! Position runs from 0.0 (fully closed) to 1.0 (fully opened). The roof
//! moves at constant speed while a travel is active and stops by itself
//! at either limit.

use ror_common::config::SimPosition;
use std::time::{Duration, Instant};
use tracing::debug;

/// Direction of simulated travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Travel {
    /// Towards the opened limit.
    Opening,
    /// Towards the closed limit.
    Closing,
}

/// Simulated roof mechanics.
#[derive(Debug, Clone)]
pub struct SimulatedRoof {
    position: f64,
    travel_time: Duration,
    motion: Option<Travel>,
    last_update: Instant,
}

impl SimulatedRoof {
    /// Create a stationary roof.
    pub fn new(travel_time: Duration, initial: SimPosition, now: Instant) -> Self {
        let position = match initial {
            SimPosition::Closed => 0.0,
            SimPosition::Opened => 1.0,
            SimPosition::Between => 0.5,
        };
        Self {
            position,
            travel_time,
            motion: None,
            last_update: now,
        }
    }

    /// Integrate motion up to `now`.
    pub fn advance(&mut self, now: Instant) {
        let dt = now.saturating_duration_since(self.last_update);
        self.last_update = now;

        let Some(travel) = self.motion else {
            return;
        };
        let delta = dt.as_secs_f64() / self.travel_time.as_secs_f64();
        self.position = match travel {
            Travel::Opening => (self.position + delta).min(1.0),
            Travel::Closing => (self.position - delta).max(0.0),
        };

        if self.is_opened() || self.is_closed() {
            debug!(position = self.position, "simulated roof reached limit");
            self.motion = None;
        }
    }

    /// Start travelling. No effect when already at the target limit.
    pub fn start(&mut self, travel: Travel, now: Instant) {
        self.advance(now);
        let at_target = match travel {
            Travel::Opening => self.is_opened(),
            Travel::Closing => self.is_closed(),
        };
        if !at_target {
            debug!(?travel, position = self.position, "simulated roof moving");
            self.motion = Some(travel);
        }
    }

    /// Stop wherever the roof is.
    pub fn stop(&mut self, now: Instant) {
        self.advance(now);
        if self.motion.take().is_some() {
            debug!(position = self.position, "simulated roof stopped");
        }
    }

    /// Change the full travel time from `now` on.
    pub fn set_travel_time(&mut self, travel_time: Duration, now: Instant) {
        self.advance(now);
        self.travel_time = travel_time;
    }

    /// Current position, 0.0 closed to 1.0 opened.
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Active travel, if any.
    pub fn motion(&self) -> Option<Travel> {
        self.motion
    }

    /// Opened limit switch.
    pub fn is_opened(&self) -> bool {
        self.position >= 1.0
    }

    /// Closed limit switch.
    pub fn is_closed(&self) -> bool {
        self.position <= 0.0
    }
}
