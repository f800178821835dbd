//! Status derivation from switch readings and motion state.
//!
//! Readings may contradict each other (both limit switches active, motion
//! while locked). [`StatusAggregator::derive`] reconciles them into one
//! [`StatusSnapshot`] by a fixed priority:
//!
//! 1. Locked: lock light alert; a closed or opened switch still shows ok,
//!    motion while locked is an alert.
//! 2. Exactly one limit switch: that light ok, its motion flag cleared.
//! 3. Motion in progress: moving and destination lights busy.
//! 4. Neither switch, stationary: overall alert; the light of a timed-out
//!    direction turns alert.
//!
//! Both switches active always raises `CONTRADICTION`.

use bitflags::bitflags;
use ror_common::consts::INDETERMINATE_WARN_LIMIT;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::sensors::SensorReadings;
use crate::state::motion::MotionDirection;

bitflags! {
    /// Alert conditions attached to a snapshot.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
    pub struct StatusAlert: u8 {
        /// Opened and closed switches both active.
        const CONTRADICTION       = 0x01;
        /// A session is running while the lock switch is active.
        const MOVING_WHILE_LOCKED = 0x02;
        /// The last open session timed out.
        const TIMEOUT_OPEN        = 0x04;
        /// The last close session timed out.
        const TIMEOUT_CLOSE       = 0x08;
        /// Stationary with neither limit switch active.
        const INDETERMINATE       = 0x10;
    }
}

/// Color of one status light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LightState {
    #[default]
    Idle,
    Ok,
    Busy,
    Alert,
}

/// The five roof status lights plus the group state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatusLights {
    pub opened: LightState,
    pub closed: LightState,
    pub moving: LightState,
    pub locked: LightState,
    pub auxiliary: LightState,
    pub overall: LightState,
}

/// Derived roof state for clients that want one word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoofState {
    Parked,
    Unparked,
    Opening,
    Closing,
    Indeterminate,
    Locked,
    Inconsistent,
}

/// Everything known about the roof after one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub readings: SensorReadings,
    pub moving: bool,
    /// Running direction, cleared once its target switch is active.
    pub direction: Option<MotionDirection>,
    pub timed_out: Option<MotionDirection>,
    pub lights: StatusLights,
    pub alerts: StatusAlert,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        StatusAggregator::derive(&SensorReadings::default(), None, None)
    }
}

impl StatusSnapshot {
    pub fn roof_state(&self) -> RoofState {
        let r = &self.readings;
        if self.alerts.contains(StatusAlert::CONTRADICTION) {
            RoofState::Inconsistent
        } else if r.locked {
            RoofState::Locked
        } else if let Some(direction) = self.direction {
            match direction {
                MotionDirection::Opening => RoofState::Opening,
                MotionDirection::Closing => RoofState::Closing,
            }
        } else if r.closed {
            RoofState::Parked
        } else if r.opened {
            RoofState::Unparked
        } else {
            RoofState::Indeterminate
        }
    }

    /// Neither limit switch and no motion.
    pub fn is_indeterminate(&self) -> bool {
        self.alerts.contains(StatusAlert::INDETERMINATE)
    }
}

// ─── Indeterminate throttle ─────────────────────────────────────────

/// What to log for the current indeterminate observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleAction {
    /// Not indeterminate, nothing pending.
    Quiet,
    /// Warn; carries the occurrence count.
    Warn(u32),
    /// Last report, at error level.
    Escalate,
    /// Already escalated.
    Suppressed,
    /// Condition cleared, counter reset.
    Clear,
}

/// Counts consecutive indeterminate ticks.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndeterminateThrottle {
    count: u32,
}

impl IndeterminateThrottle {
    pub fn observe(&mut self, indeterminate: bool) -> ThrottleAction {
        if !indeterminate {
            if self.count == 0 {
                return ThrottleAction::Quiet;
            }
            self.count = 0;
            return ThrottleAction::Clear;
        }
        if self.count < INDETERMINATE_WARN_LIMIT {
            self.count += 1;
            ThrottleAction::Warn(self.count)
        } else if self.count == INDETERMINATE_WARN_LIMIT {
            self.count += 1;
            ThrottleAction::Escalate
        } else {
            ThrottleAction::Suppressed
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

// ─── Aggregator ─────────────────────────────────────────────────────

/// Stateful wrapper around [`derive`](Self::derive) that owns the
/// warning throttle.
#[derive(Debug, Default)]
pub struct StatusAggregator {
    throttle: IndeterminateThrottle,
}

impl StatusAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pure status derivation.
    pub fn derive(
        readings: &SensorReadings,
        direction: Option<MotionDirection>,
        timed_out: Option<MotionDirection>,
    ) -> StatusSnapshot {
        let r = *readings;
        let mut lights = StatusLights::default();
        let mut alerts = StatusAlert::empty();
        let mut direction = direction;

        if r.aux {
            lights.auxiliary = LightState::Ok;
        }
        if r.opened && r.closed {
            alerts |= StatusAlert::CONTRADICTION;
        }
        if !r.opened && !r.closed && direction.is_none() {
            alerts |= StatusAlert::INDETERMINATE;
        }

        if r.locked {
            lights.locked = LightState::Alert;
            if r.closed {
                lights.closed = LightState::Ok;
                lights.overall = LightState::Ok;
            } else if r.opened {
                lights.opened = LightState::Ok;
                lights.overall = LightState::Ok;
            }
            if direction.is_some() {
                lights.moving = LightState::Alert;
                lights.overall = LightState::Alert;
                alerts |= StatusAlert::MOVING_WHILE_LOCKED;
            }
        } else if r.opened != r.closed {
            if r.opened {
                lights.opened = LightState::Ok;
                if direction == Some(MotionDirection::Opening) {
                    direction = None;
                }
            } else {
                lights.closed = LightState::Ok;
                if direction == Some(MotionDirection::Closing) {
                    direction = None;
                }
            }
            // The far switch stays active for the first moments of travel.
            if direction.is_some() {
                lights.moving = LightState::Busy;
            }
            lights.overall = LightState::Ok;
        } else if r.opened && r.closed {
            lights.opened = LightState::Alert;
            lights.closed = LightState::Alert;
            lights.overall = LightState::Alert;
            if direction.is_some() {
                lights.moving = LightState::Busy;
            }
        } else if let Some(d) = direction {
            lights.moving = LightState::Busy;
            match d {
                MotionDirection::Opening => lights.opened = LightState::Busy,
                MotionDirection::Closing => lights.closed = LightState::Busy,
            }
            lights.overall = LightState::Busy;
        } else {
            match timed_out {
                Some(MotionDirection::Opening) => {
                    lights.opened = LightState::Alert;
                    alerts |= StatusAlert::TIMEOUT_OPEN;
                }
                Some(MotionDirection::Closing) => {
                    lights.closed = LightState::Alert;
                    alerts |= StatusAlert::TIMEOUT_CLOSE;
                }
                None => {}
            }
            lights.overall = LightState::Alert;
        }

        StatusSnapshot {
            readings: r,
            moving: direction.is_some(),
            direction,
            timed_out,
            lights,
            alerts,
        }
    }

    /// Derive a snapshot and emit the contradiction and indeterminate logs.
    pub fn update(
        &mut self,
        readings: &SensorReadings,
        direction: Option<MotionDirection>,
        timed_out: Option<MotionDirection>,
    ) -> StatusSnapshot {
        let snapshot = Self::derive(readings, direction, timed_out);

        if snapshot.alerts.contains(StatusAlert::CONTRADICTION) {
            warn!("Roof showing it is both opened and closed according to the switches");
        }
        if snapshot.alerts.contains(StatusAlert::MOVING_WHILE_LOCKED) {
            warn!("Roof is moving while the external lock is engaged");
        }

        match self.throttle.observe(snapshot.is_indeterminate()) {
            ThrottleAction::Warn(n) => {
                warn!(count = n, "Roof stationary, neither opened nor closed");
            }
            ThrottleAction::Escalate => {
                error!("Roof stationary, not opened or closed. Will stop reporting this error.");
            }
            ThrottleAction::Clear => {
                info!("Roof position determined");
            }
            ThrottleAction::Suppressed | ThrottleAction::Quiet => {}
        }
        snapshot
    }

    /// Restart the warning sequence, as after a reconnect.
    pub fn reset(&mut self) {
        self.throttle = IndeterminateThrottle::default();
    }

    pub fn throttle(&self) -> &IndeterminateThrottle {
        &self.throttle
    }
}
