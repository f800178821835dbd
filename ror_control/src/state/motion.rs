//! Roof motion state machine.
//!
//! Idle → Opening/Closing on an accepted request, back to Idle on limit
//! switch, timeout or abort. The machine never touches pins itself: the
//! relay is fired through a caller-supplied closure so the machine stays
//! testable without a port.
//!
//! ```text
//!            request(Open)             opened switch
//!   Idle ───────────────────► Opening ───────────────► Idle (Unparked)
//!    ▲ │     request(Close)            timeout / abort
//!    │ └────────────────────► Closing ───────────────► Idle
//!    └──────────────────────────────── closed switch ─► Idle (Parked)
//! ```

use core::fmt;
use ror_common::io::role::{RoofInput, RoofOutput};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::actuator::Actuation;
use crate::error::{InterlockReason, RoofError};
use crate::sensors::SensorReadings;

/// Direction of roof travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionDirection {
    Opening,
    Closing,
}

impl MotionDirection {
    /// Relay that starts travel in this direction.
    pub const fn relay(self) -> RoofOutput {
        match self {
            Self::Opening => RoofOutput::Open,
            Self::Closing => RoofOutput::Close,
        }
    }

    /// Limit switch that ends travel in this direction.
    pub const fn target_input(self) -> RoofInput {
        match self {
            Self::Opening => RoofInput::Opened,
            Self::Closing => RoofInput::Closed,
        }
    }

    pub const fn target_name(self) -> &'static str {
        match self {
            Self::Opening => "opened",
            Self::Closing => "closed",
        }
    }

    /// Park status once travel in this direction completes.
    pub const fn park_status(self) -> ParkStatus {
        match self {
            Self::Opening => ParkStatus::Unparked,
            Self::Closing => ParkStatus::Parked,
        }
    }

    /// Whether `readings` show the target switch active.
    pub const fn reached(self, readings: &SensorReadings) -> bool {
        match self {
            Self::Opening => readings.opened,
            Self::Closing => readings.closed,
        }
    }
}

impl fmt::Display for MotionDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Opening => write!(f, "opening"),
            Self::Closing => write!(f, "closing"),
        }
    }
}

/// Why motion was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionPurpose {
    Move,
    Park,
    Unpark,
}

impl fmt::Display for MotionPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Move => write!(f, "move"),
            Self::Park => write!(f, "park"),
            Self::Unpark => write!(f, "unpark"),
        }
    }
}

/// Last confirmed park position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParkStatus {
    Parked,
    Unparked,
    #[default]
    Unknown,
}

/// Coarse machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionState {
    Idle,
    Opening,
    Closing,
}

/// One accepted motion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionSession {
    pub direction: MotionDirection,
    pub purpose: MotionPurpose,
    pub started: Instant,
    pub timeout: Duration,
    pub cancelled: bool,
}

impl MotionSession {
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started)
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.timeout.saturating_sub(self.elapsed(now))
    }

    pub fn expired(&self, now: Instant) -> bool {
        self.elapsed(now) >= self.timeout
    }
}

// ─── Outcomes ───────────────────────────────────────────────────────

/// Result of an accepted move request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Relay fired, session started.
    Started,
    /// A session was already running; nothing fired.
    AlreadyInProgress,
}

/// Result of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    Moving {
        direction: MotionDirection,
        remaining: Duration,
    },
    Completed(MotionDirection),
    TimedOut(MotionDirection),
}

/// Result of an abort request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortOutcome {
    /// A session was cancelled.
    Stopped(MotionSession),
    /// Nothing was moving.
    NotMoving,
}

// ─── Machine ────────────────────────────────────────────────────────

/// Roof motion lifecycle.
#[derive(Debug, Clone, Default)]
pub struct MotionStateMachine {
    session: Option<MotionSession>,
    timed_out: Option<MotionDirection>,
    park_status: ParkStatus,
}

impl MotionStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MotionState {
        match self.direction() {
            None => MotionState::Idle,
            Some(MotionDirection::Opening) => MotionState::Opening,
            Some(MotionDirection::Closing) => MotionState::Closing,
        }
    }

    #[inline]
    pub fn is_moving(&self) -> bool {
        self.session.is_some()
    }

    pub fn direction(&self) -> Option<MotionDirection> {
        self.session.map(|s| s.direction)
    }

    pub fn session(&self) -> Option<&MotionSession> {
        self.session.as_ref()
    }

    /// Direction of the most recent timed-out session, cleared when the
    /// next session starts.
    pub fn timed_out(&self) -> Option<MotionDirection> {
        self.timed_out
    }

    pub fn park_status(&self) -> ParkStatus {
        self.park_status
    }

    /// Ask the roof to travel in `direction`.
    ///
    /// Checks, in order: the lock switch, a running session (no-op), the
    /// target switch already active (park status forced to match), and for
    /// closing the mount policy. Only then is `actuate` called with the
    /// direction's relay; the session starts if it succeeds.
    #[allow(clippy::too_many_arguments)]
    pub fn request<F>(
        &mut self,
        direction: MotionDirection,
        purpose: MotionPurpose,
        readings: &SensorReadings,
        mount_locking: bool,
        timeout: Duration,
        now: Instant,
        actuate: F,
    ) -> Result<MoveOutcome, RoofError>
    where
        F: FnOnce(RoofOutput) -> Result<Actuation, RoofError>,
    {
        if readings.locked {
            warn!("Roof is externally locked, {purpose} request refused");
            return Err(RoofError::Interlocked(InterlockReason::RoofLocked));
        }

        if let Some(running) = self.session {
            info!(
                "Roof {} already in progress, {direction} request ignored",
                running.direction
            );
            return Ok(MoveOutcome::AlreadyInProgress);
        }

        if direction.reached(readings) {
            self.park_status = direction.park_status();
            warn!("Roof is already {}", direction.target_name());
            return Err(RoofError::AlreadyInPosition(direction));
        }

        if direction == MotionDirection::Closing && mount_locking {
            warn!("Telescope mount is locking the roof, close refused");
            return Err(RoofError::Interlocked(InterlockReason::MountLocking));
        }

        actuate(direction.relay())?;

        self.timed_out = None;
        self.session = Some(MotionSession {
            direction,
            purpose,
            started: now,
            timeout,
            cancelled: false,
        });
        info!(timeout_s = timeout.as_secs(), "Roof {purpose}: {direction} started");
        Ok(MoveOutcome::Started)
    }

    /// Advance the running session against fresh readings.
    pub fn tick(&mut self, readings: &SensorReadings, now: Instant) -> TickOutcome {
        let Some(session) = self.session else {
            return TickOutcome::Idle;
        };
        let direction = session.direction;

        if direction.reached(readings) {
            self.session = None;
            self.park_status = direction.park_status();
            info!(
                elapsed_ms = session.elapsed(now).as_millis() as u64,
                "Roof is {}",
                direction.target_name()
            );
            return TickOutcome::Completed(direction);
        }

        if session.expired(now) {
            self.session = None;
            self.timed_out = Some(direction);
            warn!(
                timeout_s = session.timeout.as_secs(),
                "Roof {direction} timed out before reaching the {} switch",
                direction.target_name()
            );
            return TickOutcome::TimedOut(direction);
        }

        TickOutcome::Moving {
            direction,
            remaining: session.remaining(now),
        }
    }

    /// Cancel the running session and fire `fire` (the abort relay).
    ///
    /// The session is cleared before the relay fires, so a failed abort
    /// pulse still leaves the machine idle. Park status becomes unknown
    /// until the next [`sync_park_status`](Self::sync_park_status).
    pub fn abort<F>(&mut self, fire: F) -> Result<AbortOutcome, RoofError>
    where
        F: FnOnce() -> Result<Actuation, RoofError>,
    {
        let Some(mut session) = self.session.take() else {
            return Ok(AbortOutcome::NotMoving);
        };
        session.cancelled = true;
        self.park_status = ParkStatus::Unknown;
        warn!(
            "Abort requested while the roof was {}, direction correction may be needed on the next move",
            session.direction
        );
        fire()?;
        Ok(AbortOutcome::Stopped(session))
    }

    /// Set park status from the limit switches when idle and unambiguous.
    pub fn sync_park_status(&mut self, readings: &SensorReadings) {
        if self.is_moving() {
            return;
        }
        match (readings.opened, readings.closed) {
            (false, true) => self.park_status = ParkStatus::Parked,
            (true, false) => self.park_status = ParkStatus::Unparked,
            _ => {}
        }
    }

    /// Adopt a park position recorded before the last shutdown. Only used
    /// while idle with nothing better known.
    pub fn restore_park_status(&mut self, saved: ParkStatus) {
        if !self.is_moving() && self.park_status == ParkStatus::Unknown {
            self.park_status = saved;
        }
    }

    /// Drop all session state, as after a reconnect.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
