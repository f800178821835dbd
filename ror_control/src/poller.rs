//! Single-threaded poll loop with adaptive interval.
//!
//! One tick right after connecting uses the initial interval; afterwards the
//! interval is the active one while a motion session runs and the idle one
//! otherwise. Ticks never overlap: the next sleep starts after the previous
//! tick (including any relay pulse) has returned.

use ror_common::config::PollSettings;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::controller::RoofController;
use crate::error::RoofError;
use crate::state::motion::TickOutcome;

/// Longest single sleep; bounds shutdown latency.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    Initial,
    Idle,
    Active,
}

/// Interval per phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub initial: Duration,
    pub idle: Duration,
    pub active: Duration,
}

impl From<&PollSettings> for PollSchedule {
    fn from(s: &PollSettings) -> Self {
        Self {
            initial: Duration::from_millis(s.initial_ms),
            idle: Duration::from_millis(s.idle_ms),
            active: Duration::from_millis(s.active_ms),
        }
    }
}

impl PollSchedule {
    pub fn interval(&self, phase: PollPhase) -> Duration {
        match phase {
            PollPhase::Initial => self.initial,
            PollPhase::Idle => self.idle,
            PollPhase::Active => self.active,
        }
    }
}

/// Drives [`RoofController::poll`] on a timer.
#[derive(Debug)]
pub struct Poller {
    schedule: PollSchedule,
    phase: PollPhase,
    ticks: u64,
    last: TickOutcome,
}

impl Poller {
    pub fn new(settings: &PollSettings) -> Self {
        Self {
            schedule: PollSchedule::from(settings),
            phase: PollPhase::Initial,
            ticks: 0,
            last: TickOutcome::Idle,
        }
    }

    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Outcome of the most recent successful tick.
    pub fn last_outcome(&self) -> TickOutcome {
        self.last
    }

    /// Delay before the first tick.
    pub fn initial_delay(&self) -> Duration {
        self.schedule.initial
    }

    /// Run one tick and return the delay until the next one.
    pub fn tick(&mut self, controller: &mut RoofController, now: Instant) -> Duration {
        self.ticks += 1;
        match controller.poll(now) {
            Ok(report) => {
                self.last = report.outcome;
                if report.reconnected {
                    self.phase = PollPhase::Initial;
                    return self.schedule.initial;
                }
                if let TickOutcome::Moving { direction, remaining } = report.outcome {
                    debug!(
                        remaining_s = remaining.as_secs(),
                        "Roof is {direction}"
                    );
                }
            }
            Err(e) => error!("Poll failed: {e}"),
        }
        self.phase = if controller.is_moving() {
            PollPhase::Active
        } else {
            PollPhase::Idle
        };
        self.schedule.interval(self.phase)
    }

    /// Poll until `running` clears. A session still in progress at shutdown
    /// is aborted.
    pub fn run(&mut self, controller: &mut RoofController, running: &AtomicBool) {
        info!(
            idle_ms = self.schedule.idle.as_millis() as u64,
            active_ms = self.schedule.active.as_millis() as u64,
            "Poll loop started"
        );
        let mut delay = self.initial_delay();
        while running.load(Ordering::SeqCst) {
            if !sleep_while(running, delay) {
                break;
            }
            delay = self.tick(controller, Instant::now());
        }

        if controller.is_moving() {
            warn!("Shutdown while the roof is moving, aborting");
            if let Err(e) = controller.abort() {
                error!("Abort on shutdown failed: {e}");
            }
        }
        info!(ticks = self.ticks, "Poll loop stopped");
    }

    /// Poll until the running session ends and return how it ended.
    /// A timeout is returned as an error.
    pub fn run_until_idle(
        &mut self,
        controller: &mut RoofController,
        running: &AtomicBool,
    ) -> Result<TickOutcome, RoofError> {
        let mut delay = self.initial_delay();
        while controller.is_moving() {
            if !sleep_while(running, delay) {
                warn!("Interrupted while the roof is moving, aborting");
                controller.abort()?;
                return Ok(TickOutcome::Idle);
            }
            delay = self.tick(controller, Instant::now());
        }
        match self.last {
            TickOutcome::TimedOut(direction) => Err(RoofError::Timeout(direction)),
            outcome => Ok(outcome),
        }
    }
}

/// Sleep `total` in slices, returning `false` as soon as `running` clears.
fn sleep_while(running: &AtomicBool, total: Duration) -> bool {
    let deadline = Instant::now() + total;
    loop {
        if !running.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep(SLEEP_SLICE.min(deadline - now));
    }
}
