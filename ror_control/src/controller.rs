//! Roof controller core.
//!
//! [`RoofController`] owns the configuration, the pin registry, the GPIO
//! session and the motion state machine. Collaborators are injected at
//! construction:
//!
//! - a [`GpioPort`] for pin access,
//! - a [`MountPolicy`] consulted before closing,
//! - a [`StatusPublisher`] told about every light or park change.
//!
//! All methods run on the caller's thread; the poller and client commands
//! take turns through `&mut self`.

use ror_common::config::RoofConfig;
use ror_common::consts::MOTION_TIMEOUT_RANGE_S;
use ror_common::gpio::{GpioPort, PinMode, Pull};
use ror_common::io::config::{InputSlot, IoConfig, OutputSlot};
use ror_common::io::registry::PinRegistry;
use ror_common::io::role::{ActiveLevel, RoofOutput};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::actuator::{Actuation, RoofActuator};
use crate::error::RoofError;
use crate::park::{self, ParkMismatch, ParkStore};
use crate::port::GpioSession;
use crate::publisher::StatusPublisher;
use crate::sensors::{SensorReader, SensorReadings};
use crate::state::motion::{
    AbortOutcome, MotionDirection, MotionPurpose, MotionStateMachine, MoveOutcome, ParkStatus,
    TickOutcome,
};
use crate::status::{StatusAggregator, StatusLights, StatusSnapshot};

// ─── Collaborators ──────────────────────────────────────────────────

/// Telescope mount interlock.
pub trait MountPolicy: Send {
    /// `true` while the mount is parking or parked in a position that
    /// would collide with a closing roof.
    fn mount_locking(&self) -> bool;
}

/// No mount attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMountLock;

impl MountPolicy for NoMountLock {
    fn mount_locking(&self) -> bool {
        false
    }
}

/// Flag set by whatever watches the mount.
impl MountPolicy for Arc<AtomicBool> {
    fn mount_locking(&self) -> bool {
        self.load(Ordering::Acquire)
    }
}

/// Result of one [`RoofController::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollReport {
    pub outcome: TickOutcome,
    /// The GPIO session was rebuilt before this tick.
    pub reconnected: bool,
}

// ─── Controller ─────────────────────────────────────────────────────

pub struct RoofController {
    config: RoofConfig,
    config_path: Option<PathBuf>,
    registry: PinRegistry,
    port: GpioSession,
    mount: Box<dyn MountPolicy>,
    publisher: Box<dyn StatusPublisher>,
    aggregator: StatusAggregator,
    motion: MotionStateMachine,
    last: StatusSnapshot,
    published: Option<(StatusLights, ParkStatus)>,
    lock_requested: Option<bool>,
    aux_requested: Option<bool>,
    park_store: Option<ParkStore>,
    /// Last position loaded from or written to `park_store`.
    saved_park: Option<ParkStatus>,
    park_mismatch: Option<ParkMismatch>,
}

impl RoofController {
    /// Validate `config` and build the pin registry. Does not connect.
    ///
    /// An incomplete pin map is accepted; motion requests fail until it is
    /// completed.
    pub fn new(
        config: RoofConfig,
        port: Box<dyn GpioPort>,
        mount: Box<dyn MountPolicy>,
        publisher: Box<dyn StatusPublisher>,
    ) -> Result<Self, RoofError> {
        config.validate()?;
        let registry = PinRegistry::configure(&config.io)?;
        let park_store = config.roof.park_file.as_deref().map(ParkStore::new);
        Ok(Self {
            config,
            config_path: None,
            registry,
            port: GpioSession::new(port),
            mount,
            publisher,
            aggregator: StatusAggregator::new(),
            motion: MotionStateMachine::new(),
            last: StatusSnapshot::default(),
            published: None,
            lock_requested: None,
            aux_requested: None,
            park_store,
            saved_park: None,
            park_mismatch: None,
        })
    }

    /// File used by [`save_config`](Self::save_config) and
    /// [`reload_config`](Self::reload_config).
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    // ── Session lifecycle ──

    /// Open the GPIO session, set up every mapped pin and read the
    /// initial roof position.
    ///
    /// With a park file configured, the saved position is used when the
    /// limit switches cannot be read and checked against them when they can.
    pub fn connect(&mut self) -> Result<(), RoofError> {
        self.port.connect(&self.config).map_err(|e| {
            error!(driver = self.port.name(), "GPIO connect failed: {e}");
            RoofError::Connect(e)
        })?;
        self.setup_pins();
        self.aggregator.reset();
        let limits_read = self.refresh_switches();
        self.motion.sync_park_status(&self.last.readings);
        self.restore_saved_park(limits_read);
        self.publish_if_changed();
        info!(
            park = ?self.motion.park_status(),
            state = ?self.last.roof_state(),
            "Roof controller connected"
        );
        Ok(())
    }

    pub fn disconnect(&mut self) {
        if let Err(e) = self.port.disconnect() {
            warn!("GPIO disconnect failed: {e}");
        }
        info!("Roof controller disconnected");
    }

    /// Tear down and rebuild the GPIO session, dropping motion state.
    pub fn reconnect(&mut self) -> Result<(), RoofError> {
        warn!("Resetting GPIO session");
        self.disconnect();
        self.motion.reset();
        self.lock_requested = None;
        self.aux_requested = None;
        self.connect()
    }

    fn restore_saved_park(&mut self, limits_read: bool) {
        self.park_mismatch = None;
        let Some(store) = &self.park_store else {
            return;
        };
        let saved = match store.load() {
            Ok(Some(park)) => park,
            Ok(None) => {
                debug!(path = %store.path().display(), "No saved park position");
                return;
            }
            Err(e) => {
                warn!("Unable to read saved park position: {e}");
                return;
            }
        };
        self.saved_park = Some(saved);

        if !limits_read {
            info!(?saved, "Limit switches unreadable, using saved park position");
            self.motion.restore_park_status(saved);
        } else if let Some(mismatch) = park::check_saved(saved, &self.last.readings) {
            warn!("{mismatch}");
            self.park_mismatch = Some(mismatch);
        }
    }

    /// Outputs go to rest with pulls off; inputs get a pull toward their
    /// inactive level. A failing pin is logged and skipped.
    fn setup_pins(&mut self) {
        for def in self.registry.outputs() {
            let rest = def.active.physical(false);
            let result = self
                .port
                .set_mode(def.pin, PinMode::Output)
                .and_then(|()| self.port.set_pull(def.pin, Pull::Off))
                .and_then(|()| self.port.write(def.pin, rest));
            match result {
                Ok(()) => debug!(pin = def.pin, function = %def.function, %rest, "output ready"),
                Err(e) => warn!(pin = def.pin, "Setup of {} failed: {e}", def.function),
            }
        }
        for def in self.registry.inputs() {
            let pull = match def.active {
                ActiveLevel::High => Pull::Down,
                ActiveLevel::Low => Pull::Up,
            };
            let result = self
                .port
                .set_mode(def.pin, PinMode::Input)
                .and_then(|()| self.port.set_pull(def.pin, pull));
            match result {
                Ok(()) => debug!(pin = def.pin, function = %def.function, ?pull, "input ready"),
                Err(e) => warn!(pin = def.pin, "Setup of {} failed: {e}", def.function),
            }
        }
    }

    // ── Motion commands ──

    pub fn open(&mut self, now: Instant) -> Result<MoveOutcome, RoofError> {
        self.move_roof(MotionDirection::Opening, MotionPurpose::Move, now)
    }

    pub fn close(&mut self, now: Instant) -> Result<MoveOutcome, RoofError> {
        self.move_roof(MotionDirection::Closing, MotionPurpose::Move, now)
    }

    pub fn park(&mut self, now: Instant) -> Result<MoveOutcome, RoofError> {
        self.move_roof(MotionDirection::Closing, MotionPurpose::Park, now)
    }

    pub fn unpark(&mut self, now: Instant) -> Result<MoveOutcome, RoofError> {
        self.move_roof(MotionDirection::Opening, MotionPurpose::Unpark, now)
    }

    /// Start travel. An incomplete pin map fails before any pin access.
    pub fn move_roof(
        &mut self,
        direction: MotionDirection,
        purpose: MotionPurpose,
        now: Instant,
    ) -> Result<MoveOutcome, RoofError> {
        if let Err(e) = self.registry.validate_required() {
            error!("Roof {purpose} refused: {e}");
            return Err(e.into());
        }
        if !self.port.is_connected() {
            return Err(RoofError::NotConnected);
        }

        self.refresh_status();
        let readings = self.last.readings;
        let mount_locking = self.mount.mount_locking();
        let timeout = self.config.roof.motion_timeout();

        let registry = &self.registry;
        let port = &mut self.port;
        let result = self.motion.request(
            direction,
            purpose,
            &readings,
            mount_locking,
            timeout,
            now,
            |relay| RoofActuator::new(registry, port).actuate(relay, true, false),
        );

        self.rederive();
        result
    }

    /// Stop travel by firing the abort relay. Ignores the lock switch.
    pub fn abort(&mut self) -> Result<AbortOutcome, RoofError> {
        if !self.port.is_connected() {
            return Err(RoofError::NotConnected);
        }
        self.refresh_status();

        let registry = &self.registry;
        let port = &mut self.port;
        let result = self.motion.abort(|| {
            RoofActuator::new(registry, port).actuate(RoofOutput::Abort, true, true)
        });

        if let Ok(AbortOutcome::NotMoving) = result {
            let r = &self.last.readings;
            let position = if r.closed {
                "closed"
            } else if r.opened {
                "open"
            } else {
                "partially open"
            };
            warn!("Roof appears to be {position} and stationary, no action taken on abort request");
        }

        self.refresh_status();
        self.motion.sync_park_status(&self.last.readings);
        self.publish_if_changed();
        result
    }

    // ── Lock / auxiliary ──

    /// Drive the lock relay. Repeating the current request is a no-op.
    pub fn set_lock(&mut self, on: bool) -> Result<Actuation, RoofError> {
        if self.lock_requested == Some(on) {
            info!("Roof lock is already {}", on_off(on));
            return Ok(Actuation::Skipped);
        }
        let actuation = self.switch_output(RoofOutput::Lock, on)?;
        self.lock_requested = Some(on);
        Ok(actuation)
    }

    /// Drive the auxiliary relay. Repeating the current request is a no-op.
    pub fn set_aux(&mut self, on: bool) -> Result<Actuation, RoofError> {
        if self.aux_requested == Some(on) {
            info!("Roof auxiliary is already {}", on_off(on));
            return Ok(Actuation::Skipped);
        }
        let actuation = self.switch_output(RoofOutput::Aux, on)?;
        self.aux_requested = Some(on);
        Ok(actuation)
    }

    fn switch_output(&mut self, output: RoofOutput, on: bool) -> Result<Actuation, RoofError> {
        if !self.port.is_connected() {
            return Err(RoofError::NotConnected);
        }
        let actuation = RoofActuator::new(&self.registry, &mut self.port).actuate(output, on, true)?;
        info!("Roof {output} set {}", on_off(on));
        self.refresh_status();
        Ok(actuation)
    }

    // ── Polling ──

    /// One poll tick: rebuild an exhausted session, refresh status, advance
    /// the motion state machine.
    pub fn poll(&mut self, now: Instant) -> Result<PollReport, RoofError> {
        let mut reconnected = false;
        if self.port.exhausted() {
            let e = RoofError::CommunicationExhausted {
                errors: self.port.consecutive_errors(),
            };
            error!("{e}");
            self.reconnect()?;
            reconnected = true;
        } else if !self.port.is_connected() {
            self.connect()?;
            reconnected = true;
        }

        self.refresh_status();
        let outcome = self.motion.tick(&self.last.readings, now);
        if matches!(
            outcome,
            TickOutcome::Completed(_) | TickOutcome::TimedOut(_)
        ) {
            self.rederive();
        }
        Ok(PollReport {
            outcome,
            reconnected,
        })
    }

    /// Read every switch and recompute the snapshot.
    pub fn refresh_status(&mut self) -> &StatusSnapshot {
        self.refresh_switches();
        &self.last
    }

    /// Returns whether both limit switches answered.
    fn refresh_switches(&mut self) -> bool {
        let (readings, limits_read) = if self.port.is_connected() {
            SensorReader::new(&self.registry, &mut self.port).read_all_checked()
        } else {
            (self.last.readings, false)
        };
        self.apply_readings(readings);
        limits_read
    }

    /// Recompute the snapshot from the last readings after a motion change.
    fn rederive(&mut self) {
        let readings = self.last.readings;
        self.apply_readings(readings);
    }

    fn apply_readings(&mut self, readings: SensorReadings) {
        self.last = self.aggregator.update(
            &readings,
            self.motion.direction(),
            self.motion.timed_out(),
        );
        self.publish_if_changed();
    }

    fn publish_if_changed(&mut self) {
        let key = (self.last.lights, self.motion.park_status());
        if self.published != Some(key) {
            self.publisher.publish(&self.last, key.1);
            self.published = Some(key);
        }
        self.persist_park();
    }

    fn persist_park(&mut self) {
        let park = self.motion.park_status();
        if park == ParkStatus::Unknown || self.saved_park == Some(park) {
            return;
        }
        let Some(store) = &self.park_store else {
            return;
        };
        match store.save(park) {
            Ok(()) => self.saved_park = Some(park),
            Err(e) => warn!("Unable to save park position: {e}"),
        }
    }

    // ── Configuration ──

    /// Replace the slot configuration. Refused while the roof moves.
    pub fn apply_io_config(&mut self, io: IoConfig) -> Result<(), RoofError> {
        if self.motion.is_moving() {
            return Err(RoofError::InvalidSetting(
                "pin map cannot change while the roof is moving".to_string(),
            ));
        }
        let registry = PinRegistry::configure(&io)?;
        self.config.io = io;
        self.install_registry(registry)
    }

    /// Replace output slot `index` (0-based).
    pub fn update_output_slot(&mut self, index: usize, slot: OutputSlot) -> Result<(), RoofError> {
        let mut io = self.config.io.clone();
        io.set_output(index, slot)?;
        self.apply_io_config(io)
    }

    /// Replace input slot `index` (0-based).
    pub fn update_input_slot(&mut self, index: usize, slot: InputSlot) -> Result<(), RoofError> {
        let mut io = self.config.io.clone();
        io.set_input(index, slot)?;
        self.apply_io_config(io)
    }

    /// Takes effect from the next motion request.
    pub fn set_motion_timeout(&mut self, seconds: u32) -> Result<(), RoofError> {
        if !MOTION_TIMEOUT_RANGE_S.contains(&seconds) {
            return Err(RoofError::InvalidSetting(format!(
                "motion timeout {seconds}s outside {}..={}",
                MOTION_TIMEOUT_RANGE_S.start(),
                MOTION_TIMEOUT_RANGE_S.end()
            )));
        }
        self.config.roof.motion_timeout_s = seconds;
        info!(timeout_s = seconds, "Roof motion timeout updated");
        Ok(())
    }

    /// Write the current configuration to the configured path.
    pub fn save_config(&self) -> Result<&Path, RoofError> {
        let path = self.require_path()?;
        self.config.save(path)?;
        info!("Configuration saved to {}", path.display());
        Ok(path)
    }

    /// Load the configuration file again and apply it.
    pub fn reload_config(&mut self) -> Result<(), RoofError> {
        if self.motion.is_moving() {
            return Err(RoofError::InvalidSetting(
                "configuration cannot be reloaded while the roof is moving".to_string(),
            ));
        }
        let path = self.require_path()?;
        let config = RoofConfig::load_validated(path)?;
        let registry = PinRegistry::configure(&config.io)?;
        info!("Configuration reloaded from {}", path.display());
        let park_store = config.roof.park_file.as_deref().map(ParkStore::new);
        if park_store != self.park_store {
            self.park_store = park_store;
            self.saved_park = None;
        }
        self.config = config;
        self.install_registry(registry)
    }

    fn require_path(&self) -> Result<&Path, RoofError> {
        self.config_path
            .as_deref()
            .ok_or_else(|| RoofError::InvalidSetting("no configuration file".to_string()))
    }

    /// Swap in a new registry. A live session is reconfigured so the
    /// backend sees the new pin map, then the pins are set up again.
    fn install_registry(&mut self, registry: PinRegistry) -> Result<(), RoofError> {
        self.registry = registry;
        self.lock_requested = None;
        self.aux_requested = None;
        if self.port.is_connected() {
            self.port.reconfigure(&self.config).map_err(|e| {
                error!(driver = self.port.name(), "GPIO reconfigure failed: {e}");
                RoofError::Connect(e)
            })?;
            self.setup_pins();
            self.refresh_status();
        }
        Ok(())
    }

    // ── Accessors ──

    pub fn status(&self) -> &StatusSnapshot {
        &self.last
    }

    pub fn park_status(&self) -> ParkStatus {
        self.motion.park_status()
    }

    /// Disagreement between the saved park position and the switches found
    /// at the last connect.
    pub fn park_mismatch(&self) -> Option<ParkMismatch> {
        self.park_mismatch
    }

    pub fn motion(&self) -> &MotionStateMachine {
        &self.motion
    }

    #[inline]
    pub fn is_moving(&self) -> bool {
        self.motion.is_moving()
    }

    pub fn is_connected(&self) -> bool {
        self.port.is_connected()
    }

    pub fn registry(&self) -> &PinRegistry {
        &self.registry
    }

    pub fn config(&self) -> &RoofConfig {
        &self.config
    }

    pub fn driver_name(&self) -> &'static str {
        self.port.name()
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.port.consecutive_errors()
    }
}

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InterlockReason;
    use crate::status::{LightState, RoofState, StatusAlert};
    use crate::test_support::{MockHandle, RecordingPublisher, full_config, mock_port};
    use ror_common::gpio::Level;
    use ror_common::io::role::{PulseLimit, RoofFunction, RoofInput};
    use std::time::Duration;
    use tempfile::TempDir;

    fn controller_with(config: RoofConfig) -> (RoofController, MockHandle, RecordingPublisher) {
        let (port, handle) = mock_port();
        let publisher = RecordingPublisher::default();
        let controller = RoofController::new(
            config,
            port,
            Box::new(NoMountLock),
            Box::new(publisher.clone()),
        )
        .unwrap();
        (controller, handle, publisher)
    }

    /// Connected controller with the roof closed.
    fn closed_roof() -> (RoofController, MockHandle, RecordingPublisher) {
        let (mut c, handle, publisher) = controller_with(full_config());
        handle.set_limits(false, true);
        c.connect().unwrap();
        handle.clear_writes();
        (c, handle, publisher)
    }

    #[test]
    fn connect_sets_up_pins() {
        let (mut c, handle, _) = controller_with(full_config());
        handle.set_limits(false, true);
        c.connect().unwrap();

        // Outputs at rest: open active-high → low, close active-low → high.
        assert_eq!(handle.mode(17), Some(PinMode::Output));
        assert_eq!(handle.level(17), Some(Level::Low));
        assert_eq!(handle.level(18), Some(Level::High));
        assert_eq!(handle.level(5), Some(Level::High));
        assert_eq!(handle.pull(17), Some(Pull::Off));

        // Inputs pulled toward inactive.
        assert_eq!(handle.mode(22), Some(PinMode::Input));
        assert_eq!(handle.pull(22), Some(Pull::Up));
        assert_eq!(handle.pull(24), Some(Pull::Down));

        assert_eq!(c.park_status(), ParkStatus::Parked);
        assert_eq!(c.status().roof_state(), RoofState::Parked);
    }

    #[test]
    fn failed_connect_reported() {
        let (mut c, handle, _) = controller_with(full_config());
        handle.fail_connect(true);
        assert!(matches!(c.connect(), Err(RoofError::Connect(_))));
        assert!(matches!(
            c.open(Instant::now()),
            Err(RoofError::NotConnected)
        ));
    }

    /// Config with one required function unmapped.
    fn without(function: RoofFunction) -> RoofConfig {
        let mut config = full_config();
        match function {
            RoofFunction::Output(out) => config
                .io
                .outputs
                .iter_mut()
                .filter(|s| s.function == Some(out))
                .for_each(|s| s.function = None),
            RoofFunction::Input(input) => config
                .io
                .inputs
                .iter_mut()
                .filter(|s| s.function == Some(input))
                .for_each(|s| s.function = None),
        }
        config
    }

    #[test]
    fn incomplete_map_refuses_motion_without_pin_access() {
        for function in RoofFunction::REQUIRED {
            let (mut c, handle, _) = controller_with(without(function));
            c.connect().unwrap();
            handle.clear_writes();
            handle.fail_reads(true);

            for result in [c.open(Instant::now()), c.close(Instant::now())] {
                match result {
                    Err(RoofError::ConfigurationIncomplete { missing }) => {
                        assert_eq!(missing, vec![function], "{function} unmapped");
                    }
                    other => panic!("{function} unmapped: expected refusal, got {other:?}"),
                }
            }
            assert!(handle.writes().is_empty(), "{function} unmapped: pin written");
            assert_eq!(c.consecutive_errors(), 0);
            assert!(!c.is_moving());
        }
    }

    #[test]
    fn open_pulses_relay_and_completes() {
        let (mut c, handle, publisher) = closed_roof();
        let t0 = Instant::now();

        assert_eq!(c.open(t0).unwrap(), MoveOutcome::Started);
        assert_eq!(handle.writes_to(RoofOutput::Open), vec![Level::High, Level::Low]);
        assert_eq!(handle.holds(), vec![Duration::from_millis(250)]);
        assert!(c.is_moving());
        assert_eq!(c.status().lights.moving, LightState::Busy);

        handle.set_limits(false, false);
        let report = c.poll(t0 + Duration::from_secs(2)).unwrap();
        assert!(matches!(report.outcome, TickOutcome::Moving { .. }));
        assert_eq!(c.status().lights.opened, LightState::Busy);

        handle.set_limits(true, false);
        let report = c.poll(t0 + Duration::from_secs(5)).unwrap();
        assert_eq!(
            report.outcome,
            TickOutcome::Completed(MotionDirection::Opening)
        );
        assert_eq!(c.park_status(), ParkStatus::Unparked);
        assert_eq!(c.status().roof_state(), RoofState::Unparked);
        let (snapshot, park) = publisher.last().unwrap();
        assert_eq!(park, ParkStatus::Unparked);
        assert_eq!(snapshot.lights.opened, LightState::Ok);
    }

    #[test]
    fn close_uses_active_low_relay() {
        let (mut c, handle, _) = controller_with(full_config());
        handle.set_limits(true, false);
        c.connect().unwrap();
        handle.clear_writes();

        assert_eq!(c.park(Instant::now()).unwrap(), MoveOutcome::Started);
        assert_eq!(handle.writes_to(RoofOutput::Close), vec![Level::Low, Level::High]);
        assert_eq!(handle.holds(), vec![PulseLimit::Ms500.duration().unwrap()]);
    }

    #[test]
    fn open_while_closing_is_already_in_progress() {
        let (mut c, handle, _) = controller_with(full_config());
        handle.set_limits(true, false);
        c.connect().unwrap();
        let t0 = Instant::now();
        c.close(t0).unwrap();
        handle.clear_writes();

        assert_eq!(c.open(t0).unwrap(), MoveOutcome::AlreadyInProgress);
        assert!(handle.writes().is_empty());
        assert_eq!(c.motion().direction(), Some(MotionDirection::Closing));
    }

    #[test]
    fn already_closed_refused() {
        let (mut c, handle, _) = closed_roof();
        assert!(matches!(
            c.close(Instant::now()),
            Err(RoofError::AlreadyInPosition(MotionDirection::Closing))
        ));
        assert!(handle.writes().is_empty());
        assert_eq!(c.park_status(), ParkStatus::Parked);
    }

    #[test]
    fn timeout_recorded_in_next_snapshot() {
        let (mut c, handle, _) = closed_roof();
        let t0 = Instant::now();
        c.open(t0).unwrap();
        handle.set_limits(false, false);

        let report = c.poll(t0 + Duration::from_secs(10)).unwrap();
        assert_eq!(report.outcome, TickOutcome::TimedOut(MotionDirection::Opening));
        assert!(!c.is_moving());
        let status = c.status();
        assert!(status.alerts.contains(StatusAlert::TIMEOUT_OPEN));
        assert_eq!(status.lights.opened, LightState::Alert);
        assert_eq!(status.lights.overall, LightState::Alert);

        let report = c.poll(t0 + Duration::from_secs(11)).unwrap();
        assert_eq!(report.outcome, TickOutcome::Idle);
        assert!(c.status().alerts.contains(StatusAlert::TIMEOUT_OPEN));
    }

    #[test]
    fn abort_during_opening() {
        let (mut c, handle, _) = closed_roof();
        let t0 = Instant::now();
        c.open(t0).unwrap();
        handle.set_limits(false, false);
        c.poll(t0 + Duration::from_secs(1)).unwrap();
        handle.clear_writes();

        let outcome = c.abort().unwrap();
        assert!(matches!(outcome, AbortOutcome::Stopped(s) if s.cancelled));
        assert_eq!(handle.writes_to(RoofOutput::Abort), vec![Level::High, Level::Low]);
        assert_eq!(handle.writes().len(), 2);
        assert!(!c.is_moving());
        assert_eq!(c.status().roof_state(), RoofState::Indeterminate);
        assert_eq!(c.park_status(), ParkStatus::Unknown);

        // Abort while stationary fires nothing.
        handle.clear_writes();
        assert_eq!(c.abort().unwrap(), AbortOutcome::NotMoving);
        assert!(handle.writes().is_empty());
    }

    #[test]
    fn abort_ignores_lock() {
        let (mut c, handle, _) = closed_roof();
        c.open(Instant::now()).unwrap();
        handle.set_sensor(RoofInput::Locked, true);
        handle.clear_writes();

        assert!(matches!(c.abort().unwrap(), AbortOutcome::Stopped(_)));
        assert_eq!(handle.writes_to(RoofOutput::Abort).len(), 2);
    }

    #[test]
    fn lock_switch_refuses_motion() {
        let (mut c, handle, _) = closed_roof();
        handle.set_sensor(RoofInput::Locked, true);

        assert!(matches!(
            c.open(Instant::now()),
            Err(RoofError::Interlocked(InterlockReason::RoofLocked))
        ));
        assert!(handle.writes().is_empty());
        assert_eq!(c.status().roof_state(), RoofState::Locked);
        assert_eq!(c.status().lights.locked, LightState::Alert);
    }

    #[test]
    fn mount_policy_blocks_close() {
        let (port, handle) = mock_port();
        let mount = Arc::new(AtomicBool::new(true));
        let mut c = RoofController::new(
            full_config(),
            port,
            Box::new(Arc::clone(&mount)),
            Box::new(RecordingPublisher::default()),
        )
        .unwrap();
        handle.set_limits(true, false);
        c.connect().unwrap();
        handle.clear_writes();

        assert!(matches!(
            c.close(Instant::now()),
            Err(RoofError::Interlocked(InterlockReason::MountLocking))
        ));
        assert!(handle.writes().is_empty());

        mount.store(false, Ordering::Release);
        assert_eq!(c.close(Instant::now()).unwrap(), MoveOutcome::Started);
    }

    #[test]
    fn lock_and_aux_toggles() {
        let (mut c, handle, _) = closed_roof();

        // Lock relay is active-low and held.
        assert_eq!(c.set_lock(true).unwrap(), Actuation::Held);
        assert_eq!(handle.writes_to(RoofOutput::Lock), vec![Level::Low]);
        assert_eq!(c.set_lock(true).unwrap(), Actuation::Skipped);
        assert_eq!(handle.writes_to(RoofOutput::Lock).len(), 1);
        c.set_lock(false).unwrap();
        assert_eq!(handle.level(5), Some(Level::High));

        handle.set_sensor(RoofInput::Aux, true);
        c.set_aux(true).unwrap();
        assert_eq!(handle.level(6), Some(Level::High));
        assert_eq!(c.status().lights.auxiliary, LightState::Ok);
    }

    #[test]
    fn lock_toggle_works_while_locked() {
        let (mut c, handle, _) = closed_roof();
        handle.set_sensor(RoofInput::Locked, true);
        assert_eq!(c.set_lock(false).unwrap(), Actuation::Held);
    }

    #[test]
    fn publishes_only_on_change() {
        let (mut c, handle, publisher) = closed_roof();
        let after_connect = publisher.count();
        assert!(after_connect >= 1);

        c.refresh_status();
        c.poll(Instant::now()).unwrap();
        assert_eq!(publisher.count(), after_connect);

        handle.set_sensor(RoofInput::Aux, true);
        c.refresh_status();
        assert_eq!(publisher.count(), after_connect + 1);
    }

    #[test]
    fn exhausted_session_reconnects() {
        let (mut c, handle, _) = closed_roof();
        handle.fail_reads(true);
        let t0 = Instant::now();

        for i in 0..3 {
            let report = c.poll(t0 + Duration::from_secs(i)).unwrap();
            assert!(!report.reconnected);
        }
        assert!(c.consecutive_errors() > ror_common::consts::MAX_COMM_ERRORS);

        handle.fail_reads(false);
        let report = c.poll(t0 + Duration::from_secs(4)).unwrap();
        assert!(report.reconnected);
        assert_eq!(handle.connects(), 2);
        assert_eq!(handle.disconnects(), 1);
        assert_eq!(c.consecutive_errors(), 0);
        assert_eq!(c.status().roof_state(), RoofState::Parked);
    }

    #[test]
    fn reconnect_drops_session() {
        let (mut c, _handle, _) = closed_roof();
        c.open(Instant::now()).unwrap();
        c.reconnect().unwrap();
        assert!(!c.is_moving());
    }

    #[test]
    fn slot_update_rebuilds_registry() {
        let (mut c, handle, _) = closed_roof();
        c.update_output_slot(
            0,
            OutputSlot::new(RoofOutput::Open, 12, ActiveLevel::High, PulseLimit::Ms100),
        )
        .unwrap();
        assert_eq!(c.registry().output(RoofOutput::Open).unwrap().pin, 12);
        assert_eq!(handle.mode(12), Some(PinMode::Output));
        // The live port was told about the new map.
        assert_eq!(handle.connects(), 2);

        // Pin 18 already belongs to close.
        let err = c
            .update_output_slot(
                0,
                OutputSlot::new(RoofOutput::Open, 18, ActiveLevel::High, PulseLimit::Ms100),
            )
            .unwrap_err();
        assert!(matches!(err, RoofError::InvalidPinMap(_)));
        assert_eq!(c.registry().output(RoofOutput::Open).unwrap().pin, 12);

        assert!(matches!(
            c.update_input_slot(9, InputSlot::default()),
            Err(RoofError::Slot(_))
        ));
    }

    #[test]
    fn config_change_refused_while_moving() {
        let (mut c, _handle, _) = closed_roof();
        c.open(Instant::now()).unwrap();
        assert!(matches!(
            c.apply_io_config(IoConfig::default()),
            Err(RoofError::InvalidSetting(_))
        ));
    }

    #[test]
    fn motion_timeout_range() {
        let (mut c, _handle, _) = closed_roof();
        assert!(c.set_motion_timeout(0).is_err());
        assert!(c.set_motion_timeout(301).is_err());
        c.set_motion_timeout(60).unwrap();
        assert_eq!(c.config().roof.motion_timeout_s, 60);
    }

    #[test]
    fn save_then_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("roof.toml");
        let (c, _handle, _) = closed_roof();
        let mut c = c.with_config_path(&path);

        c.set_motion_timeout(42).unwrap();
        c.update_input_slot(3, InputSlot::default()).unwrap();
        let registry = c.registry().clone();
        c.save_config().unwrap();

        c.set_motion_timeout(5).unwrap();
        c.reload_config().unwrap();
        assert_eq!(c.config().roof.motion_timeout_s, 42);
        assert_eq!(c.registry(), &registry);
        assert!(c.registry().input(RoofInput::Aux).is_none());
    }

    fn with_park_file(dir: &TempDir) -> RoofConfig {
        let mut config = full_config();
        config.roof.park_file = Some(dir.path().join("park.toml"));
        config
    }

    #[test]
    fn saved_park_stands_in_for_unreadable_switches() {
        let dir = TempDir::new().unwrap();
        let config = with_park_file(&dir);
        ParkStore::new(dir.path().join("park.toml"))
            .save(ParkStatus::Unparked)
            .unwrap();

        let (mut c, handle, _) = controller_with(config);
        handle.fail_reads(true);
        c.connect().unwrap();
        assert_eq!(c.park_status(), ParkStatus::Unparked);
        assert_eq!(c.park_mismatch(), None);
    }

    #[test]
    fn park_position_saved_and_checked_on_connect() {
        let dir = TempDir::new().unwrap();
        let store = ParkStore::new(dir.path().join("park.toml"));
        let (mut c, handle, _) = controller_with(with_park_file(&dir));
        handle.set_limits(false, true);
        c.connect().unwrap();
        assert_eq!(store.load().unwrap(), Some(ParkStatus::Parked));
        assert_eq!(c.park_mismatch(), None);

        // Roof opened by hand while the session was down.
        handle.set_limits(true, false);
        c.reconnect().unwrap();
        assert_eq!(c.park_mismatch(), Some(ParkMismatch::ParkedButOpened));
        assert_eq!(c.park_status(), ParkStatus::Unparked);
        assert_eq!(store.load().unwrap(), Some(ParkStatus::Unparked));
    }

    #[test]
    fn completed_park_is_saved() {
        let dir = TempDir::new().unwrap();
        let store = ParkStore::new(dir.path().join("park.toml"));
        let (mut c, handle, _) = controller_with(with_park_file(&dir));
        handle.set_limits(true, false);
        c.connect().unwrap();
        assert_eq!(store.load().unwrap(), Some(ParkStatus::Unparked));

        let t0 = Instant::now();
        c.park(t0).unwrap();
        handle.set_limits(false, true);
        c.poll(t0 + Duration::from_secs(3)).unwrap();
        assert_eq!(store.load().unwrap(), Some(ParkStatus::Parked));
    }

    #[test]
    fn save_without_path_fails() {
        let (c, _handle, _) = closed_roof();
        assert!(matches!(c.save_config(), Err(RoofError::InvalidSetting(_))));
    }
}
