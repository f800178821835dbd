//! Relay actuation: held and pulsed output writes.
//!
//! A pulse blocks the calling thread for its full width (at most 750 ms)
//! through `GpioSession::hold`. Pulses on one pin never overlap because
//! the controller is single-threaded; a parallel poll loop would need a
//! per-pin lock here.

use ror_common::io::registry::PinRegistry;
use ror_common::io::role::{RoofInput, RoofOutput};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{InterlockReason, RoofError};
use crate::port::GpioSession;
use crate::sensors::SensorReader;

/// What an actuation did to the pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actuation {
    /// Asserted for the width, then returned to rest.
    Pulsed(Duration),
    /// Left at the commanded level.
    Held,
    /// Optional output not configured; nothing written.
    Skipped,
}

/// Writes output functions through the registry and port.
pub struct RoofActuator<'a> {
    registry: &'a PinRegistry,
    port: &'a mut GpioSession,
}

impl<'a> RoofActuator<'a> {
    pub fn new(registry: &'a PinRegistry, port: &'a mut GpioSession) -> Self {
        Self { registry, port }
    }

    /// Switch `output` on or off.
    ///
    /// Unless `ignore_lock` is set, the locked switch is read first and the
    /// call fails if it is active or unreadable. Unmapped open/close fail;
    /// other unmapped outputs are skipped.
    pub fn actuate(
        &mut self,
        output: RoofOutput,
        turn_on: bool,
        ignore_lock: bool,
    ) -> Result<Actuation, RoofError> {
        if !ignore_lock {
            self.check_lock()?;
        }

        let Some(def) = self.registry.output(output) else {
            if output.is_required() {
                warn!("A GPIO pin definition for {output} was not found");
                return Err(RoofError::NotMapped(output.into()));
            }
            debug!("{output} relay not configured, skipping");
            return Ok(Actuation::Skipped);
        };

        let level = def.active.physical(turn_on);
        self.port.write(def.pin, level).map_err(|e| {
            warn!(pin = def.pin, "GPIO write failed for {output}: {e}");
            RoofError::pin(output, e)
        })?;

        let Some(width) = def.pulse_duration() else {
            debug!(pin = def.pin, %level, "{output} relay held");
            return Ok(Actuation::Held);
        };

        self.port.hold(width);
        self.port.write(def.pin, !level).map_err(|e| {
            warn!(pin = def.pin, "GPIO write to release {output} failed: {e}");
            RoofError::pin(output, e)
        })?;
        debug!(pin = def.pin, width_ms = width.as_millis() as u64, "{output} relay pulsed");
        Ok(Actuation::Pulsed(width))
    }

    fn check_lock(&mut self) -> Result<(), RoofError> {
        let locked = SensorReader::new(self.registry, self.port)
            .read(RoofInput::Locked)
            .map_err(|e| {
                warn!("Unable to read roof lock state: {e}");
                RoofError::Interlocked(InterlockReason::LockUnreadable)
            })?;
        if locked {
            warn!("Roof external lock state prevents roof movement");
            return Err(RoofError::Interlocked(InterlockReason::RoofLocked));
        }
        Ok(())
    }
}
