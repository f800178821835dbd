//! Switch reading with polarity applied.

use ror_common::io::registry::PinRegistry;
use ror_common::io::role::RoofInput;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::RoofError;
use crate::port::GpioSession;

/// Logical state of the four roof switches for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SensorReadings {
    pub opened: bool,
    pub closed: bool,
    pub locked: bool,
    pub aux: bool,
}

/// Reads input functions through the registry and port.
pub struct SensorReader<'a> {
    registry: &'a PinRegistry,
    port: &'a mut GpioSession,
}

impl<'a> SensorReader<'a> {
    pub fn new(registry: &'a PinRegistry, port: &'a mut GpioSession) -> Self {
        Self { registry, port }
    }

    /// Read one switch. `true` means the switch is at its active level.
    ///
    /// Unmapped opened/closed switches are an error; unmapped locked/aux
    /// switches read as `false`.
    pub fn read(&mut self, input: RoofInput) -> Result<bool, RoofError> {
        let Some(def) = self.registry.input(input) else {
            return if input.is_required() {
                Err(RoofError::NotMapped(input.into()))
            } else {
                Ok(false)
            };
        };
        let level = self
            .port
            .read(def.pin)
            .map_err(|e| RoofError::pin(input, e))?;
        Ok(def.active.is_active(level))
    }

    /// Read all four switches. A failed read counts as inactive for this tick.
    pub fn read_all(&mut self) -> SensorReadings {
        self.read_all_checked().0
    }

    /// Like [`read_all`](Self::read_all), also telling whether both limit
    /// switches answered.
    pub fn read_all_checked(&mut self) -> (SensorReadings, bool) {
        let mut limits_read = true;
        let mut get = |input: RoofInput| match self.read(input) {
            Ok(state) => state,
            Err(e) => {
                if input.is_required() {
                    limits_read = false;
                }
                match e {
                    RoofError::NotMapped(_) => debug!("{e}"),
                    _ => warn!("Unable to read {input} switch: {e}"),
                }
                false
            }
        };
        let readings = SensorReadings {
            opened: get(RoofInput::Opened),
            closed: get(RoofInput::Closed),
            locked: get(RoofInput::Locked),
            aux: get(RoofInput::Aux),
        };
        (readings, limits_read)
    }
}
