//! Simulation driver implementation.
//!
//! Implements `GpioPort` without hardware. Output writes are decoded through
//! the configured pin map into relay actions on a [`SimulatedRoof`]; input
//! reads encode the roof's limit switches back through each pin's active
//! level. Lock and aux relays are looped back to their sensors.

use ror_common::config::RoofConfig;
use ror_common::gpio::{GpioError, GpioPort, Level, PinMode, Pull};
use ror_common::io::role::{ActiveLevel, PulseLimit, RoofInput, RoofOutput};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

use super::roof::{SimulatedRoof, Travel};

#[derive(Debug, Clone, Copy)]
struct SimOutput {
    function: RoofOutput,
    active: ActiveLevel,
    held: bool,
    on: bool,
}

#[derive(Debug, Clone, Copy)]
struct SimInput {
    function: RoofInput,
    active: ActiveLevel,
}

/// Software roof controller with simulated limit switches.
pub struct SimulationDriver {
    connected: bool,
    roof: Option<SimulatedRoof>,
    outputs: HashMap<u8, SimOutput>,
    inputs: HashMap<u8, SimInput>,
    /// Levels of pins without a mapped function.
    raw: HashMap<u8, Level>,
    modes: HashMap<u8, PinMode>,
    locked: bool,
    aux: bool,
}

impl SimulationDriver {
    /// Create a disconnected driver.
    pub fn new() -> Self {
        Self {
            connected: false,
            roof: None,
            outputs: HashMap::new(),
            inputs: HashMap::new(),
            raw: HashMap::new(),
            modes: HashMap::new(),
            locked: false,
            aux: false,
        }
    }

    /// Current roof position (0.0 closed, 1.0 opened), `None` before connect.
    pub fn roof_position(&self) -> Option<f64> {
        self.roof.as_ref().map(SimulatedRoof::position)
    }

    /// Decode the pin map from `config`.
    fn load_pin_map(&mut self, config: &RoofConfig) {
        self.outputs = config
            .io
            .outputs
            .iter()
            .filter_map(|s| {
                s.function.map(|function| {
                    (
                        s.pin,
                        SimOutput {
                            function,
                            active: s.active,
                            held: s.limit == PulseLimit::Held,
                            on: false,
                        },
                    )
                })
            })
            .collect();
        self.inputs = config
            .io
            .inputs
            .iter()
            .filter_map(|s| {
                s.function.map(|function| {
                    (
                        s.pin,
                        SimInput {
                            function,
                            active: s.active,
                        },
                    )
                })
            })
            .collect();
    }

    fn connect_at(&mut self, config: &RoofConfig, now: Instant) {
        self.load_pin_map(config);
        let sim = &config.simulation;
        self.roof = Some(SimulatedRoof::new(
            Duration::from_millis(sim.travel_time_ms),
            sim.initial_position,
            now,
        ));
        self.raw.clear();
        self.modes.clear();
        self.locked = false;
        self.aux = false;
        self.connected = true;

        info!(
            outputs = self.outputs.len(),
            inputs = self.inputs.len(),
            travel_ms = sim.travel_time_ms,
            initial = ?sim.initial_position,
            "Simulation driver connected"
        );
    }

    /// Pick up a new pin map and travel time without moving the roof.
    fn reconfigure_at(&mut self, config: &RoofConfig, now: Instant) {
        if !self.connected {
            self.connect_at(config, now);
            return;
        }
        self.load_pin_map(config);
        let travel_ms = config.simulation.travel_time_ms;
        if let Some(roof) = self.roof.as_mut() {
            roof.set_travel_time(Duration::from_millis(travel_ms), now);
        }
        info!(
            outputs = self.outputs.len(),
            inputs = self.inputs.len(),
            travel_ms,
            "Simulation driver reconfigured"
        );
    }

    fn ensure_connected(&self) -> Result<(), GpioError> {
        if self.connected {
            Ok(())
        } else {
            Err(GpioError::NotConnected)
        }
    }

    fn write_at(&mut self, pin: u8, level: Level, now: Instant) -> Result<(), GpioError> {
        self.ensure_connected()?;
        trace!(pin, %level, "sim write");

        let Some(out) = self.outputs.get_mut(&pin) else {
            self.raw.insert(pin, level);
            return Ok(());
        };

        let on = out.active.is_active(level);
        let rising = on && !out.on;
        out.on = on;
        let SimOutput { function, held, .. } = *out;

        match function {
            RoofOutput::Open | RoofOutput::Close if rising => {
                if self.locked {
                    debug!(%function, "relay ignored, roof locked");
                    return Ok(());
                }
                let travel = if function == RoofOutput::Open {
                    Travel::Opening
                } else {
                    Travel::Closing
                };
                if let Some(roof) = self.roof.as_mut() {
                    roof.start(travel, now);
                }
            }
            RoofOutput::Abort if rising => {
                if let Some(roof) = self.roof.as_mut() {
                    roof.stop(now);
                }
            }
            RoofOutput::Lock => {
                if held {
                    self.locked = on;
                } else if rising {
                    self.locked = !self.locked;
                }
                if self.locked {
                    if let Some(roof) = self.roof.as_mut() {
                        roof.stop(now);
                    }
                }
            }
            RoofOutput::Aux => {
                if held {
                    self.aux = on;
                } else if rising {
                    self.aux = !self.aux;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn read_at(&mut self, pin: u8, now: Instant) -> Result<Level, GpioError> {
        self.ensure_connected()?;

        let Some(input) = self.inputs.get(&pin).copied() else {
            return Ok(self.raw.get(&pin).copied().unwrap_or(Level::Low));
        };

        let roof = self.roof.as_mut().ok_or(GpioError::NotConnected)?;
        roof.advance(now);
        let state = match input.function {
            RoofInput::Opened => roof.is_opened(),
            RoofInput::Closed => roof.is_closed(),
            RoofInput::Locked => self.locked,
            RoofInput::Aux => self.aux,
        };
        Ok(input.active.physical(state))
    }
}

impl Default for SimulationDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl GpioPort for SimulationDriver {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn connect(&mut self, config: &RoofConfig) -> Result<(), GpioError> {
        self.connect_at(config, Instant::now());
        Ok(())
    }

    fn reconfigure(&mut self, config: &RoofConfig) -> Result<(), GpioError> {
        self.reconfigure_at(config, Instant::now());
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), GpioError> {
        if self.connected {
            info!("Simulation driver disconnected");
        }
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn set_mode(&mut self, pin: u8, mode: PinMode) -> Result<(), GpioError> {
        self.ensure_connected()?;
        self.modes.insert(pin, mode);
        Ok(())
    }

    fn set_pull(&mut self, pin: u8, pull: Pull) -> Result<(), GpioError> {
        self.ensure_connected()?;
        trace!(pin, ?pull, "sim pull");
        Ok(())
    }

    fn read(&mut self, pin: u8) -> Result<Level, GpioError> {
        self.read_at(pin, Instant::now())
    }

    fn write(&mut self, pin: u8, level: Level) -> Result<(), GpioError> {
        self.write_at(pin, level, Instant::now())
    }
}
