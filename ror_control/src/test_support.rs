//! Test doubles: recording GPIO port, recording publisher, full pin map.

use parking_lot::Mutex;
use ror_common::config::RoofConfig;
use ror_common::gpio::{GpioError, GpioPort, Level, PinMode, Pull};
use ror_common::io::registry::PinRegistry;
use ror_common::io::role::{RoofInput, RoofOutput};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::publisher::StatusPublisher;
use crate::state::motion::ParkStatus;
use crate::status::StatusSnapshot;

/// Every function mapped; mixed polarity and pulse widths.
pub fn full_config() -> RoofConfig {
    RoofConfig::from_toml(
        r#"
[roof]
motion_timeout_s = 10

[[io.outputs]]
function = "open"
pin = 17
active = "high"
limit = "250ms"

[[io.outputs]]
function = "close"
pin = 18
active = "low"
limit = "500ms"

[[io.outputs]]
function = "abort"
pin = 27
active = "high"
limit = "100ms"

[[io.outputs]]
function = "lock"
pin = 5
active = "low"
limit = "held"

[[io.outputs]]
function = "aux"
pin = 6
active = "high"
limit = "held"

[[io.inputs]]
function = "opened"
pin = 22
active = "low"

[[io.inputs]]
function = "closed"
pin = 23
active = "low"

[[io.inputs]]
function = "locked"
pin = 24
active = "high"

[[io.inputs]]
function = "aux"
pin = 25
active = "high"
"#,
    )
    .unwrap()
}

pub fn full_registry() -> PinRegistry {
    PinRegistry::configure(&full_config().io).unwrap()
}

#[derive(Debug, Default)]
pub struct MockState {
    pub connected: bool,
    pub connects: u32,
    pub disconnects: u32,
    pub fail_connect: bool,
    pub fail_reads: bool,
    pub fail_writes: bool,
    pub levels: HashMap<u8, Level>,
    pub writes: Vec<(u8, Level)>,
    pub holds: Vec<Duration>,
    pub modes: HashMap<u8, PinMode>,
    pub pulls: HashMap<u8, Pull>,
}

/// Port whose state is shared with a [`MockHandle`].
pub struct MockPort {
    state: Arc<Mutex<MockState>>,
}

/// Test-side view of a [`MockPort`].
#[derive(Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
    registry: PinRegistry,
}

pub fn mock_port() -> (Box<dyn GpioPort>, MockHandle) {
    let state = Arc::new(Mutex::new(MockState::default()));
    let port = MockPort {
        state: Arc::clone(&state),
    };
    let handle = MockHandle {
        state,
        registry: full_registry(),
    };
    for input in RoofInput::ALL {
        handle.set_sensor(input, false);
    }
    (Box::new(port), handle)
}

impl MockHandle {
    /// Drive the pin behind `input` (per [`full_config`]) to its logical state.
    pub fn set_sensor(&self, input: RoofInput, on: bool) {
        let def = *self.registry.input(input).unwrap();
        self.state
            .lock()
            .levels
            .insert(def.pin, def.active.physical(on));
    }

    /// Set both limit switches.
    pub fn set_limits(&self, opened: bool, closed: bool) {
        self.set_sensor(RoofInput::Opened, opened);
        self.set_sensor(RoofInput::Closed, closed);
    }

    pub fn output_pin(&self, output: RoofOutput) -> u8 {
        self.registry.output(output).unwrap().pin
    }

    pub fn writes(&self) -> Vec<(u8, Level)> {
        self.state.lock().writes.clone()
    }

    /// Writes to the pin behind `output`.
    pub fn writes_to(&self, output: RoofOutput) -> Vec<Level> {
        let pin = self.output_pin(output);
        self.writes()
            .into_iter()
            .filter(|(p, _)| *p == pin)
            .map(|(_, l)| l)
            .collect()
    }

    pub fn clear_writes(&self) {
        let mut s = self.state.lock();
        s.writes.clear();
        s.holds.clear();
    }

    pub fn holds(&self) -> Vec<Duration> {
        self.state.lock().holds.clone()
    }

    pub fn level(&self, pin: u8) -> Option<Level> {
        self.state.lock().levels.get(&pin).copied()
    }

    pub fn mode(&self, pin: u8) -> Option<PinMode> {
        self.state.lock().modes.get(&pin).copied()
    }

    pub fn pull(&self, pin: u8) -> Option<Pull> {
        self.state.lock().pulls.get(&pin).copied()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().fail_reads = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    pub fn fail_connect(&self, fail: bool) {
        self.state.lock().fail_connect = fail;
    }

    pub fn connects(&self) -> u32 {
        self.state.lock().connects
    }

    pub fn disconnects(&self) -> u32 {
        self.state.lock().disconnects
    }
}

impl GpioPort for MockPort {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn connect(&mut self, _config: &RoofConfig) -> Result<(), GpioError> {
        let mut s = self.state.lock();
        if s.fail_connect {
            return Err(GpioError::ConnectFailed("mock refused".into()));
        }
        s.connected = true;
        s.connects += 1;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), GpioError> {
        let mut s = self.state.lock();
        s.connected = false;
        s.disconnects += 1;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    fn set_mode(&mut self, pin: u8, mode: PinMode) -> Result<(), GpioError> {
        let mut s = self.state.lock();
        if !s.connected {
            return Err(GpioError::NotConnected);
        }
        s.modes.insert(pin, mode);
        Ok(())
    }

    fn set_pull(&mut self, pin: u8, pull: Pull) -> Result<(), GpioError> {
        let mut s = self.state.lock();
        if !s.connected {
            return Err(GpioError::NotConnected);
        }
        s.pulls.insert(pin, pull);
        Ok(())
    }

    fn read(&mut self, pin: u8) -> Result<Level, GpioError> {
        let s = self.state.lock();
        if !s.connected {
            return Err(GpioError::NotConnected);
        }
        if s.fail_reads {
            return Err(GpioError::Io {
                pin,
                reason: "mock read failure".into(),
            });
        }
        Ok(s.levels.get(&pin).copied().unwrap_or(Level::Low))
    }

    fn write(&mut self, pin: u8, level: Level) -> Result<(), GpioError> {
        let mut s = self.state.lock();
        if !s.connected {
            return Err(GpioError::NotConnected);
        }
        if s.fail_writes {
            return Err(GpioError::Io {
                pin,
                reason: "mock write failure".into(),
            });
        }
        s.levels.insert(pin, level);
        s.writes.push((pin, level));
        Ok(())
    }

    fn hold(&mut self, duration: Duration) {
        self.state.lock().holds.push(duration);
    }
}

/// Publisher that keeps every published snapshot.
#[derive(Clone, Default)]
pub struct RecordingPublisher {
    pub published: Arc<Mutex<Vec<(StatusSnapshot, ParkStatus)>>>,
}

impl RecordingPublisher {
    pub fn count(&self) -> usize {
        self.published.lock().len()
    }

    pub fn last(&self) -> Option<(StatusSnapshot, ParkStatus)> {
        self.published.lock().last().cloned()
    }
}

impl StatusPublisher for RecordingPublisher {
    fn publish(&mut self, snapshot: &StatusSnapshot, park: ParkStatus) {
        self.published.lock().push((snapshot.clone(), park));
    }
}
