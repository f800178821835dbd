//! GPIO session with consecutive-error accounting.
//!
//! Wraps the boxed `GpioPort` so that every pin call feeds one counter.
//! Any success resets it; once it exceeds `MAX_COMM_ERRORS` the session
//! is reported exhausted and the poll loop rebuilds it.

use ror_common::config::RoofConfig;
use ror_common::consts::MAX_COMM_ERRORS;
use ror_common::gpio::{GpioError, GpioPort, Level, PinMode, Pull};
use std::time::Duration;
use tracing::{error, info};

/// Owned GPIO port plus error counter.
pub struct GpioSession {
    port: Box<dyn GpioPort>,
    consecutive_errors: u32,
}

impl GpioSession {
    pub fn new(port: Box<dyn GpioPort>) -> Self {
        Self {
            port,
            consecutive_errors: 0,
        }
    }

    pub fn name(&self) -> &'static str {
        self.port.name()
    }

    /// Open the session. Success clears the error counter.
    pub fn connect(&mut self, config: &RoofConfig) -> Result<(), GpioError> {
        let result = self.port.connect(config);
        if result.is_ok() {
            self.consecutive_errors = 0;
            info!(driver = self.port.name(), "GPIO session established");
        }
        result
    }

    /// Push a changed configuration into the live session.
    pub fn reconfigure(&mut self, config: &RoofConfig) -> Result<(), GpioError> {
        let result = self.port.reconfigure(config);
        if result.is_ok() {
            self.consecutive_errors = 0;
            info!(driver = self.port.name(), "GPIO session reconfigured");
        }
        result
    }

    pub fn disconnect(&mut self) -> Result<(), GpioError> {
        self.port.disconnect()
    }

    pub fn is_connected(&self) -> bool {
        self.port.is_connected()
    }

    pub fn set_mode(&mut self, pin: u8, mode: PinMode) -> Result<(), GpioError> {
        let r = self.port.set_mode(pin, mode);
        self.track(r)
    }

    pub fn set_pull(&mut self, pin: u8, pull: Pull) -> Result<(), GpioError> {
        let r = self.port.set_pull(pin, pull);
        self.track(r)
    }

    pub fn read(&mut self, pin: u8) -> Result<Level, GpioError> {
        let r = self.port.read(pin);
        self.track(r)
    }

    pub fn write(&mut self, pin: u8, level: Level) -> Result<(), GpioError> {
        let r = self.port.write(pin, level);
        self.track(r)
    }

    /// Block for a relay pulse.
    pub fn hold(&mut self, duration: Duration) {
        self.port.hold(duration);
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    /// Counter is past the threshold.
    pub fn exhausted(&self) -> bool {
        self.consecutive_errors > MAX_COMM_ERRORS
    }

    fn track<T>(&mut self, result: Result<T, GpioError>) -> Result<T, GpioError> {
        match &result {
            Ok(_) => self.consecutive_errors = 0,
            Err(e) => {
                self.consecutive_errors = self.consecutive_errors.saturating_add(1);
                if self.consecutive_errors == MAX_COMM_ERRORS + 1 {
                    error!(
                        errors = self.consecutive_errors,
                        "Too many consecutive GPIO errors, last: {e}"
                    );
                }
            }
        }
        result
    }
}
