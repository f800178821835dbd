//! GPIO port trait and error types.
//!
//! This module defines:
//! - `GpioPort` trait - Interface for pluggable GPIO access backends
//! - `GpioError` enum - Error types for pin operations
//! - `PortFactory` type alias - Factory function type
//! - `Level`, `PinMode`, `Pull` - Pin primitives

use crate::config::RoofConfig;
use core::fmt;
use std::time::Duration;
use thiserror::Error;

/// Error types for GPIO operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GpioError {
    /// No session with the GPIO service.
    #[error("GPIO port not connected")]
    NotConnected,

    /// Session could not be established.
    #[error("GPIO connect failed: {0}")]
    ConnectFailed(String),

    /// Pin number not usable by this backend.
    #[error("GPIO pin {0} is not available")]
    InvalidPin(u8),

    /// A single read/write/mode call failed.
    #[error("GPIO pin {pin}: {reason}")]
    Io { pin: u8, reason: String },

    /// Operation not supported by this backend.
    #[error("operation not supported by GPIO backend: {0}")]
    Unsupported(String),

    /// Driver name not registered.
    #[error("GPIO driver not found: {0}")]
    DriverNotFound(String),
}

/// Factory function type for creating port instances.
pub type PortFactory = fn() -> Box<dyn GpioPort>;

/// Electrical pin level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Low,
    High,
}

impl Level {
    #[inline]
    pub const fn is_high(self) -> bool {
        matches!(self, Self::High)
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Self::High } else { Self::Low }
    }
}

impl core::ops::Not for Level {
    type Output = Level;
    fn not(self) -> Level {
        match self {
            Self::Low => Self::High,
            Self::High => Self::Low,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "0"),
            Self::High => write!(f, "1"),
        }
    }
}

/// Pin direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Input,
    Output,
}

/// Pull resistor setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    Off,
    Down,
    Up,
}

/// Trait defining the interface for GPIO access backends.
///
/// The controller consumes pins only through this trait, so it runs
/// unchanged against real hardware, the roof simulator or a test double.
///
/// # Lifecycle
///
/// 1. `connect()` - Open the session (export pins, open devices, ...)
/// 2. `set_mode()` / `set_pull()` - Pin setup, once per connect
/// 3. `read()` / `write()` - Called from the poll loop and commands
/// 4. `reconfigure()` - After a pin map change, followed by pin setup again
/// 5. `disconnect()` - Release the session
///
/// Every pin call after a failed `connect()` or after `disconnect()`
/// must return `GpioError::NotConnected`.
pub trait GpioPort: Send {
    /// Returns the backend's unique identifier (e.g., "simulation", "sysfs").
    fn name(&self) -> &'static str;

    /// Establish the session.
    ///
    /// The full configuration is passed so backends can pick up their own
    /// section (`[gpio]`, `[simulation]`) and the pin map.
    fn connect(&mut self, config: &RoofConfig) -> Result<(), GpioError>;

    /// Tear down the session. Safe to call when not connected.
    fn disconnect(&mut self) -> Result<(), GpioError>;

    /// Apply a changed configuration (pin map, backend section) to a live
    /// session. The caller repeats pin setup afterwards.
    ///
    /// Default: disconnect and connect again.
    fn reconfigure(&mut self, config: &RoofConfig) -> Result<(), GpioError> {
        self.disconnect()?;
        self.connect(config)
    }

    fn is_connected(&self) -> bool;

    fn set_mode(&mut self, pin: u8, mode: PinMode) -> Result<(), GpioError>;

    fn set_pull(&mut self, pin: u8, pull: Pull) -> Result<(), GpioError>;

    fn read(&mut self, pin: u8) -> Result<Level, GpioError>;

    fn write(&mut self, pin: u8, level: Level) -> Result<(), GpioError>;

    /// Block for the width of a relay pulse.
    ///
    /// Default: `std::thread::sleep`.
    fn hold(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
