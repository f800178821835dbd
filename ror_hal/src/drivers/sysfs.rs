//! Linux sysfs GPIO driver.
//!
//! Uses the legacy `/sys/class/gpio` interface: `export`/`unexport` at the
//! root, `direction` and `value` per pin. The root is configurable
//! (`[gpio] sysfs_root`) so tests can run against a plain directory.
//!
//! Pull resistors cannot be set through sysfs. `set_pull` logs the request
//! and succeeds; pulls must be set in the device tree or boot config.

use ror_common::config::RoofConfig;
use ror_common::consts::{PIN_MAX, PIN_MIN};
use ror_common::gpio::{GpioError, GpioPort, Level, PinMode, Pull};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// sysfs GPIO backend.
pub struct SysfsGpio {
    root: PathBuf,
    connected: bool,
    exported: Vec<u8>,
}

impl SysfsGpio {
    /// Create a disconnected driver. The root is taken from the config on connect.
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("/sys/class/gpio"),
            connected: false,
            exported: Vec::new(),
        }
    }

    fn pin_dir(&self, pin: u8) -> PathBuf {
        self.root.join(format!("gpio{pin}"))
    }

    fn check(&self, pin: u8) -> Result<(), GpioError> {
        if !self.connected {
            return Err(GpioError::NotConnected);
        }
        if !(PIN_MIN..=PIN_MAX).contains(&pin) {
            return Err(GpioError::InvalidPin(pin));
        }
        Ok(())
    }

    fn export(&mut self, pin: u8) -> Result<(), GpioError> {
        if !self.pin_dir(pin).exists() {
            write_attr(&self.root.join("export"), &pin.to_string(), pin)?;
            debug!(pin, "exported");
        }
        if !self.exported.contains(&pin) {
            self.exported.push(pin);
        }
        Ok(())
    }
}

impl Default for SysfsGpio {
    fn default() -> Self {
        Self::new()
    }
}

fn write_attr(path: &Path, value: &str, pin: u8) -> Result<(), GpioError> {
    fs::write(path, value).map_err(|e| GpioError::Io {
        pin,
        reason: format!("{}: {e}", path.display()),
    })
}

impl GpioPort for SysfsGpio {
    fn name(&self) -> &'static str {
        "sysfs"
    }

    fn connect(&mut self, config: &RoofConfig) -> Result<(), GpioError> {
        self.root = config.gpio.sysfs_root.clone();
        if !self.root.is_dir() {
            return Err(GpioError::ConnectFailed(format!(
                "{} is not a directory",
                self.root.display()
            )));
        }
        self.connected = true;
        info!(root = %self.root.display(), "sysfs GPIO connected");
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), GpioError> {
        if !self.connected {
            return Ok(());
        }
        let unexport = self.root.join("unexport");
        for pin in self.exported.drain(..) {
            if let Err(e) = fs::write(&unexport, pin.to_string()) {
                warn!(pin, "unexport failed: {e}");
            }
        }
        self.connected = false;
        info!("sysfs GPIO disconnected");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn set_mode(&mut self, pin: u8, mode: PinMode) -> Result<(), GpioError> {
        self.check(pin)?;
        self.export(pin)?;
        let direction = match mode {
            PinMode::Input => "in",
            PinMode::Output => "out",
        };
        write_attr(&self.pin_dir(pin).join("direction"), direction, pin)
    }

    fn set_pull(&mut self, pin: u8, pull: Pull) -> Result<(), GpioError> {
        self.check(pin)?;
        debug!(pin, ?pull, "pull resistor not configurable through sysfs");
        Ok(())
    }

    fn read(&mut self, pin: u8) -> Result<Level, GpioError> {
        self.check(pin)?;
        let path = self.pin_dir(pin).join("value");
        let raw = fs::read_to_string(&path).map_err(|e| GpioError::Io {
            pin,
            reason: format!("{}: {e}", path.display()),
        })?;
        match raw.trim() {
            "0" => Ok(Level::Low),
            "1" => Ok(Level::High),
            other => Err(GpioError::Io {
                pin,
                reason: format!("unexpected value {other:?}"),
            }),
        }
    }

    fn write(&mut self, pin: u8, level: Level) -> Result<(), GpioError> {
        self.check(pin)?;
        write_attr(&self.pin_dir(pin).join("value"), &level.to_string(), pin)
    }
}

/// Factory function to create a sysfs driver instance.
pub fn create_driver() -> Box<dyn GpioPort> {
    Box::new(SysfsGpio::new())
}
