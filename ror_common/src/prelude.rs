//! Prelude module for common re-exports.
//!
//! ```rust
//! use ror_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, RoofConfig, SharedConfig};

// ─── GPIO ───────────────────────────────────────────────────────────
pub use crate::gpio::{GpioError, GpioPort, Level, PinMode, PortFactory, Pull};

// ─── I/O ────────────────────────────────────────────────────────────
pub use crate::io::config::{InputSlot, IoConfig, OutputSlot, SlotError};
pub use crate::io::registry::{PinConfigError, PinDefinition, PinRegistry, SlotId};
pub use crate::io::role::{ActiveLevel, PulseLimit, RoofFunction, RoofInput, RoofOutput};
