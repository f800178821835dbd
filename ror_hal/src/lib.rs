//! # Roll-off roof GPIO drivers
//!
//! Backends for the `GpioPort` trait defined in `ror_common::gpio`.
//!
//! # Module Structure
//!
//! - [`driver_registry`] - Driver factory registration
//! - [`drivers`] - Driver implementations (`simulation`, `sysfs`)
//!
//! # Usage
//!
//! ```rust
//! use ror_hal::DriverRegistry;
//!
//! let registry = DriverRegistry::with_builtin_drivers();
//! let port = registry.create_port("simulation").unwrap();
//! assert_eq!(port.name(), "simulation");
//! ```

#![deny(missing_docs)]

pub mod driver_registry;
pub mod drivers;

pub use crate::driver_registry::DriverRegistry;
