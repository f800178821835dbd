//! Roll-off roof common library.
//!
//! Shared types for every crate in the workspace.
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading, saving and validation
//! - [`consts`] - Slot counts, pin range and polling defaults
//! - [`io`] - Roof function enums, slot configuration and the pin registry
//! - [`gpio`] - The `GpioPort` boundary implemented by drivers
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use ror_common::prelude::*;
//! ```

pub mod config;
pub mod consts;
pub mod gpio;
pub mod io;
pub mod prelude;
