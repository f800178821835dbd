//! Roof I/O mapping.
//!
//! Slots from `roof.toml` ([`config`]) are validated once into the
//! [`registry::PinRegistry`], which resolves logical roof functions
//! ([`role`]) to physical pins.

pub mod config;
pub mod registry;
pub mod role;
