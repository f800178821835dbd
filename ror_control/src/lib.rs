//! # Roll-off Roof Controller Library
//!
//! Drives the roof relays and reads its switches through a `GpioPort`,
//! sequencing open/close/park/abort requests against limit-switch feedback,
//! motion timeouts and lock interlocks.
//!
//! ## Data flow per poll tick
//!
//! ```text
//! Poller ─► SensorReader ─► StatusAggregator ─► MotionStateMachine
//!                                                     │
//!                                                     ▼
//!                                 RoofActuator ─► GpioSession ─► GpioPort
//! ```
//!
//! Client commands enter at [`controller::RoofController`]; everything runs
//! on one thread. The only blocking call is the relay pulse hold.

pub mod actuator;
pub mod controller;
pub mod error;
pub mod park;
pub mod poller;
pub mod port;
pub mod publisher;
pub mod sensors;
pub mod state;
pub mod status;

#[cfg(test)]
pub(crate) mod test_support;

pub use crate::controller::{MountPolicy, NoMountLock, RoofController};
pub use crate::error::RoofError;
pub use crate::poller::Poller;
