//! Simulation driver module.
//!
//! Software roof for development and testing without GPIO hardware.

mod driver;
mod roof;

pub use driver::SimulationDriver;
pub use roof::{SimulatedRoof, Travel};

use ror_common::gpio::GpioPort;

/// Factory function to create a simulation driver instance.
pub fn create_driver() -> Box<dyn GpioPort> {
    Box::new(SimulationDriver::new())
}
