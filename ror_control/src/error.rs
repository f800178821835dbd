//! Controller error types.
//!
//! Every error is recovered locally by the caller except
//! `CommunicationExhausted`, which the poll loop answers with a full
//! GPIO session reconnect. None terminates the process.

use core::fmt;
use ror_common::config::ConfigError;
use ror_common::gpio::GpioError;
use ror_common::io::config::SlotError;
use ror_common::io::registry::PinConfigError;
use ror_common::io::role::RoofFunction;
use thiserror::Error;

use crate::state::motion::MotionDirection;

/// Why a motion request was refused without side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterlockReason {
    /// The locked switch is active.
    RoofLocked,
    /// The locked switch could not be read.
    LockUnreadable,
    /// The telescope mount reports it is parking or parked-locked.
    MountLocking,
}

impl fmt::Display for InterlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RoofLocked => write!(f, "roof external lock is engaged"),
            Self::LockUnreadable => write!(f, "roof lock state could not be read"),
            Self::MountLocking => write!(f, "telescope mount is locking the roof"),
        }
    }
}

/// Roof controller error.
#[derive(Debug, Clone, Error)]
pub enum RoofError {
    /// Mandatory functions are not mapped to pins.
    #[error("configuration incomplete, missing: {}", join(.missing))]
    ConfigurationIncomplete { missing: Vec<RoofFunction> },

    /// The slot configuration was rejected.
    #[error("invalid pin configuration: {0}")]
    InvalidPinMap(PinConfigError),

    /// A required function has no pin.
    #[error("no pin configured for {0}")]
    NotMapped(RoofFunction),

    /// A single read or write failed.
    #[error("{function}: {source}")]
    PinOperation {
        function: RoofFunction,
        #[source]
        source: GpioError,
    },

    /// A motion session ran past its deadline.
    #[error("roof {0} timed out")]
    Timeout(MotionDirection),

    /// Motion refused by an interlock.
    #[error("roof movement blocked: {0}")]
    Interlocked(InterlockReason),

    /// The target limit switch is already active.
    #[error("roof is already {}", .0.target_name())]
    AlreadyInPosition(MotionDirection),

    /// Too many consecutive pin errors.
    #[error("GPIO communication exhausted after {errors} consecutive errors")]
    CommunicationExhausted { errors: u32 },

    /// No GPIO session.
    #[error("GPIO port not connected")]
    NotConnected,

    /// The GPIO session could not be established.
    #[error("GPIO connect failed: {0}")]
    Connect(GpioError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Slot(#[from] SlotError),

    /// A setting value was out of range or not applicable now.
    #[error("invalid setting: {0}")]
    InvalidSetting(String),
}

impl From<PinConfigError> for RoofError {
    fn from(e: PinConfigError) -> Self {
        match e {
            PinConfigError::ConfigurationIncomplete { missing } => {
                Self::ConfigurationIncomplete { missing }
            }
            other => Self::InvalidPinMap(other),
        }
    }
}

impl RoofError {
    /// Wrap a port error for `function`.
    pub fn pin(function: impl Into<RoofFunction>, source: GpioError) -> Self {
        Self::PinOperation {
            function: function.into(),
            source,
        }
    }
}

fn join(functions: &[RoofFunction]) -> String {
    functions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
