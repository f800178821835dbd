//! Controller-wide constants.

/// Output slots available for relay functions.
pub const MAX_OUTPUT_SLOTS: usize = 5;

/// Input slots available for switch functions.
pub const MAX_INPUT_SLOTS: usize = 4;

/// Lowest usable BCM pin number.
pub const PIN_MIN: u8 = 2;

/// Highest usable BCM pin number.
pub const PIN_MAX: u8 = 27;

/// Default motion timeout in seconds.
pub const DEFAULT_MOTION_TIMEOUT_S: u32 = 15;

/// Accepted motion timeout range in seconds.
pub const MOTION_TIMEOUT_RANGE_S: core::ops::RangeInclusive<u32> = 1..=300;

/// First poll after connecting [ms].
pub const INITIAL_POLL_MS: u64 = 500;

/// Poll interval while the roof is stationary [ms].
pub const IDLE_POLL_MS: u64 = 1000;

/// Poll interval while a motion session is in progress [ms].
pub const ACTIVE_POLL_MS: u64 = 500;

/// Consecutive pin errors tolerated before the GPIO session is rebuilt.
/// The reconnect fires once the counter exceeds this value.
pub const MAX_COMM_ERRORS: u32 = 10;

/// Consecutive indeterminate observations reported as warnings.
/// The next one is escalated to an error, later ones are suppressed.
pub const INDETERMINATE_WARN_LIMIT: u32 = 11;

/// Service name used when the configuration leaves it unset.
pub const DEFAULT_SERVICE_NAME: &str = "rolloff-roof";
