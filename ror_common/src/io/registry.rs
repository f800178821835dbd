//! Pin registry: runtime function-based pin lookup.
//!
//! Built from `IoConfig` whenever the slot configuration changes.
//! Motion logic only reads it; lookups are O(1) HashMap access.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;
use tracing::{error, info};

use super::config::IoConfig;
use super::role::{ActiveLevel, PulseLimit, RoofFunction, RoofInput, RoofOutput};
use crate::consts::{PIN_MAX, PIN_MIN};

// ─── Error Types ────────────────────────────────────────────────────

/// Which configuration slot a pin came from (0-based index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotId {
    Output(usize),
    Input(usize),
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Output(i) => write!(f, "output {}", i + 1),
            Self::Input(i) => write!(f, "input {}", i + 1),
        }
    }
}

/// Pin configuration validation error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PinConfigError {
    /// Two slots assign the same function.
    #[error("{function} assigned in both {first} and {second}")]
    FunctionDuplicate {
        function: RoofFunction,
        first: SlotId,
        second: SlotId,
    },

    /// Two slots use the same pin.
    #[error("pin {pin} used by both {first} and {second}")]
    PinDuplicate {
        pin: u8,
        first: SlotId,
        second: SlotId,
    },

    /// Pin number outside the usable header range.
    #[error("{slot}: pin {pin} outside {min}..={max}", min = PIN_MIN, max = PIN_MAX)]
    PinOutOfRange { slot: SlotId, pin: u8 },

    /// Open/close/abort configured without a pulse width.
    #[error("{slot}: {function} needs a pulse limit, held is only available for lock and aux")]
    HeldMotionOutput { slot: SlotId, function: RoofOutput },

    /// One or more mandatory functions are not mapped.
    #[error("configuration incomplete, missing: {}", join(.missing))]
    ConfigurationIncomplete { missing: Vec<RoofFunction> },
}

fn join(functions: &[RoofFunction]) -> String {
    functions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

// ─── PinDefinition ──────────────────────────────────────────────────

/// Runtime binding of a roof function to its physical pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinDefinition {
    pub function: RoofFunction,
    pub slot: SlotId,
    /// BCM pin number.
    pub pin: u8,
    pub active: ActiveLevel,
    /// Outputs only.
    pub pulse: Option<PulseLimit>,
}

impl PinDefinition {
    /// Pulse width for outputs with a finite limit.
    #[inline]
    pub fn pulse_duration(&self) -> Option<std::time::Duration> {
        self.pulse.and_then(PulseLimit::duration)
    }
}

// ─── PinRegistry ────────────────────────────────────────────────────

/// Maps `RoofFunction` to `PinDefinition`.
///
/// A registry with missing mandatory functions is still usable: reads and
/// actuations of the missing functions fail at the call site.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinRegistry {
    bindings: HashMap<RoofFunction, PinDefinition>,
}

impl PinRegistry {
    /// Build the registry from slot configuration.
    ///
    /// Rejects duplicate functions, duplicate pins, pins outside the header
    /// range and held limits on motion outputs. Missing mandatory functions
    /// are logged as an error but do not fail construction; check with
    /// [`PinRegistry::validate_required`].
    pub fn configure(config: &IoConfig) -> Result<Self, PinConfigError> {
        let mut bindings: HashMap<RoofFunction, PinDefinition> = HashMap::new();
        let mut pins: HashMap<u8, SlotId> = HashMap::new();

        let outputs = config.outputs.iter().enumerate().filter_map(|(idx, s)| {
            s.function.map(|f| PinDefinition {
                function: RoofFunction::Output(f),
                slot: SlotId::Output(idx),
                pin: s.pin,
                active: s.active,
                pulse: Some(s.limit),
            })
        });
        let inputs = config.inputs.iter().enumerate().filter_map(|(idx, s)| {
            s.function.map(|f| PinDefinition {
                function: RoofFunction::Input(f),
                slot: SlotId::Input(idx),
                pin: s.pin,
                active: s.active,
                pulse: None,
            })
        });

        for def in outputs.chain(inputs) {
            if !(PIN_MIN..=PIN_MAX).contains(&def.pin) {
                return Err(PinConfigError::PinOutOfRange {
                    slot: def.slot,
                    pin: def.pin,
                });
            }

            if let RoofFunction::Output(o) = def.function {
                if o.is_motion() && def.pulse_duration().is_none() {
                    return Err(PinConfigError::HeldMotionOutput {
                        slot: def.slot,
                        function: o,
                    });
                }
            }

            if let Some(existing) = bindings.get(&def.function) {
                return Err(PinConfigError::FunctionDuplicate {
                    function: def.function,
                    first: existing.slot,
                    second: def.slot,
                });
            }

            if let Some(&first) = pins.get(&def.pin) {
                return Err(PinConfigError::PinDuplicate {
                    pin: def.pin,
                    first,
                    second: def.slot,
                });
            }

            pins.insert(def.pin, def.slot);
            bindings.insert(def.function, def);
        }

        let registry = Self { bindings };
        registry.log_summary();
        Ok(registry)
    }

    fn log_summary(&self) {
        let mut defs: Vec<&PinDefinition> = self.bindings.values().collect();
        defs.sort_by_key(|d| match d.slot {
            SlotId::Output(i) => (0, i),
            SlotId::Input(i) => (1, i),
        });
        for d in defs {
            match d.pulse {
                Some(limit) => info!(
                    slot = %d.slot,
                    function = %d.function,
                    pin = d.pin,
                    active = %d.active,
                    limit = %limit,
                    "output pin configured"
                ),
                None => info!(
                    slot = %d.slot,
                    function = %d.function,
                    pin = d.pin,
                    active = %d.active,
                    "input pin configured"
                ),
            }
        }

        let missing = self.missing_required();
        if missing.is_empty() {
            info!("{} roof functions mapped", self.bindings.len());
        } else {
            error!(
                "Roof functions not configured: {}. Roof movement is disabled until they are mapped",
                join(&missing)
            );
        }
    }

    /// Look up a definition by function.
    #[inline]
    pub fn resolve(&self, function: impl Into<RoofFunction>) -> Option<&PinDefinition> {
        self.bindings.get(&function.into())
    }

    pub fn output(&self, output: RoofOutput) -> Option<&PinDefinition> {
        self.resolve(output)
    }

    pub fn input(&self, input: RoofInput) -> Option<&PinDefinition> {
        self.resolve(input)
    }

    /// Configured output definitions.
    pub fn outputs(&self) -> impl Iterator<Item = &PinDefinition> {
        self.bindings
            .values()
            .filter(|d| matches!(d.function, RoofFunction::Output(_)))
    }

    /// Configured input definitions.
    pub fn inputs(&self) -> impl Iterator<Item = &PinDefinition> {
        self.bindings
            .values()
            .filter(|d| matches!(d.function, RoofFunction::Input(_)))
    }

    /// Number of mapped functions.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Mandatory functions with no pin, in fixed order.
    pub fn missing_required(&self) -> Vec<RoofFunction> {
        RoofFunction::REQUIRED
            .into_iter()
            .filter(|f| !self.bindings.contains_key(f))
            .collect()
    }

    /// Check that open, close, opened and closed are all mapped.
    pub fn validate_required(&self) -> Result<(), PinConfigError> {
        let missing = self.missing_required();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PinConfigError::ConfigurationIncomplete { missing })
        }
    }
}
