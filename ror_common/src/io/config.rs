//! I/O slot configuration.
//!
//! Deserialized from the `[io]` section of `roof.toml`. Up to five output
//! slots and four input slots; each slot names one roof function or
//! `"unused"`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::role::{ActiveLevel, PulseLimit, RoofInput, RoofOutput};
use crate::consts::{MAX_INPUT_SLOTS, MAX_OUTPUT_SLOTS};

/// Slot edit error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    #[error("output slot index {0} out of range (max {max})", max = MAX_OUTPUT_SLOTS)]
    OutputIndex(usize),
    #[error("input slot index {0} out of range (max {max})", max = MAX_INPUT_SLOTS)]
    InputIndex(usize),
}

// ─── Slots ──────────────────────────────────────────────────────────

/// One relay output slot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutputSlot {
    /// Assigned function; `None` is written as `"unused"`.
    #[serde(default, with = "unused")]
    pub function: Option<RoofOutput>,
    /// BCM pin number. Ignored for unused slots.
    #[serde(default)]
    pub pin: u8,
    #[serde(default)]
    pub active: ActiveLevel,
    #[serde(default)]
    pub limit: PulseLimit,
}

impl OutputSlot {
    pub fn new(function: RoofOutput, pin: u8, active: ActiveLevel, limit: PulseLimit) -> Self {
        Self {
            function: Some(function),
            pin,
            active,
            limit,
        }
    }
}

/// One switch input slot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InputSlot {
    #[serde(default, with = "unused")]
    pub function: Option<RoofInput>,
    #[serde(default)]
    pub pin: u8,
    #[serde(default)]
    pub active: ActiveLevel,
}

impl InputSlot {
    pub fn new(function: RoofInput, pin: u8, active: ActiveLevel) -> Self {
        Self {
            function: Some(function),
            pin,
            active,
        }
    }
}

// ─── IoConfig ───────────────────────────────────────────────────────

/// Output and input slot lists.
///
/// Capacity is fixed; a file with more slots than the hardware
/// provides fails to parse.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IoConfig {
    #[serde(default)]
    pub outputs: heapless::Vec<OutputSlot, MAX_OUTPUT_SLOTS>,
    #[serde(default)]
    pub inputs: heapless::Vec<InputSlot, MAX_INPUT_SLOTS>,
}

impl IoConfig {
    /// Parse an `[io]`-shaped TOML document.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Replace output slot `index` (0-based), padding with unused slots.
    pub fn set_output(&mut self, index: usize, slot: OutputSlot) -> Result<(), SlotError> {
        if index >= MAX_OUTPUT_SLOTS {
            return Err(SlotError::OutputIndex(index));
        }
        while self.outputs.len() <= index {
            // Capacity checked above.
            let _ = self.outputs.push(OutputSlot::default());
        }
        self.outputs[index] = slot;
        Ok(())
    }

    /// Replace input slot `index` (0-based), padding with unused slots.
    pub fn set_input(&mut self, index: usize, slot: InputSlot) -> Result<(), SlotError> {
        if index >= MAX_INPUT_SLOTS {
            return Err(SlotError::InputIndex(index));
        }
        while self.inputs.len() <= index {
            let _ = self.inputs.push(InputSlot::default());
        }
        self.inputs[index] = slot;
        Ok(())
    }
}

/// Serde adapter: `Option<T>` as a plain string with `"unused"` for `None`.
mod unused {
    use core::fmt::Display;
    use core::str::FromStr;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    const UNUSED: &str = "unused";

    pub fn serialize<S, T>(value: &Option<T>, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Display,
    {
        match value {
            Some(f) => s.collect_str(f),
            None => s.serialize_str(UNUSED),
        }
    }

    pub fn deserialize<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: FromStr<Err = String>,
    {
        let s = String::deserialize(d)?;
        if s == UNUSED {
            return Ok(None);
        }
        s.parse().map(Some).map_err(D::Error::custom)
    }
}
