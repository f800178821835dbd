//! Roof function types.
//!
//! `RoofOutput` and `RoofInput` name the logical relay and switch
//! functions independently of the pin that implements them. Both parse
//! from the lowercase strings used in `roof.toml`.

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::gpio::Level;

// ─── RoofOutput ─────────────────────────────────────────────────────

/// Relay-driving output functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoofOutput {
    /// Start opening the roof.
    Open,
    /// Start closing the roof.
    Close,
    /// Stop roof travel.
    Abort,
    /// Engage the external roof lock.
    Lock,
    /// Switch the auxiliary circuit.
    Aux,
}

impl RoofOutput {
    pub const ALL: [RoofOutput; 5] = [Self::Open, Self::Close, Self::Abort, Self::Lock, Self::Aux];

    /// Outputs without which the roof cannot move.
    #[inline]
    pub const fn is_required(self) -> bool {
        matches!(self, Self::Open | Self::Close)
    }

    /// Outputs that drive the motor controller. These must be pulsed.
    #[inline]
    pub const fn is_motion(self) -> bool {
        matches!(self, Self::Open | Self::Close | Self::Abort)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Close => "close",
            Self::Abort => "abort",
            Self::Lock => "lock",
            Self::Aux => "aux",
        }
    }
}

impl fmt::Display for RoofOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoofOutput {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "close" => Ok(Self::Close),
            "abort" => Ok(Self::Abort),
            "lock" => Ok(Self::Lock),
            "aux" => Ok(Self::Aux),
            _ => Err(format!("unknown output function: {s:?}")),
        }
    }
}

// ─── RoofInput ──────────────────────────────────────────────────────

/// Switch-reading input functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoofInput {
    /// Fully-opened limit switch.
    Opened,
    /// Fully-closed limit switch.
    Closed,
    /// External lock engaged.
    Locked,
    /// Auxiliary circuit state.
    Aux,
}

impl RoofInput {
    pub const ALL: [RoofInput; 4] = [Self::Opened, Self::Closed, Self::Locked, Self::Aux];

    /// Inputs without which roof position cannot be determined.
    #[inline]
    pub const fn is_required(self) -> bool {
        matches!(self, Self::Opened | Self::Closed)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Opened => "opened",
            Self::Closed => "closed",
            Self::Locked => "locked",
            Self::Aux => "aux",
        }
    }
}

impl fmt::Display for RoofInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoofInput {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "opened" => Ok(Self::Opened),
            "closed" => Ok(Self::Closed),
            "locked" => Ok(Self::Locked),
            "aux" => Ok(Self::Aux),
            _ => Err(format!("unknown input function: {s:?}")),
        }
    }
}

// ─── RoofFunction ───────────────────────────────────────────────────

/// Any logical roof function, output or input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "function", rename_all = "lowercase")]
pub enum RoofFunction {
    Output(RoofOutput),
    Input(RoofInput),
}

impl RoofFunction {
    /// The four functions every usable configuration maps.
    pub const REQUIRED: [RoofFunction; 4] = [
        Self::Output(RoofOutput::Open),
        Self::Output(RoofOutput::Close),
        Self::Input(RoofInput::Opened),
        Self::Input(RoofInput::Closed),
    ];

    pub const fn is_required(self) -> bool {
        match self {
            Self::Output(o) => o.is_required(),
            Self::Input(i) => i.is_required(),
        }
    }
}

impl From<RoofOutput> for RoofFunction {
    fn from(o: RoofOutput) -> Self {
        Self::Output(o)
    }
}

impl From<RoofInput> for RoofFunction {
    fn from(i: RoofInput) -> Self {
        Self::Input(i)
    }
}

impl fmt::Display for RoofFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Output(o) => write!(f, "{o} relay"),
            Self::Input(i) => write!(f, "{i} switch"),
        }
    }
}

// ─── ActiveLevel ────────────────────────────────────────────────────

/// Electrical level at which a pin is considered active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveLevel {
    #[default]
    High,
    Low,
}

impl ActiveLevel {
    /// Physical level to write for a logical on/off request.
    #[inline]
    pub const fn physical(self, on: bool) -> Level {
        let high = match self {
            Self::High => on,
            Self::Low => !on,
        };
        if high { Level::High } else { Level::Low }
    }

    /// Whether a physical level read from the pin means "active".
    #[inline]
    pub const fn is_active(self, level: Level) -> bool {
        matches!(
            (self, level),
            (Self::High, Level::High) | (Self::Low, Level::Low)
        )
    }
}

impl fmt::Display for ActiveLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Low => write!(f, "low"),
        }
    }
}

// ─── PulseLimit ─────────────────────────────────────────────────────

/// How long an output stays asserted after a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PulseLimit {
    #[serde(rename = "100ms")]
    Ms100,
    #[serde(rename = "250ms")]
    Ms250,
    #[default]
    #[serde(rename = "500ms")]
    Ms500,
    #[serde(rename = "750ms")]
    Ms750,
    /// No limit: the pin stays at the commanded level.
    #[serde(rename = "held")]
    Held,
}

impl PulseLimit {
    pub const ALL: [PulseLimit; 5] = [
        Self::Ms100,
        Self::Ms250,
        Self::Ms500,
        Self::Ms750,
        Self::Held,
    ];

    /// Pulse width, `None` when held.
    pub const fn duration(self) -> Option<Duration> {
        match self {
            Self::Ms100 => Some(Duration::from_millis(100)),
            Self::Ms250 => Some(Duration::from_millis(250)),
            Self::Ms500 => Some(Duration::from_millis(500)),
            Self::Ms750 => Some(Duration::from_millis(750)),
            Self::Held => None,
        }
    }
}

impl fmt::Display for PulseLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.duration() {
            Some(d) => write!(f, "{}ms", d.as_millis()),
            None => write!(f, "held"),
        }
    }
}

impl FromStr for PulseLimit {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "100ms" => Ok(Self::Ms100),
            "250ms" => Ok(Self::Ms250),
            "500ms" => Ok(Self::Ms500),
            "750ms" => Ok(Self::Ms750),
            "held" => Ok(Self::Held),
            _ => Err(format!(
                "unknown pulse limit: {s:?}, expected 100ms, 250ms, 500ms, 750ms or held"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_parse_display() {
        for o in RoofOutput::ALL {
            assert_eq!(o.to_string().parse::<RoofOutput>().unwrap(), o);
        }
        assert!("OPEN".parse::<RoofOutput>().is_err());
    }

    #[test]
    fn input_parse_display() {
        for i in RoofInput::ALL {
            assert_eq!(i.as_str().parse::<RoofInput>().unwrap(), i);
        }
        assert!("opening".parse::<RoofInput>().is_err());
    }

    #[test]
    fn motion_outputs() {
        assert!(RoofOutput::Open.is_motion());
        assert!(RoofOutput::Abort.is_motion());
        assert!(!RoofOutput::Lock.is_motion());
        assert!(!RoofOutput::Abort.is_required());
    }

    #[test]
    fn required_functions() {
        assert_eq!(RoofFunction::REQUIRED.len(), 4);
        assert!(RoofFunction::from(RoofInput::Closed).is_required());
        assert!(!RoofFunction::from(RoofInput::Locked).is_required());
        assert!(!RoofFunction::from(RoofOutput::Aux).is_required());
    }

    #[test]
    fn active_level_polarity() {
        assert_eq!(ActiveLevel::High.physical(true), Level::High);
        assert_eq!(ActiveLevel::High.physical(false), Level::Low);
        assert_eq!(ActiveLevel::Low.physical(true), Level::Low);
        assert_eq!(ActiveLevel::Low.physical(false), Level::High);

        assert!(ActiveLevel::High.is_active(Level::High));
        assert!(!ActiveLevel::High.is_active(Level::Low));
        assert!(ActiveLevel::Low.is_active(Level::Low));
        assert!(!ActiveLevel::Low.is_active(Level::High));
    }

    #[test]
    fn pulse_limit_durations() {
        assert_eq!(PulseLimit::Ms100.duration(), Some(Duration::from_millis(100)));
        assert_eq!(PulseLimit::Ms750.duration(), Some(Duration::from_millis(750)));
        assert_eq!(PulseLimit::Held.duration(), None);
        assert_eq!(PulseLimit::default(), PulseLimit::Ms500);
    }

    #[test]
    fn pulse_limit_strings() {
        for p in PulseLimit::ALL {
            assert_eq!(p.to_string().parse::<PulseLimit>().unwrap(), p);
        }
        assert!("1s".parse::<PulseLimit>().is_err());
    }
}
