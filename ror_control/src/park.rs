//! Park position kept across restarts.
//!
//! A one-line TOML file (`park = "parked"`) rewritten whenever the confirmed
//! park position changes. At connect it stands in for limit switches that
//! cannot be read, and is cross-checked against switches that can.

use core::fmt;
use ror_common::config::{ConfigError, ConfigLoader};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::sensors::SensorReadings;
use crate::state::motion::ParkStatus;

#[derive(Debug, Serialize, Deserialize)]
struct ParkData {
    park: ParkStatus,
}

/// Park position file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParkStore {
    path: PathBuf,
}

impl ParkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saved position, `None` before the first save.
    pub fn load(&self) -> Result<Option<ParkStatus>, ConfigError> {
        match ParkData::load(&self.path) {
            Ok(data) => Ok(Some(data.park)),
            Err(ConfigError::FileNotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Record `park`. `Unknown` is never written; the last confirmed
    /// position stays on disk.
    pub fn save(&self, park: ParkStatus) -> Result<(), ConfigError> {
        if park == ParkStatus::Unknown {
            return Ok(());
        }
        let content = toml::to_string(&ParkData { park })
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        std::fs::write(&self.path, content)
            .map_err(|e| ConfigError::WriteError(format!("{}: {e}", self.path.display())))?;
        debug!(?park, path = %self.path.display(), "park position saved");
        Ok(())
    }
}

/// Saved park position contradicted by the limit switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParkMismatch {
    ParkedButOpened,
    ParkedButNotClosed,
    UnparkedButClosed,
    UnparkedButNotOpened,
}

impl fmt::Display for ParkMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParkedButOpened => {
                write!(f, "Saved state is parked but the roof opened switch is set")
            }
            Self::ParkedButNotClosed => {
                write!(f, "Saved state is parked but the roof closed switch is not set")
            }
            Self::UnparkedButClosed => {
                write!(f, "Saved state is unparked but the roof closed switch is set")
            }
            Self::UnparkedButNotOpened => {
                write!(f, "Saved state is unparked but the roof opened switch is not set")
            }
        }
    }
}

/// Compare a saved position with fresh switch readings.
pub fn check_saved(saved: ParkStatus, readings: &SensorReadings) -> Option<ParkMismatch> {
    match saved {
        ParkStatus::Parked if readings.opened => Some(ParkMismatch::ParkedButOpened),
        ParkStatus::Parked if !readings.closed => Some(ParkMismatch::ParkedButNotClosed),
        ParkStatus::Unparked if readings.closed => Some(ParkMismatch::UnparkedButClosed),
        ParkStatus::Unparked if !readings.opened => Some(ParkMismatch::UnparkedButNotOpened),
        _ => None,
    }
}
