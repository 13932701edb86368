//! Engine configuration.
//!
//! Every knob has a default that matches the behaviour of the scheduling
//! application, so `EngineConfig::default()` is the normal starting point.
//! Hosts that keep configuration on disk can deserialize it from JSON;
//! missing fields fall back to their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CurrencyError, Result};

/// Default threshold (days) under which a held currency is "expiring soon".
pub const DEFAULT_EXPIRING_SOON_DAYS: i64 = 30;

/// Default ceiling on nesting depth (references plus groups) per evaluation.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// What expiry date a held rolling-window currency reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollingWindowMode {
    /// Held as of the evaluation date only; expiry equals that date.
    #[default]
    AsOfEvaluation,
    /// Expiry is the day the window would drop below the required count
    /// if no further events occur.
    ProjectedLapse,
}

/// The two severity bands the roster UI colours by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityBands {
    /// Fewer days than this is critical.
    pub critical_days: i64,
    /// Fewer days than this (but not critical) is a warning.
    pub warning_days: i64,
}

impl Default for SeverityBands {
    fn default() -> Self {
        Self {
            critical_days: 30,
            warning_days: 61,
        }
    }
}

/// Configuration for a [`crate::engine::CurrencyEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub expiring_soon_days: i64,
    pub max_depth: usize,
    pub rolling_window: RollingWindowMode,
    pub severity: SeverityBands,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            expiring_soon_days: DEFAULT_EXPIRING_SOON_DAYS,
            max_depth: DEFAULT_MAX_DEPTH,
            rolling_window: RollingWindowMode::default(),
            severity: SeverityBands::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_expiring_soon_days(mut self, days: i64) -> Self {
        self.expiring_soon_days = days;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_rolling_window(mut self, mode: RollingWindowMode) -> Self {
        self.rolling_window = mode;
        self
    }

    pub fn with_severity(mut self, bands: SeverityBands) -> Self {
        self.severity = bands;
        self
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        serde_json::from_slice(&bytes).map_err(|e| {
            CurrencyError::InvalidFileFormat(format!(
                "failed to parse engine config {}: {e}",
                path.display()
            ))
        })
    }
}
