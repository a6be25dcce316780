// Pacekeeper - Pedal pace monitoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Pace monitoring configuration.

use crate::error::{PaceError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default target pace, in events per minute.
pub const DEFAULT_TARGET: f64 = 65.0;

/// Master configuration for pace monitoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaceConfig {
    /// Rate estimation settings.
    pub rate: RateConfig,

    /// Alert escalation settings.
    pub alert: AlertConfig,
}

impl PaceConfig {
    /// Check every field; durations must be finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        self.rate.validate()?;
        self.alert.validate()
    }

    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to pretty JSON.
    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Rate estimation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateConfig {
    /// Trailing window (seconds) the estimator looks back over.
    pub time_window_secs: f64,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            time_window_secs: 15.0,
        }
    }
}

impl RateConfig {
    pub fn validate(&self) -> Result<()> {
        check_secs("rate.time_window_secs", self.time_window_secs)?;
        if self.time_window_secs == 0.0 {
            return Err(PaceError::InvalidConfig(
                "rate.time_window_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn time_window(&self) -> Result<Duration> {
        self.validate()?;
        check_secs("rate.time_window_secs", self.time_window_secs)
    }
}

/// Alert escalation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Pace below this is slow. Equal counts as ok.
    pub target_threshold: f64,

    /// How long (seconds) the pace must stay slow before warning.
    pub slow_grace_secs: f64,

    /// How long (seconds) a warning may last before consequences.
    pub warning_grace_secs: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            target_threshold: DEFAULT_TARGET,
            slow_grace_secs: 5.0,
            warning_grace_secs: 15.0,
        }
    }
}

impl AlertConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.target_threshold.is_finite() {
            return Err(PaceError::InvalidConfig(format!(
                "alert.target_threshold must be finite, got {}",
                self.target_threshold
            )));
        }
        check_secs("alert.slow_grace_secs", self.slow_grace_secs)?;
        check_secs("alert.warning_grace_secs", self.warning_grace_secs)?;
        Ok(())
    }

    pub fn slow_grace(&self) -> Result<Duration> {
        self.validate()?;
        check_secs("alert.slow_grace_secs", self.slow_grace_secs)
    }

    pub fn warning_grace(&self) -> Result<Duration> {
        self.validate()?;
        check_secs("alert.warning_grace_secs", self.warning_grace_secs)
    }
}

/// Seconds as a `Duration`; NaN, infinite, negative and overflowing values
/// are rejected.
fn check_secs(field: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).map_err(|_| {
        PaceError::InvalidConfig(format!(
            "{} must be a finite, non-negative number of seconds, got {}",
            field, secs
        ))
    })
}
