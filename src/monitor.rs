// Pacekeeper - Pedal pace monitoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! PaceMonitor - one tick of rate estimation followed by alert escalation.

use crate::config::PaceConfig;
use crate::error::Result;
use crate::escalator::{AlertEscalator, AlertUpdate, ThresholdState, WarningState, NO_ESTIMATE_SENTINEL};
use crate::rate::RateEstimator;
use crate::state::label;
use serde::Serialize;
use std::fmt;
use std::time::Instant;

/// Rate estimator and alert escalator driven together, once per tick.
#[derive(Debug, Clone)]
pub struct PaceMonitor {
    estimator: RateEstimator,
    escalator: AlertEscalator,
}

impl PaceMonitor {
    pub fn new(config: &PaceConfig, now: Instant) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            estimator: RateEstimator::new(config.rate.time_window()?),
            escalator: AlertEscalator::new(&config.alert, now)?,
        })
    }

    /// Run one tick with the counter value read at `now` (`None` if unreadable).
    pub fn tick(&mut self, now: Instant, count: Option<u64>) -> Result<PaceReport> {
        let rate = self.estimator.observe(now, count)?;
        let changes = self.escalator.update(rate, now);

        let threshold = self.escalator.threshold();
        let warning = self.escalator.warning();
        Ok(PaceReport {
            rate_per_minute: rate,
            threshold: threshold.value(),
            threshold_age_secs: threshold.age(now).as_secs_f64(),
            warning: warning.value().unwrap_or_default(),
            warning_age_secs: warning.age(now).as_secs_f64(),
            changes,
        })
    }

    pub fn estimator(&self) -> &RateEstimator {
        &self.estimator
    }

    pub fn escalator(&self) -> &AlertEscalator {
        &self.escalator
    }
}

/// Outcome of one [`PaceMonitor::tick`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaceReport {
    /// Events per minute, `None` when there is no estimate.
    pub rate_per_minute: Option<f64>,
    pub threshold: Option<ThresholdState>,
    pub threshold_age_secs: f64,
    pub warning: WarningState,
    pub warning_age_secs: f64,
    /// State changes made during this tick.
    #[serde(skip_serializing_if = "AlertUpdate::is_empty")]
    pub changes: AlertUpdate,
}

impl PaceReport {
    /// Rate for display, with the no-estimate sentinel.
    pub fn display_rate(&self) -> f64 {
        self.rate_per_minute.unwrap_or(NO_ESTIMATE_SENTINEL)
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for PaceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2}rpm - ThresholdState:{}:{:.1} WarningState:{}:{:.1}",
            self.display_rate(),
            label(self.threshold),
            self.threshold_age_secs,
            self.warning,
            self.warning_age_secs
        )
    }
}
