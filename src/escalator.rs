// Pacekeeper - Pedal pace monitoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Cascading alert escalation with two linked hysteresis timers.
//!
//! The inner [`ThresholdState`] is a plain comparison of the current pace
//! against the target. The outer [`WarningState`] reacts to how long the
//! inner state has been held:
//!
//! ```text
//!        slow held > slow_grace        warning held > warning_grace
//!   Ok ─────────────────────────► Warning ─────────────────────────► Consequences
//!   ▲                               │                                   │
//!   └──────── threshold ok ─────────┴───────────────────────────────────┘
//! ```
//!
//! Escalation needs sustained dwell time; recovery is immediate. Rules are
//! evaluated in a fixed order each tick (escalate to warning, recover,
//! escalate to consequences), so a tick where the pace is back above target
//! always recovers, whatever was pending.

use crate::config::AlertConfig;
use crate::error::{PaceError, Result};
use crate::state::{StateChange, StateValue, TimedState};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Pace value used when there is no estimate yet. Below any sensible target.
pub const NO_ESTIMATE_SENTINEL: f64 = -1.0;

/// Instantaneous comparison of pace against target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdState {
    Slow,
    Ok,
}

impl StateValue for ThresholdState {
    const MACHINE: &'static str = "ThresholdState";
    const ALL: &'static [Self] = &[ThresholdState::Slow, ThresholdState::Ok];

    fn as_str(&self) -> &'static str {
        match self {
            ThresholdState::Slow => "slow",
            ThresholdState::Ok => "ok",
        }
    }
}

/// Alert level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningState {
    #[default]
    Ok,
    Warning,
    Consequences,
}

impl StateValue for WarningState {
    const MACHINE: &'static str = "WarningState";
    const ALL: &'static [Self] = &[
        WarningState::Ok,
        WarningState::Warning,
        WarningState::Consequences,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            WarningState::Ok => "ok",
            WarningState::Warning => "warning",
            WarningState::Consequences => "consequences",
        }
    }
}

impl WarningState {
    /// Numeric level, 0 = ok.
    pub fn level(&self) -> u8 {
        *self as u8
    }
}

macro_rules! impl_label_traits {
    ($ty:ty) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = PaceError;

            fn from_str(s: &str) -> Result<Self> {
                Self::parse_label(s)
            }
        }
    };
}

impl_label_traits!(ThresholdState);
impl_label_traits!(WarningState);

/// State changes produced by one [`AlertEscalator::update`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlertUpdate {
    pub threshold: Option<StateChange<ThresholdState>>,
    pub warning: Vec<StateChange<WarningState>>,
}

impl AlertUpdate {
    pub fn is_empty(&self) -> bool {
        self.threshold.is_none() && self.warning.is_empty()
    }

    /// Whether this tick moved the alert into `Consequences`.
    pub fn entered_consequences(&self) -> bool {
        self.warning
            .iter()
            .any(|c| c.new == WarningState::Consequences)
    }
}

/// Two nested hysteresis machines driven by one scalar per tick.
#[derive(Debug, Clone)]
pub struct AlertEscalator {
    target: f64,
    slow_grace: Duration,
    warning_grace: Duration,
    threshold: TimedState<ThresholdState>,
    warning: TimedState<WarningState>,
}

impl AlertEscalator {
    /// Create an escalator. The threshold state starts unset; the warning
    /// state starts `Ok`.
    pub fn new(config: &AlertConfig, now: Instant) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            target: config.target_threshold,
            slow_grace: config.slow_grace()?,
            warning_grace: config.warning_grace()?,
            threshold: TimedState::unset(now),
            warning: TimedState::new(WarningState::Ok, now),
        })
    }

    /// Feed the current pace (`None` = no estimate) and advance both machines.
    pub fn update(&mut self, pace: Option<f64>, now: Instant) -> AlertUpdate {
        let mut update = AlertUpdate::default();

        let value = pace.unwrap_or(NO_ESTIMATE_SENTINEL);
        let inner = if value < self.target {
            ThresholdState::Slow
        } else {
            ThresholdState::Ok
        };
        update.threshold = self.threshold.set(inner, now);

        if self.warning.is(WarningState::Ok)
            && self
                .threshold
                .held_longer_than(ThresholdState::Slow, self.slow_grace, now)
        {
            update.warning.extend(self.warning.set(WarningState::Warning, now));
        }

        if self.threshold.is(ThresholdState::Ok) {
            update.warning.extend(self.warning.set(WarningState::Ok, now));
        }

        if self
            .warning
            .held_longer_than(WarningState::Warning, self.warning_grace, now)
        {
            update
                .warning
                .extend(self.warning.set(WarningState::Consequences, now));
        }

        update
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn threshold(&self) -> &TimedState<ThresholdState> {
        &self.threshold
    }

    pub fn warning(&self) -> &TimedState<WarningState> {
        &self.warning
    }

    /// `ThresholdState:<value>:<age> WarningState:<value>:<age>`
    pub fn show(&self, now: Instant) -> String {
        format!("{} {}", self.threshold.show(now), self.warning.show(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn escalator(t0: Instant) -> AlertEscalator {
        AlertEscalator::new(&AlertConfig::default(), t0).unwrap()
    }

    fn secs(t0: Instant, s: u64) -> Instant {
        t0 + Duration::from_secs(s)
    }

    #[test]
    fn test_initial_states() {
        let t0 = Instant::now();
        let esc = escalator(t0);
        assert_eq!(esc.threshold().value(), None);
        assert!(esc.warning().is(WarningState::Ok));
        assert_eq!(
            esc.show(secs(t0, 2)),
            "ThresholdState:none:2.0 WarningState:ok:2.0"
        );
    }

    #[test]
    fn test_equal_to_target_is_ok() {
        let t0 = Instant::now();
        let mut esc = escalator(t0);
        let update = esc.update(Some(65.0), t0);
        assert_eq!(update.threshold.unwrap().new, ThresholdState::Ok);
        assert!(esc.threshold().is(ThresholdState::Ok));
    }

    #[test]
    fn test_no_estimate_counts_as_slow() {
        let t0 = Instant::now();
        let mut esc = escalator(t0);
        esc.update(None, t0);
        assert!(esc.threshold().is(ThresholdState::Slow));
    }

    #[test]
    fn test_brief_dip_does_not_warn() {
        let t0 = Instant::now();
        let mut esc = escalator(t0);

        esc.update(Some(70.0), secs(t0, 0));
        for s in 1..=5 {
            esc.update(Some(40.0), secs(t0, s));
        }
        // Slow for exactly 4s after entering at t=1
        assert!(esc.warning().is(WarningState::Ok));
        esc.update(Some(70.0), secs(t0, 6));
        assert!(esc.warning().is(WarningState::Ok));
    }

    #[test]
    fn test_full_escalation() {
        let t0 = Instant::now();
        let mut esc = escalator(t0);

        let mut warned_at = None;
        let mut consequences_at = None;
        for s in 0..=30 {
            let update = esc.update(Some(40.0), secs(t0, s));
            for change in &update.warning {
                match change.new {
                    WarningState::Warning => warned_at = Some(s),
                    WarningState::Consequences => consequences_at = Some(s),
                    WarningState::Ok => {}
                }
            }
        }
        // Slow since t=0: warning once held > 5s, consequences once warning held > 15s
        assert_eq!(warned_at, Some(6));
        assert_eq!(consequences_at, Some(22));
        assert!(esc.warning().is(WarningState::Consequences));
    }

    #[test]
    fn test_recovery_from_consequences_is_immediate() {
        let t0 = Instant::now();
        let mut esc = escalator(t0);

        for s in 0..=30 {
            esc.update(Some(10.0), secs(t0, s));
        }
        assert!(esc.warning().is(WarningState::Consequences));

        let update = esc.update(Some(90.0), secs(t0, 31));
        assert_eq!(update.warning.len(), 1);
        assert_eq!(update.warning[0].old, Some(WarningState::Consequences));
        assert_eq!(update.warning[0].new, WarningState::Ok);
    }

    #[test]
    fn test_recovery_wins_over_pending_escalation() {
        let t0 = Instant::now();
        let mut esc = escalator(t0);

        for s in 0..=20 {
            esc.update(Some(40.0), secs(t0, s));
        }
        assert!(esc.warning().is(WarningState::Warning));

        // Warning is old enough to escalate this tick, but pace recovered
        let update = esc.update(Some(70.0), secs(t0, 40));
        assert!(!update.entered_consequences());
        assert!(esc.warning().is(WarningState::Ok));
    }

    #[test]
    fn test_consequences_only_through_warning() {
        let t0 = Instant::now();
        let config = AlertConfig {
            slow_grace_secs: 0.0,
            warning_grace_secs: 0.0,
            ..Default::default()
        };
        let mut esc = AlertEscalator::new(&config, t0).unwrap();

        esc.update(Some(1.0), t0);
        let update = esc.update(Some(1.0), t0 + Duration::from_millis(1));
        assert_eq!(update.warning.len(), 1);
        assert_eq!(update.warning[0].new, WarningState::Warning);

        let update = esc.update(Some(1.0), t0 + Duration::from_millis(2));
        assert!(update.entered_consequences());
        assert_eq!(update.warning[0].old, Some(WarningState::Warning));
    }

    #[test]
    fn test_label_parsing() {
        assert_eq!("slow".parse::<ThresholdState>().unwrap(), ThresholdState::Slow);
        assert_eq!(
            "consequences".parse::<WarningState>().unwrap(),
            WarningState::Consequences
        );
        assert!("Warning".parse::<WarningState>().is_err());
        assert_eq!(WarningState::Consequences.to_string(), "consequences");
        assert_eq!(WarningState::Warning.level(), 1);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = AlertConfig {
            slow_grace_secs: -5.0,
            ..Default::default()
        };
        assert!(AlertEscalator::new(&config, Instant::now()).is_err());
    }
}
