// Pacekeeper - Pedal pace monitoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Timed enum state
//!
//! A [`TimedState`] holds one value of a small fixed enumeration together
//! with the instant of its last change, so callers can ask how long the
//! current value has been held. Both alert machines are built on it.
//!
//! Setting the value it already holds is a no-op: the change instant is
//! kept and no [`StateChange`] is produced.

use crate::error::{PaceError, Result};
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};

/// A fixed enumeration usable inside a [`TimedState`].
pub trait StateValue: Copy + Eq + fmt::Debug + 'static {
    /// Name of the state machine, used in logs and status lines.
    const MACHINE: &'static str;

    /// Every member of the enumeration, in severity order.
    const ALL: &'static [Self];

    /// Lowercase label.
    fn as_str(&self) -> &'static str;

    /// Parse a label, failing loudly on anything outside [`Self::ALL`].
    fn parse_label(label: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.as_str() == label)
            .ok_or_else(|| PaceError::InvalidStateValue {
                machine: Self::MACHINE,
                value: label.to_string(),
                expected: Self::ALL
                    .iter()
                    .map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

/// Notification emitted when a [`TimedState`] changes value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StateChange<S> {
    /// Machine name.
    pub machine: &'static str,
    /// Previous value, `None` if the state was never set.
    pub old: Option<S>,
    /// New value.
    pub new: S,
}

impl<S: StateValue> fmt::Display for StateChange<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} change {} -> {}",
            self.machine,
            label(self.old),
            self.new.as_str()
        )
    }
}

/// A value from a fixed enumeration plus the instant it last changed.
#[derive(Debug, Clone)]
pub struct TimedState<S: StateValue> {
    value: Option<S>,
    last_change: Instant,
}

impl<S: StateValue> TimedState<S> {
    /// Create a state holding `initial`, changed as of `now`.
    pub fn new(initial: S, now: Instant) -> Self {
        Self {
            value: Some(initial),
            last_change: now,
        }
    }

    /// Create a state with no value yet. Its age counts from `now`.
    pub fn unset(now: Instant) -> Self {
        Self {
            value: None,
            last_change: now,
        }
    }

    /// Current value.
    pub fn value(&self) -> Option<S> {
        self.value
    }

    /// Whether the current value is `state`.
    pub fn is(&self, state: S) -> bool {
        self.value == Some(state)
    }

    /// Time since the last change.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_change)
    }

    /// Whether the value is `state` and has been held strictly longer than `over`.
    pub fn held_longer_than(&self, state: S, over: Duration, now: Instant) -> bool {
        self.is(state) && self.age(now) > over
    }

    /// Set the value. Returns the change, or `None` if the value was already held.
    pub fn set(&mut self, value: S, now: Instant) -> Option<StateChange<S>> {
        if self.value == Some(value) {
            return None;
        }

        let change = StateChange {
            machine: S::MACHINE,
            old: self.value,
            new: value,
        };
        self.value = Some(value);
        self.last_change = now;

        log::info!("{}", change);
        Some(change)
    }

    /// Set the value from its label.
    pub fn set_label(&mut self, label: &str, now: Instant) -> Result<Option<StateChange<S>>> {
        let value = S::parse_label(label)?;
        Ok(self.set(value, now))
    }

    /// `Machine:value:age` with the age in seconds to one decimal.
    pub fn show(&self, now: Instant) -> String {
        format!(
            "{}:{}:{:.1}",
            S::MACHINE,
            label(self.value),
            self.age(now).as_secs_f64()
        )
    }
}

/// Label of an optional state value; unset prints as `none`.
pub fn label<S: StateValue>(value: Option<S>) -> &'static str {
    value.map_or("none", |v| v.as_str())
}
