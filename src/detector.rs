// Pacekeeper - Pedal pace monitoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Edge detection on proximity readings
//!
//! Turns a jittery proximity magnitude into one count per physical pass.
//!
//! ```text
//!              reading == 1            reading > 1
//!   Nothing ───────────────► Uncertain ───────────► Something (+1)
//!      │  ▲                     │                      │
//!      │  └──── reading == 0 ───┘                      │
//!      │  ▲                                            │
//!      │  └──────────────── reading == 0 ──────────────┘
//!      └──────────────────── reading > 1 ──────────────► Something (+1)
//! ```
//!
//! A single reading of 1 is held in `Uncertain` until the next tick resolves
//! it. Only entering `Something` counts, so a pass that stays in view for
//! many ticks is counted once.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Raw proximity magnitude: 0 = nothing, 1 = weak, >1 = confident.
pub type ProximityReading = u32;

/// Detector state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DetectionState {
    /// Nothing in view
    #[default]
    Nothing,
    /// A single weak reading, not yet confirmed
    Uncertain,
    /// Something is passing
    Something,
}

impl DetectionState {
    /// Transition table. Returns the next state and whether a pass was detected.
    pub fn next(self, reading: ProximityReading) -> (Self, bool) {
        match (self, reading) {
            (DetectionState::Nothing, 0) => (DetectionState::Nothing, false),
            (DetectionState::Nothing, 1) => (DetectionState::Uncertain, false),
            (DetectionState::Nothing, _) => (DetectionState::Something, true),

            (DetectionState::Uncertain, 0) => (DetectionState::Nothing, false),
            (DetectionState::Uncertain, 1) => (DetectionState::Uncertain, false),
            (DetectionState::Uncertain, _) => (DetectionState::Something, true),

            (DetectionState::Something, 0) => (DetectionState::Nothing, false),
            (DetectionState::Something, _) => (DetectionState::Something, false),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionState::Nothing => "nothing",
            DetectionState::Uncertain => "uncertain",
            DetectionState::Something => "something",
        }
    }
}

/// Per-tick edge detector.
#[derive(Debug, Clone, Default)]
pub struct EdgeDetector {
    state: DetectionState,
    /// When the current `Something` episode started.
    something_since: Option<Instant>,
    /// Duration of the last completed `Something` episode.
    last_pass_duration: Option<Duration>,
}

impl EdgeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one reading. Returns `true` exactly on the tick a pass begins.
    pub fn update(&mut self, reading: ProximityReading, now: Instant) -> bool {
        let (next, detected) = self.state.next(reading);

        if next == DetectionState::Something && self.state != DetectionState::Something {
            self.something_since = Some(now);
        }
        if self.state == DetectionState::Something && next == DetectionState::Nothing {
            if let Some(since) = self.something_since.take() {
                let duration = now.saturating_duration_since(since);
                log::debug!("pass ended after {:?}", duration);
                self.last_pass_duration = Some(duration);
            }
        }

        self.state = next;
        detected
    }

    pub fn state(&self) -> DetectionState {
        self.state
    }

    /// How long the object stayed in view during the last completed pass.
    pub fn last_pass_duration(&self) -> Option<Duration> {
        self.last_pass_duration
    }
}

/// Edge detector plus the running pass count.
#[derive(Debug, Clone, Default)]
pub struct PassCounter {
    detector: EdgeDetector,
    count: u64,
}

impl PassCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume counting from an existing total.
    pub fn with_count(count: u64) -> Self {
        Self {
            detector: EdgeDetector::new(),
            count,
        }
    }

    /// Feed one reading. Returns `true` when the count went up.
    pub fn update(&mut self, reading: ProximityReading, now: Instant) -> bool {
        let detected = self.detector.update(reading, now);
        if detected {
            self.count += 1;
            log::debug!("pass detected, count={}", self.count);
        }
        detected
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn state(&self) -> DetectionState {
        self.detector.state()
    }

    pub fn last_pass_duration(&self) -> Option<Duration> {
        self.detector.last_pass_duration()
    }
}
