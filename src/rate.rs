// Pacekeeper - Pedal pace monitoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Windowed rate estimation over a cumulative counter.
//!
//! Samples arrive once per poll, at irregular spacing. Each observation looks
//! back for the newest retained sample older than the time window (the
//! anchor) and reports the counter slope between the anchor and now, in
//! events per minute. When nothing is old enough yet, the oldest retained
//! sample is used instead, giving a best-effort short-window estimate.
//!
//! The buffer is trimmed to start at the anchor, so it holds roughly
//! `time_window / poll_interval` samples.

use crate::error::{PaceError, Result};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

const MACHINE: &str = "RateEstimator";

/// A timestamped counter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub timestamp: Instant,
    pub value: u64,
}

/// Trailing-window rate estimator.
#[derive(Debug, Clone)]
pub struct RateEstimator {
    /// Retained samples, oldest first.
    samples: VecDeque<Sample>,
    time_window: Duration,
}

impl RateEstimator {
    pub fn new(time_window: Duration) -> Self {
        Self {
            samples: VecDeque::new(),
            time_window,
        }
    }

    /// Observe the counter at `now` and estimate the rate per minute.
    ///
    /// `count` is `None` when no sample could be read this tick; the buffer
    /// is left untouched and no estimate is produced. The first real sample
    /// also yields `None` since there is nothing to compare against.
    ///
    /// `now` must be strictly later than the previous sample, otherwise
    /// [`PaceError::NonMonotonicTime`] is returned and nothing is stored.
    pub fn observe(&mut self, now: Instant, count: Option<u64>) -> Result<Option<f64>> {
        let Some(count) = count else {
            return Ok(None);
        };

        if let Some(newest) = self.samples.back() {
            if now <= newest.timestamp {
                return Err(PaceError::NonMonotonicTime { machine: MACHINE });
            }
        }

        let rate = match self.find_anchor(now) {
            Some(index) => {
                let anchor = self.samples[index];
                let seconds = now.duration_since(anchor.timestamp).as_secs_f64();
                let delta = count as f64 - anchor.value as f64;
                let per_minute = delta / seconds * 60.0;

                if index > 0 {
                    log::trace!("{}: dropping {} samples older than anchor", MACHINE, index);
                    self.samples.drain(..index);
                }
                log::debug!(
                    "{}: {:.2}/min over {:.1}s ({} events)",
                    MACHINE,
                    per_minute,
                    seconds,
                    delta
                );
                Some(per_minute)
            }
            None => None,
        };

        self.samples.push_back(Sample {
            timestamp: now,
            value: count,
        });

        Ok(rate)
    }

    /// Index of the anchor sample for an observation at `now`.
    ///
    /// Newest sample strictly older than the window, else the oldest sample,
    /// else nothing.
    fn find_anchor(&self, now: Instant) -> Option<usize> {
        self.samples
            .iter()
            .rposition(|s| now.saturating_duration_since(s.timestamp) > self.time_window)
            .or(if self.samples.is_empty() { None } else { Some(0) })
    }

    pub fn time_window(&self) -> Duration {
        self.time_window
    }

    /// Retained samples, oldest first.
    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Forget all samples.
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
