// Pacekeeper Watch - Pace watch driver
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Tick driver: read the counter, run the monitor, report.
//!
//! Time and the counter source are injected so the whole loop body can be
//! exercised on simulated time.

use crate::error::WatchError;
use pacekeeper::textfile::{read_counter, validate_metric_name};
use pacekeeper::{Clock, PaceConfig, PaceMonitor, PaceReport, TextfileError};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Where the cumulative counter comes from.
pub trait CounterSource {
    /// Current counter value; `Ok(None)` when the source has no matching value.
    fn read_counter(&mut self) -> Result<Option<u64>, TextfileError>;
}

/// Counter read from a metrics textfile.
#[derive(Debug, Clone)]
pub struct FileCounterSource {
    path: PathBuf,
    metric_name: String,
}

impl FileCounterSource {
    /// The file must exist at start-up; later read failures are per-tick.
    pub fn new(path: impl Into<PathBuf>, metric_name: impl Into<String>) -> Result<Self, WatchError> {
        let path = path.into();
        let metric_name = metric_name.into();
        validate_metric_name(&metric_name)?;
        if !path.exists() {
            return Err(WatchError::MetricsFileMissing(path));
        }
        Ok(Self { path, metric_name })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CounterSource for FileCounterSource {
    fn read_counter(&mut self) -> Result<Option<u64>, TextfileError> {
        read_counter(&self.path, &self.metric_name)
    }
}

/// Watch loop state.
pub struct Watcher<S, C> {
    source: S,
    clock: C,
    monitor: PaceMonitor,
    ticks: u64,
    missing: u64,
}

impl<S: CounterSource, C: Clock> Watcher<S, C> {
    pub fn new(source: S, clock: C, config: &PaceConfig) -> Result<Self, WatchError> {
        let monitor = PaceMonitor::new(config, clock.now())?;
        Ok(Self {
            source,
            clock,
            monitor,
            ticks: 0,
            missing: 0,
        })
    }

    /// Run one tick. Unreadable or unmatched sources give a no-estimate tick.
    pub fn tick(&mut self) -> Result<PaceReport, WatchError> {
        let count = match self.source.read_counter() {
            Ok(Some(count)) => Some(count),
            Ok(None) => {
                warn!("no counter value in metrics source");
                None
            }
            Err(e) => {
                warn!(error = %e, "failed to read metrics source");
                None
            }
        };
        if count.is_none() {
            self.missing += 1;
        }

        let now = self.clock.now();
        let report = self.monitor.tick(now, count)?;
        self.ticks += 1;

        debug!(
            tick = self.ticks,
            count = ?count,
            rate = ?report.rate_per_minute,
            "tick"
        );
        Ok(report)
    }

    /// Ticks completed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Ticks without a counter value.
    pub fn missing(&self) -> u64 {
        self.missing
    }

    pub fn monitor(&self) -> &PaceMonitor {
        &self.monitor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacekeeper::textfile::write_counter;
    use pacekeeper::{ManualClock, WarningState};
    use std::collections::VecDeque;
    use tempfile::tempdir;

    /// Replays a fixed list of reads.
    struct ScriptedSource(VecDeque<Result<Option<u64>, TextfileError>>);

    impl CounterSource for ScriptedSource {
        fn read_counter(&mut self) -> Result<Option<u64>, TextfileError> {
            self.0.pop_front().unwrap_or(Ok(None))
        }
    }

    #[test]
    fn test_missing_file_rejected_at_startup() {
        let dir = tempdir().unwrap();
        let err = FileCounterSource::new(dir.path().join("bike.prom"), "pedals").unwrap_err();
        assert!(matches!(err, WatchError::MetricsFileMissing(_)));
    }

    #[test]
    fn test_invalid_metric_name_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bike.prom");
        write_counter(&path, "pedals", 0).unwrap();
        assert!(FileCounterSource::new(&path, "bad name").is_err());
    }

    #[test]
    fn test_file_source_ticks() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bike.prom");
        write_counter(&path, "pedals", 0).unwrap();

        let clock = ManualClock::new();
        let source = FileCounterSource::new(&path, "pedals").unwrap();
        let mut watcher = Watcher::new(source, &clock, &PaceConfig::default()).unwrap();

        clock.advance_secs(1.0);
        assert_eq!(watcher.tick().unwrap().rate_per_minute, None);

        write_counter(&path, "pedals", 2).unwrap();
        clock.advance_secs(1.0);
        let report = watcher.tick().unwrap();
        assert_eq!(report.rate_per_minute, Some(120.0));
        assert_eq!(
            report.to_string(),
            "120.00rpm - ThresholdState:ok:0.0 WarningState:ok:2.0"
        );
        assert_eq!(watcher.monitor().estimator().len(), 2);
    }

    #[test]
    fn test_file_vanishing_is_not_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bike.prom");
        write_counter(&path, "pedals", 0).unwrap();

        let clock = ManualClock::new();
        let source = FileCounterSource::new(&path, "pedals").unwrap();
        let mut watcher = Watcher::new(source, &clock, &PaceConfig::default()).unwrap();

        std::fs::remove_file(&path).unwrap();
        clock.advance_secs(1.0);
        let report = watcher.tick().unwrap();
        assert_eq!(report.rate_per_minute, None);
        assert_eq!(watcher.missing(), 1);
    }

    #[test]
    fn test_read_errors_escalate_like_no_data() {
        let reads = (0..30)
            .map(|_| Err(TextfileError::InvalidLine("garbage".to_string())))
            .collect();
        let clock = ManualClock::new();
        let mut watcher =
            Watcher::new(ScriptedSource(reads), &clock, &PaceConfig::default()).unwrap();

        let mut last = None;
        for _ in 0..30 {
            clock.advance_secs(1.0);
            last = Some(watcher.tick().unwrap().warning);
        }
        assert_eq!(last, Some(WarningState::Consequences));
        assert_eq!(watcher.ticks(), 30);
        assert_eq!(watcher.missing(), 30);
    }

    #[test]
    fn test_steady_pace_stays_ok() {
        let reads = (0..60u64).map(|i| Ok(Some(i * 80 / 60))).collect();
        let clock = ManualClock::new();
        let mut watcher =
            Watcher::new(ScriptedSource(reads), &clock, &PaceConfig::default()).unwrap();

        let mut reports = Vec::new();
        for _ in 0..60 {
            clock.advance_secs(1.0);
            reports.push(watcher.tick().unwrap());
        }
        assert!(reports.iter().all(|r| r.warning == WarningState::Ok));
        let last_rate = reports.last().unwrap().rate_per_minute.unwrap();
        assert!((last_rate - 80.0).abs() < 5.0, "rate = {}", last_rate);
    }
}
