// Pacekeeper Watch - Status metrics
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Prometheus gauges describing the watch state.
//!
//! Written to a textfile after every tick when `--status-textfile` is set, so
//! the same node exporter that collects the pedal counter can scrape the
//! alert level too.

use pacekeeper::{PaceReport, ThresholdState};
use prometheus::{Encoder, Gauge, IntCounterVec, Opts, Registry, TextEncoder};

/// Status metrics owned by one watch loop.
pub struct StatusMetrics {
    registry: Registry,
    rate: Gauge,
    threshold: Gauge,
    warning: Gauge,
    changes: IntCounterVec,
}

impl StatusMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let rate = Gauge::new(
            "pace_rate_per_minute",
            "Estimated pace in events per minute (-1 when there is no estimate)",
        )?;
        let threshold = Gauge::new(
            "pace_threshold_state",
            "Pace against target (0=slow, 1=ok, -1=unset)",
        )?;
        let warning = Gauge::new(
            "pace_warning_state",
            "Alert level (0=ok, 1=warning, 2=consequences)",
        )?;
        let changes = IntCounterVec::new(
            Opts::new("pace_state_changes_total", "State machine transitions"),
            &["machine"],
        )?;

        let registry = Registry::new();
        registry.register(Box::new(rate.clone()))?;
        registry.register(Box::new(threshold.clone()))?;
        registry.register(Box::new(warning.clone()))?;
        registry.register(Box::new(changes.clone()))?;

        Ok(Self {
            registry,
            rate,
            threshold,
            warning,
            changes,
        })
    }

    /// Update from one tick report.
    pub fn observe(&self, report: &PaceReport) {
        self.rate.set(report.display_rate());
        self.threshold.set(match report.threshold {
            Some(ThresholdState::Slow) => 0.0,
            Some(ThresholdState::Ok) => 1.0,
            None => -1.0,
        });
        self.warning.set(f64::from(report.warning.level()));

        if let Some(change) = &report.changes.threshold {
            self.changes.with_label_values(&[change.machine]).inc();
        }
        for change in &report.changes.warning {
            self.changes.with_label_values(&[change.machine]).inc();
        }
    }

    /// Encode to the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacekeeper::{PaceConfig, PaceMonitor};
    use std::time::{Duration, Instant};

    #[test]
    fn test_encode_before_any_tick() {
        let metrics = StatusMetrics::new().unwrap();
        let output = metrics.encode().unwrap();
        assert!(output.contains("pace_rate_per_minute 0"));
        assert!(output.contains("pace_warning_state 0"));
    }

    #[test]
    fn test_observe_reports() {
        let t0 = Instant::now();
        let mut monitor = PaceMonitor::new(&PaceConfig::default(), t0).unwrap();
        let metrics = StatusMetrics::new().unwrap();

        metrics.observe(&monitor.tick(t0, Some(0)).unwrap());
        let output = metrics.encode().unwrap();
        assert!(output.contains("pace_rate_per_minute -1"));
        assert!(output.contains("pace_threshold_state 0"));
        assert!(output.contains("pace_state_changes_total{machine=\"ThresholdState\"} 1"));

        metrics.observe(&monitor.tick(t0 + Duration::from_secs(10), Some(12)).unwrap());
        let output = metrics.encode().unwrap();
        assert!(output.contains("pace_rate_per_minute 72"));
        assert!(output.contains("pace_threshold_state 1"));
        assert!(output.contains("pace_state_changes_total{machine=\"ThresholdState\"} 2"));
        assert!(!output.contains("machine=\"WarningState\""));
    }

    #[test]
    fn test_registries_are_independent() {
        let a = StatusMetrics::new().unwrap();
        let b = StatusMetrics::new().unwrap();
        a.rate.set(10.0);
        assert!(b.encode().unwrap().contains("pace_rate_per_minute 0"));
    }
}
