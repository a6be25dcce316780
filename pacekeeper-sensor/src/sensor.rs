// Pacekeeper Sensor - Pedal sensor driver
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Line handling for the sensor driver.
//!
//! The sensor board prints either ready-made metric lines or raw proximity
//! readings. Metric lines are relayed as-is; readings go through a
//! [`PassCounter`] and the running count is published instead.

use crate::error::SensorError;
use pacekeeper::textfile::{is_metric_line, is_writable_dir, validate_metric_name, write_counter, write_line};
use pacekeeper::{Clock, PassCounter, ProximityReading};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Marker printed by the sensor board before the reading.
const PROXIMITY_MARKER: &str = "Proximity = ";

/// What an input line turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorLine<'a> {
    /// `<metric_name> <number>`, relayed verbatim.
    Metric(&'a str),
    /// A raw proximity reading.
    Proximity(ProximityReading),
    /// Anything else.
    Other(&'a str),
}

impl<'a> SensorLine<'a> {
    /// Classify one line; trailing whitespace and line endings are ignored.
    pub fn classify(line: &'a str) -> Self {
        let line = line.trim();
        if is_metric_line(line) {
            return SensorLine::Metric(line);
        }
        match parse_proximity(line) {
            Some(reading) => SensorLine::Proximity(reading),
            None => SensorLine::Other(line),
        }
    }
}

/// A bare integer, or the digits following `Proximity = `.
fn parse_proximity(line: &str) -> Option<ProximityReading> {
    if is_digits(line) {
        return line.parse().ok();
    }
    let (_, rest) = line.split_once(PROXIMITY_MARKER)?;
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Pick the textfile directory, falling back to `./` when `preferred` is not
/// writable.
pub fn resolve_textfile_dir(preferred: &Path) -> PathBuf {
    if is_writable_dir(preferred) {
        return preferred.to_path_buf();
    }
    warn!(
        "Textfile directory {} is not writable. Falling back to the current directory",
        preferred.display()
    );
    PathBuf::from("./")
}

/// Result of handling one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    Relayed,
    /// Reading consumed; `true` when it completed a pass and the count was written.
    Counted(bool),
    Ignored,
}

/// Pass counter plus the textfile it publishes to.
pub struct Sensor<C> {
    counter: PassCounter,
    clock: C,
    path: PathBuf,
    metric_name: String,
}

impl<C: Clock> Sensor<C> {
    pub fn new(path: PathBuf, metric_name: String, clock: C) -> Result<Self, SensorError> {
        validate_metric_name(&metric_name)?;
        Ok(Self {
            counter: PassCounter::new(),
            clock,
            path,
            metric_name,
        })
    }

    /// Publish the initial count so readers find the file straight away.
    pub fn start(&self) -> Result<(), SensorError> {
        write_counter(&self.path, &self.metric_name, self.counter.count())?;
        info!(
            path = %self.path.display(),
            metric = %self.metric_name,
            "Publishing pedal count"
        );
        Ok(())
    }

    pub fn handle_line(&mut self, line: &str) -> Result<LineOutcome, SensorError> {
        match SensorLine::classify(line) {
            SensorLine::Metric(metric) => {
                write_line(&self.path, metric)?;
                debug!(line = metric, "relayed metric line");
                Ok(LineOutcome::Relayed)
            }
            SensorLine::Proximity(reading) => {
                let now = self.clock.now();
                if !self.counter.update(reading, now) {
                    return Ok(LineOutcome::Counted(false));
                }
                write_counter(&self.path, &self.metric_name, self.counter.count())?;
                debug!(
                    count = self.counter.count(),
                    duration = ?self.counter.last_pass_duration(),
                    "pass"
                );
                Ok(LineOutcome::Counted(true))
            }
            SensorLine::Other(other) => {
                debug!(line = other, "ignored input line");
                Ok(LineOutcome::Ignored)
            }
        }
    }

    pub fn count(&self) -> u64 {
        self.counter.count()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacekeeper::textfile::read_counter;
    use pacekeeper::ManualClock;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_classify() {
        assert_eq!(
            SensorLine::classify("bike_sensor_pedal_count 12\r\n"),
            SensorLine::Metric("bike_sensor_pedal_count 12")
        );
        assert_eq!(SensorLine::classify("3"), SensorLine::Proximity(3));
        assert_eq!(
            SensorLine::classify("Color = 12, 9, 14, Proximity = 7"),
            SensorLine::Proximity(7)
        );
        assert_eq!(
            SensorLine::classify("Proximity Trinkey Practice"),
            SensorLine::Other("Proximity Trinkey Practice")
        );
        assert_eq!(SensorLine::classify("-2"), SensorLine::Other("-2"));
        assert_eq!(SensorLine::classify("+3"), SensorLine::Other("+3"));
        assert_eq!(
            SensorLine::classify("Proximity = +3"),
            SensorLine::Other("Proximity = +3")
        );
        assert_eq!(SensorLine::classify(""), SensorLine::Other(""));
    }

    #[test]
    fn test_start_publishes_zero() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bike_sensor.prom");
        let sensor = Sensor::new(path.clone(), "pedals".to_string(), ManualClock::new()).unwrap();

        sensor.start().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "pedals 0\n");
    }

    #[test]
    fn test_readings_update_count_on_pass() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bike_sensor.prom");
        let clock = ManualClock::new();
        let mut sensor = Sensor::new(path.clone(), "pedals".to_string(), &clock).unwrap();
        sensor.start().unwrap();

        let mut outcomes = Vec::new();
        for line in ["0", "1", "Color = 1, 2, 3, Proximity = 4", "4", "0", "2", "0"] {
            clock.advance_secs(0.01);
            outcomes.push(sensor.handle_line(line).unwrap());
        }

        assert_eq!(
            outcomes,
            vec![
                LineOutcome::Counted(false),
                LineOutcome::Counted(false),
                LineOutcome::Counted(true),
                LineOutcome::Counted(false),
                LineOutcome::Counted(false),
                LineOutcome::Counted(true),
                LineOutcome::Counted(false),
            ]
        );
        assert_eq!(sensor.count(), 2);
        assert_eq!(read_counter(&path, "pedals").unwrap(), Some(2));
    }

    #[test]
    fn test_metric_lines_relayed_verbatim() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bike_sensor.prom");
        let mut sensor = Sensor::new(path.clone(), "pedals".to_string(), ManualClock::new()).unwrap();

        assert_eq!(sensor.handle_line("pedals 41\n").unwrap(), LineOutcome::Relayed);
        assert_eq!(fs::read_to_string(&path).unwrap(), "pedals 41\n");

        assert_eq!(sensor.handle_line("hello there").unwrap(), LineOutcome::Ignored);
        assert_eq!(fs::read_to_string(&path).unwrap(), "pedals 41\n");
    }

    #[test]
    fn test_invalid_metric_name_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bike_sensor.prom");
        assert!(Sensor::new(path, "2fast".to_string(), ManualClock::new()).is_err());
    }

    #[test]
    fn test_resolve_textfile_dir() {
        let dir = tempdir().unwrap();
        assert_eq!(resolve_textfile_dir(dir.path()), dir.path().to_path_buf());
        assert_eq!(
            resolve_textfile_dir(&dir.path().join("missing")),
            PathBuf::from("./")
        );
    }
}
