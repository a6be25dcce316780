//! # Pacekeeper - Pedal pace monitoring
//!
//! Turns noisy proximity readings from a pedal sensor into a pass count, a
//! smoothed pace in events per minute, and an alert level with hysteresis.
//!
//! ## Key Features
//!
//! - **Edge detection**: One count per physical pass; a lone weak reading is
//!   held as uncertain instead of being counted or dropped
//! - **Windowed rate**: Pace over a trailing time window from sparse,
//!   irregular polls of a cumulative counter
//! - **Cascading alerts**: `ok -> warning -> consequences` with dwell times on
//!   the way up and instant recovery on the way down
//!
//! ## Quick Start
//!
//! ```rust
//! use pacekeeper::{PaceConfig, PaceMonitor, PassCounter, WarningState};
//! use std::time::{Duration, Instant};
//!
//! let t0 = Instant::now();
//!
//! // Sensor side: debounce readings into a counter
//! let mut counter = PassCounter::new();
//! for (i, reading) in [0, 1, 3, 3, 0, 2, 0].into_iter().enumerate() {
//!     counter.update(reading, t0 + Duration::from_millis(10 * i as u64));
//! }
//! assert_eq!(counter.count(), 2);
//!
//! // Watch side: estimate pace and escalate
//! let mut monitor = PaceMonitor::new(&PaceConfig::default(), t0).unwrap();
//! monitor.tick(t0, Some(0)).unwrap();
//! let report = monitor.tick(t0 + Duration::from_secs(10), Some(12)).unwrap();
//! assert_eq!(report.rate_per_minute, Some(72.0));
//! assert_eq!(report.warning, WarningState::Ok);
//! ```
//!
//! ## Modules
//!
//! - [`detector`]: Proximity edge detection and pass counting
//! - [`rate`]: Trailing-window rate estimation
//! - [`state`]: Timed enum state shared by the alert machines
//! - [`escalator`]: Threshold and warning hysteresis machines
//! - [`monitor`]: One tick of rate estimation plus escalation
//! - [`clock`]: Real and simulated time sources
//! - [`config`]: Configuration with defaults
//! - [`textfile`]: The `<metric_name> <integer>` metrics textfile

// Modules
pub mod clock;
pub mod config;
pub mod detector;
pub mod error;
pub mod escalator;
pub mod monitor;
pub mod rate;
pub mod state;
pub mod textfile;

// Re-exports for convenient access
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{AlertConfig, PaceConfig, RateConfig, DEFAULT_TARGET};
pub use detector::{DetectionState, EdgeDetector, PassCounter, ProximityReading};
pub use error::{PaceError, Result, TextfileError};
pub use escalator::{AlertEscalator, AlertUpdate, ThresholdState, WarningState, NO_ESTIMATE_SENTINEL};
pub use monitor::{PaceMonitor, PaceReport};
pub use rate::{RateEstimator, Sample};
pub use state::{StateChange, StateValue, TimedState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Metric name shared by the sensor and watch drivers
pub const DEFAULT_METRIC_NAME: &str = "bike_sensor_pedal_count";
