// Pacekeeper Watch - Pace watch driver
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # keep-up-the-pace
//!
//! Polls the pedal counter textfile written by `pedal-sensor`, estimates the
//! pace over a trailing window and escalates `ok -> warning -> consequences`
//! when it stays below target.
//!
//! ## Usage
//!
//! ```bash
//! # Defaults: 65 rpm over a 15s window
//! keep-up-the-pace
//!
//! # Custom target, JSON reports, and a hook on consequences
//! keep-up-the-pace --target 80 --json --on-consequences 'notify-send "Pedal!"'
//! ```

mod action;
mod error;
mod metrics;
mod watcher;

use action::ConsequenceAction;
use clap::Parser;
use error::WatchError;
use metrics::StatusMetrics;
use pacekeeper::textfile::write_atomic;
use pacekeeper::{MonotonicClock, PaceConfig, PaceReport, DEFAULT_METRIC_NAME};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;
use watcher::{FileCounterSource, Watcher};

/// Pedal pace watcher
#[derive(Parser, Debug)]
#[command(name = "keep-up-the-pace", author, version, about, long_about = None)]
struct Args {
    /// Metrics textfile holding the pedal counter
    #[arg(short, long, default_value = "/opt/node_exporter_textfiles/bike_sensor.prom")]
    filename: PathBuf,

    /// Metric name of the counter inside the textfile
    #[arg(short, long, default_value = DEFAULT_METRIC_NAME)]
    metric_name: String,

    /// Target pace in events per minute [default: 65]
    #[arg(short, long)]
    target: Option<f64>,

    /// Trailing window for the pace estimate, in seconds [default: 15]
    #[arg(long)]
    time_window: Option<f64>,

    /// Seconds of slow pace tolerated before warning [default: 5]
    #[arg(long)]
    slow_grace: Option<f64>,

    /// Seconds a warning may last before consequences [default: 15]
    #[arg(long)]
    warning_grace: Option<f64>,

    /// Poll interval in milliseconds
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
    interval_ms: u64,

    /// JSON configuration file; explicit flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print one JSON report per tick instead of the status line
    #[arg(long)]
    json: bool,

    /// Shell command run each time the alert enters consequences
    #[arg(long)]
    on_consequences: Option<String>,

    /// Also write status gauges to this textfile
    #[arg(long)]
    status_textfile: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    /// Configuration file (or defaults) with flag overrides applied.
    fn build_config(&self) -> Result<PaceConfig, WatchError> {
        let mut config = match &self.config {
            Some(path) => PaceConfig::from_json(&std::fs::read_to_string(path)?)?,
            None => PaceConfig::default(),
        };
        if let Some(target) = self.target {
            config.alert.target_threshold = target;
        }
        if let Some(secs) = self.time_window {
            config.rate.time_window_secs = secs;
        }
        if let Some(secs) = self.slow_grace {
            config.alert.slow_grace_secs = secs;
        }
        if let Some(secs) = self.warning_grace {
            config.alert.warning_grace_secs = secs;
        }
        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        EnvFilter::from_default_env().add_directive(level.into())
    });

    // Status lines own stdout
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(&args.log_level);

    info!("keep-up-the-pace v{}", env!("CARGO_PKG_VERSION"));

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), WatchError> {
    let config = args.build_config()?;
    info!(
        target = config.alert.target_threshold,
        window_secs = config.rate.time_window_secs,
        slow_grace_secs = config.alert.slow_grace_secs,
        warning_grace_secs = config.alert.warning_grace_secs,
        "pace configuration"
    );

    let source = FileCounterSource::new(&args.filename, &args.metric_name)?;
    info!("Watching {} for {}", source.path().display(), args.metric_name);

    let mut watcher = Watcher::new(source, MonotonicClock, &config)?;
    let metrics = match args.status_textfile {
        Some(_) => Some(StatusMetrics::new()?),
        None => None,
    };
    let action = args.on_consequences.as_deref().map(ConsequenceAction::new);
    if let Some(action) = &action {
        info!(command = action.command(), "Consequence action armed");
    }

    let mut interval = tokio::time::interval(Duration::from_millis(args.interval_ms));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = &mut shutdown => {
                info!(
                    ticks = watcher.ticks(),
                    missing = watcher.missing(),
                    warning = %watcher.monitor().escalator().warning().value().unwrap_or_default(),
                    "Shutting down"
                );
                return Ok(());
            }
        }

        let report = match watcher.tick() {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "tick skipped");
                continue;
            }
        };

        print_report(&report, args.json);

        if let (Some(metrics), Some(path)) = (&metrics, &args.status_textfile) {
            metrics.observe(&report);
            let written = metrics
                .encode()
                .map_err(WatchError::from)
                .and_then(|text| write_atomic(path, &text).map_err(WatchError::from));
            if let Err(e) = written {
                warn!(path = %path.display(), error = %e, "failed to write status textfile");
            }
        }

        if report.changes.entered_consequences() {
            if let Some(action) = &action {
                action.spawn();
            }
        }
    }
}

fn print_report(report: &PaceReport, json: bool) {
    if !json {
        println!("{}", report);
        return;
    }
    match report.to_json() {
        Ok(line) => println!("{}", line),
        Err(e) => warn!(error = %e, "failed to serialize report"),
    }
}
