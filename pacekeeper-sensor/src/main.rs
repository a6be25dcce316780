// Pacekeeper Sensor - Pedal sensor driver
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # pedal-sensor
//!
//! Reads lines from the proximity sensor (a serial tty, a file, or stdin),
//! counts pedal passes and keeps a node exporter textfile up to date.
//!
//! ## Usage
//!
//! ```bash
//! # Serial sensor, default textfile directory
//! pedal-sensor --input /dev/ttyACM0
//!
//! # Replay a capture into the current directory
//! pedal-sensor -d . < capture.txt
//! ```

mod error;
mod sensor;

use clap::Parser;
use error::SensorError;
use pacekeeper::{MonotonicClock, DEFAULT_METRIC_NAME};
use sensor::{resolve_textfile_dir, LineOutcome, Sensor};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

/// Pedal proximity sensor driver
#[derive(Parser, Debug)]
#[command(name = "pedal-sensor", author, version, about, long_about = None)]
struct Args {
    /// Line source: a device, a file, or `-` for stdin
    #[arg(short, long, default_value = "-")]
    input: PathBuf,

    /// Directory scraped by the node exporter textfile collector
    #[arg(short = 'd', long, default_value = "/opt/node_exporter_textfiles/")]
    textfile_dir: PathBuf,

    /// Textfile name inside the directory
    #[arg(long, default_value = "bike_sensor.prom")]
    textfile_name: String,

    /// Metric name for the pass counter
    #[arg(short, long, default_value = DEFAULT_METRIC_NAME)]
    metric_name: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
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

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(&args.log_level);

    info!("pedal-sensor v{}", env!("CARGO_PKG_VERSION"));

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), SensorError> {
    let dir = resolve_textfile_dir(&args.textfile_dir);
    let mut sensor = Sensor::new(dir.join(&args.textfile_name), args.metric_name, MonotonicClock)?;
    sensor.start()?;

    let input: Box<dyn AsyncRead + Unpin + Send> = if args.input.as_os_str() == "-" {
        info!("Reading sensor lines from stdin");
        Box::new(tokio::io::stdin())
    } else {
        info!("Reading sensor lines from {}", args.input.display());
        Box::new(tokio::fs::File::open(&args.input).await?)
    };
    let mut lines = BufReader::new(input).lines();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = &mut shutdown => {
                info!(count = sensor.count(), "Shutting down");
                return Ok(());
            }
        };
        let Some(line) = line else {
            info!(count = sensor.count(), "Input closed");
            return Ok(());
        };

        match sensor.handle_line(&line) {
            Ok(LineOutcome::Counted(true)) => info!(count = sensor.count(), "pass"),
            Ok(_) => {}
            Err(e) => warn!(path = %sensor.path().display(), error = %e, "failed to update textfile"),
        }
    }
}
