// Pacekeeper Watch - Pace watch driver
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Watch driver errors.

use pacekeeper::{PaceError, TextfileError};
use std::path::PathBuf;

/// Errors that stop the watch driver.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("Metrics file {0} does not exist yet")]
    MetricsFileMissing(PathBuf),

    #[error("Core error: {0}")]
    Pace(#[from] PaceError),

    #[error("Textfile error: {0}")]
    Textfile(#[from] TextfileError),

    #[error("Config file error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
