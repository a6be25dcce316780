// Pacekeeper - Pedal pace monitoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Error types for Pacekeeper
//!
//! [`PaceError`] covers invariant violations inside the core state machines.
//! [`TextfileError`] covers the metrics textfile, which is the only place the
//! library touches the filesystem.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, PaceError>;

/// Main error type for core operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PaceError {
    /// A state holder was given a value outside its enumerated domain
    #[error("Value {value:?} is not a valid {machine} (expected one of {expected})")]
    InvalidStateValue {
        machine: &'static str,
        value: String,
        expected: String,
    },

    /// Timestamps went backwards or did not advance
    #[error("{machine}: timestamps must be strictly increasing")]
    NonMonotonicTime { machine: &'static str },

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Errors reading or writing the metrics textfile
#[derive(Error, Debug)]
pub enum TextfileError {
    /// Underlying filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Renaming the temporary file over the destination failed
    #[error("Failed to persist {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Metric names are letters, digits and underscores, not starting with a digit
    #[error("Invalid metric name: {0:?}")]
    InvalidMetricName(String),

    /// Line is not `<metric_name> <number>`
    #[error("Invalid metric line: {0:?}")]
    InvalidLine(String),
}
