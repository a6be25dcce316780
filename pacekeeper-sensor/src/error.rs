// Pacekeeper Sensor - Pedal sensor driver
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Sensor driver errors.

use pacekeeper::TextfileError;

#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("Textfile error: {0}")]
    Textfile(#[from] TextfileError),

    #[error("Input error: {0}")]
    Io(#[from] std::io::Error),
}
