// Pacekeeper Watch - Consequence action
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Shell command run when the alert reaches `consequences`.

use std::io;
use std::process::ExitStatus;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// A user-supplied `sh -c` command.
#[derive(Debug, Clone)]
pub struct ConsequenceAction {
    command: String,
}

impl ConsequenceAction {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Run the command to completion.
    pub async fn run(&self) -> io::Result<ExitStatus> {
        Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .status()
            .await
    }

    /// Run in the background; the watch loop does not wait for it.
    pub fn spawn(&self) -> JoinHandle<()> {
        let action = self.clone();
        tokio::spawn(async move {
            info!(command = %action.command, "running consequence action");
            match action.run().await {
                Ok(status) if status.success() => {
                    info!(command = %action.command, "consequence action finished")
                }
                Ok(status) => warn!(command = %action.command, %status, "consequence action failed"),
                Err(e) => warn!(command = %action.command, error = %e, "could not start consequence action"),
            }
        })
    }
}
