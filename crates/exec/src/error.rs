// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for subprocess execution

use thiserror::Error;

/// Errors from executing a [`crate::CommandSpec`].
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("empty command")]
    EmptyCommand,

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{}", failed_message(command, *code, stderr))]
    Failed {
        command: String,
        code: Option<i32>,
        /// Captured output, preserved so callers can render diagnostics.
        stdout: String,
        stderr: String,
    },

    #[error("command was cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ExecError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExecError::Cancelled)
    }
}

fn failed_message(command: &str, code: Option<i32>, stderr: &str) -> String {
    let status = match code {
        Some(code) => format!("exit status {code}"),
        None => "signal".to_string(),
    };
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("`{command}` failed: {status}")
    } else {
        format!("`{command}` failed: {status}: {stderr}")
    }
}
