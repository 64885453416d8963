// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cancellable subprocess execution with captured output

use crate::command::CommandSpec;
use crate::env::compose_env;
use crate::error::ExecError;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Captured output of a successful execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub stdout: String,
    pub stderr: String,
}

impl CommandSpec {
    /// Run the command in `dir` with empty stdin.
    pub async fn exec(
        &self,
        cancel: &CancellationToken,
        dir: &Path,
    ) -> Result<ExecResult, ExecError> {
        self.exec_with_stdin(cancel, dir, &[]).await
    }

    /// Run the command in `dir`, writing `input` to its stdin.
    ///
    /// Cancelling the token kills the child (`kill_on_drop`) and yields
    /// [`ExecError::Cancelled`]. A non-zero exit is [`ExecError::Failed`]
    /// with the buffered stdout/stderr attached.
    pub async fn exec_with_stdin(
        &self,
        cancel: &CancellationToken,
        dir: &Path,
        input: &[u8],
    ) -> Result<ExecResult, ExecError> {
        if self.program.is_empty() {
            return Err(ExecError::EmptyCommand);
        }

        let env = compose_env(&self.base_env, &self.env_from, &self.env);
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .current_dir(dir)
            .env_clear()
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(
            program = %self.program,
            dir = %dir.display(),
            stdin_bytes = input.len(),
            "spawning command"
        );

        let mut child = command.spawn().map_err(|source| ExecError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        let stdin = child.stdin.take();
        let write_stdin = async {
            if let Some(mut stdin) = stdin {
                // A child that never reads stdin closes the pipe early;
                // that is not a failure of the run.
                if let Err(err) = stdin.write_all(input).await {
                    tracing::debug!(error = %err, "stdin write interrupted");
                    return;
                }
                if let Err(err) = stdin.shutdown().await {
                    tracing::debug!(error = %err, "stdin close interrupted");
                }
            }
        };

        let output = tokio::select! {
            (_, output) = async { tokio::join!(write_stdin, child.wait_with_output()) } => output?,
            () = cancel.cancelled() => {
                tracing::debug!(program = %self.program, "command cancelled");
                return Err(ExecError::Cancelled);
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if output.status.success() {
            Ok(ExecResult { stdout, stderr })
        } else {
            Err(ExecError::Failed {
                command: self.command_line(),
                code: output.status.code(),
                stdout,
                stderr,
            })
        }
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
