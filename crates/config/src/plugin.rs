// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named ad-hoc commands attached to a profile

use kiln_exec::{CommandSpec, EnvPatternError, ExecError, ExecResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// An ad-hoc subprocess a subscriber can trigger by name or key binding.
/// Plugin outputs are never split into resources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plugin {
    #[serde(flatten)]
    pub command: CommandSpec,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keys: Vec<String>,
}

impl Plugin {
    pub(crate) fn build(&mut self) -> Result<(), EnvPatternError> {
        self.command.build()
    }

    pub async fn exec(
        &self,
        cancel: &CancellationToken,
        dir: &Path,
    ) -> Result<ExecResult, ExecError> {
        self.command.exec(cancel, dir).await
    }
}
