// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle hook groups

use kiln_exec::CommandSpec;
use serde::{Deserialize, Serialize};

/// Ordered command groups run at fixed lifecycle stages. Hook commands
/// have the same shape and execution semantics as the main command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct Hooks {
    /// Run once when the runner is configured (version probes and the
    /// like). Failure aborts configuration.
    #[serde(default)]
    pub init: Vec<CommandSpec>,
    /// Run before the main command on every invocation.
    #[serde(default)]
    pub pre_render: Vec<CommandSpec>,
    /// Run after a successful main command; each receives the main
    /// command's stdout on stdin.
    #[serde(default)]
    pub post_render: Vec<CommandSpec>,
}

impl Hooks {
    pub fn is_empty(&self) -> bool {
        self.init.is_empty() && self.pre_render.is_empty() && self.post_render.is_empty()
    }
}

/// Which hook group a failing command belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    Init,
    PreRender,
    PostRender,
}

impl std::fmt::Display for HookStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookStage::Init => f.write_str("init"),
            HookStage::PreRender => f.write_str("preRender"),
            HookStage::PostRender => f.write_str("postRender"),
        }
    }
}
