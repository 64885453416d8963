// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for configuration and profile execution

use crate::hooks::HookStage;
use crate::profile::ProfileBuildError;
use kiln_exec::ExecError;
use kiln_expr::ExprError;
use thiserror::Error;

/// Configuration-time errors. Every variant carries a breadcrumb into the
/// configuration tree (`profiles.<name>.source`, `rules[i].match`, ...).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("profiles.{name}.{source}")]
    Profile {
        name: String,
        #[source]
        source: ProfileBuildError,
    },

    #[error("{location}: {source}")]
    Rule {
        location: String,
        #[source]
        source: ExprError,
    },

    #[error("{location}: unknown profile {name:?}")]
    UnknownProfile { location: String, name: String },

    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Execution-time errors from a profile render or a hook.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("{stage} hook failed: {source}")]
    Hook {
        stage: HookStage,
        #[source]
        source: ExecError,
    },

    #[error(transparent)]
    Command(#[from] ExecError),
}

impl RenderError {
    pub fn is_cancelled(&self) -> bool {
        match self {
            RenderError::Hook { source, .. } => source.is_cancelled(),
            RenderError::Command(source) => source.is_cancelled(),
        }
    }
}
