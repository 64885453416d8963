// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command specifications and their environment definitions

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// An env pattern that failed to compile during `build`.
#[derive(Debug, Error)]
#[error("invalid env pattern {pattern:?}: {source}")]
pub struct EnvPatternError {
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}

/// Reference to the calling process environment: a single key by `name`,
/// or every key matching `pattern`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CallerRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip)]
    pub compiled: Option<Regex>,
}

impl CallerRef {
    pub(crate) fn compile(&mut self) -> Result<(), EnvPatternError> {
        if let Some(pattern) = &self.pattern {
            let compiled = Regex::new(pattern).map_err(|source| EnvPatternError {
                pattern: pattern.clone(),
                source,
            })?;
            self.compiled = Some(compiled);
        }
        Ok(())
    }
}

/// `valueFrom` wrapper for an [`EnvDef`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ValueFrom {
    #[serde(default)]
    pub caller_ref: CallerRef,
}

/// One environment entry: a static value, or a reference resolved against
/// the environment composed so far.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct EnvDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_from: Option<ValueFrom>,
}

/// Pass-through of caller environment keys by name or pattern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct EnvFrom {
    #[serde(default)]
    pub caller_ref: CallerRef,
}

/// An executable command: program, arguments, and environment definition.
///
/// `build` captures the caller environment and compiles env patterns; the
/// captured snapshot, not the live process environment, is what execution
/// composes from. No `deny_unknown_fields`: this struct is flattened into
/// profiles, hooks, and plugins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandSpec {
    #[serde(rename = "command", default)]
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: Vec<EnvDef>,
    #[serde(default)]
    pub env_from: Vec<EnvFrom>,
    #[serde(skip)]
    pub(crate) base_env: HashMap<String, String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Compile env patterns and snapshot the caller environment.
    /// Idempotent; re-running refreshes the snapshot.
    pub fn build(&mut self) -> Result<(), EnvPatternError> {
        for entry in &mut self.env_from {
            entry.caller_ref.compile()?;
        }
        for def in &mut self.env {
            if let Some(value_from) = &mut def.value_from {
                value_from.caller_ref.compile()?;
            }
        }
        self.base_env = std::env::vars().collect();
        Ok(())
    }

    /// The command as a single display string (for error wrapping and logs).
    pub fn command_line(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
