// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution output records

use crate::resource::Resource;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// What kind of execution produced an [`Output`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    /// A full render of the current path.
    Run,
    /// An ad-hoc plugin invocation.
    Plugin,
}

impl std::fmt::Display for OutputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputKind::Run => f.write_str("run"),
            OutputKind::Plugin => f.write_str("plugin"),
        }
    }
}

/// The result of one execution, as broadcast in a `render:end` event and
/// returned to the caller.
///
/// `resources` is populated only for [`OutputKind::Run`] outputs whose
/// stdout split successfully; a split failure sets `error` without
/// discarding `stdout`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    pub kind: OutputKind,
    #[serde(default)]
    pub created_at_epoch_ms: u64,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<Resource>,
}

impl Output {
    pub fn new(kind: OutputKind) -> Self {
        Self {
            kind,
            created_at_epoch_ms: now_epoch_ms(),
            stdout: String::new(),
            stderr: String::new(),
            error: None,
            resources: Vec::new(),
        }
    }

    pub fn with_error(mut self, error: impl std::fmt::Display) -> Self {
        self.error = Some(error.to_string());
        self
    }

    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }
}

/// Milliseconds since the Unix epoch. Clamps to zero on a pre-epoch clock.
pub fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
