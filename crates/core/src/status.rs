// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Render status shared between executions and reload predicates

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Lifecycle stage an execution is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStage {
    #[default]
    None,
    Init,
    PreRender,
    Render,
    PostRender,
}

impl RenderStage {
    /// Stable integer code exposed to the expression environment.
    pub fn code(self) -> i64 {
        match self {
            RenderStage::None => 0,
            RenderStage::Init => 1,
            RenderStage::PreRender => 2,
            RenderStage::Render => 3,
            RenderStage::PostRender => 4,
        }
    }
}

/// Outcome of the most recent execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderResult {
    #[default]
    None,
    Ok,
    Error,
    Cancel,
}

impl RenderResult {
    /// Stable string code exposed to the expression environment.
    pub fn code(self) -> &'static str {
        match self {
            RenderResult::None => "",
            RenderResult::Ok => "ok",
            RenderResult::Error => "error",
            RenderResult::Cancel => "cancel",
        }
    }
}

/// Shared stage/result cell, mutated by a profile across execution
/// transitions and read by reload predicates.
///
/// Clones share the same cell.
#[derive(Debug, Clone, Default)]
pub struct StatusTracker {
    inner: Arc<Mutex<(RenderStage, RenderResult)>>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_stage(&self, stage: RenderStage) {
        self.inner.lock().0 = stage;
    }

    pub fn set_result(&self, result: RenderResult) {
        self.inner.lock().1 = result;
    }

    pub fn snapshot(&self) -> (RenderStage, RenderResult) {
        *self.inner.lock()
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
