// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event types broadcast by a runner

use crate::output::{Output, OutputKind};
use crate::resource::Resource;
use serde::{Deserialize, Serialize};

/// Events delivered to runner subscribers.
///
/// Serializes with `{"type": "render:start", ...fields}` format. The set is
/// closed: within one execution, subscribers see exactly one `Start`,
/// followed by exactly one of `End` or `Cancel`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// An execution began.
    #[serde(rename = "render:start")]
    Start { kind: OutputKind },

    /// An execution finished; carries the full output, including any error.
    #[serde(rename = "render:end")]
    End { output: Output },

    /// An in-flight execution was cancelled.
    #[serde(rename = "render:cancel")]
    Cancel,

    /// The runner was (re)configured.
    #[serde(rename = "runner:configure")]
    Configure,

    /// A subscriber asked to open a single rendered resource.
    #[serde(rename = "resource:open")]
    OpenResource { resource: Resource },

    /// A subscriber asked for the resource list view.
    #[serde(rename = "resource:list")]
    ListResources,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Start { .. } => "render:start",
            Event::End { .. } => "render:end",
            Event::Cancel => "render:cancel",
            Event::Configure => "runner:configure",
            Event::OpenResource { .. } => "resource:open",
            Event::ListResources => "resource:list",
        }
    }

    pub fn log_summary(&self) -> String {
        let t = self.name();
        match self {
            Event::Start { kind } => format!("{t} kind={kind}"),
            Event::End { output } => {
                if let Some(err) = &output.error {
                    format!(
                        "{t} kind={} resources={} error={err}",
                        output.kind,
                        output.resources.len()
                    )
                } else {
                    format!(
                        "{t} kind={} resources={}",
                        output.kind,
                        output.resources.len()
                    )
                }
            }
            Event::Cancel | Event::Configure | Event::ListResources => t.to_string(),
            Event::OpenResource { resource } => {
                format!("{t} kind={} name={}", resource.kind, resource.name)
            }
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
