// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bridge from the notify backend to tokio channels
//!
//! The watcher callback runs on notify's own thread; events are mapped to
//! the core's operation bitmask and pushed over bounded channels with
//! `blocking_send`. Dropping the [`WatchHandle`] closes both channels,
//! which is how the runner's event loop learns to exit.

use kiln_core::{op, FsEvent};
use notify::event::ModifyKind;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use tokio::sync::mpsc;

pub(crate) struct WatchHandle {
    watcher: RecommendedWatcher,
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle").finish_non_exhaustive()
    }
}

pub(crate) struct WatchChannels {
    pub events: mpsc::Receiver<FsEvent>,
    pub errors: mpsc::Receiver<notify::Error>,
}

/// Create a watcher with no registered directories.
pub(crate) fn create_watcher(
    capacity: usize,
) -> Result<(WatchHandle, WatchChannels), notify::Error> {
    let (event_tx, events) = mpsc::channel(capacity);
    let (error_tx, errors) = mpsc::channel(16);
    let watcher = notify::recommended_watcher(
        move |result: Result<notify::Event, notify::Error>| match result {
            Ok(event) => {
                let bits = map_event_kind(&event.kind);
                if bits == 0 {
                    return;
                }
                for path in event.paths {
                    let _ = event_tx.blocking_send(FsEvent::new(path, bits));
                }
            }
            Err(err) => {
                let _ = error_tx.blocking_send(err);
            }
        },
    )?;
    Ok((WatchHandle { watcher }, WatchChannels { events, errors }))
}

impl WatchHandle {
    /// Watch a single directory, non-recursively. Directory watching
    /// subsumes file watching and survives atomic rename-replace.
    pub fn add(&mut self, dir: &Path) -> Result<(), notify::Error> {
        tracing::debug!(dir = %dir.display(), "watching directory");
        self.watcher.watch(dir, RecursiveMode::NonRecursive)
    }
}

fn map_event_kind(kind: &EventKind) -> u32 {
    match kind {
        EventKind::Create(_) => op::CREATE,
        EventKind::Remove(_) => op::REMOVE,
        EventKind::Modify(ModifyKind::Name(_)) => op::RENAME,
        EventKind::Modify(ModifyKind::Metadata(_)) => op::CHMOD,
        EventKind::Modify(_) => op::WRITE,
        EventKind::Access(_) | EventKind::Any | EventKind::Other => 0,
    }
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
