// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for the behavioral specs

use kiln_core::{Event, RootedDir};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

/// Create a temp root populated with `(relative path, contents)` pairs.
pub fn temp_root(files: &[(&str, &str)]) -> (TempDir, RootedDir) {
    let dir = TempDir::new().unwrap();
    for (path, contents) in files {
        let full = dir.path().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full, contents).unwrap();
    }
    let root = RootedDir::new(dir.path()).unwrap();
    (dir, root)
}

/// A pre-registered subscriber channel for `RunnerOptions.subscribers`,
/// so the `Configure` broadcast from construction is observable.
pub fn subscriber() -> (mpsc::Sender<Event>, mpsc::Receiver<Event>) {
    mpsc::channel(64)
}

/// Receive the next event or panic after five seconds.
pub async fn next_event(rx: &mut mpsc::Receiver<Event>) -> Event {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event channel closed")
}

/// Drain whatever arrives within the window.
pub async fn drain_for(rx: &mut mpsc::Receiver<Event>, window: Duration) -> Vec<Event> {
    let mut events = Vec::new();
    let deadline = tokio::time::Instant::now() + window;
    loop {
        match tokio::time::timeout_at(deadline, rx.recv()).await {
            Ok(Some(event)) => events.push(event),
            Ok(None) | Err(_) => break,
        }
    }
    events
}

/// Drain until no event arrives for `quiet`, or `total` elapses.
pub async fn drain_until_quiet(
    rx: &mut mpsc::Receiver<Event>,
    quiet: Duration,
    total: Duration,
) -> Vec<Event> {
    let mut events = Vec::new();
    let hard_deadline = tokio::time::Instant::now() + total;
    loop {
        let deadline = std::cmp::min(tokio::time::Instant::now() + quiet, hard_deadline);
        match tokio::time::timeout_at(deadline, rx.recv()).await {
            Ok(Some(event)) => events.push(event),
            Ok(None) | Err(_) => break,
        }
    }
    events
}
