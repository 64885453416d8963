// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watch-driven re-execution: reload gating and preemption

use crate::prelude::*;
use kiln_config::{Config, Profile};
use kiln_core::Event;
use kiln_runner::{ProfileChoice, Runner, RunnerOptions};
use std::time::Duration;

fn watched_options(
    profile: Profile,
    tx: tokio::sync::mpsc::Sender<Event>,
) -> RunnerOptions {
    RunnerOptions {
        config: Config::default(),
        profile: ProfileChoice::Custom(
            profile.with_source(r#"files.filter(|f| pathExt(f) == ".yaml")"#),
        ),
        watch: true,
        subscribers: vec![tx],
        ..RunnerOptions::default()
    }
}

fn count_starts(events: &[Event]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, Event::Start { .. }))
        .count()
}

#[tokio::test]
async fn reload_predicate_gates_re_execution() {
    let (dir, root) = temp_root(&[
        ("deployment.yaml", "kind: Deployment\n"),
        ("kustomization.yaml", "resources: []\n"),
    ]);
    let (tx, mut rx) = subscriber();
    let profile = Profile::new("echo", &["kind: ok"])
        .with_reload(r#"pathBase(file) != "kustomization.yaml""#);
    let _runner = Runner::new(root, ".", watched_options(profile, tx))
        .await
        .unwrap();

    assert_eq!(next_event(&mut rx).await, Event::Configure);
    // Let the watcher backend settle before mutating files.
    tokio::time::sleep(Duration::from_millis(200)).await;

    // A relevant write triggers a run.
    std::fs::write(
        dir.path().join("deployment.yaml"),
        "kind: Deployment\nreplicas: 2\n",
    )
    .unwrap();
    let triggered =
        drain_until_quiet(&mut rx, Duration::from_millis(500), Duration::from_secs(8)).await;
    assert!(
        count_starts(&triggered) >= 1,
        "no run triggered: {triggered:?}"
    );

    // A write gated out by the reload predicate triggers nothing.
    std::fs::write(
        dir.path().join("kustomization.yaml"),
        "resources:\n  - deployment.yaml\n",
    )
    .unwrap();
    let gated = drain_for(&mut rx, Duration::from_millis(700)).await;
    assert_eq!(count_starts(&gated), 0, "unexpected events: {gated:?}");
}

#[tokio::test]
async fn unwatched_sibling_files_do_not_trigger() {
    let (dir, root) = temp_root(&[("app.yaml", "kind: App\n")]);
    let (tx, mut rx) = subscriber();
    let profile = Profile::new("echo", &["kind: ok"]);
    let _runner = Runner::new(root, ".", watched_options(profile, tx))
        .await
        .unwrap();

    assert_eq!(next_event(&mut rx).await, Event::Configure);
    tokio::time::sleep(Duration::from_millis(200)).await;

    // The directory is watched, but notes.txt never matched the source
    // predicate.
    std::fs::write(dir.path().join("notes.txt"), "scratch\n").unwrap();
    let events = drain_for(&mut rx, Duration::from_millis(700)).await;
    assert_eq!(count_starts(&events), 0, "unexpected events: {events:?}");
}

#[tokio::test]
async fn rapid_writes_preempt_the_in_flight_run() {
    let (dir, root) = temp_root(&[("app.yaml", "kind: App\n")]);
    let (tx, mut rx) = subscriber();
    let profile = Profile::new("sh", &["-c", "sleep 0.3; echo 'kind: done'"]);
    let _runner = Runner::new(root, ".", watched_options(profile, tx))
        .await
        .unwrap();

    assert_eq!(next_event(&mut rx).await, Event::Configure);
    tokio::time::sleep(Duration::from_millis(200)).await;

    for i in 0..5 {
        std::fs::write(dir.path().join("app.yaml"), format!("kind: App\nrev: {i}\n")).unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
    }

    let events =
        drain_until_quiet(&mut rx, Duration::from_secs(1), Duration::from_secs(15)).await;
    let starts = count_starts(&events);
    let cancels = events
        .iter()
        .filter(|e| matches!(e, Event::Cancel))
        .count();
    let ends: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            Event::End { output } => Some(output),
            _ => None,
        })
        .collect();

    assert!(starts >= 2, "starts: {starts}, events: {events:?}");
    assert!(cancels >= 1, "cancels: {cancels}, events: {events:?}");
    assert!(
        cancels + ends.len() <= starts,
        "starts={starts} cancels={cancels} ends={}",
        ends.len()
    );

    // The surviving run completed cleanly.
    let last_end = ends.last().expect("no End event at all");
    let error = last_end.error.as_deref().unwrap_or("");
    assert!(!error.contains("cancel"), "final End carries: {error}");
    assert_eq!(last_end.stdout, "kind: done\n");
}

#[tokio::test]
async fn watch_set_survives_reconfigure_with_same_arguments() {
    let (_dir, root) = temp_root(&[("app.yaml", "kind: App\n")]);

    let (tx, _rx) = subscriber();
    let runner = Runner::new(
        root,
        ".",
        watched_options(Profile::new("echo", &["ok"]), tx),
    )
    .await
    .unwrap();
    let before = runner.watched();
    assert!(!before.0.is_empty());

    let (tx, _rx2) = subscriber();
    runner
        .configure(".", watched_options(Profile::new("echo", &["ok"]), tx))
        .await
        .unwrap();
    assert_eq!(runner.watched(), before);
}
