// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Profile selection against the default configuration

use crate::prelude::*;
use kiln_core::Event;
use kiln_runner::{ProfileChoice, Runner, RunnerOptions};
use std::time::Duration;

#[tokio::test]
async fn helm_chart_auto_selects_the_helm_profile() {
    let (_dir, root) = temp_root(&[(
        "Chart.yaml",
        "apiVersion: v2\nname: app\nversion: 0.1.0\n",
    )]);
    let (tx, mut rx) = subscriber();
    let options = RunnerOptions {
        subscribers: vec![tx],
        ..RunnerOptions::default()
    };

    let runner = Runner::new(root, ".", options).await.unwrap();
    assert_eq!(runner.current_profile_name().as_deref(), Some("helm"));

    // One Configure, no Start.
    assert_eq!(next_event(&mut rx).await, Event::Configure);
    let rest = drain_for(&mut rx, Duration::from_millis(300)).await;
    assert!(
        !rest.iter().any(|e| matches!(e, Event::Start { .. })),
        "unexpected events: {rest:?}"
    );
}

#[tokio::test]
async fn chart_with_v1_api_version_falls_through_to_yaml() {
    let (_dir, root) = temp_root(&[("Chart.yaml", "apiVersion: v1\nname: old\n")]);
    let runner = Runner::new(root, ".", RunnerOptions::default()).await.unwrap();
    assert_eq!(runner.current_profile_name().as_deref(), Some("yaml"));
}

#[tokio::test]
async fn explicit_profile_overrides_rule_selection() {
    // The directory holds only a Helm chart, but `ks` is forced.
    let (_dir, root) = temp_root(&[(
        "Chart.yaml",
        "apiVersion: v2\nname: app\nversion: 0.1.0\n",
    )]);
    let (tx, mut rx) = subscriber();
    let options = RunnerOptions {
        profile: ProfileChoice::Named("ks".to_string()),
        subscribers: vec![tx],
        ..RunnerOptions::default()
    };

    let runner = Runner::new(root, ".", options).await.unwrap();
    assert_eq!(runner.current_profile_name().as_deref(), Some("ks"));

    assert_eq!(next_event(&mut rx).await, Event::Configure);
    let rest = drain_for(&mut rx, Duration::from_millis(300)).await;
    assert!(
        !rest.iter().any(|e| matches!(e, Event::Start { .. })),
        "unexpected events: {rest:?}"
    );
}

#[tokio::test]
async fn kustomization_wins_over_plain_yaml() {
    let (_dir, root) = temp_root(&[
        ("kustomization.yaml", "resources:\n  - d.yaml\n"),
        ("d.yaml", "kind: Deployment\n"),
    ]);
    let runner = Runner::new(root, ".", RunnerOptions::default()).await.unwrap();
    assert_eq!(runner.current_profile_name().as_deref(), Some("ks"));
}
