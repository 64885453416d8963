// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end execution through the runner

use crate::prelude::*;
use kiln_config::{Config, Profile};
use kiln_core::{Event, OutputKind};
use kiln_runner::{ProfileChoice, Runner, RunnerOptions};

#[tokio::test]
async fn echo_profile_renders_one_resource() {
    let (_dir, root) = temp_root(&[]);
    let (tx, mut rx) = subscriber();
    let options = RunnerOptions {
        config: Config::default(),
        profile: ProfileChoice::Custom(Profile::new(
            "echo",
            &["{apiVersion: v1, kind: Resource}"],
        )),
        subscribers: vec![tx],
        ..RunnerOptions::default()
    };
    let runner = Runner::new(root, ".", options).await.unwrap();

    let output = runner.run().await;
    assert_eq!(output.stdout, "{apiVersion: v1, kind: Resource}\n");
    assert!(output.error.is_none(), "error: {:?}", output.error);
    assert_eq!(output.resources.len(), 1);
    assert_eq!(output.resources[0].api_version, "v1");
    assert_eq!(output.resources[0].kind, "Resource");

    assert_eq!(next_event(&mut rx).await, Event::Configure);
    assert_eq!(
        next_event(&mut rx).await,
        Event::Start {
            kind: OutputKind::Run
        }
    );
    match next_event(&mut rx).await {
        Event::End { output } => {
            assert_eq!(output.kind, OutputKind::Run);
            assert_eq!(output.resources.len(), 1);
        }
        other => panic!("expected End, got {other:?}"),
    }
}

#[tokio::test]
async fn multi_document_render_splits_every_resource() {
    let (_dir, root) = temp_root(&[(
        "all.yaml",
        "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: a\n---\napiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: b\n",
    )]);
    let options = RunnerOptions {
        config: Config::default(),
        profile: ProfileChoice::Custom(Profile::new("cat", &["all.yaml"])),
        ..RunnerOptions::default()
    };
    let runner = Runner::new(root, ".", options).await.unwrap();

    let output = runner.run().await;
    assert!(output.error.is_none(), "error: {:?}", output.error);
    assert_eq!(output.resources.len(), 2);
    assert_eq!(output.resources[0].name, "a");
    assert_eq!(output.resources[1].group(), "apps");
}

#[tokio::test]
async fn post_render_hooks_transform_the_stream() {
    let (_dir, root) = temp_root(&[]);
    let mut profile = Profile::new("echo", &["kind: thing"]);
    profile
        .hooks
        .post_render
        .push(kiln_exec::CommandSpec::new("tr", &["a-z", "A-Z"]));
    let options = RunnerOptions {
        config: Config::default(),
        profile: ProfileChoice::Custom(profile),
        ..RunnerOptions::default()
    };
    let runner = Runner::new(root, ".", options).await.unwrap();

    let output = runner.run().await;
    assert!(output.error.is_none(), "error: {:?}", output.error);
    assert_eq!(output.stdout, "KIND: THING\n");
    assert_eq!(output.resources.len(), 1);
    assert_eq!(output.resources[0].raw, "KIND: THING\n");
}

#[tokio::test]
async fn failed_render_broadcasts_end_with_the_error() {
    let (_dir, root) = temp_root(&[]);
    let (tx, mut rx) = subscriber();
    let options = RunnerOptions {
        config: Config::default(),
        profile: ProfileChoice::Custom(Profile::new("sh", &["-c", "echo nope >&2; exit 1"])),
        subscribers: vec![tx],
        ..RunnerOptions::default()
    };
    let runner = Runner::new(root, ".", options).await.unwrap();

    let output = runner.run().await;
    assert!(output.error.is_some());
    assert_eq!(output.stderr, "nope\n");

    assert_eq!(next_event(&mut rx).await, Event::Configure);
    assert!(matches!(next_event(&mut rx).await, Event::Start { .. }));
    match next_event(&mut rx).await {
        Event::End { output } => assert!(output.error.is_some()),
        other => panic!("expected End, got {other:?}"),
    }
}
