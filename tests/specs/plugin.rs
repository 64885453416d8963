// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plugin invocation through the runner

use crate::prelude::*;
use kiln_config::{Config, Plugin, Profile};
use kiln_core::{Event, OutputKind};
use kiln_exec::CommandSpec;
use kiln_runner::{ProfileChoice, Runner, RunnerOptions};

fn profile_with_plugin() -> Profile {
    Profile::new("echo", &["main output"]).with_plugin(
        "stamp",
        Plugin {
            command: CommandSpec::new("echo", &["stamped"]),
            description: "stamp the render".to_string(),
            keys: vec!["s".to_string()],
        },
    )
}

#[tokio::test]
async fn missing_plugin_reports_its_name() {
    let (_dir, root) = temp_root(&[]);
    let (tx, mut rx) = subscriber();
    let options = RunnerOptions {
        config: Config::default(),
        profile: ProfileChoice::Custom(profile_with_plugin()),
        subscribers: vec![tx],
        ..RunnerOptions::default()
    };
    let runner = Runner::new(root, ".", options).await.unwrap();

    let output = runner.run_plugin("nonexistent").await;
    assert_eq!(output.kind, OutputKind::Plugin);
    assert!(
        output.error.as_deref().unwrap_or("").contains("nonexistent"),
        "error: {:?}",
        output.error
    );

    assert_eq!(next_event(&mut rx).await, Event::Configure);
    assert_eq!(
        next_event(&mut rx).await,
        Event::Start {
            kind: OutputKind::Plugin
        }
    );
    match next_event(&mut rx).await {
        Event::End { output } => {
            assert_eq!(output.kind, OutputKind::Plugin);
            assert!(output.error.is_some());
        }
        other => panic!("expected End, got {other:?}"),
    }
}

#[tokio::test]
async fn plugin_output_is_not_split_into_resources() {
    let (_dir, root) = temp_root(&[]);
    let options = RunnerOptions {
        config: Config::default(),
        profile: ProfileChoice::Custom(profile_with_plugin()),
        ..RunnerOptions::default()
    };
    let runner = Runner::new(root, ".", options).await.unwrap();

    let output = runner.run_plugin("stamp").await;
    assert!(output.error.is_none(), "error: {:?}", output.error);
    assert_eq!(output.stdout, "stamped\n");
    assert!(output.resources.is_empty());
}

#[tokio::test]
async fn plugins_resolve_by_key_binding() {
    let (_dir, root) = temp_root(&[]);
    let options = RunnerOptions {
        config: Config::default(),
        profile: ProfileChoice::Custom(profile_with_plugin()),
        ..RunnerOptions::default()
    };
    let runner = Runner::new(root, ".", options).await.unwrap();

    let profile = runner.current_profile().unwrap();
    let (name, _) = profile.get_plugin_by_key("s").unwrap();
    assert_eq!(name, "stamp");
    let output = runner.run_plugin(name).await;
    assert_eq!(output.stdout, "stamped\n");
}
