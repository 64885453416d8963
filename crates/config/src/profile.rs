// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Profiles: the named recipe for rendering a directory

use crate::error::RenderError;
use crate::hooks::{HookStage, Hooks};
use crate::plugin::Plugin;
use indexmap::IndexMap;
use kiln_core::{RenderResult, RenderStage, StatusTracker};
use kiln_exec::{CommandSpec, EnvPatternError, ExecResult};
use kiln_expr::{Expr, ExprError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// A build failure inside one profile. Displays as the breadcrumb tail
/// (`source: ...`, `hooks.preRender[0]: ...`); [`crate::ConfigError`]
/// prefixes the profile name.
#[derive(Debug, Error)]
pub enum ProfileBuildError {
    #[error("source: {0}")]
    Source(#[source] ExprError),

    #[error("reload: {0}")]
    Reload(#[source] ExprError),

    #[error("env: {0}")]
    Env(#[from] EnvPatternError),

    #[error("hooks.{stage}[{index}]: {source}")]
    Hook {
        stage: HookStage,
        index: usize,
        #[source]
        source: EnvPatternError,
    },

    #[error("plugins.{name}: {source}")]
    Plugin {
        name: String,
        #[source]
        source: EnvPatternError,
    },
}

/// A named recipe describing how to render a directory: command, extra
/// args, hooks, plugins, and the source/reload predicates.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(flatten)]
    pub command: CommandSpec,
    #[serde(default)]
    pub extra_args: Vec<String>,
    #[serde(default)]
    pub hooks: Hooks,
    #[serde(default)]
    pub plugins: IndexMap<String, Plugin>,
    /// UI presentation overrides. Opaque to the core; carried for the
    /// terminal frontend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui: Option<serde_yaml::Value>,
    /// Selects the files relevant to this profile; drives the watcher.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Expr>,
    /// Gates re-execution on file-system events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reload: Option<Expr>,
    #[serde(skip)]
    pub status: StatusTracker,
}

impl Profile {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            command: CommandSpec::new(program, args),
            extra_args: Vec::new(),
            hooks: Hooks::default(),
            plugins: IndexMap::new(),
            ui: None,
            source: None,
            reload: None,
            status: StatusTracker::new(),
        }
    }

    pub fn with_source(mut self, expr: &str) -> Self {
        self.source = Some(Expr::new(expr));
        self
    }

    pub fn with_reload(mut self, expr: &str) -> Self {
        self.reload = Some(Expr::new(expr));
        self
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_plugin(mut self, name: impl Into<String>, plugin: Plugin) -> Self {
        self.plugins.insert(name.into(), plugin);
        self
    }

    /// Compile predicates and env patterns, snapshot the caller env for
    /// every command in the bundle. Idempotent.
    pub fn build(&mut self) -> Result<(), ProfileBuildError> {
        if let Some(source) = &self.source {
            source.compile().map_err(ProfileBuildError::Source)?;
        }
        if let Some(reload) = &self.reload {
            reload.compile().map_err(ProfileBuildError::Reload)?;
        }
        self.command.build()?;
        for (stage, hooks) in [
            (HookStage::Init, &mut self.hooks.init),
            (HookStage::PreRender, &mut self.hooks.pre_render),
            (HookStage::PostRender, &mut self.hooks.post_render),
        ] {
            for (index, hook) in hooks.iter_mut().enumerate() {
                hook.build()
                    .map_err(|source| ProfileBuildError::Hook {
                        stage,
                        index,
                        source,
                    })?;
            }
        }
        for (name, plugin) in &mut self.plugins {
            plugin.build().map_err(|source| ProfileBuildError::Plugin {
                name: name.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Evaluate the source predicate over a directory's file set.
    ///
    /// No predicate means "use defaults": `(true, None)`. A predicate
    /// returning a non-empty list matches with that list; anything else
    /// does not match.
    pub fn match_files(&self, dir: &str, files: &[String]) -> (bool, Option<Vec<String>>) {
        match &self.source {
            None => (true, None),
            Some(expr) => match expr.eval_files(dir, files) {
                Some(matched) => (true, Some(matched)),
                None => (false, None),
            },
        }
    }

    /// Evaluate the reload predicate for a file-system event. No predicate
    /// means every event triggers. Errors surface to the caller.
    pub fn match_file_event(&self, file: &str, event_op: u32) -> Result<bool, ExprError> {
        match &self.reload {
            None => Ok(true),
            Some(expr) => expr.eval_reload(file, event_op, self.status.snapshot()),
        }
    }

    /// Run pre-render hooks, the main command, then post-render hooks,
    /// advancing the status tracker across phases.
    pub async fn exec(
        &self,
        cancel: &tokio_util::sync::CancellationToken,
        dir: &Path,
    ) -> Result<ExecResult, RenderError> {
        let result = self.exec_stages(cancel, dir).await;
        match &result {
            Ok(_) => self.status.set_result(RenderResult::Ok),
            Err(err) if err.is_cancelled() => self.status.set_result(RenderResult::Cancel),
            Err(_) => self.status.set_result(RenderResult::Error),
        }
        result
    }

    async fn exec_stages(
        &self,
        cancel: &tokio_util::sync::CancellationToken,
        dir: &Path,
    ) -> Result<ExecResult, RenderError> {
        self.status.set_stage(RenderStage::PreRender);
        for hook in &self.hooks.pre_render {
            hook.exec(cancel, dir)
                .await
                .map_err(|source| RenderError::Hook {
                    stage: HookStage::PreRender,
                    source,
                })?;
        }

        self.status.set_stage(RenderStage::Render);
        let mut output = self.render_command().exec(cancel, dir).await?;

        self.status.set_stage(RenderStage::PostRender);
        let main_stdout = output.stdout.clone();
        for hook in &self.hooks.post_render {
            let hook_result = hook
                .exec_with_stdin(cancel, dir, main_stdout.as_bytes())
                .await
                .map_err(|source| RenderError::Hook {
                    stage: HookStage::PostRender,
                    source,
                })?;
            // A hook that writes stdout transforms the output stream.
            if !hook_result.stdout.is_empty() {
                output.stdout = hook_result.stdout;
            }
            output.stderr.push_str(&hook_result.stderr);
        }
        Ok(output)
    }

    /// Run init hooks. Called by the runner at configure time; failure
    /// aborts configuration.
    pub async fn run_init_hooks(
        &self,
        cancel: &tokio_util::sync::CancellationToken,
        dir: &Path,
    ) -> Result<(), RenderError> {
        if self.hooks.init.is_empty() {
            return Ok(());
        }
        self.status.set_stage(RenderStage::Init);
        for hook in &self.hooks.init {
            hook.exec(cancel, dir)
                .await
                .map_err(|source| RenderError::Hook {
                    stage: HookStage::Init,
                    source,
                })?;
        }
        Ok(())
    }

    pub fn get_plugin(&self, name: &str) -> Option<&Plugin> {
        self.plugins.get(name)
    }

    pub fn get_plugin_by_key(&self, key: &str) -> Option<(&str, &Plugin)> {
        self.plugins
            .iter()
            .find(|(_, plugin)| plugin.keys.iter().any(|k| k == key))
            .map(|(name, plugin)| (name.as_str(), plugin))
    }

    /// Clone-on-write for extra args: the shared profile is never mutated.
    /// The clone gets a fresh status tracker and is rebuilt.
    pub fn with_extra_args(&self, extra_args: Vec<String>) -> Result<Profile, ProfileBuildError> {
        let mut clone = Profile {
            command: self.command.clone(),
            extra_args,
            hooks: self.hooks.clone(),
            plugins: self.plugins.clone(),
            ui: self.ui.clone(),
            source: self.source.clone(),
            reload: self.reload.clone(),
            status: StatusTracker::new(),
        };
        clone.build()?;
        Ok(clone)
    }

    /// The main command with extra args appended.
    fn render_command(&self) -> CommandSpec {
        if self.extra_args.is_empty() {
            return self.command.clone();
        }
        let mut spec = self.command.clone();
        spec.args.extend(self.extra_args.iter().cloned());
        spec
    }
}

#[cfg(test)]
#[path = "profile_tests.rs"]
mod tests;
