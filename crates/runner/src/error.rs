// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the runner

use kiln_config::{ConfigError, ProfileBuildError, RenderError};
use kiln_core::RootError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from constructing or driving a [`crate::Runner`].
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("no matching rule found for {}", path.display())]
    NoCommandForPath { path: PathBuf },

    #[error("unknown profile {name:?}")]
    ProfileUnknown { name: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("profile build failed: {0}")]
    ProfileBuild(#[from] ProfileBuildError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Root(#[from] RootError),

    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),
}
