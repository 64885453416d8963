// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kiln-expr: the embedded predicate language
//!
//! Profiles and rules are selected by small expressions evaluated over the
//! file set of a directory (`files`, `dir`), a file-system event (`file`,
//! `fs.event`), and the render status (`render`). Expressions compile
//! lazily, once, and evaluate concurrently on a shared engine.

mod engine;
mod expr;

pub use expr::{Expr, ExprError};
