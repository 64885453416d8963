// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lazily compiled expressions and their evaluation contracts

use crate::engine::ENGINE;
use kiln_core::{op, RenderResult, RenderStage};
use parking_lot::Mutex;
use rhai::{Array, Dynamic, Map, Scope, AST};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;
use thiserror::Error;

/// Errors from compiling or evaluating an expression.
#[derive(Debug, Error)]
pub enum ExprError {
    #[error("compile error: {0}")]
    Compile(String),
    #[error("evaluation error: {0}")]
    Eval(String),
    #[error("expected a boolean result, got {0}")]
    NotABool(String),
}

/// An expression with compile-once-on-first-use semantics.
///
/// Compilation is serialized by a mutex and cached; clones share the
/// cache, so a profile cloned for extra-args reuse does not recompile.
#[derive(Debug, Clone)]
pub struct Expr {
    source: String,
    program: Arc<Mutex<Option<Arc<AST>>>>,
}

impl Expr {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            program: Arc::new(Mutex::new(None)),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Compile (or fetch the cached program). Validation calls this
    /// eagerly so bad expressions surface as configuration errors.
    pub fn compile(&self) -> Result<Arc<AST>, ExprError> {
        let mut guard = self.program.lock();
        if let Some(ast) = guard.as_ref() {
            return Ok(ast.clone());
        }
        let ast = ENGINE
            .compile(&self.source)
            .map_err(|err| ExprError::Compile(err.to_string()))?;
        let ast = Arc::new(ast);
        *guard = Some(ast.clone());
        Ok(ast)
    }

    fn eval(&self, scope: &mut Scope<'_>) -> Result<Dynamic, ExprError> {
        let ast = self.compile()?;
        ENGINE
            .eval_ast_with_scope::<Dynamic>(scope, &ast)
            .map_err(|err| ExprError::Eval(err.to_string()))
    }

    /// Profile `source` contract: a non-empty sequence of strings selects
    /// those files; anything else (empty sequence, non-sequence result,
    /// or a runtime error) means "no match".
    pub fn eval_files(&self, dir: &str, files: &[String]) -> Option<Vec<String>> {
        let mut scope = file_scope(dir, files);
        match self.eval(&mut scope) {
            Ok(value) => {
                let Some(items) = value.try_cast::<Array>() else {
                    return None;
                };
                let matched: Vec<String> = items
                    .into_iter()
                    .filter_map(|item| item.into_immutable_string().ok())
                    .map(|s| s.to_string())
                    .collect();
                if matched.is_empty() {
                    None
                } else {
                    Some(matched)
                }
            }
            Err(err) => {
                tracing::warn!(expr = %self.source, error = %err, "source predicate failed, treating as no match");
                None
            }
        }
    }

    /// Rule `match` contract: boolean; non-boolean results and errors are
    /// false.
    pub fn eval_match(&self, dir: &str, files: &[String]) -> bool {
        let mut scope = file_scope(dir, files);
        match self.eval(&mut scope) {
            Ok(value) => value.as_bool().unwrap_or(false),
            Err(err) => {
                tracing::warn!(expr = %self.source, error = %err, "match predicate failed, treating as no match");
                false
            }
        }
    }

    /// Profile `reload` contract: boolean, with errors surfaced to the
    /// caller; silently suppressing them would swallow rebuilds.
    pub fn eval_reload(
        &self,
        file: &str,
        event_op: u32,
        status: (RenderStage, RenderResult),
    ) -> Result<bool, ExprError> {
        let mut scope = Scope::new();
        scope.push("file", file.to_string());
        scope.push_constant("fs", fs_map(Some(event_op)));
        scope.push_constant("render", render_map(status));
        let value = self.eval(&mut scope)?;
        value
            .as_bool()
            .map_err(|actual| ExprError::NotABool(actual.to_string()))
    }
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for Expr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Expr::new(String::deserialize(deserializer)?))
    }
}

fn file_scope(dir: &str, files: &[String]) -> Scope<'static> {
    let mut scope = Scope::new();
    let array: Array = files.iter().map(|f| Dynamic::from(f.clone())).collect();
    scope.push("files", array);
    scope.push("dir", dir.to_string());
    scope.push_constant("fs", fs_map(None));
    scope
}

/// The `fs` namespace: operation constants, plus the triggering event's
/// bits when evaluating a reload predicate.
fn fs_map(event_op: Option<u32>) -> Map {
    let mut map = Map::new();
    map.insert("CREATE".into(), Dynamic::from(op::CREATE as i64));
    map.insert("WRITE".into(), Dynamic::from(op::WRITE as i64));
    map.insert("REMOVE".into(), Dynamic::from(op::REMOVE as i64));
    map.insert("RENAME".into(), Dynamic::from(op::RENAME as i64));
    map.insert("CHMOD".into(), Dynamic::from(op::CHMOD as i64));
    if let Some(bits) = event_op {
        map.insert("event".into(), Dynamic::from(bits as i64));
    }
    map
}

/// The `render` namespace: stage/result constants plus the current values.
fn render_map(status: (RenderStage, RenderResult)) -> Map {
    let (stage, result) = status;
    let mut map = Map::new();
    map.insert("STAGE_NONE".into(), Dynamic::from(RenderStage::None.code()));
    map.insert("STAGE_INIT".into(), Dynamic::from(RenderStage::Init.code()));
    map.insert(
        "STAGE_PRE_RENDER".into(),
        Dynamic::from(RenderStage::PreRender.code()),
    );
    map.insert(
        "STAGE_RENDER".into(),
        Dynamic::from(RenderStage::Render.code()),
    );
    map.insert(
        "STAGE_POST_RENDER".into(),
        Dynamic::from(RenderStage::PostRender.code()),
    );
    map.insert(
        "RESULT_NONE".into(),
        Dynamic::from(RenderResult::None.code().to_string()),
    );
    map.insert(
        "RESULT_OK".into(),
        Dynamic::from(RenderResult::Ok.code().to_string()),
    );
    map.insert(
        "RESULT_ERROR".into(),
        Dynamic::from(RenderResult::Error.code().to_string()),
    );
    map.insert(
        "RESULT_CANCEL".into(),
        Dynamic::from(RenderResult::Cancel.code().to_string()),
    );
    map.insert("stage".into(), Dynamic::from(stage.code()));
    map.insert("result".into(), Dynamic::from(result.code().to_string()));
    map
}

#[cfg(test)]
#[path = "expr_tests.rs"]
mod tests;
