// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rules: ordered predicates that select a profile by name

use kiln_expr::Expr;
use serde::{Deserialize, Serialize};

/// A `(match predicate, profile name)` pair. Rules are evaluated in list
/// order; the first match wins for selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    #[serde(rename = "match")]
    pub match_expr: Expr,
    #[serde(rename = "profile")]
    pub profile_name: String,
    /// Index of the named profile in the configuration's profile map.
    /// Set by validation; `Some` afterwards.
    #[serde(skip)]
    pub(crate) resolved: Option<usize>,
}

impl Rule {
    pub fn new(match_expr: &str, profile_name: impl Into<String>) -> Self {
        Self {
            match_expr: Expr::new(match_expr),
            profile_name: profile_name.into(),
            resolved: None,
        }
    }

    /// Evaluate the match predicate over a directory's file set.
    /// Non-boolean results and evaluation errors are false.
    pub fn match_files(&self, dir: &str, files: &[String]) -> bool {
        self.match_expr.eval_match(dir, files)
    }
}

#[cfg(test)]
#[path = "rule_tests.rs"]
mod tests;
