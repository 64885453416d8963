// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Three-phase environment composition
//!
//! 1. essential pass-through, 2. `envFrom` in order, 3. `env` in order.
//! The phases are observable: `envFrom` can populate a key that a later
//! `env` entry reads through `valueFrom`.

use crate::command::{EnvDef, EnvFrom};
use regex::Regex;
use std::collections::{BTreeMap, HashMap};

/// Caller environment keys always carried into subprocesses.
pub const ESSENTIAL_KEYS: &[&str] = &["PATH", "HOME", "USER", "TERM", "COLORTERM"];

/// Compose a child environment from the captured caller environment.
pub fn compose_env(
    base: &HashMap<String, String>,
    env_from: &[EnvFrom],
    env: &[EnvDef],
) -> BTreeMap<String, String> {
    let mut composed = BTreeMap::new();

    for key in ESSENTIAL_KEYS {
        if let Some(value) = base.get(*key) {
            composed.insert((*key).to_string(), value.clone());
        }
    }

    for entry in env_from {
        let caller_ref = &entry.caller_ref;
        if let Some(matcher) = pattern_matcher(caller_ref) {
            let mut keys: Vec<&String> = base.keys().filter(|k| matcher.is_match(k)).collect();
            keys.sort();
            for key in keys {
                if let Some(value) = base.get(key) {
                    composed.insert(key.clone(), value.clone());
                }
            }
        }
        if let Some(name) = &caller_ref.name {
            if let Some(value) = base.get(name) {
                composed.insert(name.clone(), value.clone());
            }
        }
    }

    for def in env {
        if def.name.is_empty() {
            continue;
        }
        if let Some(value) = &def.value {
            if value.is_empty() {
                continue;
            }
            composed.insert(def.name.clone(), value.clone());
        } else if let Some(value_from) = &def.value_from {
            let Some(ref_name) = &value_from.caller_ref.name else {
                continue;
            };
            // Resolved against the environment composed so far, not the
            // caller environment.
            if let Some(value) = composed.get(ref_name).cloned() {
                composed.insert(def.name.clone(), value);
            }
        }
    }

    composed
}

/// The compiled pattern from `build`, or a one-shot compile when the spec
/// was never built (an invalid pattern then matches nothing).
fn pattern_matcher(caller_ref: &crate::command::CallerRef) -> Option<Regex> {
    if caller_ref.compiled.is_some() {
        return caller_ref.compiled.clone();
    }
    let pattern = caller_ref.pattern.as_ref()?;
    Regex::new(pattern).ok()
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
