// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The shared rhai engine and its registered helper functions

use regex::Regex;
use rhai::{Array, Dynamic, Engine};
use std::sync::LazyLock;

/// Process-global engine. Registration happens once; evaluation against
/// distinct compiled programs is safe concurrently.
pub(crate) static ENGINE: LazyLock<Engine> = LazyLock::new(build_engine);

fn build_engine() -> Engine {
    let mut engine = Engine::new();
    engine.register_fn("pathBase", path_base);
    engine.register_fn("pathDir", path_dir);
    engine.register_fn("pathExt", path_ext);
    engine.register_fn("yamlPath", yaml_path);
    engine.register_fn("has", |event: i64, flag: i64| event & flag != 0);
    engine.register_fn("has", |event: i64, flags: Array| {
        flags
            .iter()
            .any(|f| f.as_int().map(|f| event & f != 0).unwrap_or(false))
    });
    engine.register_fn("startsWith", |s: &str, prefix: &str| s.starts_with(prefix));
    engine.register_fn("endsWith", |s: &str, suffix: &str| s.ends_with(suffix));
    engine.register_fn("matches", str_matches);
    engine
}

/// Final path element, slash-separated regardless of platform.
pub(crate) fn path_base(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    trimmed.rsplit('/').next().unwrap_or(trimmed).to_string()
}

/// Everything but the final path element; `.` when there is no slash.
pub(crate) fn path_dir(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && !path.is_empty() {
        return "/".to_string();
    }
    match trimmed.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => trimmed[..idx].to_string(),
        None => ".".to_string(),
    }
}

/// File extension of the final path element, including the leading dot;
/// empty when there is none.
pub(crate) fn path_ext(path: &str) -> String {
    let base = path_base(path);
    match base.rfind('.') {
        Some(idx) => base[idx..].to_string(),
        None => String::new(),
    }
}

/// Read a YAML file and extract the value at a dot-separated path
/// (optional leading `$.`). Any failure (unreadable file, parse error,
/// missing key, index out of range) yields `()`; this function never
/// raises.
pub(crate) fn yaml_path(file: &str, query: &str) -> Dynamic {
    let Ok(content) = std::fs::read_to_string(file) else {
        return Dynamic::UNIT;
    };
    let Ok(root) = serde_yaml::from_str::<serde_yaml::Value>(&content) else {
        return Dynamic::UNIT;
    };
    let mut current = &root;
    for segment in query.trim_start_matches("$.").split('.') {
        if segment.is_empty() {
            continue;
        }
        let next = match current {
            serde_yaml::Value::Mapping(mapping) => mapping.get(segment),
            serde_yaml::Value::Sequence(items) => {
                segment.parse::<usize>().ok().and_then(|i| items.get(i))
            }
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => return Dynamic::UNIT,
        }
    }
    yaml_to_dynamic(current)
}

fn yaml_to_dynamic(value: &serde_yaml::Value) -> Dynamic {
    match value {
        serde_yaml::Value::Null => Dynamic::UNIT,
        serde_yaml::Value::Bool(b) => (*b).into(),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Dynamic::from(i)
            } else if let Some(f) = n.as_f64() {
                Dynamic::from(f)
            } else {
                Dynamic::UNIT
            }
        }
        serde_yaml::Value::String(s) => s.clone().into(),
        other => rhai::serde::to_dynamic(other).unwrap_or(Dynamic::UNIT),
    }
}

fn str_matches(s: &str, pattern: &str) -> bool {
    match Regex::new(pattern) {
        Ok(re) => re.is_match(s),
        Err(err) => {
            tracing::debug!(pattern, error = %err, "invalid regex in matches()");
            false
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
