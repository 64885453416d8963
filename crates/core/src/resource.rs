// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Splitting a rendered YAML stream into resource records

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from [`split_resources`].
#[derive(Debug, Error)]
pub enum SplitError {
    #[error("invalid YAML document at index {index}: {source}")]
    Parse {
        index: usize,
        #[source]
        source: serde_yaml::Error,
    },
}

/// One document out of a rendered multi-document YAML stream.
///
/// The splitter extracts the well-known identity fields and carries the
/// document in `raw`, re-rendered from the parsed value; everything else
/// is opaque to the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    pub raw: String,
}

impl Resource {
    /// API group half of `apiVersion` (`apps/v1` → `apps`); empty for the
    /// core group (`v1` → ``).
    pub fn group(&self) -> &str {
        match self.api_version.split_once('/') {
            Some((group, _)) => group,
            None => "",
        }
    }

    /// Version half of `apiVersion` (`apps/v1` → `v1`, `v1` → `v1`).
    pub fn version(&self) -> &str {
        match self.api_version.split_once('/') {
            Some((_, version)) => version,
            None => &self.api_version,
        }
    }
}

/// Split a rendered stream into its YAML documents using serde_yaml's
/// multi-document deserializer, so every boundary the YAML grammar
/// accepts is honored (including `--- # Source: ...` markers with
/// same-line trailing content).
///
/// Empty or whitespace-only input yields an empty vec. Documents that
/// parse to null or to a non-mapping value are skipped. A document that
/// fails to parse at all is an error.
pub fn split_resources(input: &str) -> Result<Vec<Resource>, SplitError> {
    let mut resources = Vec::new();
    for (index, document) in serde_yaml::Deserializer::from_str(input).enumerate() {
        let value = serde_yaml::Value::deserialize(document)
            .map_err(|source| SplitError::Parse { index, source })?;
        let serde_yaml::Value::Mapping(mapping) = value else {
            continue;
        };
        let raw = serde_yaml::to_string(&mapping)
            .map_err(|source| SplitError::Parse { index, source })?;
        resources.push(Resource {
            api_version: str_field(&mapping, "apiVersion"),
            kind: str_field(&mapping, "kind"),
            name: mapping
                .get("metadata")
                .and_then(|m| m.get("name"))
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            raw,
        });
    }
    Ok(resources)
}

fn str_field(mapping: &serde_yaml::Mapping, key: &str) -> String {
    mapping
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
#[path = "resource_tests.rs"]
mod tests;
