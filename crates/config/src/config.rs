// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration: the profile map and the ordered rule list

use crate::error::ConfigError;
use crate::profile::Profile;
use crate::rule::Rule;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The full render configuration.
///
/// `merge` leaves the result unvalidated; call [`Config::validate`] after
/// the final merge and before handing the config to a runner.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub profiles: IndexMap<String, Profile>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl Config {
    /// Parse and validate a YAML configuration document.
    pub fn from_yaml(input: &str) -> Result<Self, ConfigError> {
        let mut config: Config = serde_yaml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Compile every predicate and env pattern, build every profile, and
    /// resolve rule references. Errors carry a breadcrumb into the
    /// configuration tree. Idempotent: re-validating an unchanged config
    /// returns the same outcome.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        for (name, profile) in &mut self.profiles {
            profile.build().map_err(|source| ConfigError::Profile {
                name: name.clone(),
                source,
            })?;
        }
        for (index, rule) in self.rules.iter_mut().enumerate() {
            rule.match_expr
                .compile()
                .map_err(|source| ConfigError::Rule {
                    location: format!("rules[{index}].match"),
                    source,
                })?;
            let Some(profile_index) = self.profiles.get_index_of(&rule.profile_name) else {
                return Err(ConfigError::UnknownProfile {
                    location: format!("rules[{index}].profile"),
                    name: rule.profile_name.clone(),
                });
            };
            rule.resolved = Some(profile_index);
        }
        Ok(())
    }

    /// Merge a project configuration onto this (global) one: project
    /// profiles replace by name, project rules are prepended so they are
    /// evaluated first. Rule resolutions are cleared; re-validate.
    pub fn merge(&mut self, project: Config) {
        for (name, profile) in project.profiles {
            self.profiles.insert(name, profile);
        }
        let mut rules = project.rules;
        rules.append(&mut self.rules);
        self.rules = rules;
        for rule in &mut self.rules {
            rule.resolved = None;
        }
    }

    /// The built-in profiles (`ks`, `helm`, `yaml`) and their detection
    /// rules, in priority order.
    pub fn default_config() -> Self {
        let yaml_sources = r#"files.filter(|f| pathExt(f) == ".yaml" || pathExt(f) == ".yml")"#;
        let mut profiles = IndexMap::new();
        profiles.insert(
            "ks".to_string(),
            Profile::new("kustomize", &["build", "."]).with_source(yaml_sources),
        );
        profiles.insert(
            "helm".to_string(),
            Profile::new("helm", &["template", "."]).with_source(
                r#"files.filter(|f| pathExt(f) == ".yaml" || pathExt(f) == ".yml" || pathExt(f) == ".tpl")"#,
            ),
        );
        profiles.insert(
            "yaml".to_string(),
            Profile::new("sh", &["-c", "cat -- *.yaml *.yml 2>/dev/null || true"])
                .with_source(yaml_sources),
        );
        let rules = vec![
            Rule::new(
                r#"files.some(|f| pathBase(f) == "kustomization.yaml" || pathBase(f) == "kustomization.yml" || pathBase(f) == "Kustomization")"#,
                "ks",
            ),
            Rule::new(
                r#"files.some(|f| pathBase(f) == "Chart.yaml" && yamlPath(f, "apiVersion") == "v2")"#,
                "helm",
            ),
            Rule::new(
                r#"files.some(|f| pathExt(f) == ".yaml" || pathExt(f) == ".yml")"#,
                "yaml",
            ),
        ];
        Self { profiles, rules }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
