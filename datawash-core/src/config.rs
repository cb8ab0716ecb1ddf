//! Configuration management for `datawash-core`.
//!
//! This module defines the cleaning rules and options that drive the rule
//! engine, the embedded default configuration, and helpers for loading and
//! merging user overrides from YAML.
//!
//! The default configuration is process-wide and immutable. Anything that
//! wants a variant clones it and merges on top (see [`merge_config`]).
//!
//! License: MIT OR Apache-2.0

use anyhow::{Context, Result};
use log::{debug, info, warn};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Maximum allowed length for a regex pattern string.
pub const MAX_PATTERN_LENGTH: usize = 500;

const DEFAULT_CONFIG_YAML: &str = include_str!("../config/default_config.yaml");

static SHARED_DEFAULT: OnceCell<Arc<CleaningConfig>> = OnceCell::new();

/// A single pattern/replacement rule.
///
/// Rules are data: their position in [`CleaningConfig::rules`] is the order in
/// which they are applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CleaningRule {
    /// Unique name within a config. Reported in `appliedRules`.
    pub name: String,
    pub description: String,
    /// Regular expression. A missing or empty pattern means the rule is skipped.
    pub pattern: Option<String>,
    /// Replacement text; `$1`-style capture references are expanded.
    pub replacement: String,
    pub enabled: bool,
}

impl Default for CleaningRule {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            pattern: None,
            replacement: String::new(),
            enabled: true,
        }
    }
}

impl CleaningRule {
    /// Returns the pattern if the rule should run at all.
    pub fn active_pattern(&self) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        self.pattern.as_deref().filter(|p| !p.is_empty())
    }
}

/// Options applied after the rule engine.
///
/// The `remove*` flags are informational: the matching rules do the work.
/// Only `normalize_whitespace` and the length bounds have a runtime effect.
/// Lengths are signed so that an invalid negative bound survives parsing and
/// is reported by the validator instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CleaningOptions {
    pub remove_html: bool,
    pub remove_urls: bool,
    pub remove_emojis: bool,
    pub normalize_whitespace: bool,
    pub remove_special_chars: bool,
    pub min_length: i64,
    pub max_length: i64,
}

impl Default for CleaningOptions {
    fn default() -> Self {
        Self {
            remove_html: true,
            remove_urls: true,
            remove_emojis: true,
            normalize_whitespace: true,
            remove_special_chars: false,
            min_length: 10,
            max_length: 10_000,
        }
    }
}

/// An ordered rule list plus the post-processing options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CleaningConfig {
    pub rules: Vec<CleaningRule>,
    pub options: CleaningOptions,
}

/// Option overrides where every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CleaningOptionsOverride {
    pub remove_html: Option<bool>,
    pub remove_urls: Option<bool>,
    pub remove_emojis: Option<bool>,
    pub normalize_whitespace: Option<bool>,
    pub remove_special_chars: Option<bool>,
    pub min_length: Option<i64>,
    pub max_length: Option<i64>,
}

/// A partial configuration layered on top of a base config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CleaningConfigOverride {
    pub rules: Vec<CleaningRule>,
    pub options: CleaningOptionsOverride,
}

impl CleaningConfig {
    /// Parses a configuration from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yml::from_str(text).context("Failed to parse cleaning configuration")
    }

    /// Loads the built-in configuration embedded in the binary.
    pub fn load_default() -> Result<Self> {
        debug!("Loading default cleaning config from embedded string...");
        let config = Self::from_yaml_str(DEFAULT_CONFIG_YAML)
            .context("Failed to parse default cleaning config")?;
        debug!("Loaded {} default rules.", config.rules.len());
        Ok(config)
    }

    /// Returns the process-wide default configuration, parsing it on first use.
    ///
    /// The returned value is shared read-only between all handlers.
    pub fn shared_default() -> Result<Arc<CleaningConfig>> {
        SHARED_DEFAULT
            .get_or_try_init(|| Self::load_default().map(Arc::new))
            .cloned()
    }

    /// Looks up a rule by name.
    pub fn rule(&self, name: &str) -> Option<&CleaningRule> {
        self.rules.iter().find(|r| r.name == name)
    }
}

impl CleaningConfigOverride {
    /// Loads an override from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading cleaning config from: {}", path.display());
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: CleaningConfigOverride = serde_yml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        info!("Loaded {} rules from file {}.", config.rules.len(), path.display());
        Ok(config)
    }
}

/// Merges a user override onto a base configuration.
///
/// A user rule whose name matches a base rule replaces it at the same
/// position; new rules are appended in the order they appear in the override.
/// Each option set in the override replaces the base value.
pub fn merge_config(base: CleaningConfig, user: Option<CleaningConfigOverride>) -> CleaningConfig {
    debug!("merge_config called. Base rules count: {}", base.rules.len());

    let Some(user) = user else {
        return base;
    };

    let mut rules = base.rules;
    let mut positions: HashMap<String, usize> = rules
        .iter()
        .enumerate()
        .map(|(i, r)| (r.name.clone(), i))
        .collect();

    for user_rule in user.rules {
        match positions.get(&user_rule.name) {
            Some(&idx) => {
                debug!("Overriding rule '{}' in place.", user_rule.name);
                rules[idx] = user_rule;
            }
            None => {
                positions.insert(user_rule.name.clone(), rules.len());
                rules.push(user_rule);
            }
        }
    }

    let mut options = base.options;
    let o = user.options;
    if let Some(v) = o.remove_html {
        options.remove_html = v;
    }
    if let Some(v) = o.remove_urls {
        options.remove_urls = v;
    }
    if let Some(v) = o.remove_emojis {
        options.remove_emojis = v;
    }
    if let Some(v) = o.normalize_whitespace {
        options.normalize_whitespace = v;
    }
    if let Some(v) = o.remove_special_chars {
        options.remove_special_chars = v;
    }
    if let Some(v) = o.min_length {
        debug!("Overriding minLength with user value: {}", v);
        options.min_length = v;
    }
    if let Some(v) = o.max_length {
        debug!("Overriding maxLength with user value: {}", v);
        options.max_length = v;
    }

    debug!("Final total rules after merge: {}", rules.len());
    CleaningConfig { rules, options }
}

/// Locations searched for a config file when none is given explicitly.
pub fn config_candidate_paths() -> Vec<PathBuf> {
    vec![
        Some(PathBuf::from("./datawash.yaml")),
        dirs::config_dir().map(|p| p.join("datawash").join("config.yaml")),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Returns the first existing candidate config file, if any.
pub fn discover_config_file() -> Option<PathBuf> {
    let found = config_candidate_paths().into_iter().find(|p| p.is_file());
    match &found {
        Some(p) => debug!("Discovered config file at {}", p.display()),
        None => debug!("No config file found in candidate locations."),
    }
    found
}

/// Loads the default config and layers the optional file on top.
pub fn load_effective_config(path: Option<&Path>) -> Result<CleaningConfig> {
    let base = CleaningConfig::shared_default()?.as_ref().clone();
    let user = match path {
        Some(p) => Some(CleaningConfigOverride::load_from_file(p)?),
        None => match discover_config_file() {
            Some(p) => Some(CleaningConfigOverride::load_from_file(&p)?),
            None => None,
        },
    };
    let merged = merge_config(base, user);
    if merged.rules.is_empty() {
        warn!("Effective cleaning config has no rules.");
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_shape() {
        let config = CleaningConfig::load_default().unwrap();
        let names: Vec<&str> = config.rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names.first(), Some(&"removeHtmlTags"));
        assert_eq!(names.last(), Some(&"normalizeWhitespace"));
        assert!(names.contains(&"removeUrls"));
        assert_eq!(config.options.min_length, 10);
        assert!(config.options.normalize_whitespace);
    }

    #[test]
    fn test_shared_default_is_same_instance() {
        let a = CleaningConfig::shared_default().unwrap();
        let b = CleaningConfig::shared_default().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_rule_defaults_when_fields_missing() {
        let config = CleaningConfig::from_yaml_str("rules:\n  - name: x\n    pattern: 'a'\n").unwrap();
        let rule = &config.rules[0];
        assert!(rule.enabled);
        assert_eq!(rule.replacement, "");
        assert_eq!(config.options, CleaningOptions::default());
    }

    #[test]
    fn test_active_pattern_skips_disabled_and_empty() {
        let mut rule = CleaningRule { name: "r".into(), pattern: Some("a".into()), ..Default::default() };
        assert_eq!(rule.active_pattern(), Some("a"));
        rule.enabled = false;
        assert_eq!(rule.active_pattern(), None);
        rule.enabled = true;
        rule.pattern = Some(String::new());
        assert_eq!(rule.active_pattern(), None);
    }

    #[test]
    fn test_merge_replaces_in_place_and_appends() {
        let base = CleaningConfig {
            rules: vec![
                CleaningRule { name: "a".into(), pattern: Some("a".into()), ..Default::default() },
                CleaningRule { name: "b".into(), pattern: Some("b".into()), ..Default::default() },
            ],
            options: CleaningOptions::default(),
        };
        let user = CleaningConfigOverride {
            rules: vec![
                CleaningRule { name: "c".into(), pattern: Some("c".into()), ..Default::default() },
                CleaningRule { name: "a".into(), pattern: Some("A".into()), ..Default::default() },
            ],
            options: CleaningOptionsOverride { max_length: Some(20), ..Default::default() },
        };
        let merged = merge_config(base, Some(user));
        let names: Vec<&str> = merged.rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(merged.rules[0].pattern.as_deref(), Some("A"));
        assert_eq!(merged.options.max_length, 20);
        assert_eq!(merged.options.min_length, 10);
    }
}
