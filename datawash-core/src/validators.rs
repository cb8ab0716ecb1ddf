// File: datawash-core/src/validators.rs
//! Static validation of cleaning configurations.
//!
//! Checks a `CleaningConfig` for well-formedness without running it. Every
//! violation is collected so a caller can fix a configuration in one pass.
//!
//! License: MIT OR APACHE 2.0

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::config::{CleaningConfig, CleaningOptions, CleaningRule};
use crate::errors::DatawashError;
use crate::sanitizers::compiler::check_pattern;

lazy_static! {
    // Replacement syntax as `regex::Captures::expand` reads it: `$$` is a
    // literal dollar, `${name}` is braced, and a bare `$name` takes the
    // longest run of `[_0-9A-Za-z]`.
    static ref CAPTURE_REFERENCE: Regex = Regex::new(r"\$(?:\$|\{([^}]*)\}|([_0-9A-Za-z]+))").unwrap();
}

/// Outcome of [`validate_config`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<String>) -> Self {
        Self { valid: errors.is_empty(), errors }
    }

    /// Converts an invalid report into an error.
    pub fn into_result(self) -> Result<(), DatawashError> {
        if self.valid {
            Ok(())
        } else {
            Err(DatawashError::InvalidConfig(self.errors.join("; ")))
        }
    }
}

/// Group references in a replacement string, in order. Escaped dollars and
/// a `$` not followed by a name are literal text and yield nothing.
fn replacement_references(replacement: &str) -> Vec<&str> {
    CAPTURE_REFERENCE
        .captures_iter(replacement)
        .filter_map(|cap| cap.get(1).or_else(|| cap.get(2)).map(|m| m.as_str()))
        .collect()
}

fn check_replacement(label: &str, regex: &Regex, replacement: &str, errors: &mut Vec<String>) {
    for reference in replacement_references(replacement) {
        match reference.parse::<usize>() {
            Ok(group) if group < regex.captures_len() => {}
            Ok(group) => errors.push(format!(
                "{}: replacement references non-existent capture group '${}'.",
                label, group
            )),
            Err(_) if regex.capture_names().flatten().any(|n| n == reference) => {}
            Err(_) if reference.starts_with(|c: char| c.is_ascii_digit()) => {
                let split = reference.find(|c: char| !c.is_ascii_digit()).unwrap_or(reference.len());
                let (digits, rest) = reference.split_at(split);
                errors.push(format!(
                    "{}: replacement '${}' is read as a group named '{}'; write '${{{}}}{}' for group {} followed by text.",
                    label, reference, reference, digits, rest, digits
                ));
            }
            Err(_) => errors.push(format!(
                "{}: replacement references unknown capture group name '{}'.",
                label, reference
            )),
        }
    }
}

fn validate_rule(index: usize, rule: &CleaningRule, seen: &mut HashSet<String>, errors: &mut Vec<String>) {
    let label = if rule.name.is_empty() {
        format!("Rule #{}", index)
    } else {
        format!("Rule '{}'", rule.name)
    };

    if rule.name.is_empty() {
        errors.push(format!("Rule #{} has an empty `name` field.", index));
    } else if !seen.insert(rule.name.clone()) {
        errors.push(format!("Duplicate rule name found: '{}'.", rule.name));
    }

    let pattern = match rule.pattern.as_deref() {
        Some(p) if !p.is_empty() => p,
        _ => {
            errors.push(format!("{} has an empty `pattern` field.", label));
            return;
        }
    };

    let regex = match check_pattern(&rule.name, pattern) {
        Ok(regex) => regex,
        Err(DatawashError::RuleCompilationError(_, inner)) => {
            errors.push(format!("{} has an invalid regex pattern: {}", label, inner));
            return;
        }
        Err(other) => {
            errors.push(format!("{}: {}", label, other));
            return;
        }
    };

    check_replacement(&label, &regex, &rule.replacement, errors);
}

fn validate_options(options: &CleaningOptions, errors: &mut Vec<String>) {
    if options.min_length < 0 {
        errors.push(format!("`minLength` must be >= 0 (got {}).", options.min_length));
    }
    if options.max_length <= 0 {
        errors.push(format!("`maxLength` must be > 0 (got {}).", options.max_length));
    }
    if options.max_length < options.min_length {
        errors.push(format!(
            "`maxLength` ({}) must be >= `minLength` ({}).",
            options.max_length, options.min_length
        ));
    }
}

/// Validates every rule and the options of `config`.
pub fn validate_config(config: &CleaningConfig) -> ValidationReport {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (index, rule) in config.rules.iter().enumerate() {
        validate_rule(index, rule, &mut seen, &mut errors);
    }
    validate_options(&config.options, &mut errors);

    debug!("Config validation finished with {} error(s).", errors.len());
    ValidationReport::from_errors(errors)
}
