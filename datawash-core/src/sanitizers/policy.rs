//! Post-rule validation and truncation.
//!
//! Runs after the rule engine: optional whitespace normalization, then the
//! length bounds. Lengths are counted in `char`s so multi-byte text is never
//! split mid-character.

use log::debug;

use crate::config::CleaningOptions;

/// Result of applying the length/whitespace policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyOutcome {
    pub content: String,
    pub diagnostics: Vec<String>,
    /// True when the content was cut down to `max_length`.
    pub truncated: bool,
}

/// Collapses whitespace runs into one space and trims both ends.
pub fn normalize_whitespace(content: &str) -> String {
    content.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Applies the options to the rule-engine output.
///
/// Being under `min_length` only adds a diagnostic; the content is returned
/// as is. Both bounds are always checked.
pub fn apply_policy(content: String, options: &CleaningOptions) -> PolicyOutcome {
    let content = if options.normalize_whitespace {
        normalize_whitespace(&content)
    } else {
        content
    };

    let mut diagnostics = Vec::new();
    let mut truncated = false;
    let length = content.chars().count();
    let min = options.min_length.max(0) as usize;
    let max = options.max_length.max(0) as usize;

    if length < min {
        diagnostics.push(format!("cleaned length {} below minimum {}", length, min));
    }

    let content = if length > max {
        debug!("Truncating cleaned content from {} to {} chars.", length, max);
        truncated = true;
        content.chars().take(max).collect()
    } else {
        content
    };

    PolicyOutcome { content, diagnostics, truncated }
}
