//! Ordered application of compiled cleaning rules.
//!
//! Each rule is applied to the output of the previous one. A rule that could
//! not be compiled yields a diagnostic and the fold carries on with the
//! content unchanged, so one bad rule never aborts the rest.

use log::debug;
use std::borrow::Cow;

use super::compiler::{CompiledRule, CompiledRuleSet};

/// What a single rule did to the content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleApplication {
    pub content: String,
    pub applied: bool,
}

/// Accumulated result of running every rule in a set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleEngineOutput {
    pub content: String,
    /// Names of rules that changed the content, in application order.
    pub applied_rules: Vec<String>,
    pub diagnostics: Vec<String>,
}

/// Applies one rule.
///
/// The rule counts as applied when the output differs from the input. A
/// same-length substitution is still reported.
pub fn apply_rule(rule: &CompiledRule, content: &str) -> Result<RuleApplication, String> {
    let regex = rule
        .regex
        .as_ref()
        .map_err(|msg| format!("rule {} failed: {}", rule.name, msg))?;

    match regex.replace_all(content, rule.replacement.as_str()) {
        Cow::Borrowed(_) => Ok(RuleApplication { content: content.to_string(), applied: false }),
        Cow::Owned(replaced) => {
            let applied = replaced != content;
            Ok(RuleApplication { content: replaced, applied })
        }
    }
}

/// Runs every rule in `set` over `content`, in order.
pub fn apply_rules(content: &str, set: &CompiledRuleSet) -> RuleEngineOutput {
    let initial = RuleEngineOutput { content: content.to_string(), ..Default::default() };

    set.rules.iter().fold(initial, |mut acc, rule| {
        match apply_rule(rule, &acc.content) {
            Ok(step) => {
                if step.applied {
                    debug!("Rule '{}' changed content ({} chars).", rule.name, step.content.chars().count());
                    acc.applied_rules.push(rule.name.clone());
                }
                acc.content = step.content;
            }
            Err(diagnostic) => {
                debug!("{}", diagnostic);
                acc.diagnostics.push(diagnostic);
            }
        }
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CleaningRule;
    use crate::sanitizers::compiler::compile_rules;

    fn rule(name: &str, pattern: &str, replacement: &str) -> CleaningRule {
        CleaningRule {
            name: name.into(),
            pattern: Some(pattern.into()),
            replacement: replacement.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_rules_apply_in_order() {
        let set = compile_rules(&[rule("ab", "a", "b"), rule("bc", "b", "c")]);
        let out = apply_rules("a", &set);
        assert_eq!(out.content, "c");
        assert_eq!(out.applied_rules, vec!["ab", "bc"]);
    }

    #[test]
    fn test_same_length_substitution_is_reported() {
        let set = compile_rules(&[rule("swap", "x", "y")]);
        let out = apply_rules("xox", &set);
        assert_eq!(out.content, "yoy");
        assert_eq!(out.applied_rules, vec!["swap"]);
    }

    #[test]
    fn test_identity_replacement_is_not_reported() {
        let set = compile_rules(&[rule("noop", "(a)", "$1")]);
        let out = apply_rules("banana", &set);
        assert_eq!(out.content, "banana");
        assert!(out.applied_rules.is_empty());
    }

    #[test]
    fn test_broken_rule_is_isolated() {
        let set = compile_rules(&[rule("broken", "[", ""), rule("digits", "[0-9]", "#")]);
        let out = apply_rules("a1", &set);
        assert_eq!(out.content, "a#");
        assert_eq!(out.applied_rules, vec!["digits"]);
        assert_eq!(out.diagnostics.len(), 1);
        assert!(out.diagnostics[0].starts_with("rule broken failed: "));
    }

    #[test]
    fn test_unicode_aware_matching() {
        let set = compile_rules(&[rule("han", r"\p{Han}+", "*")]);
        let out = apply_rules("hi 你好 there", &set);
        assert_eq!(out.content, "hi * there");
    }
}
