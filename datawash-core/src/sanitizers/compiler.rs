//! compiler.rs - Manages the compilation and caching of cleaning rules.
//!
//! Converts an ordered list of `CleaningRule`s into a `CompiledRuleSet`.
//! Compilation never fails as a whole: a rule that does not compile keeps its
//! error so the rule engine can report it in place and move on. Compiled sets
//! are cached process-wide, keyed by the ordered rule list.
//!
//! License: MIT OR APACHE 2.0

use lazy_static::lazy_static;
use log::{debug, warn};
use regex::{Regex, RegexBuilder};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock};

use crate::config::{CleaningRule, MAX_PATTERN_LENGTH};
use crate::errors::DatawashError;

/// Upper bound on distinct rule sets kept in the cache.
const MAX_CACHED_RULE_SETS: usize = 64;

/// Compiled size limit for a single rule's regex.
const REGEX_SIZE_LIMIT: usize = 10 * (1 << 20);

/// A single rule ready for application.
#[derive(Debug)]
pub struct CompiledRule {
    pub name: String,
    pub replacement: String,
    /// The compiled regex, or the reason it could not be built.
    pub regex: Result<Regex, String>,
}

/// All active rules of a config, in application order.
#[derive(Debug, Default)]
pub struct CompiledRuleSet {
    pub rules: Vec<CompiledRule>,
}

impl CompiledRuleSet {
    /// Number of rules that failed to compile.
    pub fn failed_count(&self) -> usize {
        self.rules.iter().filter(|r| r.regex.is_err()).count()
    }
}

lazy_static! {
    static ref COMPILED_RULES_CACHE: RwLock<HashMap<u64, Arc<CompiledRuleSet>>> =
        RwLock::new(HashMap::new());
}

/// Order-sensitive hash of the rule list.
fn hash_rules(rules: &[CleaningRule]) -> u64 {
    let mut hasher = DefaultHasher::new();
    rules.hash(&mut hasher);
    hasher.finish()
}

fn compile_pattern(rule_name: &str, pattern: &str) -> Result<Regex, DatawashError> {
    if pattern.len() > MAX_PATTERN_LENGTH {
        return Err(DatawashError::PatternLengthExceeded(
            rule_name.to_string(),
            pattern.len(),
            MAX_PATTERN_LENGTH,
        ));
    }
    RegexBuilder::new(pattern)
        .unicode(true)
        .size_limit(REGEX_SIZE_LIMIT)
        .build()
        .map_err(|e| DatawashError::RuleCompilationError(rule_name.to_string(), e))
}

/// Compiles the active rules of `rules`, preserving order.
///
/// Disabled rules and rules without a pattern are left out entirely.
pub fn compile_rules(rules: &[CleaningRule]) -> CompiledRuleSet {
    debug!("Starting compilation of {} rules.", rules.len());

    let mut compiled = Vec::with_capacity(rules.len());
    for rule in rules {
        let Some(pattern) = rule.active_pattern() else {
            debug!("Skipping rule '{}': disabled or no pattern.", rule.name);
            continue;
        };

        let regex = compile_pattern(&rule.name, pattern).map_err(|e| {
            warn!("Rule '{}' will be skipped at runtime: {}", rule.name, e);
            match e {
                DatawashError::RuleCompilationError(_, inner) => inner.to_string(),
                other => other.to_string(),
            }
        });

        compiled.push(CompiledRule {
            name: rule.name.clone(),
            replacement: rule.replacement.clone(),
            regex,
        });
    }

    debug!("Finished compiling rules. Total compiled: {}.", compiled.len());
    CompiledRuleSet { rules: compiled }
}

/// Gets a `CompiledRuleSet` from the cache or compiles it if not found.
///
/// A poisoned cache lock is reported as `DatawashError::Fatal`.
pub fn get_or_compile_rules(rules: &[CleaningRule]) -> Result<Arc<CompiledRuleSet>, DatawashError> {
    let cache_key = hash_rules(rules);

    {
        let cache = COMPILED_RULES_CACHE
            .read()
            .map_err(|_| DatawashError::Fatal("compiled rule cache lock poisoned".to_string()))?;
        if let Some(set) = cache.get(&cache_key) {
            debug!("Serving compiled rules from cache for key: {}", cache_key);
            return Ok(Arc::clone(set));
        }
    }

    let compiled = Arc::new(compile_rules(rules));

    let mut cache = COMPILED_RULES_CACHE
        .write()
        .map_err(|_| DatawashError::Fatal("compiled rule cache lock poisoned".to_string()))?;
    if cache.len() >= MAX_CACHED_RULE_SETS {
        debug!("Compiled rule cache full ({} sets); clearing.", cache.len());
        cache.clear();
    }
    cache.insert(cache_key, Arc::clone(&compiled));
    debug!("Successfully compiled and cached rules for key: {}", cache_key);
    Ok(compiled)
}

/// Checks that a pattern compiles under the same settings the engine uses.
pub fn check_pattern(rule_name: &str, pattern: &str) -> Result<Regex, DatawashError> {
    compile_pattern(rule_name, pattern)
}
