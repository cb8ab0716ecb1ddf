// datawash-core/src/engines/regex_engine.rs
//! A `SanitizationEngine` implementation built on ordered regex rules.
//!
//! Runs the rule engine, then the length/whitespace policy, and classifies
//! the record from the diagnostics collected along the way. Anything that
//! escapes the pipeline (an internal error or a panic) produces a `failed`
//! record carrying the untouched original content.
//!
//! License: MIT OR APACHE 2.0

use chrono::Utc;
use log::{debug, warn};
use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use crate::config::CleaningConfig;
use crate::engine::SanitizationEngine;
use crate::errors::{panic_message, DatawashError};
use crate::record::{
    CleanStatus, CleanedRecord, RawRecord, META_CLEANED_LENGTH, META_ORIGINAL_LENGTH,
    META_PROCESSING_TIME_MS, TRUNCATE_MARKER,
};
use crate::sanitizers::compiler::get_or_compile_rules;
use crate::sanitizers::policy::apply_policy;
use crate::sanitizers::rules::apply_rules;

#[derive(Debug)]
struct PipelineOutput {
    content: String,
    applied_rules: Vec<String>,
    diagnostics: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RegexEngine {
    config: Arc<CleaningConfig>,
}

impl RegexEngine {
    pub fn new(config: Arc<CleaningConfig>) -> Self {
        Self { config }
    }

    /// Builds an engine around the shared process-wide default configuration.
    pub fn with_default_config() -> anyhow::Result<Self> {
        Ok(Self::new(CleaningConfig::shared_default()?))
    }

    /// Shared handle to the configuration, for callers that outlive `&self`.
    pub fn config_arc(&self) -> Arc<CleaningConfig> {
        Arc::clone(&self.config)
    }
}

fn run_pipeline(content: &str, config: &CleaningConfig) -> Result<PipelineOutput, DatawashError> {
    let compiled = get_or_compile_rules(&config.rules)?;
    let rule_output = apply_rules(content, &compiled);
    let policy = apply_policy(rule_output.content, &config.options);

    let mut applied_rules = rule_output.applied_rules;
    if policy.truncated {
        applied_rules.push(TRUNCATE_MARKER.to_string());
    }
    let mut diagnostics = rule_output.diagnostics;
    diagnostics.extend(policy.diagnostics);

    Ok(PipelineOutput { content: policy.content, applied_rules, diagnostics })
}

/// Sanitizes `record` with `config`. Never fails.
pub fn sanitize_record(record: &RawRecord, config: &CleaningConfig) -> CleanedRecord {
    let started = Instant::now();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| run_pipeline(&record.content, config)))
        .unwrap_or_else(|payload| Err(DatawashError::Fatal(panic_message(payload.as_ref()))));

    finish_record(record, outcome, started)
}

/// Classifies a pipeline outcome and stamps the telemetry metadata.
///
/// An error keeps the original content, drops every applied rule and
/// reports itself as the only diagnostic.
fn finish_record(
    record: &RawRecord,
    outcome: Result<PipelineOutput, DatawashError>,
    started: Instant,
) -> CleanedRecord {
    let (cleaned_content, applied_rules, status, errors) = match outcome {
        Ok(out) if out.diagnostics.is_empty() => (out.content, out.applied_rules, CleanStatus::Success, None),
        Ok(out) => (out.content, out.applied_rules, CleanStatus::Partial, Some(out.diagnostics)),
        Err(e) => {
            warn!("Record '{}' failed to clean: {}", record.id, e);
            (record.content.clone(), Vec::new(), CleanStatus::Failed, Some(vec![e.to_string()]))
        }
    };

    let mut metadata = record.metadata.clone();
    metadata.insert(
        META_PROCESSING_TIME_MS.to_string(),
        Value::from(started.elapsed().as_secs_f64() * 1000.0),
    );
    metadata.insert(META_ORIGINAL_LENGTH.to_string(), Value::from(record.content.chars().count()));
    metadata.insert(META_CLEANED_LENGTH.to_string(), Value::from(cleaned_content.chars().count()));

    debug!(
        "Record '{}' from '{}' cleaned: status={}, applied={:?}",
        record.id,
        record.source,
        status.as_str(),
        applied_rules
    );

    CleanedRecord {
        id: record.id.clone(),
        source: record.source.clone(),
        cleaned_content,
        original_content: record.content.clone(),
        applied_rules,
        metadata,
        processed_at: Utc::now(),
        status,
        errors,
    }
}

impl SanitizationEngine for RegexEngine {
    fn sanitize_with(&self, record: &RawRecord, config: &CleaningConfig) -> CleanedRecord {
        sanitize_record(record, config)
    }

    fn get_config(&self) -> &CleaningConfig {
        &self.config
    }
}
