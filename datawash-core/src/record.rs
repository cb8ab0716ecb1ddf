// datawash-core/src/record.rs
//! Record types exchanged with producers and callers.
//!
//! `RawRecord` is what arrives on the queue; `CleanedRecord` is what the
//! sanitizer hands back. Field names are camelCase on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Marker added to `applied_rules` when the content was cut to `maxLength`.
pub const TRUNCATE_MARKER: &str = "truncate";

/// Metadata keys stamped on every cleaned record.
pub const META_PROCESSING_TIME_MS: &str = "processingTimeMs";
pub const META_ORIGINAL_LENGTH: &str = "originalLength";
pub const META_CLEANED_LENGTH: &str = "cleanedLength";

/// An untrusted text record as sent by an upstream producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    pub id: String,
    pub source: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl RawRecord {
    pub fn new(id: impl Into<String>, source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            content: content.into(),
            metadata: Map::new(),
            timestamp: Utc::now(),
        }
    }
}

/// Outcome classification of a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CleanStatus {
    /// No diagnostics were produced.
    Success,
    /// The pipeline finished but produced at least one diagnostic.
    Partial,
    /// The pipeline aborted; `cleaned_content` is the original content.
    Failed,
}

impl CleanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CleanStatus::Success => "success",
            CleanStatus::Partial => "partial",
            CleanStatus::Failed => "failed",
        }
    }
}

/// The result of sanitizing one `RawRecord`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanedRecord {
    pub id: String,
    pub source: String,
    pub cleaned_content: String,
    pub original_content: String,
    pub applied_rules: Vec<String>,
    pub metadata: Map<String, Value>,
    pub processed_at: DateTime<Utc>,
    pub status: CleanStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl CleanedRecord {
    /// Diagnostics as a slice, empty on success.
    pub fn diagnostics(&self) -> &[String] {
        self.errors.as_deref().unwrap_or(&[])
    }

    pub fn was_applied(&self, rule_name: &str) -> bool {
        self.applied_rules.iter().any(|r| r == rule_name)
    }
}

/// Reply body of the `health-check` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub service: String,
}

impl HealthStatus {
    pub fn healthy(service: &str) -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            service: service.to_string(),
        }
    }
}
