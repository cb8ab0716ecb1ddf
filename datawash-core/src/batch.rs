//! Batch orchestration with per-item fault isolation.
//!
//! Every input record yields exactly one entry in the output, in input order:
//! a `CleanedRecord` (whatever its status) or a `BatchItemFailure` naming the
//! record that could not be processed. Nothing is dropped, so callers can
//! always reconcile counts.
//!
//! License: MIT OR APACHE 2.0

use log::{debug, error};
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};

use crate::config::CleaningConfig;
use crate::engine::SanitizationEngine;
use crate::errors::panic_message;
use crate::record::{CleanStatus, CleanedRecord, RawRecord};

/// A record that escaped the sanitizer's own error handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItemFailure {
    pub id: String,
    pub error: String,
}

pub type BatchItem = Result<CleanedRecord, BatchItemFailure>;

/// Per-status counts over a batch result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: usize,
    pub success: usize,
    pub partial: usize,
    pub failed: usize,
    /// Items that produced a `BatchItemFailure`.
    pub errored: usize,
}

impl BatchSummary {
    pub fn from_items(items: &[BatchItem]) -> Self {
        items.iter().fold(Self { total: items.len(), ..Default::default() }, |mut s, item| {
            match item {
                Ok(r) => match r.status {
                    CleanStatus::Success => s.success += 1,
                    CleanStatus::Partial => s.partial += 1,
                    CleanStatus::Failed => s.failed += 1,
                },
                Err(_) => s.errored += 1,
            }
            s
        })
    }
}

/// Sanitizes each record independently.
///
/// `config` overrides the engine's configuration for the whole batch.
pub fn sanitize_batch<E>(engine: &E, records: &[RawRecord], config: Option<&CleaningConfig>) -> Vec<BatchItem>
where
    E: SanitizationEngine + ?Sized,
{
    debug!("Sanitizing batch of {} records.", records.len());
    let config = config.unwrap_or_else(|| engine.get_config());

    records
        .iter()
        .map(|record| {
            panic::catch_unwind(AssertUnwindSafe(|| engine.sanitize_with(record, config))).map_err(|payload| {
                let message = panic_message(payload.as_ref());
                error!("Record '{}' aborted inside batch: {}", record.id, message);
                BatchItemFailure { id: record.id.clone(), error: message }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::regex_engine::RegexEngine;

    struct PanickyEngine {
        inner: RegexEngine,
    }

    impl SanitizationEngine for PanickyEngine {
        fn sanitize_with(&self, record: &RawRecord, config: &CleaningConfig) -> CleanedRecord {
            if record.id == "poison" {
                panic!("poisoned record");
            }
            self.inner.sanitize_with(record, config)
        }

        fn get_config(&self) -> &CleaningConfig {
            self.inner.get_config()
        }
    }

    #[test]
    fn test_panicking_item_is_reported_not_dropped() {
        let engine = PanickyEngine { inner: RegexEngine::with_default_config().unwrap() };
        let records = vec![
            RawRecord::new("ok-1", "t", "a perfectly normal record"),
            RawRecord::new("poison", "t", "anything"),
            RawRecord::new("ok-2", "t", "another perfectly normal record"),
        ];
        let items = engine.sanitize_batch(&records);
        assert_eq!(items.len(), 3);
        assert!(items[0].is_ok());
        assert_eq!(
            items[1].as_ref().unwrap_err(),
            &BatchItemFailure { id: "poison".into(), error: "poisoned record".into() }
        );
        assert_eq!(items[2].as_ref().unwrap().id, "ok-2");

        let summary = BatchSummary::from_items(&items);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.success, 2);
        assert_eq!(summary.errored, 1);
    }

    #[test]
    fn test_empty_batch() {
        let engine = RegexEngine::with_default_config().unwrap();
        assert!(engine.sanitize_batch(&[]).is_empty());
    }
}
