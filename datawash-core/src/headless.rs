// File: datawash-core/src/headless.rs

//! Convenience wrappers for one-shot use outside the queue service.
//!
//! These fall back to the shared default configuration when the caller does
//! not pass one.

use anyhow::Result;

use crate::batch::{self, BatchItem};
use crate::config::CleaningConfig;
use crate::engines::regex_engine::{sanitize_record, RegexEngine};
use crate::record::{CleanedRecord, RawRecord};

/// Sanitizes a single record, using the default configuration unless
/// `config` is given.
///
/// Only fails if the embedded default configuration cannot be parsed.
pub fn headless_sanitize(record: &RawRecord, config: Option<&CleaningConfig>) -> Result<CleanedRecord> {
    match config {
        Some(cfg) => Ok(sanitize_record(record, cfg)),
        None => {
            let default = CleaningConfig::shared_default()?;
            Ok(sanitize_record(record, &default))
        }
    }
}

/// Sanitizes a list of records, one outcome per input.
pub fn headless_sanitize_batch(records: &[RawRecord], config: Option<&CleaningConfig>) -> Result<Vec<BatchItem>> {
    let engine = RegexEngine::with_default_config()?;
    Ok(batch::sanitize_batch(&engine, records, config))
}
