// datawash-core/src/engine.rs
//! Defines the core SanitizationEngine trait.
//!
//! The trait is the seam between the messaging layer and the cleaning
//! pipeline: consumers and handlers only ever see `dyn SanitizationEngine`.
//! Sanitization never returns an error. Rule, length and catastrophic
//! failures all come back as data on the `CleanedRecord`.
//!
//! License: MIT OR APACHE 2.0

use crate::batch::{self, BatchItem};
use crate::config::CleaningConfig;
use crate::record::{CleanedRecord, RawRecord};

/// A pluggable record sanitizer.
pub trait SanitizationEngine: Send + Sync {
    /// Sanitizes one record with the engine's own configuration.
    fn sanitize(&self, record: &RawRecord) -> CleanedRecord {
        self.sanitize_with(record, self.get_config())
    }

    /// Sanitizes one record with a caller-supplied configuration.
    ///
    /// The configuration is treated as a value and is not modified.
    fn sanitize_with(&self, record: &RawRecord, config: &CleaningConfig) -> CleanedRecord;

    /// Sanitizes each record independently, returning one outcome per input
    /// in input order.
    fn sanitize_batch(&self, records: &[RawRecord]) -> Vec<BatchItem> {
        batch::sanitize_batch(self, records, None)
    }

    /// Returns a reference to the engine's configuration.
    fn get_config(&self) -> &CleaningConfig;
}
