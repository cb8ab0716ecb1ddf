// datawash-core/src/lib.rs
//! # datawash Core Library
//!
//! `datawash-core` is the queue-driven data-cleaning pipeline. Raw text
//! records arrive individually or in batches, run through an ordered list of
//! pattern/replacement rules, get length-checked and truncated, and are
//! reported back either by acknowledging the event or by replying to the
//! caller.
//!
//! ## Modules
//!
//! * `config`: `CleaningRule`, `CleaningOptions`, `CleaningConfig`, the
//!   embedded default config and override merging.
//! * `sanitizers`: rule compilation and caching, ordered rule application,
//!   whitespace/length policy.
//! * `engine`: the `SanitizationEngine` trait.
//! * `engines`: `RegexEngine`, the record sanitizer.
//! * `batch`: per-item fault-isolated batch processing.
//! * `validators`: static validation of a configuration.
//! * `record`: `RawRecord`, `CleanedRecord` and related wire types.
//! * `messaging`: routes, the broker seam, `InMemoryBroker`, `QueueConsumer`
//!   and `QueuePublisher`.
//! * `headless`: one-shot helpers that fall back to the default config.
//!
//! ## Usage Example
//!
//! ```rust
//! use datawash_core::{headless_sanitize, RawRecord, CleanStatus};
//! use anyhow::Result;
//!
//! fn main() -> Result<()> {
//!     let record = RawRecord::new("42", "forum", "<p>Read more at https://example.com today</p>");
//!     let cleaned = headless_sanitize(&record, None)?;
//!
//!     assert_eq!(cleaned.cleaned_content, "Read more at [链接] today");
//!     assert_eq!(cleaned.status, CleanStatus::Success);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Cleaning never returns an error: rule failures, length violations and
//! internal faults are reported through `CleanedRecord::status` and
//! `CleanedRecord::errors`. `DatawashError` is reserved for transport and
//! setup problems.
//!
//! ---
//! License: MIT OR Apache-2.0

pub mod batch;
pub mod config;
pub mod engine;
pub mod engines;
pub mod errors;
pub mod headless;
pub mod messaging;
pub mod record;
pub mod sanitizers;
pub mod validators;

/// Re-exports the configuration types and helpers.
pub use config::{
    config_candidate_paths,
    load_effective_config,
    merge_config,
    CleaningConfig,
    CleaningConfigOverride,
    CleaningOptions,
    CleaningOptionsOverride,
    CleaningRule,
    MAX_PATTERN_LENGTH,
};

/// Re-exports the custom error type.
pub use errors::DatawashError;

pub use engine::SanitizationEngine;
pub use engines::regex_engine::{sanitize_record, RegexEngine};

pub use batch::{sanitize_batch, BatchItem, BatchItemFailure, BatchSummary};
pub use record::{CleanStatus, CleanedRecord, HealthStatus, RawRecord, TRUNCATE_MARKER};
pub use validators::{validate_config, ValidationReport};

pub use headless::{headless_sanitize, headless_sanitize_batch};

/// Re-exports the messaging surface.
pub use messaging::broker::{Broker, BrokerStats, DeadLetter, DeliverySource, InMemoryBroker};
pub use messaging::consumer::{decide_outcome, ConsumerStats, QueueConsumer};
pub use messaging::handlers::{EventHandler, RpcHandler};
pub use messaging::publisher::QueuePublisher;
pub use messaging::{AckOutcome, EventRoute, QueueArguments, Route, RpcRoute};
