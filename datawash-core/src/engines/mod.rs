// datawash-core/src/engines/mod.rs
//! Concrete `SanitizationEngine` implementations.
//!
//! `regex_engine` is the ordered pattern/replacement pipeline used by the
//! queue service.

pub mod regex_engine;
