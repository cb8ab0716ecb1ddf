// datawash/src/lib.rs
//! # datawash CLI Application
//!
//! Command-line front end for `datawash-core`: one-shot cleaning, config
//! validation, and a stdin-driven queue service.

pub mod cli;
pub mod commands;
pub mod logger;
