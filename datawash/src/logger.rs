// datawash/src/logger.rs
//! Process-wide logger setup.
//!
//! `RUST_LOG` is honoured unless an explicit level is passed, in which case
//! that level applies to the datawash crates and other crates stay at `warn`.

use env_logger::{Builder, Env, Target};
use log::LevelFilter;

/// Initialises `env_logger` once. Later calls are ignored.
pub fn init_logger(level: Option<LevelFilter>) {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    builder.target(Target::Stderr).format_timestamp_millis();

    if let Some(level) = level {
        builder
            .filter_level(LevelFilter::Warn)
            .filter_module("datawash", level)
            .filter_module("datawash_core", level);
    }

    // A second initialisation (e.g. from tests) is harmless.
    let _ = builder.try_init();
}

/// Maps the global `--quiet` / `--debug` flags to a level override.
pub fn level_from_flags(quiet: bool, debug: bool) -> Option<LevelFilter> {
    if quiet {
        Some(LevelFilter::Off)
    } else if debug {
        Some(LevelFilter::Debug)
    } else {
        None
    }
}
