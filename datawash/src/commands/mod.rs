// datawash/src/commands/mod.rs
//! Command implementations.

use anyhow::Result;
use log::debug;

use datawash_core::{
    load_effective_config, merge_config, validate_config, CleaningConfig, CleaningConfigOverride,
    CleaningOptionsOverride,
};

use crate::cli::ConfigArgs;

pub mod clean;
pub mod serve;
pub mod validate;

/// Builds the effective config: built-in default, then the config file
/// (explicit or discovered), then command-line length overrides.
pub fn resolve_config(args: &ConfigArgs) -> Result<CleaningConfig> {
    let from_file = load_effective_config(args.config.as_deref())?;

    if args.min_length.is_none() && args.max_length.is_none() {
        return Ok(from_file);
    }
    debug!(
        "Applying command-line length overrides: min={:?}, max={:?}",
        args.min_length, args.max_length
    );
    let flags = CleaningConfigOverride {
        rules: Vec::new(),
        options: CleaningOptionsOverride {
            min_length: args.min_length,
            max_length: args.max_length,
            ..CleaningOptionsOverride::default()
        },
    };
    Ok(merge_config(from_file, Some(flags)))
}

/// Like [`resolve_config`], but refuses a config that fails validation.
pub fn resolve_valid_config(args: &ConfigArgs) -> Result<CleaningConfig> {
    let config = resolve_config(args)?;
    validate_config(&config).into_result()?;
    Ok(config)
}
