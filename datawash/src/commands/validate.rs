// datawash/src/commands/validate.rs
//! `datawash validate`: report every problem in the effective config.

use anyhow::Result;
use log::{info, warn};

use datawash_core::validate_config;

use super::resolve_config;
use crate::cli::ValidateCommand;

/// Prints the validation report as JSON. Returns whether the config is valid.
pub fn run_validate(cmd: ValidateCommand) -> Result<bool> {
    let config = resolve_config(&cmd.config)?;
    let report = validate_config(&config);

    if report.valid {
        info!("Configuration is valid ({} rules).", config.rules.len());
    } else {
        warn!("Configuration has {} problem(s).", report.errors.len());
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(report.valid)
}
