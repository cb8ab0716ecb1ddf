// datawash/src/commands/clean.rs
//! `datawash clean`: sanitize one record and print it as JSON.

use anyhow::{Context, Result};
use log::{debug, info};
use std::fs;
use std::io::{self, Read, Write};

use datawash_core::{sanitize_record, CleanedRecord, RawRecord};

use super::resolve_valid_config;
use crate::cli::CleanCommand;

pub fn run_clean(cmd: CleanCommand) -> Result<()> {
    let content = read_input(&cmd)?;
    let config = resolve_valid_config(&cmd.config)?;

    let id = cmd.id.clone().unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let record = RawRecord::new(id, cmd.source.clone(), content);
    debug!("Cleaning record '{}' ({} chars).", record.id, record.content.chars().count());

    let cleaned = sanitize_record(&record, &config);
    info!("Record '{}' finished with status {}.", cleaned.id, cleaned.status.as_str());

    write_output(&cleaned, cmd.pretty)
}

fn read_input(cmd: &CleanCommand) -> Result<String> {
    match &cmd.input_file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file {}", path.display())),
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(cleaned: &CleanedRecord, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(cleaned)?
    } else {
        serde_json::to_string(cleaned)?
    };
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", json).context("Failed to write to stdout")?;
    Ok(())
}
