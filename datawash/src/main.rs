// datawash/src/main.rs
//! datawash entry point.
//!
//! Loads `.env`, parses arguments, initialises logging and dispatches to the
//! selected command.

use anyhow::Result;
use clap::Parser;

use datawash::cli::{Cli, Commands};
use datawash::commands::{clean, serve, validate};
use datawash::logger;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is not an error.
    let _ = dotenvy::dotenv();

    let args = Cli::parse();
    logger::init_logger(logger::level_from_flags(args.quiet, args.debug));

    match args.command {
        Commands::Clean(cmd) => clean::run_clean(cmd),
        Commands::Validate(cmd) => {
            if !validate::run_validate(cmd)? {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Serve(cmd) => serve::run_serve(cmd).await,
    }
}
