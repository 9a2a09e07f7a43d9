//! formweave operator tool
//!
//! Usage:
//!   formweave check contact.json
//!   formweave submit contact.json data.json
//!
//! Both commands import the export into an in-memory store, so nothing is
//! persisted. Mail is captured and printed instead of sent.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use formweave_cli::Workbench;
use formweave_engine::EngineConfig;
use serde::Serialize;
use tracing::{Level, debug};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "formweave")]
#[command(about = "Check form exports and try submissions against the built-in plugins")]
struct Args {
    /// Engine configuration file
    #[arg(short, long, default_value = "formweave.toml")]
    config: PathBuf,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import an export document and print the assembled field order
    Check {
        /// Form export (JSON)
        export: PathBuf,
    },
    /// Import an export document and submit data to it
    Submit {
        /// Form export (JSON)
        export: PathBuf,
        /// Submitted values (JSON object)
        data: PathBuf,
    },
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = EngineConfig::load_from(&args.config);
    debug!(?config, "Engine configuration");
    let workbench = Workbench::new(config)?;

    match args.command {
        Command::Check { export } => {
            let report = workbench.check(&read(&export)?)?;
            print_json(&report)
        }
        Command::Submit { export, data } => {
            let report = workbench.submit(&read(&export)?, &read(&data)?)?;
            print_json(&report)
        }
    }
}
