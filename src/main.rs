//! `leadq`: qualify lead lists with a generative model.
//!
//! The binary loads a CSV or spreadsheet of leads, asks a model for an ICP
//! verdict per row, and exports the augmented table.
use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod error;
mod export;
mod extract;
mod gemini;
mod lm_client;
mod pipeline;
mod progress;
mod prompt;
mod record;
mod table;
mod workflow;

fn main() -> Result<()> {
    let args = cli::RootArgs::parse();
    let verbose = matches!(&args.command, cli::Command::Enrich(enrich) if enrich.verbose);
    init_tracing(verbose);

    match args.command {
        cli::Command::Enrich(args) => workflow::run_enrich(&args),
        cli::Command::Preview(args) => workflow::run_preview(&args),
        cli::Command::Config(args) => workflow::run_config(&args),
    }
}

/// `RUST_LOG` wins; otherwise warnings only, or info with `--verbose`.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "info" } else { "warn" })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
