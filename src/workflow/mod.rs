//! Workflow orchestration behind the CLI commands.
//!
//! Each step is small so the CLI stays thin and the pipeline stays free of
//! presentation concerns.
mod context;
mod enrich;
mod preview;

use crate::cli::ConfigArgs;
use crate::config::{config_stub, default_config, resolve_config};
use anyhow::Result;

pub(crate) use enrich::run_enrich;
pub(crate) use preview::run_preview;

/// Print the effective config (or built-in defaults) as JSON.
pub(crate) fn run_config(args: &ConfigArgs) -> Result<()> {
    let config = if args.defaults {
        default_config()
    } else {
        resolve_config(args.config.as_deref())?.config
    };
    println!("{}", config_stub(&config)?);
    Ok(())
}
