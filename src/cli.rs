//! CLI argument parsing for the lead enrichment workflow.
//!
//! The CLI is intentionally thin: it resolves inputs and hands a loaded table
//! and a model client to the pipeline.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "leadq",
    version,
    about = "Qualify lead lists (CSV or spreadsheet) with a generative model",
    after_help = "Examples:\n  leadq enrich --input leads.xlsx\n  leadq enrich --input leads.csv --output qualified.csv --delay-ms 1500\n  leadq enrich --input leads.csv --lm 'ollama run llama3'\n  leadq preview --input leads.xlsx --rows 2\n  leadq config > ~/.config/leadq/config.json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Enrich(EnrichArgs),
    Preview(PreviewArgs),
    Config(ConfigArgs),
}

/// Enrich command inputs.
#[derive(Parser, Debug)]
#[command(about = "Enrich every row with a model verdict and export the results")]
pub struct EnrichArgs {
    /// Lead table (.csv, .tsv, .xlsx, .xlsm, .xls, .xlsb, .ods)
    #[arg(long, short, value_name = "FILE")]
    pub input: PathBuf,

    /// Output file (.xlsx or .csv); defaults to the config `output`
    #[arg(long, short, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Worksheet to read from a workbook (first sheet by default)
    #[arg(long, value_name = "NAME")]
    pub sheet: Option<String>,

    /// Config file (defaults to the user config dir when present)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Gemini model name, overriding the config
    #[arg(long, value_name = "NAME")]
    pub model: Option<String>,

    /// Local LM command receiving the prompt on stdin (overrides Gemini)
    #[arg(long, value_name = "CMD")]
    pub lm: Option<String>,

    /// Pause between model calls in milliseconds
    #[arg(long, value_name = "MS")]
    pub delay_ms: Option<u64>,

    /// Only process the first N rows
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Emit a machine-readable JSON summary on stdout
    #[arg(long)]
    pub json: bool,

    /// Log model calls and per-row outcomes
    #[arg(long, short)]
    pub verbose: bool,
}

/// Preview command inputs.
#[derive(Parser, Debug)]
#[command(about = "Show columns, display names and prompts without calling a model")]
pub struct PreviewArgs {
    /// Lead table (.csv, .tsv, .xlsx, .xlsm, .xls, .xlsb, .ods)
    #[arg(long, short, value_name = "FILE")]
    pub input: PathBuf,

    /// Worksheet to read from a workbook (first sheet by default)
    #[arg(long, value_name = "NAME")]
    pub sheet: Option<String>,

    /// Config file (defaults to the user config dir when present)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of rows whose prompts are printed
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub rows: usize,
}

/// Config command inputs.
#[derive(Parser, Debug)]
#[command(about = "Print the effective config as JSON")]
pub struct ConfigArgs {
    /// Config file to load instead of the default location
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print built-in defaults, ignoring any config file
    #[arg(long)]
    pub defaults: bool,
}
