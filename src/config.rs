//! Configuration helpers.
//!
//! The config is a small JSON file; every field has a default so an absent
//! file behaves like `leadq config` output. CLI flags override it.
use crate::export::DEFAULT_OUTPUT_FILE;
use crate::lm_client::LM_COMMAND_ENV;
use crate::pipeline::{DEFAULT_COMPANY_COLUMNS, DEFAULT_LEGAL_NAME_COLUMNS};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_SCHEMA_VERSION: u32 = 1;

const CONFIG_DIR_NAME: &str = "leadq";
const CONFIG_FILE_NAME: &str = "config.json";

/// Effective settings for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnrichConfig {
    pub schema_version: u32,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Local LM command; takes precedence over the hosted API when set.
    #[serde(default)]
    pub lm_command: Option<String>,
    #[serde(default = "default_json_mode")]
    pub json_mode: bool,
    /// Constrain hosted-model answers to the lead fields (with `json_mode`).
    #[serde(default = "default_response_schema")]
    pub response_schema: bool,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Pause between successive model calls.
    #[serde(default)]
    pub delay_ms: u64,
    #[serde(default = "default_legal_name_columns")]
    pub legal_name_columns: Vec<String>,
    #[serde(default = "default_company_columns")]
    pub company_columns: Vec<String>,
    /// Replacement instruction template; relative paths resolve against the
    /// config file's directory.
    #[serde(default)]
    pub instructions_path: Option<PathBuf>,
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

fn default_model() -> String {
    "gemini-1.5-pro".to_string()
}

fn default_api_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_json_mode() -> bool {
    true
}

fn default_response_schema() -> bool {
    true
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_legal_name_columns() -> Vec<String> {
    DEFAULT_LEGAL_NAME_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .collect()
}

fn default_company_columns() -> Vec<String> {
    DEFAULT_COMPANY_COLUMNS.iter().map(|c| c.to_string()).collect()
}

fn default_output() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_FILE)
}

/// Build the config used when no file exists.
pub fn default_config() -> EnrichConfig {
    EnrichConfig {
        schema_version: CONFIG_SCHEMA_VERSION,
        model: default_model(),
        api_base_url: default_api_base_url(),
        api_key_env: default_api_key_env(),
        lm_command: None,
        json_mode: default_json_mode(),
        response_schema: default_response_schema(),
        request_timeout_secs: default_request_timeout_secs(),
        delay_ms: 0,
        legal_name_columns: default_legal_name_columns(),
        company_columns: default_company_columns(),
        instructions_path: None,
        output: default_output(),
    }
}

/// Render a config as pretty JSON for `leadq config`.
pub fn config_stub(config: &EnrichConfig) -> Result<String> {
    serde_json::to_string_pretty(config).context("serialize config")
}

/// `$XDG_CONFIG_HOME/leadq/config.json` (or the platform equivalent).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load and validate a config file.
pub fn load_config(path: &Path) -> Result<EnrichConfig> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: EnrichConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    validate_config(&config).with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

/// A config plus the file it came from, if any.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: EnrichConfig,
    pub source: Option<PathBuf>,
}

impl LoadedConfig {
    /// Instruction template path, resolved against the config file directory.
    pub fn instructions_path(&self) -> Option<PathBuf> {
        let path = self.config.instructions_path.as_ref()?;
        if path.is_absolute() {
            return Some(path.clone());
        }
        let base = self
            .source
            .as_deref()
            .and_then(Path::parent)
            .unwrap_or_else(|| Path::new(""));
        Some(base.join(path))
    }
}

/// Resolve the config: an explicit path must exist; the default location is
/// optional and falls back to built-in defaults.
pub fn resolve_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        return Ok(LoadedConfig {
            config: load_config(path)?,
            source: Some(path.to_path_buf()),
        });
    }
    match default_config_path().filter(|path| path.is_file()) {
        Some(path) => Ok(LoadedConfig {
            config: load_config(&path)?,
            source: Some(path),
        }),
        None => Ok(LoadedConfig {
            config: default_config(),
            source: None,
        }),
    }
}

/// Validate schema version and user-provided values.
pub fn validate_config(config: &EnrichConfig) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported config schema_version {} (expected {})",
            config.schema_version,
            CONFIG_SCHEMA_VERSION
        ));
    }
    if config.model.trim().is_empty() {
        return Err(anyhow!("model must be non-empty"));
    }
    if config.api_base_url.trim().is_empty() {
        return Err(anyhow!("api_base_url must be non-empty"));
    }
    if config.api_key_env.trim().is_empty() {
        return Err(anyhow!("api_key_env must be non-empty"));
    }
    if config.request_timeout_secs == 0 {
        return Err(anyhow!("request_timeout_secs must be greater than zero"));
    }
    if config.legal_name_columns.is_empty() && config.company_columns.is_empty() {
        return Err(anyhow!(
            "at least one of legal_name_columns or company_columns must be non-empty"
        ));
    }
    if let Some(command) = config.lm_command.as_deref() {
        if command.trim().is_empty() {
            return Err(anyhow!("lm_command must be non-empty when set"));
        }
    }
    Ok(())
}

/// Display-name candidates: legal-name columns first, then company columns.
pub fn display_columns(config: &EnrichConfig) -> Vec<String> {
    config
        .legal_name_columns
        .iter()
        .chain(&config.company_columns)
        .cloned()
        .collect()
}

/// Resolve the LM command: CLI flag, then config, then environment.
pub fn resolve_lm_command(cli: Option<&str>, config: &EnrichConfig) -> Option<String> {
    resolve_lm_command_with_env(cli, config, env::var(LM_COMMAND_ENV).ok())
}

fn resolve_lm_command_with_env(
    cli: Option<&str>,
    config: &EnrichConfig,
    env_value: Option<String>,
) -> Option<String> {
    cli.map(str::to_string)
        .or_else(|| config.lm_command.clone())
        .or(env_value)
        .filter(|command| !command.trim().is_empty())
}

/// Read the API key from the environment variable named in the config.
pub fn resolve_api_key(config: &EnrichConfig) -> Result<String> {
    let name = config.api_key_env.as_str();
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(anyhow!(
            "no API key: set {name} or configure an LM command (--lm, lm_command, {LM_COMMAND_ENV})"
        )),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
