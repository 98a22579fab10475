//! Shared setup for workflow commands: config, input table, model client.
use crate::config::{
    display_columns, resolve_api_key, resolve_config, resolve_lm_command, validate_config,
    LoadedConfig,
};
use crate::gemini::{GeminiClient, GeminiConfig};
use crate::lm_client::{CommandClient, LeadModel};
use crate::pipeline::PipelineOptions;
use crate::prompt::{PromptTemplate, SYSTEM_INSTRUCTION};
use crate::table::{describe_source, load_table, LeadTable};
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;

/// Per-invocation overrides of config values.
#[derive(Debug, Default)]
pub(crate) struct ConfigOverrides<'a> {
    pub(crate) model: Option<&'a str>,
    pub(crate) delay_ms: Option<u64>,
}

/// Resolve the config file and apply CLI overrides.
pub(crate) fn load_run_config(
    path: Option<&Path>,
    overrides: &ConfigOverrides<'_>,
) -> Result<LoadedConfig> {
    let mut loaded = resolve_config(path)?;
    if let Some(model) = overrides.model {
        loaded.config.model = model.to_string();
    }
    if let Some(delay_ms) = overrides.delay_ms {
        loaded.config.delay_ms = delay_ms;
    }
    validate_config(&loaded.config).context("invalid command-line overrides")?;
    if let Some(source) = loaded.source.as_deref() {
        tracing::info!(path = %source.display(), "config loaded");
    }
    Ok(loaded)
}

/// Load the lead table; any failure here is fatal before the first row.
pub(crate) fn load_input(path: &Path, sheet: Option<&str>) -> Result<LeadTable> {
    let table = load_table(path, sheet)
        .with_context(|| format!("load input table {}", describe_source(path, sheet)))?;
    tracing::info!(
        source = %describe_source(path, sheet),
        rows = table.len(),
        columns = table.columns().len(),
        "input table loaded"
    );
    Ok(table)
}

/// Pipeline options derived from the config.
pub(crate) fn pipeline_options(loaded: &LoadedConfig) -> Result<PipelineOptions> {
    let template = match loaded.instructions_path() {
        Some(path) => PromptTemplate::load(&path)?,
        None => PromptTemplate::default(),
    };
    let pacing = (loaded.config.delay_ms > 0).then(|| Duration::from_millis(loaded.config.delay_ms));
    Ok(PipelineOptions {
        display_columns: display_columns(&loaded.config),
        template,
        pacing,
    })
}

/// Build the model client: a local command when one is configured, the
/// Gemini API otherwise.
pub(crate) fn build_model(loaded: &LoadedConfig, lm_cli: Option<&str>) -> Result<Box<dyn LeadModel>> {
    let config = &loaded.config;
    if let Some(command) = resolve_lm_command(lm_cli, config) {
        let client = CommandClient::new(&command)?.with_system_instruction(SYSTEM_INSTRUCTION);
        tracing::info!(command = %command, "using local LM command");
        return Ok(Box::new(client));
    }
    let api_key = resolve_api_key(config)?;
    let client = GeminiClient::new(GeminiConfig {
        base_url: config.api_base_url.clone(),
        model: config.model.clone(),
        api_key,
        json_mode: config.json_mode,
        response_schema: config.response_schema,
        system_instruction: Some(SYSTEM_INSTRUCTION.to_string()),
        timeout: Duration::from_secs(config.request_timeout_secs),
    })?;
    tracing::info!(endpoint = client.endpoint(), "using gemini");
    Ok(Box::new(client))
}
