//! Model clients for lead qualification.
//!
//! The pipeline depends only on [`LeadModel`]: one prompt in, raw text out.
//! Two implementations exist:
//!
//! - [`CommandClient`] runs a user-configured command with the prompt on
//!   stdin and reads the response from stdout (`llm`, `ollama run`, scripts).
//! - [`crate::gemini::GeminiClient`] calls the hosted Gemini API.
//!
//! # Configuration
//!
//! The LM command is resolved in priority order:
//! 1. `--lm` CLI flag
//! 2. `lm_command` in the config file
//! 3. `LEADQ_LM_COMMAND` environment variable
//!
//! When none is set the Gemini client is used.
use crate::error::TransportError;
use anyhow::{anyhow, Context, Result};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Instant;

/// Environment variable naming a local LM command.
pub const LM_COMMAND_ENV: &str = "LEADQ_LM_COMMAND";

/// Raw text returned by a model for one prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelResponse {
    pub text: String,
}

impl ModelResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// The narrow capability the pipeline needs from a model provider.
pub trait LeadModel {
    fn generate(&self, prompt: &str) -> Result<ModelResponse, TransportError>;

    /// Short label for logs and summaries.
    fn describe(&self) -> String;
}

impl<T: LeadModel + ?Sized> LeadModel for Box<T> {
    fn generate(&self, prompt: &str) -> Result<ModelResponse, TransportError> {
        (**self).generate(prompt)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Runs a local command per prompt.
#[derive(Debug, Clone)]
pub struct CommandClient {
    command: String,
    program: PathBuf,
    args: Vec<String>,
    system_instruction: Option<String>,
}

impl CommandClient {
    /// Parse `command` with shell quoting rules and resolve its program on
    /// `PATH` so a typo fails before the first row.
    pub fn new(command: &str) -> Result<Self> {
        let mut args =
            shell_words::split(command).with_context(|| format!("parse LM command: {command}"))?;
        if args.is_empty() {
            return Err(anyhow!("LM command is empty"));
        }
        let program_name = args.remove(0);
        let program = which::which(&program_name)
            .with_context(|| format!("resolve LM command program {program_name:?}"))?;
        Ok(Self {
            command: command.to_string(),
            program,
            args,
            system_instruction: None,
        })
    }

    /// Prepend role framing to every prompt; commands have no separate
    /// system channel.
    pub fn with_system_instruction(mut self, text: &str) -> Self {
        let text = text.trim();
        self.system_instruction = (!text.is_empty()).then(|| text.to_string());
        self
    }
}

impl LeadModel for CommandClient {
    fn generate(&self, prompt: &str) -> Result<ModelResponse, TransportError> {
        let start = Instant::now();
        let input = match &self.system_instruction {
            Some(system) => format!("{system}\n\n{prompt}"),
            None => prompt.to_string(),
        };
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| {
                TransportError::Command(format!("spawn {}: {err}", self.program.display()))
            })?;

        // Write prompt to stdin; dropping the handle closes the pipe. A command
        // that exits without reading is judged by its exit status instead.
        if let Some(mut stdin) = child.stdin.take() {
            if let Err(err) = stdin.write_all(input.as_bytes()) {
                if err.kind() != ErrorKind::BrokenPipe {
                    return Err(TransportError::Command(format!(
                        "write prompt to stdin: {err}"
                    )));
                }
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|err| TransportError::Command(format!("wait for LM command: {err}")))?;
        let elapsed_ms = start.elapsed().as_millis();

        tracing::info!(
            elapsed_ms,
            prompt_bytes = input.len(),
            response_bytes = output.stdout.len(),
            "lm invoke complete"
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TransportError::Command(format!(
                "exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        String::from_utf8(output.stdout)
            .map(ModelResponse::new)
            .map_err(|err| TransportError::Command(format!("decode stdout as UTF-8: {err}")))
    }

    fn describe(&self) -> String {
        format!("command `{}`", self.command)
    }
}
