//! Prompt assembly for lead qualification.
//!
//! The instruction text is a template with a `{row_data}` placeholder that
//! receives the row's full column/value mapping as JSON.
use crate::table::LeadRow;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

// Prompt template loaded at compile time
const QUALIFY_LEAD: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/qualify_lead.md"
));

/// Role framing sent ahead of every prompt (as a system instruction where the
/// model supports one).
pub const SYSTEM_INSTRUCTION: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/system_instruction.md"
));

const ROW_DATA_PLACEHOLDER: &str = "{row_data}";

/// Instruction text plus the rule for splicing row data into it.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    text: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            text: QUALIFY_LEAD.to_string(),
        }
    }
}

impl PromptTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Load a user-supplied instruction file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("read instructions {}", path.display()))?;
        Ok(Self::new(text))
    }

    /// Build the prompt for one row.
    ///
    /// Templates without a placeholder get the row appended under a `Dados:`
    /// heading so custom instructions never lose the row data.
    pub fn render(&self, row: &LeadRow) -> String {
        let row_data = format!("{:#}", row.to_json());
        if self.text.contains(ROW_DATA_PLACEHOLDER) {
            self.text.replace(ROW_DATA_PLACEHOLDER, &row_data)
        } else {
            format!("{}\n\nDados:\n{row_data}\n", self.text.trim_end())
        }
    }
}
