//! Enrichment records and the result table.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Company name field.
pub const COMPANY_FIELD: &str = "Empresa";
/// Qualification status field.
pub const STATUS_FIELD: &str = "status_icp";
/// Optional short justification field.
pub const JUSTIFICATION_FIELD: &str = "justificativa_curta";
/// Error detail field, present only on failed rows.
pub const ERROR_FIELD: &str = "erro";
/// Status sentinel marking a row that could not be enriched.
pub const ERROR_STATUS: &str = "Erro";

/// Structured output for one input row, in field order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnrichmentRecord(Map<String, Value>);

impl EnrichmentRecord {
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Error-shaped record for a row whose model call or extraction failed.
    pub fn failure(display_name: &str, message: &str) -> Self {
        let mut map = Map::new();
        map.insert(COMPANY_FIELD.to_string(), Value::from(display_name));
        map.insert(STATUS_FIELD.to_string(), Value::from(ERROR_STATUS));
        map.insert(ERROR_FIELD.to_string(), Value::from(message));
        Self(map)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Fill the company field when the model omitted it (null or blank counts
    /// as omitted).
    pub fn default_company(&mut self, display_name: &str) {
        let missing = match self.0.get(COMPANY_FIELD) {
            None | Some(Value::Null) => true,
            Some(Value::String(text)) => text.trim().is_empty(),
            Some(_) => false,
        };
        if missing {
            self.0
                .insert(COMPANY_FIELD.to_string(), Value::from(display_name));
        }
    }

    /// Ensure a status field exists so every record is well-formed.
    pub fn ensure_status(&mut self) {
        self.0
            .entry(STATUS_FIELD.to_string())
            .or_insert(Value::Null);
    }

    pub fn is_error(&self) -> bool {
        self.get_str(STATUS_FIELD) == Some(ERROR_STATUS) && self.0.contains_key(ERROR_FIELD)
    }
}

/// Ordered records, one per input row.
pub type ResultTable = Vec<EnrichmentRecord>;

/// Counts over a finished result table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub enriched: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn from_records(records: &[EnrichmentRecord]) -> Self {
        let failed = records.iter().filter(|r| r.is_error()).count();
        Self {
            total: records.len(),
            enriched: records.len() - failed,
            failed,
        }
    }
}
