//! Row enrichment pipeline.
//!
//! Rows are processed strictly in input order, one model call at a time. A
//! row that fails (transport or extraction) becomes an error-shaped record
//! and the batch moves on, so the result table always has exactly one record
//! per input row.
use crate::error::{ExtractionError, TransportError};
use crate::extract::extract_record;
use crate::lm_client::LeadModel;
use crate::prompt::PromptTemplate;
use crate::record::{EnrichmentRecord, ResultTable};
use crate::table::{LeadRow, LeadTable};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Default legal-name columns consulted first for a row's display name.
pub const DEFAULT_LEGAL_NAME_COLUMNS: &[&str] = &["RAZÃO SOCIAL"];
/// Default company columns consulted after the legal-name columns.
pub const DEFAULT_COMPANY_COLUMNS: &[&str] = &["Empresa"];

/// Knobs for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Columns searched in order for a row's display name.
    pub display_columns: Vec<String>,
    pub template: PromptTemplate,
    /// Fixed delay between successive model calls.
    pub pacing: Option<Duration>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            display_columns: DEFAULT_LEGAL_NAME_COLUMNS
                .iter()
                .chain(DEFAULT_COMPANY_COLUMNS)
                .map(|column| column.to_string())
                .collect(),
            template: PromptTemplate::default(),
            pacing: None,
        }
    }
}

/// How far a run has got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
}

impl Progress {
    /// Completion fraction in `(0, 1]` once at least one row is done.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.processed as f64 / self.total as f64
    }
}

/// Why a single row has no enriched record.
#[derive(Debug, Error)]
pub enum RowFailure {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

/// Result of enriching one row.
#[derive(Debug)]
pub enum RowOutcome {
    Enriched(EnrichmentRecord),
    Failed(RowFailure),
}

/// Notification sent after each row is recorded.
#[derive(Debug)]
pub struct RowReport<'a> {
    pub progress: Progress,
    pub row_index: usize,
    pub display_name: &'a str,
    pub failure: Option<&'a RowFailure>,
}

/// Display name for a row: first non-empty candidate column, else
/// `Row {index+1}`.
pub fn display_name(row: &LeadRow, candidates: &[String]) -> String {
    row.first_present(candidates)
        .unwrap_or_else(|| format!("Row {}", row.index() + 1))
}

/// Enrich a single row. Never panics on model misbehavior; every failure is
/// reported through [`RowOutcome::Failed`].
pub fn enrich_row<M: LeadModel + ?Sized>(
    row: &LeadRow,
    display_name: &str,
    model: &M,
    template: &PromptTemplate,
) -> RowOutcome {
    let prompt = template.render(row);
    tracing::debug!(row = row.index() + 1, prompt_bytes = prompt.len(), "prompt built");

    let response = match model.generate(&prompt) {
        Ok(response) => response,
        Err(err) => return RowOutcome::Failed(err.into()),
    };
    match extract_record(&response.text) {
        Ok(mut record) => {
            record.default_company(display_name);
            record.ensure_status();
            RowOutcome::Enriched(record)
        }
        Err(err) => RowOutcome::Failed(err.into()),
    }
}

/// Run the pipeline over every row of `table`.
///
/// `on_progress` is called once per row, after that row's record has been
/// appended, with strictly increasing progress that ends at `total/total`.
pub fn run<M, F>(
    table: &LeadTable,
    model: &M,
    options: &PipelineOptions,
    mut on_progress: F,
) -> ResultTable
where
    M: LeadModel + ?Sized,
    F: FnMut(&RowReport<'_>),
{
    let total = table.len();
    let mut results = ResultTable::with_capacity(total);
    let start = Instant::now();
    tracing::info!(rows = total, model = %model.describe(), "enrichment started");

    for (position, row) in table.rows().iter().enumerate() {
        if position > 0 {
            if let Some(delay) = options.pacing {
                thread::sleep(delay);
            }
        }

        let name = display_name(row, &options.display_columns);
        let outcome = enrich_row(row, &name, model, &options.template);
        let (record, failure) = match outcome {
            RowOutcome::Enriched(record) => (record, None),
            RowOutcome::Failed(failure) => {
                tracing::warn!(
                    row = row.index() + 1,
                    display_name = %name,
                    error = %failure,
                    "row enrichment failed"
                );
                (
                    EnrichmentRecord::failure(&name, &failure.to_string()),
                    Some(failure),
                )
            }
        };
        results.push(record);

        let progress = Progress {
            processed: position + 1,
            total,
        };
        tracing::debug!(
            row = row.index() + 1,
            fraction = progress.fraction(),
            "row recorded"
        );
        on_progress(&RowReport {
            progress,
            row_index: row.index(),
            display_name: &name,
            failure: failure.as_ref(),
        });
    }

    tracing::info!(
        rows = total,
        elapsed_ms = start.elapsed().as_millis(),
        "enrichment finished"
    );
    results
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
