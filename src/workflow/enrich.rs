//! Workflow enrich step.
//!
//! Loads the table, runs the pipeline with a progress bar, exports the
//! result table and prints a summary. Failed rows are data, not errors: the
//! command only fails for fatal conditions (input, config, export).
use super::context::{build_model, load_input, load_run_config, pipeline_options, ConfigOverrides};
use crate::cli::EnrichArgs;
use crate::export::{check_output_path, export_results};
use crate::pipeline;
use crate::progress::ProgressReporter;
use crate::record::{EnrichmentRecord, RunSummary, COMPANY_FIELD, ERROR_FIELD};
use crate::table::LeadTable;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

/// Machine-readable run summary for `--json`.
#[derive(Debug, Serialize)]
struct EnrichReport {
    input: String,
    output: String,
    model: String,
    #[serde(flatten)]
    summary: RunSummary,
    failed_rows: Vec<FailedRow>,
}

#[derive(Debug, Serialize)]
struct FailedRow {
    /// 1-based row number in the input table.
    row: usize,
    company: String,
    error: String,
}

pub(crate) fn run_enrich(args: &EnrichArgs) -> Result<()> {
    let overrides = ConfigOverrides {
        model: args.model.as_deref(),
        delay_ms: args.delay_ms,
    };
    let loaded = load_run_config(args.config.as_deref(), &overrides)?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| loaded.config.output.clone());
    check_output_path(&output).context("check output path")?;

    let mut table = load_input(&args.input, args.sheet.as_deref())?;
    if let Some(limit) = args.limit {
        table.truncate(limit);
    }
    if table.is_empty() {
        tracing::warn!(input = %args.input.display(), "input table has no rows");
    }
    let options = pipeline_options(&loaded)?;
    let model = build_model(&loaded, args.lm.as_deref())?;

    let reporter = ProgressReporter::new(table.len(), !args.json);
    let results = pipeline::run(&table, &model, &options, |report| reporter.on_row(report));
    reporter.finish();

    export_results(&results, &output)
        .with_context(|| format!("export results to {}", output.display()))?;

    let report = EnrichReport {
        input: args.input.display().to_string(),
        output: output.display().to_string(),
        model: model.describe(),
        summary: RunSummary::from_records(&results),
        failed_rows: failed_rows(&table, &results),
    };
    if args.json {
        let text = serde_json::to_string_pretty(&report).context("serialize run summary")?;
        println!("{text}");
    } else {
        print_report(&report, &output);
    }
    Ok(())
}

fn failed_rows(table: &LeadTable, results: &[EnrichmentRecord]) -> Vec<FailedRow> {
    table
        .rows()
        .iter()
        .zip(results)
        .filter(|(_, record)| record.is_error())
        .map(|(row, record)| FailedRow {
            row: row.index() + 1,
            company: record.get_str(COMPANY_FIELD).unwrap_or_default().to_string(),
            error: record.get_str(ERROR_FIELD).unwrap_or_default().to_string(),
        })
        .collect()
}

fn print_report(report: &EnrichReport, output: &Path) {
    let summary = &report.summary;
    println!(
        "enriched {}/{} rows with {} ({} failed)",
        summary.enriched, summary.total, report.model, summary.failed
    );
    for failed in &report.failed_rows {
        println!("  row {} ({}): {}", failed.row, failed.company, failed.error);
    }
    println!("wrote {}", output.display());
}
