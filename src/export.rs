//! Result table export.
//!
//! Columns are the union of record fields in first-seen order, with the
//! company and status fields pinned first. The file is written next to its
//! destination and renamed into place so a failed export never leaves a
//! truncated artifact.
use crate::error::{extension_of, ExportError};
use crate::record::{EnrichmentRecord, COMPANY_FIELD, JUSTIFICATION_FIELD, STATUS_FIELD};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde_json::Value;
use std::io::Write;
use std::path::Path;

/// Artifact name used when no output path is given.
pub const DEFAULT_OUTPUT_FILE: &str = "leads_enriched.xlsx";

const SHEET_NAME: &str = "Leads";

/// Output columns for a result table.
pub fn result_columns(records: &[EnrichmentRecord]) -> Vec<String> {
    let mut columns = vec![COMPANY_FIELD.to_string(), STATUS_FIELD.to_string()];
    if records.iter().any(|record| record.get(JUSTIFICATION_FIELD).is_some()) {
        columns.push(JUSTIFICATION_FIELD.to_string());
    }
    for record in records {
        for field in record.fields().keys() {
            if !columns.iter().any(|column| column == field) {
                columns.push(field.clone());
            }
        }
    }
    columns
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Xlsx,
    Csv,
}

fn output_format(path: &Path) -> Result<OutputFormat, ExportError> {
    match extension_of(path).as_str() {
        "xlsx" => Ok(OutputFormat::Xlsx),
        "csv" => Ok(OutputFormat::Csv),
        other => Err(ExportError::UnsupportedExtension {
            path: path.to_path_buf(),
            extension: other.to_string(),
        }),
    }
}

/// Reject output paths that cannot be written before any model call is made.
pub fn check_output_path(path: &Path) -> Result<(), ExportError> {
    output_format(path)?;
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
            Err(ExportError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "output directory does not exist",
                ),
            })
        }
        _ => Ok(()),
    }
}

/// Write `records` to `path`; the format follows the extension.
pub fn export_results(records: &[EnrichmentRecord], path: &Path) -> Result<(), ExportError> {
    let columns = result_columns(records);
    let bytes = match output_format(path)? {
        OutputFormat::Xlsx => workbook_bytes(records, &columns)?,
        OutputFormat::Csv => csv_bytes(records, &columns, path)?,
    };
    write_atomically(path, &bytes)?;
    tracing::info!(
        path = %path.display(),
        rows = records.len(),
        columns = columns.len(),
        "results exported"
    );
    Ok(())
}

fn workbook_bytes(records: &[EnrichmentRecord], columns: &[String]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (idx, column) in columns.iter().enumerate() {
        worksheet.write_string_with_format(0, column_index(idx)?, column, &header)?;
    }
    for (row_idx, record) in records.iter().enumerate() {
        let row = u32::try_from(row_idx + 1).map_err(|_| XlsxError::RowColumnLimitError)?;
        for (idx, column) in columns.iter().enumerate() {
            let col = column_index(idx)?;
            match record.get(column) {
                None | Some(Value::Null) => {}
                Some(Value::Bool(b)) => {
                    worksheet.write_boolean(row, col, *b)?;
                }
                Some(Value::Number(n)) => match n.as_f64() {
                    Some(number) => {
                        worksheet.write_number(row, col, number)?;
                    }
                    None => {
                        worksheet.write_string(row, col, n.to_string())?;
                    }
                },
                Some(other) => {
                    worksheet.write_string(row, col, cell_text(Some(other)))?;
                }
            }
        }
    }
    worksheet.autofit();

    Ok(workbook.save_to_buffer()?)
}

fn column_index(idx: usize) -> Result<u16, XlsxError> {
    u16::try_from(idx).map_err(|_| XlsxError::RowColumnLimitError)
}

fn csv_bytes(
    records: &[EnrichmentRecord],
    columns: &[String],
    path: &Path,
) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(columns)?;
    for record in records {
        writer.write_record(columns.iter().map(|column| cell_text(record.get(column))))?;
    }
    writer.into_inner().map_err(|err| ExportError::Io {
        path: path.to_path_buf(),
        source: err.into_error(),
    })
}

/// Text form of a cell: strings verbatim, null as empty, nested values as
/// compact JSON.
fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    let io_error = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(io_error)?;
    file.write_all(bytes).map_err(io_error)?;
    file.persist(path).map_err(|err| io_error(err.error))?;
    Ok(())
}
