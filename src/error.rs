//! Error taxonomy for lead enrichment.
//!
//! Per-row failures (`TransportError`, `ExtractionError`) are recovered into
//! error records by the pipeline. `InputFormatError` and `ExportError` are
//! fatal and surface through the workflow as `anyhow` errors.
use std::path::PathBuf;
use thiserror::Error;

/// The model capability failed to produce a response.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request never produced an HTTP response (DNS, TLS, timeout, ...).
    #[error("model request failed: {0}")]
    Request(String),

    /// The service answered with a non-success status.
    #[error("model service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The service answered but the body was not the expected envelope.
    #[error("decode model response: {0}")]
    Decode(String),

    /// The service answered without any candidate text (blocked prompt, etc.).
    #[error("model returned no candidates ({reason})")]
    NoCandidates { reason: String },

    /// A local LM command could not be run or exited unsuccessfully.
    #[error("LM command failed: {0}")]
    Command(String),
}

/// The model response could not be read as a structured record.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("model response is empty")]
    Empty,

    #[error("parse model response as JSON: {source} (first 200 chars: {snippet:?})")]
    Json {
        #[source]
        source: serde_json::Error,
        snippet: String,
    },

    #[error("model response is a JSON {found}, expected an object")]
    NotAnObject { found: &'static str },
}

/// The input table could not be loaded at all.
#[derive(Debug, Error)]
pub enum InputFormatError {
    #[error("read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported input extension {extension:?} for {path} (expected csv, tsv, xlsx, xlsm, xls, xlsb or ods)")]
    UnsupportedExtension { path: PathBuf, extension: String },

    #[error("parse CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("open workbook {path}: {message}")]
    Workbook { path: PathBuf, message: String },

    #[error("workbook {path} has no sheet named {sheet:?} (available: {available})")]
    MissingSheet {
        path: PathBuf,
        sheet: String,
        available: String,
    },

    #[error("{path} has no header row")]
    NoHeader { path: PathBuf },
}

/// The result table could not be written.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unsupported output extension {extension:?} for {path} (expected xlsx or csv)")]
    UnsupportedExtension { path: PathBuf, extension: String },

    #[error("write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("build workbook: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error("write CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Lowercased extension of a path, or an empty string.
pub(crate) fn extension_of(path: &std::path::Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default()
}
