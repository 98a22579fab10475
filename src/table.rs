//! Lead table loading.
//!
//! The whole file is read into memory before any row is enriched. Rows are
//! kept as ordered column/value pairs rather than a fixed struct because lead
//! lists arrive with arbitrary columns.
use crate::error::{extension_of, InputFormatError};
use calamine::{open_workbook_auto, Data, ExcelDateTime, Reader};
use chrono::NaiveTime;
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::Path;

/// A raw cell value as read from the source table.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    /// Text form used for display-name lookup; `None` when the cell is blank.
    pub fn non_empty_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(text) => {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            CellValue::Number(n) if n.is_nan() => None,
            other => Some(other.to_string()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            CellValue::Empty => Value::Null,
            CellValue::Text(text) => Value::String(text.clone()),
            CellValue::Bool(b) => Value::Bool(*b),
            CellValue::Number(n) => {
                if is_integral(*n) {
                    Value::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n)
                        .map(Value::Number)
                        .unwrap_or(Value::Null)
                }
            }
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(text) => f.write_str(text),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Number(n) if is_integral(*n) => write!(f, "{}", *n as i64),
            CellValue::Number(n) => write!(f, "{n}"),
        }
    }
}

fn is_integral(n: f64) -> bool {
    n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15
}

/// One input record. Identity is its position in the source table.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadRow {
    index: usize,
    fields: Vec<(String, CellValue)>,
}

impl LeadRow {
    pub fn new(index: usize, fields: Vec<(String, CellValue)>) -> Self {
        Self { index, fields }
    }

    /// Zero-based position in the source table.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// First non-empty value among `candidates`, in candidate order.
    pub fn first_present(&self, candidates: &[String]) -> Option<String> {
        candidates
            .iter()
            .find_map(|column| self.get(column).and_then(CellValue::non_empty_text))
    }

    /// The row as a JSON object, preserving column order.
    pub fn to_json(&self) -> Value {
        let map = self
            .fields
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect::<serde_json::Map<_, _>>();
        Value::Object(map)
    }
}

/// An ordered, fully loaded input table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadTable {
    columns: Vec<String>,
    rows: Vec<LeadRow>,
}

impl LeadTable {
    /// Build a table from a header and raw rows. Short rows are padded with
    /// empty cells, long rows grow extra `Column N` headers, and rows with no
    /// content at all are dropped.
    pub fn from_rows(header: Vec<String>, raw_rows: Vec<Vec<CellValue>>) -> Self {
        let mut columns = dedupe_columns(header);
        let mut rows = Vec::new();
        for mut cells in raw_rows {
            if cells.iter().all(|cell| cell.non_empty_text().is_none()) {
                continue;
            }
            while columns.len() < cells.len() {
                let name = unique_name(&columns, format!("Column {}", columns.len() + 1));
                columns.push(name);
            }
            cells.resize(columns.len(), CellValue::Empty);
            let fields = columns.iter().cloned().zip(cells).collect();
            rows.push(LeadRow::new(rows.len(), fields));
        }
        // Rows read before a column was added need the late columns too.
        for row in &mut rows {
            for column in columns.iter().skip(row.fields.len()) {
                row.fields.push((column.clone(), CellValue::Empty));
            }
        }
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[LeadRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Keep only the first `limit` rows.
    pub fn truncate(&mut self, limit: usize) {
        self.rows.truncate(limit);
    }
}

/// Blank headers become `Column N`; repeated headers get `.1`, `.2`, ...
fn dedupe_columns(header: Vec<String>) -> Vec<String> {
    let mut columns = Vec::with_capacity(header.len());
    for (idx, raw) in header.into_iter().enumerate() {
        let base = match raw.trim() {
            "" => format!("Column {}", idx + 1),
            trimmed => trimmed.to_string(),
        };
        let name = unique_name(&columns, base);
        columns.push(name);
    }
    columns
}

/// `base`, or the first `base.N` not already taken.
fn unique_name(columns: &[String], base: String) -> String {
    if !columns.contains(&base) {
        return base;
    }
    let mut n = 1;
    loop {
        let candidate = format!("{base}.{n}");
        if !columns.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Load a lead table, picking the reader from the file extension.
///
/// `sheet` selects a worksheet by name for workbook inputs; the first sheet
/// is used otherwise. It is ignored for delimited text.
pub fn load_table(path: &Path, sheet: Option<&str>) -> Result<LeadTable, InputFormatError> {
    fs::metadata(path).map_err(|source| InputFormatError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    match extension_of(path).as_str() {
        "csv" => load_delimited(path, b','),
        "tsv" => load_delimited(path, b'\t'),
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => load_workbook(path, sheet),
        other => Err(InputFormatError::UnsupportedExtension {
            path: path.to_path_buf(),
            extension: other.to_string(),
        }),
    }
}

fn load_delimited(path: &Path, delimiter: u8) -> Result<LeadTable, InputFormatError> {
    let bytes = fs::read(path).map_err(|source| InputFormatError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_delimited(&bytes, delimiter, path)
}

/// Parse delimited text. Non-UTF-8 bytes are replaced rather than rejected.
pub(crate) fn parse_delimited(
    bytes: &[u8],
    delimiter: u8,
    path: &Path,
) -> Result<LeadTable, InputFormatError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let csv_error = |source| InputFormatError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut records = reader.byte_records();
    let header = match records.next() {
        Some(record) => record
            .map_err(csv_error)?
            .iter()
            .map(|field| String::from_utf8_lossy(field).into_owned())
            .collect::<Vec<_>>(),
        None => {
            return Err(InputFormatError::NoHeader {
                path: path.to_path_buf(),
            })
        }
    };

    let mut raw_rows = Vec::new();
    for record in records {
        let record = record.map_err(csv_error)?;
        let cells = record
            .iter()
            .map(|field| {
                let text = String::from_utf8_lossy(field);
                if text.trim().is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::Text(text.into_owned())
                }
            })
            .collect();
        raw_rows.push(cells);
    }

    Ok(LeadTable::from_rows(header, raw_rows))
}

fn load_workbook(path: &Path, sheet: Option<&str>) -> Result<LeadTable, InputFormatError> {
    let workbook_error = |message: String| InputFormatError::Workbook {
        path: path.to_path_buf(),
        message,
    };
    let mut workbook = open_workbook_auto(path).map_err(|err| workbook_error(err.to_string()))?;
    let names = workbook.sheet_names();
    let sheet_name = match sheet {
        Some(wanted) => names
            .iter()
            .find(|name| name.as_str() == wanted)
            .cloned()
            .ok_or_else(|| InputFormatError::MissingSheet {
                path: path.to_path_buf(),
                sheet: wanted.to_string(),
                available: names.join(", "),
            })?,
        None => names
            .first()
            .cloned()
            .ok_or_else(|| workbook_error("workbook has no sheets".to_string()))?,
    };
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|err| workbook_error(format!("sheet {sheet_name:?}: {err}")))?;

    let mut rows = range.rows();
    let header = rows
        .next()
        .map(|cells| {
            cells
                .iter()
                .map(|cell| workbook_cell(cell).to_string())
                .collect::<Vec<_>>()
        })
        .ok_or_else(|| InputFormatError::NoHeader {
            path: path.to_path_buf(),
        })?;
    let raw_rows = rows
        .map(|cells| cells.iter().map(workbook_cell).collect())
        .collect();

    Ok(LeadTable::from_rows(header, raw_rows))
}

fn workbook_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(text) if text.trim().is_empty() => CellValue::Empty,
        Data::String(text) => CellValue::Text(text.clone()),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Float(n) => CellValue::Number(*n),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(value) => excel_datetime_cell(value),
        Data::DateTimeIso(text) | Data::DurationIso(text) => CellValue::Text(text.clone()),
        other => CellValue::Text(other.to_string()),
    }
}

/// Dates as `YYYY-MM-DD`, date-times as `YYYY-MM-DDTHH:MM:SS`, times of day
/// and durations as `HH:MM:SS`.
fn excel_datetime_cell(value: &ExcelDateTime) -> CellValue {
    if value.is_duration() {
        if let Some(duration) = value.as_duration() {
            let secs = duration.num_seconds();
            return CellValue::Text(format!(
                "{:02}:{:02}:{:02}",
                secs / 3600,
                secs % 3600 / 60,
                secs % 60
            ));
        }
    }
    let Some(datetime) = value.as_datetime() else {
        return CellValue::Number(value.as_f64());
    };
    let text = if (0.0..1.0).contains(&value.as_f64()) {
        datetime.format("%H:%M:%S").to_string()
    } else if datetime.time() == NaiveTime::MIN {
        datetime.format("%Y-%m-%d").to_string()
    } else {
        datetime.format("%Y-%m-%dT%H:%M:%S").to_string()
    };
    CellValue::Text(text)
}

/// Human-readable name of an input table for logs and summaries.
pub fn describe_source(path: &Path, sheet: Option<&str>) -> String {
    match sheet {
        Some(sheet) => format!("{} [{sheet}]", path.display()),
        None => path.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> LeadTable {
        parse_delimited(text.as_bytes(), b',', Path::new("leads.csv")).expect("parse csv")
    }

    #[test]
    fn parses_header_and_rows_in_order() {
        let table = parse("Empresa,Cidade\nA,Recife\nB,Natal\n");
        assert_eq!(table.columns(), ["Empresa", "Cidade"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].index(), 0);
        assert_eq!(
            table.rows()[1].get("Empresa"),
            Some(&CellValue::Text("B".to_string()))
        );
    }

    #[test]
    fn strips_bom_and_skips_blank_rows() {
        let table = parse("\u{feff}Empresa,Cidade\n,\nA,Recife\n");
        assert_eq!(table.columns()[0], "Empresa");
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].index(), 0);
    }

    #[test]
    fn pads_short_rows_and_names_extra_cells() {
        let table = parse("Empresa\nA,extra\nB\n");
        assert_eq!(table.columns(), ["Empresa", "Column 2"]);
        assert_eq!(
            table.rows()[0]
                .get("Column 2")
                .and_then(CellValue::non_empty_text),
            Some("extra".to_string())
        );
        assert_eq!(table.rows()[1].get("Column 2"), Some(&CellValue::Empty));
    }

    #[test]
    fn dedupes_repeated_and_blank_headers() {
        let table = parse("Email,Email,\nx,y,z\n");
        assert_eq!(table.columns(), ["Email", "Email.1", "Column 3"]);
    }

    #[test]
    fn generated_column_names_never_shadow_headers() {
        let table = parse("Column 2\na,b\n");
        assert_eq!(table.columns(), ["Column 2", "Column 2.1"]);
        let json = serde_json::to_string(&table.rows()[0].to_json()).expect("serialize row");
        assert_eq!(json, r#"{"Column 2":"a","Column 2.1":"b"}"#);

        let table = parse("A,A.1,A\nx,y,z\n");
        assert_eq!(table.columns(), ["A", "A.1", "A.2"]);
    }

    #[test]
    fn workbook_dates_load_as_iso_text() {
        use rust_xlsxwriter::{ExcelDateTime as XlsxDateTime, Format, Workbook};

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("leads.xlsx");
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, name) in ["Empresa", "Fundacao", "Contato", "Funcionarios"].iter().enumerate() {
            sheet.write_string(0, col as u16, *name).expect("write header");
        }
        sheet.write_string(1, 0, "Acme").expect("write name");
        let founded = XlsxDateTime::from_ymd(2020, 5, 17).expect("date");
        sheet
            .write_datetime_with_format(1, 1, &founded, &Format::new().set_num_format("yyyy-mm-dd"))
            .expect("write date");
        let contacted = XlsxDateTime::from_ymd(2021, 3, 4)
            .and_then(|date| date.and_hms(9, 30, 0))
            .expect("datetime");
        sheet
            .write_datetime_with_format(
                1,
                2,
                &contacted,
                &Format::new().set_num_format("yyyy-mm-dd hh:mm:ss"),
            )
            .expect("write datetime");
        sheet.write_number(1, 3, 120).expect("write number");
        workbook.save(&path).expect("save workbook");

        let table = load_table(&path, None).expect("load workbook");
        let row = &table.rows()[0];
        assert_eq!(row.get("Fundacao"), Some(&CellValue::Text("2020-05-17".to_string())));
        assert_eq!(
            row.get("Contato"),
            Some(&CellValue::Text("2021-03-04T09:30:00".to_string()))
        );
        assert_eq!(row.get("Funcionarios"), Some(&CellValue::Number(120.0)));
        assert_eq!(
            serde_json::to_string(&row.to_json()).expect("serialize row"),
            r#"{"Empresa":"Acme","Fundacao":"2020-05-17","Contato":"2021-03-04T09:30:00","Funcionarios":120}"#
        );
    }

    #[test]
    fn header_only_file_yields_empty_table() {
        let table = parse("Empresa,Cidade\n");
        assert!(table.is_empty());
    }

    #[test]
    fn empty_file_has_no_header() {
        let err = parse_delimited(b"", b',', Path::new("leads.csv")).unwrap_err();
        assert!(matches!(err, InputFormatError::NoHeader { .. }));
    }

    #[test]
    fn first_present_skips_blank_candidates() {
        let row = LeadRow::new(
            0,
            vec![
                ("RAZÃO SOCIAL".to_string(), CellValue::Text("  ".to_string())),
                ("Empresa".to_string(), CellValue::Text("Acme".to_string())),
            ],
        );
        let candidates = vec!["RAZÃO SOCIAL".to_string(), "Empresa".to_string()];
        assert_eq!(row.first_present(&candidates), Some("Acme".to_string()));
        assert_eq!(row.first_present(&["Missing".to_string()]), None);
    }

    #[test]
    fn numbers_render_without_trailing_zero() {
        assert_eq!(CellValue::Number(42.0).to_string(), "42");
        assert_eq!(CellValue::Number(1.5).to_string(), "1.5");
        assert_eq!(CellValue::Number(42.0).to_json(), serde_json::json!(42));
        assert_eq!(CellValue::Number(f64::NAN).non_empty_text(), None);
    }

    #[test]
    fn row_json_preserves_column_order() {
        let table = parse("Zeta,Alpha\n1,2\n");
        let json = serde_json::to_string(&table.rows()[0].to_json()).expect("serialize row");
        assert_eq!(json, r#"{"Zeta":"1","Alpha":"2"}"#);
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("leads.json");
        fs::write(&path, "{}").expect("write input");
        let err = load_table(&path, None).unwrap_err();
        assert!(matches!(err, InputFormatError::UnsupportedExtension { .. }));
    }

    #[test]
    fn every_accepted_extension_is_listed_in_the_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let unknown = dir.path().join("leads.json");
        fs::write(&unknown, "{}").expect("write input");
        let message = load_table(&unknown, None).unwrap_err().to_string();

        for ext in ["csv", "tsv", "xlsx", "xlsm", "xls", "xlsb", "ods"] {
            assert!(message.contains(ext), "{ext} missing from: {message}");
            let path = dir.path().join(format!("leads.{ext}"));
            fs::write(&path, "Empresa\nAcme\n").expect("write input");
            let result = load_table(&path, None);
            assert!(
                !matches!(result, Err(InputFormatError::UnsupportedExtension { .. })),
                "{ext} was rejected as unsupported"
            );
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_table(Path::new("/nonexistent/leads.csv"), None).unwrap_err();
        assert!(matches!(err, InputFormatError::Io { .. }));
    }
}
