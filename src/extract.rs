//! Structured record extraction from raw model text.
//!
//! Models are asked for a bare JSON object but often wrap it in markdown code
//! fences. The direct parse is tried first, then the text with its outer
//! fences stripped, then the first fenced block found inside surrounding
//! prose. Anything other than a JSON object is rejected.
use crate::error::ExtractionError;
use crate::record::EnrichmentRecord;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

const SNIPPET_CHARS: usize = 200;

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[\w+-]*[ \t]*\r?\n?(.*?)```").expect("fence pattern compiles")
});

/// Parse one model response into a record.
pub fn extract_record(raw: &str) -> Result<EnrichmentRecord, ExtractionError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ExtractionError::Empty);
    }

    let value = match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(_) => parse_fenced(text)?,
    };

    match value {
        Value::Object(map) => Ok(EnrichmentRecord::from_map(map)),
        other => Err(ExtractionError::NotAnObject {
            found: json_kind(&other),
        }),
    }
}

/// Parse text wrapped in code fences.
///
/// The outer fence pair is stripped first so backticks inside string values
/// survive. A fenced block embedded in prose is the last resort.
fn parse_fenced(text: &str) -> Result<Value, ExtractionError> {
    let body = strip_outer_fence(text);
    if body.is_empty() {
        return Err(ExtractionError::Empty);
    }
    let source = match serde_json::from_str::<Value>(body) {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };

    if let Some(block) = embedded_block(text) {
        if let Ok(value) = serde_json::from_str::<Value>(block) {
            return Ok(value);
        }
    }
    Err(ExtractionError::Json {
        source,
        snippet: snippet(text),
    })
}

/// Trim a leading fence (with its language tag) and a trailing fence.
fn strip_outer_fence(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```") {
        body = rest.trim_start_matches(|c: char| c.is_alphanumeric() || matches!(c, '_' | '-' | '+'));
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }
    body.trim()
}

/// Body of the first complete fenced block anywhere in the text.
fn embedded_block(text: &str) -> Option<&str> {
    FENCED_BLOCK
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|body| body.as_str().trim())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn snippet(text: &str) -> String {
    text.chars().take(SNIPPET_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> EnrichmentRecord {
        serde_json::from_value(value).expect("record from object")
    }

    #[test]
    fn parses_plain_json_object() {
        let rec = extract_record(r#"{"Empresa":"X","status_icp":"ok"}"#).unwrap();
        assert_eq!(rec, record(json!({"Empresa": "X", "status_icp": "ok"})));
    }

    #[test]
    fn parses_json_fenced_block() {
        let raw = "```json\n{\"Empresa\":\"X\",\"status_icp\":\"ok\"}\n```";
        let rec = extract_record(raw).unwrap();
        assert_eq!(rec, record(json!({"Empresa": "X", "status_icp": "ok"})));
    }

    #[test]
    fn serialized_records_round_trip_with_and_without_fences() {
        let samples = [
            json!({"Empresa": "Acme Ltda", "status_icp": "alto", "justificativa_curta": "Setor alvo"}),
            json!({"status_icp": "baixo"}),
            json!({"Empresa": "Ação & Cia \"Norte\"", "status_icp": "médio", "score": 7, "tags": ["a", "b"]}),
            json!({}),
        ];
        for sample in samples {
            let expected = record(sample.clone());
            let compact = serde_json::to_string(&sample).unwrap();
            let pretty = serde_json::to_string_pretty(&sample).unwrap();
            assert_eq!(extract_record(&compact).unwrap(), expected);
            assert_eq!(extract_record(&pretty).unwrap(), expected);
            assert_eq!(
                extract_record(&format!("```json\n{pretty}\n```")).unwrap(),
                expected
            );
            assert_eq!(
                extract_record(&format!("```\n{compact}\n```")).unwrap(),
                expected
            );
        }
    }

    #[test]
    fn tolerates_prose_around_fenced_block() {
        let raw = "Segue a análise:\n```json\n{\"status_icp\":\"alto\"}\n```\nQualquer dúvida, avise.";
        let rec = extract_record(raw).unwrap();
        assert_eq!(rec.get_str("status_icp"), Some("alto"));
    }

    #[test]
    fn tolerates_unterminated_fence() {
        let rec = extract_record("```json\n{\"status_icp\":\"alto\"}").unwrap();
        assert_eq!(rec.get_str("status_icp"), Some("alto"));
    }

    #[test]
    fn rejects_non_object_values() {
        for (raw, kind) in [
            ("[1, 2]", "array"),
            ("\"alto\"", "string"),
            ("42", "number"),
            ("```json\n[{\"Empresa\":\"X\"}]\n```", "array"),
        ] {
            match extract_record(raw) {
                Err(ExtractionError::NotAnObject { found }) => assert_eq!(found, kind),
                other => panic!("expected NotAnObject for {raw:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_empty_and_fence_only_text() {
        assert!(matches!(extract_record("   "), Err(ExtractionError::Empty)));
        assert!(matches!(extract_record("```json\n```"), Err(ExtractionError::Empty)));
    }

    #[test]
    fn rejects_free_text_with_snippet() {
        let err = extract_record("Não foi possível avaliar este lead.").unwrap_err();
        match &err {
            ExtractionError::Json { snippet, .. } => {
                assert!(snippet.starts_with("Não foi possível"))
            }
            other => panic!("expected Json error, got {other:?}"),
        }
        assert!(err.to_string().contains("parse model response as JSON"));
    }

    #[test]
    fn strip_outer_fence_leaves_bare_text_alone() {
        assert_eq!(strip_outer_fence("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn backticks_inside_values_survive_fence_stripping() {
        let sample = json!({
            "Empresa": "Acme Ltda",
            "status_icp": "alto",
            "justificativa_curta": "site usa ``` em blocos de código"
        });
        let pretty = serde_json::to_string_pretty(&sample).unwrap();
        for raw in [
            format!("```json\n{pretty}\n```"),
            format!("```\n{pretty}\n```"),
            format!("```json\n{pretty}"),
        ] {
            assert_eq!(extract_record(&raw).unwrap(), record(sample.clone()), "{raw}");
        }
    }
}
