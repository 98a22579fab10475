//! Gemini `generateContent` client.
//!
//! Sends the prompt as a single user turn, with the role framing as a system
//! instruction, and returns the text of the first candidate. With `json_mode`
//! the request asks for an `application/json` response, which removes most
//! (not all) code-fence wrapping; `response_schema` additionally constrains
//! the answer to an object with the required lead fields.
use crate::error::TransportError;
use crate::lm_client::{LeadModel, ModelResponse};
use crate::record::{COMPANY_FIELD, JUSTIFICATION_FIELD, STATUS_FIELD};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::{Duration, Instant};

/// Settings for one Gemini client.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub json_mode: bool,
    /// Send a response schema requiring the lead fields (needs `json_mode`).
    pub response_schema: bool,
    pub system_instruction: Option<String>,
    pub timeout: Duration,
}

pub struct GeminiClient {
    agent: ureq::Agent,
    endpoint: String,
    model: String,
    api_key: String,
    json_mode: bool,
    response_schema: bool,
    system_instruction: Option<String>,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(anyhow!("Gemini API key is empty"));
        }
        let model = config
            .model
            .trim()
            .trim_start_matches("models/")
            .to_string();
        if model.is_empty() {
            return Err(anyhow!("Gemini model name is empty"));
        }
        let endpoint = format!(
            "{}/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            model
        );
        let agent_config = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .http_status_as_error(false)
            .build();
        let agent: ureq::Agent = agent_config.into();
        Ok(Self {
            agent,
            endpoint,
            model,
            api_key: config.api_key,
            json_mode: config.json_mode,
            response_schema: config.response_schema,
            system_instruction: config
                .system_instruction
                .filter(|text| !text.trim().is_empty()),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request<'a>(&'a self, prompt: &'a str) -> GenerateContentRequest<'a> {
        GenerateContentRequest {
            system_instruction: self.system_instruction.as_deref().map(|text| SystemInstruction {
                parts: vec![RequestPart { text }],
            }),
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: self.json_mode.then(|| GenerationConfig {
                response_mime_type: "application/json",
                response_schema: self.response_schema.then(lead_response_schema),
            }),
        }
    }
}

impl LeadModel for GeminiClient {
    fn generate(&self, prompt: &str) -> Result<ModelResponse, TransportError> {
        let start = Instant::now();
        let request = self.request(prompt);
        let mut response = self
            .agent
            .post(&self.endpoint)
            .header("x-goog-api-key", self.api_key.as_str())
            .send_json(&request)
            .map_err(|err| TransportError::Request(err.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|err| TransportError::Decode(err.to_string()))?;

        tracing::info!(
            elapsed_ms = start.elapsed().as_millis(),
            status,
            prompt_bytes = prompt.len(),
            response_bytes = body.len(),
            model = %self.model,
            "gemini invoke complete"
        );

        if !(200..300).contains(&status) {
            return Err(TransportError::Status {
                status,
                body: error_message(&body),
            });
        }
        parse_response(&body)
    }

    fn describe(&self) -> String {
        format!("gemini `{}`", self.model)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction<'a>>,
    contents: Vec<RequestContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Object schema with every lead field required, in output order.
fn lead_response_schema() -> Value {
    let fields = [COMPANY_FIELD, STATUS_FIELD, JUSTIFICATION_FIELD];
    let properties: Map<String, Value> = fields
        .iter()
        .map(|field| (field.to_string(), json!({ "type": "STRING" })))
        .collect();
    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": fields,
        "propertyOrdering": fields,
    })
}

/// Concatenate the text parts of the first candidate.
fn parse_response(body: &str) -> Result<ModelResponse, TransportError> {
    let response: GenerateContentResponse =
        serde_json::from_str(body).map_err(|err| TransportError::Decode(err.to_string()))?;

    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
            .map(|reason| format!("prompt blocked: {reason}"))
            .unwrap_or_else(|| "no reason given".to_string());
        return Err(TransportError::NoCandidates { reason });
    };

    let texts: Vec<String> = candidate
        .content
        .map(|content| content.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|part| part.text)
        .collect();
    if texts.is_empty() {
        let reason = candidate
            .finish_reason
            .map(|reason| format!("finish reason {reason}"))
            .unwrap_or_else(|| "candidate has no text".to_string());
        return Err(TransportError::NoCandidates { reason });
    }
    Ok(ModelResponse::new(texts.concat()))
}

/// Prefer the API's own error message over the raw body.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => match envelope.error.status {
            Some(status) => format!("{status}: {}", envelope.error.message),
            None => envelope.error.message,
        },
        Err(_) => body.trim().chars().take(500).collect(),
    }
}
