//! Minimal Google Gemini API client.
//!
//! This crate provides a focused client for the `generateContent` endpoint with:
//! - Text prompts with an optional system instruction
//! - JSON, image and speech response modes
//! - Inline binary payloads (base64) in replies

use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Errors that can occur when using the Gemini client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("API key not configured")]
    NoApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to decode inline data: {0}")]
    Decode(String),
}

/// Gemini API client.
#[derive(Clone)]
pub struct Gemini {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl Gemini {
    /// Create a new Gemini client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: API_BASE.to_string(),
        }
    }

    /// Create a Gemini client from the GEMINI_API_KEY environment variable.
    pub fn from_env() -> Result<Self, Error> {
        let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| Error::NoApiKey)?;
        if api_key.trim().is_empty() {
            return Err(Error::NoApiKey);
        }
        Ok(Self::new(api_key))
    }

    /// Set the default model for this client.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the client at a different API root (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// The model used when a request does not name one.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a generation request and return the first candidate.
    pub async fn generate(&self, request: Request) -> Result<Response, Error> {
        let model = request.model.clone().unwrap_or_else(|| self.model.clone());
        let api_request = build_api_request(&request);
        let headers = self.build_headers()?;

        tracing::debug!(model = %model, contents = request.contents.len(), "generateContent");

        let response = self
            .client
            .post(format!("{}/models/{model}:generateContent", self.base_url))
            .headers(headers)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: error_message(&body),
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        Ok(parse_response(model, api_response))
    }

    fn build_headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|e| Error::Config(format!("Invalid API key: {e}")))?,
        );
        Ok(headers)
    }
}

fn build_api_request(request: &Request) -> ApiRequest {
    let contents = request
        .contents
        .iter()
        .map(|c| ApiContent {
            role: Some(
                match c.role {
                    Role::User => "user",
                    Role::Model => "model",
                }
                .to_string(),
            ),
            parts: c.parts.iter().map(ApiPart::from).collect(),
        })
        .collect();

    let system_instruction = request.system.as_ref().map(|text| ApiContent {
        role: None,
        parts: vec![ApiPart {
            text: Some(text.clone()),
            inline_data: None,
        }],
    });

    let speech_config = request.voice.as_ref().map(|voice| ApiSpeechConfig {
        voice_config: ApiVoiceConfig {
            prebuilt_voice_config: ApiPrebuiltVoiceConfig {
                voice_name: voice.clone(),
            },
        },
    });

    let config = ApiGenerationConfig {
        temperature: request.temperature,
        response_mime_type: request.response_mime_type.clone(),
        response_modalities: if request.response_modalities.is_empty() {
            None
        } else {
            Some(
                request
                    .response_modalities
                    .iter()
                    .map(|m| m.as_str().to_string())
                    .collect(),
            )
        },
        speech_config,
    };

    ApiRequest {
        contents,
        system_instruction,
        generation_config: if config.is_empty() { None } else { Some(config) },
    }
}

fn parse_response(model: String, api_response: ApiResponse) -> Response {
    let candidate = api_response.candidates.into_iter().next();

    let (parts, finish_reason) = match candidate {
        Some(c) => (
            c.content.map(|content| content.parts).unwrap_or_default(),
            c.finish_reason.as_deref().map(FinishReason::parse),
        ),
        None => (Vec::new(), None),
    };

    let content = parts
        .into_iter()
        .filter_map(|p| {
            if let Some(inline) = p.inline_data {
                Some(Part::InlineData(InlineData {
                    mime_type: inline.mime_type,
                    data: inline.data,
                }))
            } else {
                p.text.map(|text| Part::Text { text })
            }
        })
        .collect();

    let usage = api_response.usage_metadata.unwrap_or_default();

    Response {
        model: api_response.model_version.unwrap_or(model),
        content,
        finish_reason: finish_reason.unwrap_or(FinishReason::Unspecified),
        usage: Usage {
            prompt_tokens: usage.prompt_token_count,
            output_tokens: usage.candidates_token_count,
            total_tokens: usage.total_token_count,
        },
    }
}

/// Pull the human-readable message out of a Google error envelope.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

// ============================================================================
// Public types
// ============================================================================

/// A generation request to send to Gemini.
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub model: Option<String>,
    pub contents: Vec<Content>,
    pub system: Option<String>,
    pub temperature: Option<f32>,
    pub response_mime_type: Option<String>,
    pub response_modalities: Vec<Modality>,
    pub voice: Option<String>,
}

impl Request {
    /// Create a new request with the given contents.
    pub fn new(contents: Vec<Content>) -> Self {
        Self {
            contents,
            ..Self::default()
        }
    }

    /// Create a single-turn request from a plain text prompt.
    pub fn prompt(text: impl Into<String>) -> Self {
        Self::new(vec![Content::user(text)])
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Ask for a specific reply format, e.g. `application/json`.
    pub fn with_response_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.response_mime_type = Some(mime_type.into());
        self
    }

    pub fn with_response_modalities(mut self, modalities: Vec<Modality>) -> Self {
        self.response_modalities = modalities;
        self
    }

    /// Select a prebuilt voice for speech replies.
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }
}

/// One turn of content.
#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    /// Create a user turn with text content.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::Text { text: text.into() }],
        }
    }
}

/// The author of a content turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

/// A piece of content.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text { text: String },
    InlineData(InlineData),
}

/// Base64-encoded binary content with its media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

impl InlineData {
    /// Decode the base64 payload.
    pub fn decode(&self) -> Result<Vec<u8>, Error> {
        base64::engine::general_purpose::STANDARD
            .decode(self.data.trim())
            .map_err(|e| Error::Decode(e.to_string()))
    }

    /// Render as a `data:` URI.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    /// Parse a `data:<mime>;base64,<payload>` URI.
    pub fn from_data_uri(uri: &str) -> Option<Self> {
        let rest = uri.strip_prefix("data:")?;
        let (mime_type, data) = rest.split_once(";base64,")?;
        Some(Self {
            mime_type: mime_type.to_string(),
            data: data.to_string(),
        })
    }
}

/// Output modes a request may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    Text,
    Image,
    Audio,
}

impl Modality {
    fn as_str(self) -> &'static str {
        match self {
            Modality::Text => "TEXT",
            Modality::Image => "IMAGE",
            Modality::Audio => "AUDIO",
        }
    }
}

/// A response from Gemini (first candidate only).
#[derive(Debug, Clone)]
pub struct Response {
    pub model: String,
    pub content: Vec<Part>,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}

impl Response {
    /// Get the concatenated text content from the response.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// Get the first inline binary part, if any.
    pub fn inline_data(&self) -> Option<&InlineData> {
        self.content.iter().find_map(|p| match p {
            Part::InlineData(data) => Some(data),
            _ => None,
        })
    }
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    MaxTokens,
    Safety,
    Recitation,
    Other,
    Unspecified,
}

impl FinishReason {
    fn parse(s: &str) -> Self {
        match s {
            "STOP" => FinishReason::Stop,
            "MAX_TOKENS" => FinishReason::MaxTokens,
            "SAFETY" => FinishReason::Safety,
            "RECITATION" => FinishReason::Recitation,
            "FINISH_REASON_UNSPECIFIED" => FinishReason::Unspecified,
            _ => FinishReason::Other,
        }
    }
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Default)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub output_tokens: usize,
    pub total_tokens: usize,
}

// ============================================================================
// API types (internal)
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRequest {
    contents: Vec<ApiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<ApiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<ApiGenerationConfig>,
}

#[derive(Serialize, Deserialize)]
struct ApiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<ApiPart>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<ApiInlineData>,
}

impl From<&Part> for ApiPart {
    fn from(part: &Part) -> Self {
        match part {
            Part::Text { text } => ApiPart {
                text: Some(text.clone()),
                inline_data: None,
            },
            Part::InlineData(data) => ApiPart {
                text: None,
                inline_data: Some(ApiInlineData {
                    mime_type: data.mime_type.clone(),
                    data: data.data.clone(),
                }),
            },
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<ApiSpeechConfig>,
}

impl ApiGenerationConfig {
    fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.response_mime_type.is_none()
            && self.response_modalities.is_none()
            && self.speech_config.is_none()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiSpeechConfig {
    voice_config: ApiVoiceConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiVoiceConfig {
    prebuilt_voice_config: ApiPrebuiltVoiceConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiPrebuiltVoiceConfig {
    voice_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<ApiCandidate>,
    #[serde(default)]
    usage_metadata: Option<ApiUsage>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCandidate {
    #[serde(default)]
    content: Option<ApiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ApiUsage {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
    #[serde(default)]
    total_token_count: usize,
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = Gemini::new("test-key");
        assert_eq!(client.model, DEFAULT_MODEL);
        assert_eq!(client.base_url, API_BASE);
    }

    #[test]
    fn test_client_with_model() {
        let client = Gemini::new("test-key")
            .with_model("gemini-2.5-flash-image")
            .with_base_url("http://localhost:9000/");
        assert_eq!(client.model(), "gemini-2.5-flash-image");
        assert_eq!(client.base_url, "http://localhost:9000");
    }

    #[test]
    fn test_request_builder() {
        let request = Request::prompt("Hello")
            .with_system("You are the PLANNER agent.")
            .with_temperature(0.7)
            .with_response_mime_type("application/json");

        assert_eq!(request.contents.len(), 1);
        assert_eq!(request.contents[0].role, Role::User);
        assert!(request.system.is_some());
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(
            request.response_mime_type.as_deref(),
            Some("application/json")
        );
    }

    #[test]
    fn test_request_serialization() {
        let request = Request::prompt("Read this")
            .with_system("Be brief")
            .with_temperature(0.5)
            .with_response_modalities(vec![Modality::Audio])
            .with_voice("Kore");

        let json = serde_json::to_value(build_api_request(&request)).unwrap();

        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Read this");
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "Be brief");
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["generationConfig"]["temperature"], 0.5);
        assert_eq!(json["generationConfig"]["responseModalities"][0], "AUDIO");
        assert_eq!(
            json["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]
                ["voiceName"],
            "Kore"
        );
    }

    #[test]
    fn test_bare_request_omits_generation_config() {
        let json = serde_json::to_value(build_api_request(&Request::prompt("hi"))).unwrap();
        assert!(json.get("generationConfig").is_none());
        assert!(json.get("systemInstruction").is_none());
    }

    #[test]
    fn test_parse_text_response() {
        let body = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Beat 1. "}, {"text": "Beat 2."}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 5, "totalTokenCount": 17},
            "modelVersion": "gemini-3-flash-preview"
        }"#;
        let api: ApiResponse = serde_json::from_str(body).unwrap();
        let response = parse_response("fallback".to_string(), api);

        assert_eq!(response.text(), "Beat 1. Beat 2.");
        assert_eq!(response.finish_reason, FinishReason::Stop);
        assert_eq!(response.usage.total_tokens, 17);
        assert_eq!(response.model, "gemini-3-flash-preview");
        assert!(response.inline_data().is_none());
    }

    #[test]
    fn test_parse_inline_response() {
        let body = r#"{
            "candidates": [{
                "content": {"parts": [
                    {"text": "Here is your picture"},
                    {"inlineData": {"mimeType": "image/png", "data": "aGVsbG8="}}
                ]}
            }]
        }"#;
        let api: ApiResponse = serde_json::from_str(body).unwrap();
        let response = parse_response("gemini-2.5-flash-image".to_string(), api);

        let inline = response.inline_data().unwrap();
        assert_eq!(inline.mime_type, "image/png");
        assert_eq!(inline.decode().unwrap(), b"hello");
        assert_eq!(inline.to_data_uri(), "data:image/png;base64,aGVsbG8=");
        assert_eq!(response.model, "gemini-2.5-flash-image");
        assert_eq!(response.finish_reason, FinishReason::Unspecified);
    }

    #[test]
    fn test_parse_empty_response() {
        let api: ApiResponse = serde_json::from_str("{}").unwrap();
        let response = parse_response("m".to_string(), api);
        assert!(response.content.is_empty());
        assert_eq!(response.text(), "");
    }

    #[test]
    fn test_data_uri_roundtrip() {
        let parsed = InlineData::from_data_uri("data:image/jpeg;base64,AAAA").unwrap();
        assert_eq!(parsed.mime_type, "image/jpeg");
        assert_eq!(parsed.data, "AAAA");
        assert!(InlineData::from_data_uri("https://example.com/a.png").is_none());
    }

    #[test]
    fn test_error_message_extraction() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}}"#;
        assert_eq!(error_message(body), "API key not valid.");
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }
}
