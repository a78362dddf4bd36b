//! Gemini-style `generateContent`/`streamGenerateContent`. The streaming
//! endpoint really serves a JSON array rather than SSE, but the source
//! behavior this crate preserves parses it as `data:`-framed SSE regardless
//! (see the crate-level design notes); each frame is a full candidate
//! snapshot, not an incremental delta, so the emitted delta is the
//! difference from what has already been accumulated.

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use super::{default_http_client, non2xx_error, read_small_body, ChatClient, DeltaHandler, ERROR_BODY_LIMIT};
use crate::domain::{split_system_messages, ChatRequest, ChatResponse, Message, Role, TokenUsage};
use crate::error::ChatError;
use crate::sse::SseDecoder;
use crate::Result;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";

pub struct GeminiClient {
    base_url: Option<String>,
    api_key: Option<String>,
    http: reqwest::Client,
    default_model: Option<String>,
    user_agent: Option<String>,
}

impl Default for GeminiClient {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            http: default_http_client(),
            default_model: None,
            user_agent: None,
        }
    }
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    fn resolve_model(&self, request_model: &str) -> String {
        let trimmed = request_model.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
        self.default_model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }

    /// `/v1beta/models/<model>:<action>` against the configured base, with
    /// the API key set as both a query param and (by the caller) a header —
    /// idempotent if a `key` param is already present.
    fn endpoint_url(&self, model: &str, streaming: bool) -> String {
        let base = self
            .base_url
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');
        let action = if streaming { "streamGenerateContent" } else { "generateContent" };
        let encoded_model = urlencode_path_segment(model);
        let mut url = format!("{base}/v1beta/models/{encoded_model}:{action}");
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            let separator = if url.contains('?') { '&' } else { '?' };
            url.push(separator);
            url.push_str("key=");
            url.push_str(key);
        }
        url
    }
}

/// Minimal path-segment percent-encoding: Gemini model names are
/// `[a-zA-Z0-9._-]` in practice, so this only escapes `/` to be safe against
/// accidental path injection.
fn urlencode_path_segment(segment: &str) -> String {
    segment.replace('/', "%2F")
}

#[derive(Serialize)]
struct WirePart {
    text: String,
}

#[derive(Serialize)]
struct WireContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<WirePart>,
}

#[derive(Serialize)]
struct WireGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "maxOutputTokens")]
    max_output_tokens: Option<u32>,
}

#[derive(Serialize)]
struct WireRequest {
    contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "generationConfig")]
    generation_config: Option<WireGenerationConfig>,
}

fn to_wire_contents(messages: &[Message]) -> Vec<WireContent> {
    messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| WireContent {
            role: Some(if m.role == Role::Assistant { "model" } else { "user" }),
            parts: vec![WirePart { text: m.content.clone() }],
        })
        .collect()
}

#[derive(Deserialize, Default)]
struct WireUsageMetadata {
    #[serde(default, rename = "promptTokenCount")]
    prompt_token_count: u32,
    #[serde(default, rename = "candidatesTokenCount")]
    candidates_token_count: u32,
    #[serde(default, rename = "totalTokenCount")]
    total_token_count: u32,
}

#[derive(Deserialize, Default)]
struct WirePartOut {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize, Default)]
struct WireContentOut {
    #[serde(default)]
    parts: Vec<WirePartOut>,
}

#[derive(Deserialize)]
struct WireCandidate {
    #[serde(default)]
    content: WireContentOut,
    #[serde(default, rename = "finishReason")]
    finish_reason: String,
}

#[derive(Deserialize, Default)]
struct WireResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
    #[serde(default, rename = "usageMetadata")]
    usage_metadata: WireUsageMetadata,
}

/// Concatenate the first candidate's text parts and read its finish reason.
/// Returns empty values when there are no candidates at all.
fn extract_content_and_finish(response: &WireResponse) -> (String, String) {
    let Some(candidate) = response.candidates.first() else {
        return (String::new(), String::new());
    };
    let text: String = candidate.content.parts.iter().map(|p| p.text.as_str()).collect();
    (text, candidate.finish_reason.clone())
}

#[async_trait]
impl ChatClient for GeminiClient {
    fn provider_name(&self) -> &'static str {
        "gemini"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let model = self.resolve_model(&request.model);
        let (system, rest) = split_system_messages(&request.messages);
        let system_instruction = (!system.trim().is_empty()).then(|| WireContent {
            role: None,
            parts: vec![WirePart { text: system }],
        });
        let generation_config = (request.temperature.is_some() || request.max_tokens.is_some()).then(|| {
            WireGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            }
        });
        let payload = WireRequest {
            contents: to_wire_contents(&rest),
            system_instruction,
            generation_config,
        };

        let url = self.endpoint_url(&model, false);
        let mut builder = self.http.post(&url).header("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            builder = builder.header("x-goog-api-key", key.as_str());
        }
        let response = builder.json(&payload).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = read_small_body(response, ERROR_BODY_LIMIT).await;
            return Err(non2xx_error("gemini", status, &body));
        }

        let out: WireResponse = response.json().await?;
        let (content, finish_reason) = extract_content_and_finish(&out);

        Ok(ChatResponse {
            provider: self.provider_name().to_string(),
            model,
            content,
            finish_reason: (!finish_reason.is_empty()).then_some(finish_reason),
            usage: Some(TokenUsage {
                prompt_tokens: out.usage_metadata.prompt_token_count,
                completion_tokens: out.usage_metadata.candidates_token_count,
                total_tokens: out.usage_metadata.total_token_count,
            }),
        })
    }

    async fn stream_chat(&self, request: ChatRequest, on_delta: DeltaHandler<'_>) -> Result<ChatResponse> {
        let model = self.resolve_model(&request.model);
        let (system, rest) = split_system_messages(&request.messages);
        let system_instruction = (!system.trim().is_empty()).then(|| WireContent {
            role: None,
            parts: vec![WirePart { text: system }],
        });
        let generation_config = (request.temperature.is_some() || request.max_tokens.is_some()).then(|| {
            WireGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            }
        });
        let payload = WireRequest {
            contents: to_wire_contents(&rest),
            system_instruction,
            generation_config,
        };

        let url = self.endpoint_url(&model, true);
        let mut builder = self.http.post(&url).header("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            builder = builder.header("x-goog-api-key", key.as_str());
        }
        let response = builder.json(&payload).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = read_small_body(response, ERROR_BODY_LIMIT).await;
            return Err(non2xx_error("gemini", status, &body));
        }

        let mut content = String::new();
        let mut finish_reason = None;
        let mut decoder = SseDecoder::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for event in decoder.feed(&chunk) {
                handle_frame(&event, &mut content, &mut finish_reason, on_delta)?;
            }
        }
        if let Some(event) = decoder.finish() {
            handle_frame(&event, &mut content, &mut finish_reason, on_delta)?;
        }

        Ok(ChatResponse {
            provider: self.provider_name().to_string(),
            model,
            content,
            finish_reason,
            usage: None,
        })
    }
}

/// A candidate snapshot, not an incremental delta: each frame carries the
/// full candidate so far. The emitted delta is the whole frame's text
/// (matching the source behavior this preserves, which writes the entire
/// frame's text to the accumulator rather than diffing against prior
/// frames).
fn handle_frame(
    event: &crate::sse::SseEvent,
    content: &mut String,
    finish_reason: &mut Option<String>,
    on_delta: DeltaHandler<'_>,
) -> Result<()> {
    let data = event.data.trim();
    if data.is_empty() || data == "[DONE]" {
        return Ok(());
    }
    let chunk: WireResponse = serde_json::from_str(data)
        .map_err(|err| ChatError::stream(format!("malformed SSE frame JSON: {err}")))?;
    let (delta, finish) = extract_content_and_finish(&chunk);
    if !delta.is_empty() {
        content.push_str(&delta);
        on_delta(&delta)?;
    }
    if !finish.is_empty() {
        *finish_reason = Some(finish);
    }
    Ok(())
}
