//! OpenAI-style chat completions: bearer auth, `data: <json>`-framed stream
//! terminated by `data: [DONE]`.

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use super::{build_url, default_http_client, non2xx_error, read_small_body, ChatClient, DeltaHandler, ERROR_BODY_LIMIT};
use crate::domain::{ChatRequest, ChatResponse, Message, Role, TokenUsage};
use crate::error::ChatError;
use crate::sse::SseDecoder;
use crate::Result;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const CHAT_PATH: &str = "/v1/chat/completions";

pub struct OpenAiClient {
    base_url: Option<String>,
    api_key: Option<String>,
    http: reqwest::Client,
    default_model: Option<String>,
    user_agent: Option<String>,
}

impl Default for OpenAiClient {
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

impl OpenAiClient {
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
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

fn to_wire_messages(messages: &[Message]) -> Vec<WireMessage> {
    messages
        .iter()
        .map(|m| WireMessage {
            role: match m.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            },
            content: m.content.clone(),
        })
        .collect()
}

#[derive(Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "is_false")]
    stream: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Deserialize, Default)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct WireChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct WireResponse {
    model: String,
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: WireUsage,
}

#[derive(Deserialize, Default)]
struct StreamChoiceDelta {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamChoiceDelta,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct StreamChunk {
    model: String,
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[async_trait]
impl ChatClient for OpenAiClient {
    fn provider_name(&self) -> &'static str {
        "openai"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let model = self.resolve_model(&request.model);
        let payload = WireRequest {
            model: model.clone(),
            messages: to_wire_messages(&request.messages),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
        };

        let url = build_url(self.base_url.as_deref().unwrap_or(""), DEFAULT_BASE_URL, CHAT_PATH);
        let mut builder = self.http.post(&url).header("Content-Type", "application/json");
        if let Some(ua) = &self.user_agent {
            builder = builder.header("User-Agent", ua.as_str());
        }
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }

        let response = builder.json(&payload).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = read_small_body(response, ERROR_BODY_LIMIT).await;
            return Err(non2xx_error("openai", status, &body));
        }

        let out: WireResponse = response.json().await?;
        let (content, finish_reason) = out
            .choices
            .into_iter()
            .next()
            .map(|c| (c.message.content, c.finish_reason))
            .unwrap_or_default();

        Ok(ChatResponse {
            provider: self.provider_name().to_string(),
            model: out.model,
            content,
            finish_reason,
            usage: Some(TokenUsage {
                prompt_tokens: out.usage.prompt_tokens,
                completion_tokens: out.usage.completion_tokens,
                total_tokens: out.usage.total_tokens,
            }),
        })
    }

    async fn stream_chat(&self, request: ChatRequest, on_delta: DeltaHandler<'_>) -> Result<ChatResponse> {
        let model = self.resolve_model(&request.model);
        let payload = WireRequest {
            model: model.clone(),
            messages: to_wire_messages(&request.messages),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: true,
        };

        let url = build_url(self.base_url.as_deref().unwrap_or(""), DEFAULT_BASE_URL, CHAT_PATH);
        let mut builder = self.http.post(&url).header("Content-Type", "application/json");
        if let Some(ua) = &self.user_agent {
            builder = builder.header("User-Agent", ua.as_str());
        }
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }

        let response = builder.json(&payload).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = read_small_body(response, ERROR_BODY_LIMIT).await;
            return Err(non2xx_error("openai", status, &body));
        }

        let mut content = String::new();
        let mut finish_reason = None;
        let mut model_out = model;
        let mut decoder = SseDecoder::new();
        let mut stream = response.bytes_stream();
        let mut done = false;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for event in decoder.feed(&chunk) {
                done = apply_stream_event(&event, done, &mut content, &mut finish_reason, &mut model_out, on_delta)?;
            }
        }
        if let Some(event) = decoder.finish() {
            apply_stream_event(&event, done, &mut content, &mut finish_reason, &mut model_out, on_delta)?;
        }

        Ok(ChatResponse {
            provider: self.provider_name().to_string(),
            model: model_out,
            content,
            finish_reason,
            usage: None,
        })
    }
}

/// Applies one decoded SSE event to the in-progress accumulation, returning
/// whether `[DONE]` has now been seen. Once done, further events are
/// ignored rather than erroring, matching the `break`-on-`[DONE]` behavior
/// of the reference stream loop.
fn apply_stream_event(
    event: &crate::sse::SseEvent,
    already_done: bool,
    content: &mut String,
    finish_reason: &mut Option<String>,
    model_out: &mut String,
    on_delta: DeltaHandler<'_>,
) -> Result<bool> {
    if already_done {
        return Ok(true);
    }
    let data = event.data.trim();
    if data.is_empty() {
        return Ok(false);
    }
    if data == "[DONE]" {
        return Ok(true);
    }
    let chunk: StreamChunk = serde_json::from_str(data)
        .map_err(|err| ChatError::stream(format!("malformed SSE frame JSON: {err}")))?;
    if !chunk.model.is_empty() {
        *model_out = chunk.model;
    }
    let Some(choice) = chunk.choices.into_iter().next() else {
        return Ok(false);
    };
    if !choice.delta.content.is_empty() {
        content.push_str(&choice.delta.content);
        on_delta(&choice.delta.content)?;
    }
    if choice.finish_reason.is_some() {
        *finish_reason = choice.finish_reason;
    }
    Ok(false)
}
