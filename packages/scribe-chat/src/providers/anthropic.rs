//! Anthropic-style messages API: `x-api-key`/`anthropic-version` headers,
//! system messages folded into a top-level `system` field, and a fully
//! named-event SSE stream.

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use super::{build_url, default_http_client, non2xx_error, read_small_body, ChatClient, DeltaHandler, ERROR_BODY_LIMIT};
use crate::domain::{split_system_messages, ChatRequest, ChatResponse, Message, Role, TokenUsage};
use crate::error::ChatError;
use crate::sse::SseDecoder;
use crate::Result;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
const DEFAULT_ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 1024;
const MESSAGES_PATH: &str = "/v1/messages";

pub struct AnthropicClient {
    base_url: Option<String>,
    api_key: Option<String>,
    http: reqwest::Client,
    default_model: Option<String>,
    anthropic_version: Option<String>,
    default_max_tokens: Option<u32>,
    default_temperature: Option<f32>,
    user_agent: Option<String>,
}

impl Default for AnthropicClient {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            http: default_http_client(),
            default_model: None,
            anthropic_version: None,
            default_max_tokens: None,
            default_temperature: None,
            user_agent: None,
        }
    }
}

impl AnthropicClient {
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

    fn resolve_max_tokens(&self, requested: Option<u32>) -> u32 {
        requested
            .filter(|m| *m > 0)
            .or(self.default_max_tokens.filter(|m| *m > 0))
            .unwrap_or(DEFAULT_MAX_TOKENS)
    }

    fn resolve_temperature(&self, requested: Option<f32>) -> Option<f32> {
        requested.or(self.default_temperature)
    }

    fn anthropic_version(&self) -> &str {
        self.anthropic_version.as_deref().unwrap_or(DEFAULT_ANTHROPIC_VERSION)
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
        .filter(|m| m.role != Role::System)
        .map(|m| WireMessage {
            role: if m.role == Role::Assistant { "assistant" } else { "user" },
            content: m.content.clone(),
        })
        .collect()
}

#[derive(Serialize)]
struct WireRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "String::is_empty")]
    system: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "is_false")]
    stream: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Deserialize, Default)]
struct WireUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Deserialize)]
struct WireContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct WireResponse {
    model: String,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    content: Vec<WireContentBlock>,
    #[serde(default)]
    usage: WireUsage,
}

#[derive(Deserialize)]
struct MessageStartPayload {
    message: MessageStartInner,
}

#[derive(Deserialize)]
struct MessageStartInner {
    #[serde(default)]
    model: String,
}

#[derive(Deserialize)]
struct ContentBlockDeltaPayload {
    delta: ContentBlockDeltaInner,
}

#[derive(Deserialize, Default)]
struct ContentBlockDeltaInner {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct MessageDeltaPayload {
    delta: MessageDeltaInner,
}

#[derive(Deserialize, Default)]
struct MessageDeltaInner {
    #[serde(default)]
    stop_reason: Option<String>,
}

#[async_trait]
impl ChatClient for AnthropicClient {
    fn provider_name(&self) -> &'static str {
        "claude"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let model = self.resolve_model(&request.model);
        let (system, rest) = split_system_messages(&request.messages);
        let payload = WireRequest {
            model: model.clone(),
            max_tokens: self.resolve_max_tokens(request.max_tokens),
            messages: to_wire_messages(&rest),
            system,
            temperature: self.resolve_temperature(request.temperature),
            stream: false,
        };

        let url = build_url(self.base_url.as_deref().unwrap_or(""), DEFAULT_BASE_URL, MESSAGES_PATH);
        let response = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-api-key", self.api_key.as_deref().unwrap_or(""))
            .header("anthropic-version", self.anthropic_version())
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = read_small_body(response, ERROR_BODY_LIMIT).await;
            return Err(non2xx_error("claude", status, &body));
        }

        let out: WireResponse = response.json().await?;
        let content: String = out.content.iter().map(|b| b.text.as_str()).collect();
        let input = out.usage.input_tokens;
        let output = out.usage.output_tokens;

        Ok(ChatResponse {
            provider: self.provider_name().to_string(),
            model: out.model,
            content,
            finish_reason: out.stop_reason,
            usage: Some(TokenUsage {
                prompt_tokens: input,
                completion_tokens: output,
                total_tokens: input + output,
            }),
        })
    }

    async fn stream_chat(&self, request: ChatRequest, on_delta: DeltaHandler<'_>) -> Result<ChatResponse> {
        let model = self.resolve_model(&request.model);
        let (system, rest) = split_system_messages(&request.messages);
        let payload = WireRequest {
            model: model.clone(),
            max_tokens: self.resolve_max_tokens(request.max_tokens),
            messages: to_wire_messages(&rest),
            system,
            temperature: self.resolve_temperature(request.temperature),
            stream: true,
        };

        let url = build_url(self.base_url.as_deref().unwrap_or(""), DEFAULT_BASE_URL, MESSAGES_PATH);
        let response = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-api-key", self.api_key.as_deref().unwrap_or(""))
            .header("anthropic-version", self.anthropic_version())
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = read_small_body(response, ERROR_BODY_LIMIT).await;
            return Err(non2xx_error("claude", status, &body));
        }

        let mut content = String::new();
        let mut finish_reason = None;
        let mut model_out = model;
        let mut decoder = SseDecoder::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for event in decoder.feed(&chunk) {
                self.handle_event(&event, &mut content, &mut finish_reason, &mut model_out, on_delta)?;
            }
        }
        if let Some(event) = decoder.finish() {
            self.handle_event(&event, &mut content, &mut finish_reason, &mut model_out, on_delta)?;
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

impl AnthropicClient {
    fn handle_event(
        &self,
        event: &crate::sse::SseEvent,
        content: &mut String,
        finish_reason: &mut Option<String>,
        model_out: &mut String,
        on_delta: DeltaHandler<'_>,
    ) -> Result<()> {
        let data = event.data.trim();
        if data.is_empty() {
            return Ok(());
        }
        match event.event.as_str() {
            "message_start" => {
                let payload: MessageStartPayload = serde_json::from_str(data)
                    .map_err(|err| ChatError::stream(format!("malformed SSE frame JSON: {err}")))?;
                if !payload.message.model.is_empty() {
                    *model_out = payload.message.model;
                }
            }
            "content_block_delta" => {
                let payload: ContentBlockDeltaPayload = serde_json::from_str(data)
                    .map_err(|err| ChatError::stream(format!("malformed SSE frame JSON: {err}")))?;
                if !payload.delta.text.is_empty() {
                    content.push_str(&payload.delta.text);
                    on_delta(&payload.delta.text)?;
                }
            }
            "message_delta" => {
                let payload: MessageDeltaPayload = serde_json::from_str(data)
                    .map_err(|err| ChatError::stream(format!("malformed SSE frame JSON: {err}")))?;
                if payload.delta.stop_reason.is_some() {
                    *finish_reason = payload.delta.stop_reason;
                }
            }
            // "message_stop" and any unrecognized event carry no state.
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Message;

    #[test]
    fn resolve_max_tokens_defaults_when_missing_or_non_positive() {
        let client = AnthropicClient::default();
        assert_eq!(client.resolve_max_tokens(None), DEFAULT_MAX_TOKENS);
        assert_eq!(client.resolve_max_tokens(Some(0)), DEFAULT_MAX_TOKENS);
        assert_eq!(client.resolve_max_tokens(Some(42)), 42);
    }

    #[test]
    fn to_wire_messages_drops_system_and_maps_assistant_role() {
        let messages = vec![Message::user("hi"), Message::assistant("hello")];
        let wire = to_wire_messages(&messages);
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0].role, "user");
        assert_eq!(wire[1].role, "assistant");
    }

    /// Matches the spec's scenario: `message_start` carries the model,
    /// two `content_block_delta` events carry "Hel"/"lo", `message_delta`
    /// carries the stop reason, `message_stop` terminates.
    #[test]
    fn named_event_stream_accumulates_deltas_and_model_and_stop_reason() {
        let body = concat!(
            "event: message_start\ndata: {\"message\":{\"model\":\"claude-x\"}}\n\n",
            "event: content_block_delta\ndata: {\"delta\":{\"text\":\"Hel\"}}\n\n",
            "event: content_block_delta\ndata: {\"delta\":{\"text\":\"lo\"}}\n\n",
            "event: message_delta\ndata: {\"delta\":{\"stop_reason\":\"end_turn\"}}\n\n",
            "event: message_stop\ndata: {}\n\n",
        );

        let client = AnthropicClient::default();
        let mut decoder = SseDecoder::new();
        let mut content = String::new();
        let mut finish_reason = None;
        let mut model_out = String::new();
        let mut deltas = Vec::new();
        let mut handler = |delta: &str| {
            deltas.push(delta.to_string());
            Ok(())
        };

        for event in decoder.feed(body.as_bytes()) {
            client
                .handle_event(&event, &mut content, &mut finish_reason, &mut model_out, &mut handler)
                .unwrap();
        }

        assert_eq!(deltas, vec!["Hel", "lo"]);
        assert_eq!(content, "Hello");
        assert_eq!(model_out, "claude-x");
        assert_eq!(finish_reason, Some("end_turn".to_string()));
    }

    #[test]
    fn malformed_content_block_delta_surfaces_as_stream_error() {
        let client = AnthropicClient::default();
        let mut content = String::new();
        let mut finish_reason = None;
        let mut model_out = String::new();
        let mut handler = |_: &str| Ok(());
        let event = crate::sse::SseEvent {
            event: "content_block_delta".to_string(),
            data: "{not json".to_string(),
        };

        let err = client
            .handle_event(&event, &mut content, &mut finish_reason, &mut model_out, &mut handler)
            .unwrap_err();

        assert_eq!(err.kind, crate::error::ErrorKind::Stream);
    }
}
