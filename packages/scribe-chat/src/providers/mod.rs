//! Shared contract and HTTP plumbing for the three provider clients.

pub mod anthropic;
pub mod gemini;
pub mod openai;

use async_trait::async_trait;

use crate::domain::{ChatRequest, ChatResponse};
use crate::error::ChatError;
use crate::Result;

/// Invoked once per non-empty content increment during a streaming call. A
/// handler failure aborts the stream with the stream-error kind, same as a
/// malformed frame would.
pub type DeltaHandler<'a> = &'a mut dyn FnMut(&str) -> Result<()>;

/// The operations every provider-specific client exposes uniformly.
#[async_trait]
pub trait ChatClient: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Single-shot chat: sends the request, decodes the full JSON response.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;

    /// Streams incremental text via `on_delta`, returning the accumulated
    /// response once the stream ends.
    async fn stream_chat(&self, request: ChatRequest, on_delta: DeltaHandler<'_>) -> Result<ChatResponse>;
}

pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub(crate) const ERROR_BODY_LIMIT: usize = 1024;

pub(crate) fn default_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .build()
        .expect("default reqwest client config is valid")
}

/// Join a configurable base URL (falling back to the provider default) with
/// a path, trimming exactly one slash at the seam.
pub(crate) fn build_url(base_url: &str, fallback: &str, path: &str) -> String {
    let base = if base_url.trim().is_empty() {
        fallback.trim()
    } else {
        base_url.trim()
    };
    format!("{}{}", base.trim_end_matches('/'), path)
}

/// Read up to `limit` bytes of an error body for logging; never surfaced in
/// the error value itself.
pub(crate) async fn read_small_body(response: reqwest::Response, limit: usize) -> String {
    match response.text().await {
        Ok(text) => text.chars().take(limit).collect::<String>().trim().to_string(),
        Err(_) => String::new(),
    }
}

/// Logs the bounded error body (never returned to the caller) and builds the
/// provider-kind error for a non-2xx response.
pub(crate) fn non2xx_error(provider: &str, status: reqwest::StatusCode, body: &str) -> ChatError {
    tracing::warn!(provider, %status, body, "provider returned non-2xx response");
    ChatError::provider(format!("{provider}: status {status}"))
}
