//! Streaming chat client family: three provider-specific HTTP clients
//! (OpenAI-style, Anthropic-style, Gemini-style) sharing one request/
//! response contract, each decoding its own SSE wire framing into
//! incremental deltas.
//!
//! ```rust,ignore
//! use scribe_chat::{ChatClient, ChatRequest, Message, providers::openai::OpenAiClient};
//!
//! # async fn run() -> scribe_chat::Result<()> {
//! let client = OpenAiClient::new("sk-...");
//! let request = ChatRequest::new("gpt-4o-mini", vec![Message::user("hello")]);
//! let response = client.chat(request).await?;
//! # Ok(())
//! # }
//! ```

pub mod domain;
pub mod error;
pub mod providers;
pub mod sse;

pub use domain::{split_system_messages, ChatRequest, ChatResponse, Message, Role, TokenUsage};
pub use error::{ChatError, ErrorKind, Result};
pub use providers::anthropic::AnthropicClient;
pub use providers::gemini::GeminiClient;
pub use providers::openai::OpenAiClient;
pub use providers::{ChatClient, DeltaHandler};
pub use sse::{SseDecoder, SseEvent};
