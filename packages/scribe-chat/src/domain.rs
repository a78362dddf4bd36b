//! The wire-agnostic request/response contract every provider client speaks.

use serde::{Deserialize, Serialize};

/// A message's sender role. `System` messages are extracted and merged into
/// a provider-specific system field by clients that need one; they never
/// appear in the provider's own message list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Splits `messages` into (joined system text, remaining messages in order),
/// matching the Anthropic/Gemini system-message-extraction behavior. System
/// fragments are trimmed and joined with a blank line between them; empty
/// fragments contribute nothing.
pub fn split_system_messages(messages: &[Message]) -> (String, Vec<Message>) {
    let mut system_parts = Vec::new();
    let mut rest = Vec::with_capacity(messages.len());
    for message in messages {
        if message.role == Role::System {
            let trimmed = message.content.trim();
            if !trimmed.is_empty() {
                system_parts.push(trimmed.to_string());
            }
            continue;
        }
        rest.push(message.clone());
    }
    (system_parts.join("\n\n"), rest)
}

#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, Default)]
pub struct ChatResponse {
    pub provider: String,
    pub model: String,
    pub content: String,
    pub finish_reason: Option<String>,
    pub usage: Option<TokenUsage>,
}
