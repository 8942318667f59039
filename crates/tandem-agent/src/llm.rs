//! LLM client interfaces and message types.
//!
//! Providers live outside this workspace.  The core programs against two
//! traits: [`LlmClient`] for a single conversation-capable client, and
//! [`LlmManager`] as the factory the dispatcher calls once per worker so
//! every worker gets a fresh client (no shared rate-limit or connection
//! state between concurrent workers).

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// The role of a participant in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-level instructions that shape model behavior.
    System,
    /// Input from the user (or tool feedback fed back to the worker).
    User,
    /// Output from the LLM.
    Assistant,
}

/// A single message in a conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who produced this message.
    pub role: Role,
    /// The textual content.  Tool calls travel in-band as `<tool_call>` tags.
    pub content: String,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Client interfaces
// ---------------------------------------------------------------------------

/// A conversation-capable LLM client.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a conversation and return the model's text response.
    ///
    /// `system_override` replaces the provider-side system prompt when
    /// non-empty; the core passes `""` because workers carry their system
    /// prompt in `history`.  `max_tokens == 0` means "provider default".
    async fn send_prompt(
        &self,
        system_override: &str,
        history: &[ChatMessage],
        max_tokens: u32,
    ) -> Result<String>;
}

/// Manufactures LLM clients keyed by `(provider, model)`.
///
/// Called once per worker invocation; implementations must be thread-safe.
pub trait LlmManager: Send + Sync {
    /// Create a fresh client for the given provider and model.
    fn get_client(&self, provider: &str, model: &str) -> Result<Arc<dyn LlmClient>>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_constructors() {
        assert_eq!(ChatMessage::system("s").role, Role::System);
        assert_eq!(ChatMessage::user("u").role, Role::User);
        assert_eq!(ChatMessage::assistant("a").role, Role::Assistant);
    }

    #[test]
    fn role_serialization() {
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
        let parsed: Role = serde_json::from_str("\"system\"").unwrap();
        assert_eq!(parsed, Role::System);
    }
}
