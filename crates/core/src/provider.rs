//! Provider trait — the abstraction over hosted chat models.
//!
//! A Provider knows how to send a system instruction, prior turns and a new
//! user message to a model and get a reply back, either complete or as a
//! stream of text fragments.
//!
//! Implementations: Gemini, OpenAI-compatible (OpenAI, Ollama).

use crate::error::ProviderError;
use crate::message::Role;
use crate::stream::ReplyStream;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The role names a backend expects on the wire.
///
/// Internal roles are fixed (`User`, `Assistant`); backends differ in what
/// they call the assistant (`assistant`, `model`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleLabels {
    pub user: &'static str,
    pub assistant: &'static str,
}

impl RoleLabels {
    /// OpenAI-style labels.
    pub const OPENAI: RoleLabels = RoleLabels {
        user: "user",
        assistant: "assistant",
    };

    /// Gemini-style labels.
    pub const GEMINI: RoleLabels = RoleLabels {
        user: "user",
        assistant: "model",
    };

    pub fn label(&self, role: Role) -> &'static str {
        match role {
            Role::User => self.user,
            Role::Assistant => self.assistant,
        }
    }

    /// Reverse lookup. `None` for labels this backend doesn't use.
    pub fn role_of(&self, label: &str) -> Option<Role> {
        if label == self.user {
            Some(Role::User)
        } else if label == self.assistant {
            Some(Role::Assistant)
        } else {
            None
        }
    }
}

impl Default for RoleLabels {
    fn default() -> Self {
        Self::OPENAI
    }
}

/// A prior turn, already relabeled for the target backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: String,
    pub text: String,
}

/// Configuration for a provider request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "gemini-1.5-flash", "gpt-4o-mini")
    pub model: String,

    /// System / style instruction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,

    /// Prior turns, oldest first
    #[serde(default)]
    pub history: Vec<HistoryEntry>,

    /// The new user message
    pub message: String,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

impl ProviderRequest {
    pub fn new(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_instruction: None,
            history: Vec::new(),
            message: message.into(),
            temperature: default_temperature(),
            max_tokens: None,
        }
    }
}

/// A complete (non-streaming) response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated text
    pub text: String,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A single chunk in a streaming response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Partial content delta
    #[serde(default)]
    pub content: Option<String>,

    /// Whether this is the final chunk
    #[serde(default)]
    pub done: bool,

    /// Usage info (typically only in the final chunk)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl StreamChunk {
    /// A text delta; more chunks follow.
    pub fn delta(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            done: false,
            usage: None,
        }
    }

    /// A final chunk carrying text.
    pub fn last(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            done: true,
            usage: None,
        }
    }

    /// An end-of-stream marker without text.
    pub fn finished() -> Self {
        Self {
            content: None,
            done: true,
            usage: None,
        }
    }
}

/// The core Provider trait.
///
/// Every chat backend implements this trait. The assistant calls
/// `complete()` or `stream()` without knowing which backend is used.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "gemini", "ollama").
    fn name(&self) -> &str;

    /// How this backend labels user and assistant turns.
    fn role_labels(&self) -> RoleLabels {
        RoleLabels::OPENAI
    }

    /// Send a request and get a complete response.
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError>;

    /// Send a request and get a stream of reply fragments.
    ///
    /// Default implementation calls `complete()` and yields the result as a single fragment.
    async fn stream(&self, request: ProviderRequest) -> Result<ReplyStream, ProviderError> {
        let response = self.complete(request).await?;
        Ok(ReplyStream::from_text(response.text))
    }

    /// Health check: can we reach the provider?
    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(true)
    }
}
