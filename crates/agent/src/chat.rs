//! A conversation handle bound to one provider and a fixed history.

use crate::context::ContextBuilder;
use pharmabot_core::error::ProviderError;
use pharmabot_core::message::Turn;
use pharmabot_core::provider::{HistoryEntry, Provider, ProviderRequest};
use pharmabot_core::stream::ReplyStream;
use std::sync::Arc;
use tracing::debug;

/// Request settings shared by every send on a session.
#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub system_instruction: Option<String>,
}

impl ChatOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            system_instruction: None,
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// History already translated into the provider's role labels.
pub struct ChatSession {
    provider: Arc<dyn Provider>,
    history: Vec<HistoryEntry>,
    options: ChatOptions,
}

impl ChatSession {
    /// Open a session over `history`, relabeled with the provider's role names.
    pub fn start(provider: Arc<dyn Provider>, history: &[Turn], options: ChatOptions) -> Self {
        let history = ContextBuilder::default().translate_history(history, provider.role_labels());
        Self {
            provider,
            history,
            options,
        }
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Send one message; fragments arrive lazily on the returned stream.
    pub async fn send(&self, message: &str) -> Result<ReplyStream, ProviderError> {
        let request = ProviderRequest {
            model: self.options.model.clone(),
            system_instruction: self.options.system_instruction.clone(),
            history: self.history.clone(),
            message: message.to_string(),
            temperature: self.options.temperature,
            max_tokens: self.options.max_tokens,
        };

        debug!(
            provider = self.provider.name(),
            model = %request.model,
            history = request.history.len(),
            "Sending chat message"
        );

        self.provider.stream(request).await
    }
}
