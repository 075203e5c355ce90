//! Shared test helpers for the agent crate.

use pharmabot_core::error::ProviderError;
use pharmabot_core::provider::{
    Provider, ProviderRequest, ProviderResponse, RoleLabels, StreamChunk,
};
use pharmabot_core::stream::ReplyStream;
use std::sync::Mutex;

enum Script {
    Reply(Vec<String>),
    FailOnSend,
    FailMidStream(String),
    Rejected(String),
}

/// A mock provider that streams scripted fragments and records requests.
pub struct ScriptedProvider {
    script: Script,
    labels: RoleLabels,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn with_script(script: Script) -> Self {
        Self {
            script,
            labels: RoleLabels::OPENAI,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Stream each fragment in order, then finish.
    pub fn replying<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_script(Script::Reply(fragments.into_iter().map(Into::into).collect()))
    }

    /// Fail before any fragment is produced.
    pub fn failing() -> Self {
        Self::with_script(Script::FailOnSend)
    }

    /// Yield one fragment, then report an interrupted stream.
    pub fn failing_mid_stream(first: &str) -> Self {
        Self::with_script(Script::FailMidStream(first.to_string()))
    }

    /// Accept the request, then end the stream with a rejection and no text.
    pub fn rejecting(reason: &str) -> Self {
        Self::with_script(Script::Rejected(reason.to_string()))
    }

    pub fn with_labels(mut self, labels: RoleLabels) -> Self {
        self.labels = labels;
        self
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    fn role_labels(&self) -> RoleLabels {
        self.labels
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let model = request.model.clone();
        let text = self.stream(request).await?.collect_text(None).await?;
        Ok(ProviderResponse {
            text,
            usage: None,
            model,
        })
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ReplyStream, ProviderError> {
        self.requests.lock().unwrap().push(request);

        let chunks: Vec<Result<StreamChunk, ProviderError>> = match &self.script {
            Script::FailOnSend => {
                return Err(ProviderError::Network("connection refused".into()));
            }
            Script::Reply(fragments) => fragments
                .iter()
                .map(|f| Ok(StreamChunk::delta(f.clone())))
                .chain(std::iter::once(Ok(StreamChunk::finished())))
                .collect(),
            Script::FailMidStream(first) => vec![
                Ok(StreamChunk::delta(first.clone())),
                Err(ProviderError::StreamInterrupted("connection reset".into())),
            ],
            Script::Rejected(reason) => vec![Err(ProviderError::ApiError {
                status_code: 200,
                message: format!("Prompt rejected: {reason}"),
            })],
        };

        let (tx, stream) = ReplyStream::channel(chunks.len());
        for chunk in chunks {
            let _ = tx.try_send(chunk);
        }
        Ok(stream)
    }
}
