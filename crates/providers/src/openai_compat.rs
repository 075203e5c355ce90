//! OpenAI-compatible provider implementation.
//!
//! Works with: OpenAI, Ollama, vLLM, llama.cpp, and any endpoint exposing
//! `/v1/chat/completions`.
//!
//! Supports chat completions (non-streaming and streaming SSE) and health checks.

use crate::sse::SseDecoder;
use async_trait::async_trait;
use futures::StreamExt;
use pharmabot_core::error::ProviderError;
use pharmabot_core::provider::*;
use pharmabot_core::stream::ReplyStream;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// An OpenAI-compatible chat provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_default();

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    /// Create an Ollama provider (convenience constructor).
    pub fn ollama(base_url: Option<&str>) -> Self {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama", // Ollama doesn't need a real key
        )
    }

    /// Flatten system instruction, history and the new message into chat messages.
    fn to_api_messages(request: &ProviderRequest) -> Vec<ApiMessage> {
        let mut messages = Vec::with_capacity(request.history.len() + 2);

        if let Some(system) = request.system_instruction.as_deref().filter(|s| !s.is_empty()) {
            messages.push(ApiMessage {
                role: "system".into(),
                content: Some(system.to_string()),
            });
        }

        messages.extend(request.history.iter().map(|entry| ApiMessage {
            role: entry.role.clone(),
            content: Some(entry.text.clone()),
        }));

        messages.push(ApiMessage {
            role: RoleLabels::OPENAI.user.into(),
            content: Some(request.message.clone()),
        });

        messages
    }

    fn to_body(request: &ProviderRequest, stream: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(request),
            "temperature": request.temperature,
            "stream": stream,
        });

        if stream {
            body["stream_options"] = serde_json::json!({ "include_usage": true });
        }

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        body
    }

    async fn post(&self, body: &serde_json::Value, streaming: bool) -> Result<reqwest::Response, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut builder = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json");
        if streaming {
            builder = builder.header("Accept", "text/event-stream");
        }

        let response = builder
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl pharmabot_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let body = Self::to_body(&request, false);

        debug!(provider = %self.name, model = %request.model, "Sending completion request");

        let response = self.post(&body, false).await?;

        let api_response: ApiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        let choice =
            api_response
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| ProviderError::ApiError {
                    status_code: 200,
                    message: "No choices in response".into(),
                })?;

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ProviderResponse {
            text: choice.message.content.unwrap_or_default(),
            usage,
            model: api_response.model,
        })
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ReplyStream, ProviderError> {
        let body = Self::to_body(&request, true);

        debug!(provider = %self.name, model = %request.model, "Sending streaming request");

        let response = self.post(&body, true).await?;

        let (tx, stream) = ReplyStream::channel(64);
        let provider_name = self.name.clone();

        // Spawn task to read the SSE byte stream and parse chunks
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut decoder = SseDecoder::new();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                for data in decoder.push(&bytes) {
                    // "[DONE]" signals end of stream
                    if data == "[DONE]" {
                        let _ = tx.send(Ok(StreamChunk::finished())).await;
                        return;
                    }

                    let stream_resp = match serde_json::from_str::<StreamResponse>(&data) {
                        Ok(parsed) => parsed,
                        Err(e) => {
                            trace!(
                                provider = %provider_name,
                                data = %data,
                                error = %e,
                                "Ignoring unparseable SSE chunk"
                            );
                            continue;
                        }
                    };

                    if let Some(error) = stream_resp.error {
                        warn!(provider = %provider_name, message = %error.message, "Stream reported an error");
                        let _ = tx
                            .send(Err(ProviderError::ApiError {
                                status_code: 200,
                                message: error.message,
                            }))
                            .await;
                        return;
                    }

                    if let Some(content) = stream_resp
                        .choices
                        .first()
                        .and_then(|c| c.delta.content.clone())
                        .filter(|c| !c.is_empty())
                    {
                        if tx.send(Ok(StreamChunk::delta(content))).await.is_err() {
                            return; // receiver dropped or cancelled
                        }
                    }

                    // Usage arrives in the final chunk when stream_options is honored
                    if let Some(usage) = stream_resp.usage {
                        let _ = tx
                            .send(Ok(StreamChunk {
                                content: None,
                                done: true,
                                usage: Some(Usage {
                                    prompt_tokens: usage.prompt_tokens,
                                    completion_tokens: usage.completion_tokens,
                                    total_tokens: usage.total_tokens,
                                }),
                            }))
                            .await;
                        return;
                    }
                }
            }

            // Stream ended without [DONE]; send final chunk
            let _ = tx.send(Ok(StreamChunk::finished())).await;
        });

        Ok(stream)
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

/// A single SSE `data: {...}` chunk from a streaming response.
#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
    #[serde(default)]
    error: Option<StreamError>,
}

/// An `{"error": {...}}` object sent in place of a chunk.
#[derive(Debug, Deserialize)]
struct StreamError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pharmabot_core::Provider;

    #[test]
    fn ollama_constructor() {
        let provider = OpenAiCompatProvider::ollama(None);
        assert_eq!(provider.name(), "ollama");
        assert!(provider.base_url.contains("localhost:11434"));
        assert_eq!(provider.role_labels(), RoleLabels::OPENAI);
    }

    #[test]
    fn message_conversion_orders_system_history_message() {
        let mut request = ProviderRequest::new("gpt-4o-mini", "Anything for a cough?");
        request.system_instruction = Some("You are a pharmacy assistant.".into());
        request.history = vec![
            HistoryEntry {
                role: "user".into(),
                text: "Hi".into(),
            },
            HistoryEntry {
                role: "assistant".into(),
                text: "Hello!".into(),
            },
        ];

        let api_messages = OpenAiCompatProvider::to_api_messages(&request);
        let roles: Vec<&str> = api_messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(api_messages[3].content.as_deref(), Some("Anything for a cough?"));
    }

    #[test]
    fn body_includes_stream_options_only_when_streaming() {
        let request = ProviderRequest::new("llama3.2:1b", "hi");
        assert!(OpenAiCompatProvider::to_body(&request, false).get("stream_options").is_none());
        let streaming = OpenAiCompatProvider::to_body(&request, true);
        assert_eq!(streaming["stream_options"]["include_usage"], true);
        assert!(streaming.get("max_tokens").is_none());
    }

    #[test]
    fn parse_stream_content_delta() {
        let data = r#"{"choices":[{"delta":{"content":"Hello"},"finish_reason":null}]}"#;
        let parsed: StreamResponse = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.choices[0].delta.content.as_deref(), Some("Hello"));
    }

    #[test]
    fn parse_stream_usage() {
        let data = r#"{"choices":[],"usage":{"prompt_tokens":10,"completion_tokens":5,"total_tokens":15}}"#;
        let parsed: StreamResponse = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.usage.unwrap().total_tokens, 15);
    }

    #[tokio::test]
    async fn stream_against_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Strepsils \"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"may help.\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        let _mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer ollama")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await;

        let provider = OpenAiCompatProvider::new("ollama", server.url(), "ollama");
        let stream = provider
            .stream(ProviderRequest::new("llama3.2:1b", "cough"))
            .await
            .unwrap();
        assert_eq!(stream.collect_text(None).await.unwrap(), "Strepsils may help.");
    }

    #[tokio::test]
    async fn in_band_stream_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Str\"}}]}\n\n",
            "data: {\"error\":{\"message\":\"model overloaded\",\"type\":\"server_error\"}}\n\n",
        );
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await;

        let provider = OpenAiCompatProvider::new("ollama", server.url(), "ollama");
        let err = provider
            .stream(ProviderRequest::new("llama3.2:1b", "cough"))
            .await
            .unwrap()
            .collect_text(None)
            .await
            .unwrap_err();
        match err {
            ProviderError::ApiError { message, .. } => assert_eq!(message, "model overloaded"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn complete_against_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"model":"gpt-4o-mini","choices":[{"message":{"role":"assistant","content":"Yes, Adol is available."}}],"usage":{"prompt_tokens":9,"completion_tokens":6,"total_tokens":15}}"#,
            )
            .create_async()
            .await;

        let provider = OpenAiCompatProvider::new("openai", server.url(), "sk-test");
        let response = provider
            .complete(ProviderRequest::new("gpt-4o-mini", "Adol?"))
            .await
            .unwrap();
        assert_eq!(response.text, "Yes, Adol is available.");
        assert_eq!(response.usage.unwrap().total_tokens, 15);
    }
}
