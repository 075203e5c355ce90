//! Gemini native provider implementation.
//!
//! Uses the Generative Language API directly.
//!
//! Features:
//! - `x-goog-api-key` header authentication
//! - System instruction as a top-level `system_instruction` field
//! - History as `contents` with `user` / `model` roles
//! - Streaming via `:streamGenerateContent?alt=sse`

use crate::sse::SseDecoder;
use async_trait::async_trait;
use futures::StreamExt;
use pharmabot_core::error::ProviderError;
use pharmabot_core::provider::*;
use pharmabot_core::stream::ReplyStream;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini Generative Language API provider.
pub struct GeminiProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Create a new Gemini provider.
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_default();

        Self {
            name: "gemini".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// `{base}/models/{model}:{method}`; accepts model ids with or without a `models/` prefix.
    fn endpoint(&self, model: &str, method: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/models/{model}:{method}", self.base_url)
    }

    /// Convert a request into the `generateContent` body.
    fn to_api_request(request: &ProviderRequest) -> GenerateRequest {
        let labels = RoleLabels::GEMINI;

        let mut contents: Vec<ApiContent> = request
            .history
            .iter()
            .map(|entry| ApiContent::text(Some(entry.role.clone()), &entry.text))
            .collect();
        contents.push(ApiContent::text(Some(labels.user.into()), &request.message));

        GenerateRequest {
            system_instruction: request
                .system_instruction
                .as_deref()
                .filter(|s| !s.is_empty())
                .map(|s| ApiContent::text(None, s)),
            contents,
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        }
    }

    /// POST a body and map non-success statuses to provider errors.
    async fn post(
        &self,
        url: &str,
        body: &GenerateRequest,
    ) -> Result<reqwest::Response, ProviderError> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

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
            warn!(status, body = %error_body, "Gemini returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: api_error_message(&error_body),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl pharmabot_core::Provider for GeminiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn role_labels(&self) -> RoleLabels {
        RoleLabels::GEMINI
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let url = self.endpoint(&request.model, "generateContent");
        let body = Self::to_api_request(&request);

        debug!(provider = %self.name, model = %request.model, turns = body.contents.len(), "Sending generateContent request");

        let response = self.post(&url, &body).await?;

        let api_response: GenerateResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        if api_response.candidates.is_empty() {
            let reason = api_response
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates in response".into());
            return Err(ProviderError::ApiError {
                status_code: 200,
                message: format!("Prompt rejected: {reason}"),
            });
        }

        Ok(ProviderResponse {
            text: api_response.text(),
            usage: api_response.usage_metadata.map(Usage::from),
            model: api_response.model_version.unwrap_or(request.model),
        })
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ReplyStream, ProviderError> {
        let url = format!(
            "{}?alt=sse",
            self.endpoint(&request.model, "streamGenerateContent")
        );
        let body = Self::to_api_request(&request);

        debug!(provider = %self.name, model = %request.model, "Sending streaming request");

        let response = self.post(&url, &body).await?;

        let (tx, stream) = ReplyStream::channel(64);
        let provider_name = self.name.clone();

        // Spawn task to read the SSE byte stream and parse chunks
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut decoder = SseDecoder::new();
            let mut usage: Option<Usage> = None;
            let mut produced_text = false;
            let mut exhausted = false;

            while !exhausted {
                let batch = match byte_stream.next().await {
                    Some(Ok(bytes)) => decoder.push(&bytes),
                    Some(Err(e)) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                    None => {
                        exhausted = true;
                        decoder.finish().into_iter().collect()
                    }
                };

                for data in batch {
                    match parse_stream_event(&data, &mut usage) {
                        StreamEvent::Text(text) => {
                            produced_text = true;
                            if tx.send(Ok(StreamChunk::delta(text))).await.is_err() {
                                return; // receiver dropped or cancelled
                            }
                        }
                        StreamEvent::Skip => {
                            trace!(provider = %provider_name, data = %data, "Skipping SSE chunk without text");
                        }
                        StreamEvent::Failed(e) => {
                            warn!(provider = %provider_name, error = %e, "Gemini stream reported an error");
                            let _ = tx.send(Err(e)).await;
                            return;
                        }
                    }
                }
            }

            if !produced_text {
                let _ = tx
                    .send(Err(ProviderError::ApiError {
                        status_code: 200,
                        message: "Prompt rejected: no candidates in response".into(),
                    }))
                    .await;
                return;
            }

            let _ = tx
                .send(Ok(StreamChunk {
                    content: None,
                    done: true,
                    usage,
                }))
                .await;
        });

        Ok(stream)
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }
}

/// What one streamed `data:` payload means for the reply.
enum StreamEvent {
    Text(String),
    Skip,
    Failed(ProviderError),
}

/// Classify a streamed payload. Blocked prompts and in-band error objects
/// end the stream with an error.
fn parse_stream_event(data: &str, usage: &mut Option<Usage>) -> StreamEvent {
    let mut chunk = match serde_json::from_str::<GenerateResponse>(data) {
        Ok(chunk) => chunk,
        Err(_) => return StreamEvent::Skip,
    };

    if let Some(error) = chunk.error.take() {
        return StreamEvent::Failed(ProviderError::ApiError {
            status_code: error.code.unwrap_or(200),
            message: error.message,
        });
    }

    if let Some(reason) = chunk.prompt_feedback.as_ref().and_then(|f| f.block_reason.clone()) {
        return StreamEvent::Failed(ProviderError::ApiError {
            status_code: 200,
            message: format!("Prompt rejected: {reason}"),
        });
    }

    if let Some(meta) = chunk.usage_metadata.clone() {
        *usage = Some(meta.into());
    }
    let text = chunk.text();
    if text.is_empty() {
        StreamEvent::Skip
    } else {
        StreamEvent::Text(text)
    }
}

/// Pull `error.message` out of a Gemini error body, falling back to the raw text.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .map(|b| b.error.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.to_string())
}

// --- Gemini API types (internal) ---

#[derive(Debug, Serialize)]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<ApiContent>,
    contents: Vec<ApiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<ApiPart>,
}

impl ApiContent {
    fn text(role: Option<String>, text: &str) -> Self {
        Self {
            role,
            parts: vec![ApiPart {
                text: Some(text.to_string()),
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    error: Option<ApiErrorDetail>,
}

impl GenerateResponse {
    /// Text of the first candidate, parts concatenated.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<ApiContent>,
    #[serde(default)]
    #[allow(dead_code)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

impl From<UsageMetadata> for Usage {
    fn from(u: UsageMetadata) -> Self {
        Usage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count,
            total_tokens: u.total_token_count,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: String,
}
