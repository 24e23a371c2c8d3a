/// LLM Client — the single point of entry for all Gemini API calls in SkillQuest.
///
/// ARCHITECTURAL RULE: No other module may call the Gemini API directly.
/// Callers depend on the `TextGenerator` trait; `LlmClient` is the production backend.
///
/// Model: gemini-3-flash-preview (hardcoded — do not make configurable to prevent drift)
use async_stream::stream;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::{Stream, StreamExt};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod prompts;
pub mod sse;

use sse::SseDecoder;

/// The model used for all LLM calls in SkillQuest.
/// This is intentionally hardcoded to prevent accidental drift.
pub const MODEL: &str = "gemini-3-flash-preview";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// Ordered, finite, one-shot sequence of text fragments.
pub type FragmentStream = BoxStream<'static, Result<String, LlmError>>;

/// The Text Generation Service boundary.
///
/// Carried as `Arc<dyn TextGenerator>` so the validator, generators and tests
/// share one configured client.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Single-shot completion, used for terse categorical answers.
    async fn classify(&self, prompt: &str, temperature: f32) -> Result<String, LlmError>;

    /// Opens a streaming completion. Errors after the stream is open arrive as items.
    async fn stream_generate(
        &self,
        prompt: &str,
        system_instruction: &str,
        temperature: f32,
    ) -> Result<FragmentStream, LlmError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

impl<'a> GeminiRequest<'a> {
    fn new(prompt: &'a str, system_instruction: Option<&'a str>, temperature: f32) -> Self {
        Self {
            contents: vec![GeminiContent {
                role: Some("user"),
                parts: vec![GeminiPart { text: prompt }],
            }],
            system_instruction: system_instruction.map(|text| GeminiContent {
                role: None,
                parts: vec![GeminiPart { text }],
            }),
            generation_config: GenerationConfig { temperature },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<UsageMetadata>,
    /// Set when the service reports a failure inside an already-open stream.
    error: Option<GeminiErrorBody>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
pub struct ContentPart {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    pub prompt_token_count: Option<u32>,
    pub candidates_token_count: Option<u32>,
}

impl GeminiResponse {
    /// Concatenates the text parts of the first candidate.
    pub fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    code: Option<u16>,
    message: String,
}

/// The single LLM client used by all services in SkillQuest.
/// Wraps the Gemini `generateContent` and `streamGenerateContent` endpoints.
/// One attempt per call: no retries, no backoff.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl LlmClient {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            // Connect timeout only: a long interview stream must not be cut off.
            client: Client::builder()
                .connect_timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, MODEL, method)
    }

    async fn post(&self, url: &str, body: &GeminiRequest<'_>) -> Result<Response, LlmError> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: api_error_message(body),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn classify(&self, prompt: &str, temperature: f32) -> Result<String, LlmError> {
        let request = GeminiRequest::new(prompt, None, temperature);
        let response = self.post(&self.endpoint("generateContent"), &request).await?;
        let response: GeminiResponse = response.json().await?;

        if let Some(usage) = &response.usage_metadata {
            debug!(
                "LLM classify succeeded: prompt_tokens={:?}, output_tokens={:?}",
                usage.prompt_token_count, usage.candidates_token_count
            );
        }

        response.text().ok_or(LlmError::EmptyContent)
    }

    async fn stream_generate(
        &self,
        prompt: &str,
        system_instruction: &str,
        temperature: f32,
    ) -> Result<FragmentStream, LlmError> {
        let request = GeminiRequest::new(prompt, Some(system_instruction), temperature);
        let url = format!("{}?alt=sse", self.endpoint("streamGenerateContent"));
        let response = self.post(&url, &request).await?;

        Ok(decode_fragments(response.bytes_stream()))
    }
}

/// Turns a streamed SSE body into text fragments. Ends after the first error.
fn decode_fragments<S, B, E>(bytes: S) -> FragmentStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<LlmError> + Send + 'static,
{
    let mut bytes = Box::pin(bytes);
    let fragments = stream! {
        let mut decoder = SseDecoder::default();
        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(e.into());
                    return;
                }
            };
            for event in decoder.push(chunk.as_ref()) {
                match parse_event(&event) {
                    Ok(Some(text)) => yield Ok(text),
                    Ok(None) => {}
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        }
        if let Some(event) = decoder.finish() {
            match parse_event(&event) {
                Ok(Some(text)) => yield Ok(text),
                Ok(None) => {}
                Err(e) => yield Err(e),
            }
        }
    };

    fragments.boxed()
}

/// Parses one SSE `data:` payload into its text fragment, if it carries any.
fn parse_event(data: &str) -> Result<Option<String>, LlmError> {
    let response: GeminiResponse = serde_json::from_str(data)?;
    if let Some(error) = response.error {
        return Err(LlmError::Api {
            status: error.code.unwrap_or(500),
            message: error.message,
        });
    }
    Ok(response.text())
}

/// Extracts `error.message` from a Gemini error body, falling back to the raw body.
fn api_error_message(body: String) -> String {
    serde_json::from_str::<GeminiError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}
