//! Model interaction: send the document and prompt, get JSON text back.
//!
//! [`ScheduleModel`] is the seam between the pipeline and whatever answers
//! the request. Two implementations ship:
//!
//! * [`GeminiModel`] talks to the Gemini `generateContent` REST endpoint
//!   directly. It is the default because Gemini accepts a PDF as inline data
//!   and can constrain its output to a declared schema.
//! * [`ProviderModel`] routes through any `edgequake-llm` provider. Those
//!   APIs have no uniform schema knob, so the schema travels in a system
//!   message instead.
//!
//! Exactly one request is made per extraction. Errors are returned as-is;
//! there is no retry loop.

use crate::config::ExtractionConfig;
use crate::error::ScheduleError;
use crate::pipeline::encode::PdfPayload;
use crate::prompts::schema_system_prompt;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Substituted when no credential is configured; the API rejects it.
pub const PLACEHOLDER_API_KEY: &str = "12345";

/// Everything a model needs to answer one extraction.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub prompt: String,
    pub document: PdfPayload,
    /// Schema the output must follow (see [`crate::prompts::response_schema`]).
    pub response_schema: Value,
    pub temperature: f32,
    pub max_output_tokens: usize,
}

/// A generative model able to read a PDF and answer with JSON text.
///
/// Implementations return the raw response text. Decoding and leniency
/// rules live in [`crate::pipeline::normalize`], so a mock only has to
/// return a string.
#[async_trait]
pub trait ScheduleModel: Send + Sync {
    /// Short provider name used in errors and logs.
    fn name(&self) -> &str;

    async fn generate(&self, request: &ExtractionRequest) -> Result<String, ScheduleError>;
}

// ── Native Gemini client ─────────────────────────────────────────────────

/// Gemini `generateContent` client.
pub struct GeminiModel {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiModel {
    /// Build the client, tolerating a missing credential.
    ///
    /// Without a key a warning is logged and [`PLACEHOLDER_API_KEY`] is used,
    /// so construction succeeds and the first request fails with
    /// [`ScheduleError::AuthError`].
    pub fn new(config: &ExtractionConfig) -> Result<Self, ScheduleError> {
        let api_key = match config.require_api_key() {
            Ok(key) => key.to_string(),
            Err(_) => {
                warn!(
                    "API key missing! Set {} or pass an explicit key; requests will be rejected.",
                    crate::config::API_KEY_ENV
                );
                PLACEHOLDER_API_KEY.to_string()
            }
        };
        Self::with_key(config, api_key)
    }

    /// Build the client, failing with [`ScheduleError::CredentialMissing`]
    /// when no key is configured.
    pub fn try_new(config: &ExtractionConfig) -> Result<Self, ScheduleError> {
        let api_key = config.require_api_key()?.to_string();
        Self::with_key(config, api_key)
    }

    fn with_key(config: &ExtractionConfig, api_key: String) -> Result<Self, ScheduleError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.api_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| ScheduleError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    /// Full `generateContent` URL for the configured model.
    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// `true` when the client fell back to the placeholder credential.
    pub fn uses_placeholder_key(&self) -> bool {
        self.api_key == PLACEHOLDER_API_KEY
    }
}

#[async_trait]
impl ScheduleModel for GeminiModel {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, request: &ExtractionRequest) -> Result<String, ScheduleError> {
        let start = Instant::now();
        let body = GenerateContentRequest::from_request(request);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ScheduleError::ExternalService {
                provider: self.name().to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let text = response
            .text()
            .await
            .map_err(|e| ScheduleError::ExternalService {
                provider: self.name().to_string(),
                message: format!("failed to read response body: {e}"),
            })?;

        if !status.is_success() {
            return Err(status_error(status.as_u16(), &text, retry_after));
        }

        let content = response_text(&text)?;
        debug!(
            "Gemini {}: {} chars of JSON in {:?}",
            self.model,
            content.len(),
            start.elapsed()
        );
        Ok(content)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    #[serde(rename_all = "camelCase")]
    Inline {
        inline_data: InlineData<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'static str,
    response_schema: &'a Value,
    temperature: f32,
    max_output_tokens: usize,
}

impl<'a> GenerateContentRequest<'a> {
    fn from_request(request: &'a ExtractionRequest) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: &request.prompt,
                    },
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: request.document.mime_type,
                            data: &request.document.data,
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: &request.response_schema,
                temperature: request.temperature,
                max_output_tokens: request.max_output_tokens,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Concatenated text of the first candidate.
///
/// An envelope with no candidates and no block reason yields an empty
/// string, which the decoder treats as `{}`.
fn response_text(body: &str) -> Result<String, ScheduleError> {
    let parsed: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| ScheduleError::ExternalService {
            provider: "gemini".to_string(),
            message: format!("unreadable response envelope: {e}"),
        })?;

    if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(ScheduleError::ExternalService {
            provider: "gemini".to_string(),
            message: format!("request blocked: {reason}"),
        });
    }

    let Some(candidate) = parsed.candidates.into_iter().next() else {
        return Ok(String::new());
    };
    if let Some(reason) = candidate.finish_reason.as_deref() {
        if reason != "STOP" {
            warn!("Gemini finished with reason {reason}; output may be truncated");
        }
    }

    Ok(candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default())
}

/// Map a non-2xx status to an error, keeping the API's own message.
fn status_error(status: u16, body: &str, retry_after_secs: Option<u64>) -> ScheduleError {
    let detail = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string());
    let provider = "gemini".to_string();

    match status {
        401 | 403 => ScheduleError::AuthError { provider, detail },
        429 => ScheduleError::RateLimitExceeded {
            provider,
            retry_after_secs,
        },
        _ => ScheduleError::ExternalService {
            provider,
            message: format!("HTTP {status}: {detail}"),
        },
    }
}

// ── edgequake-llm providers ──────────────────────────────────────────────

/// Any `edgequake-llm` provider, with the schema given in the system prompt.
pub struct ProviderModel {
    name: String,
    provider: Arc<dyn LLMProvider>,
}

impl ProviderModel {
    pub fn new(name: impl Into<String>, provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            name: name.into(),
            provider,
        }
    }

    /// Instantiate a named provider (reads its own API key variable).
    pub fn from_factory(provider_name: &str, model: &str) -> Result<Self, ScheduleError> {
        let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
            ScheduleError::ProviderNotConfigured {
                provider: provider_name.to_string(),
                hint: format!("{e}"),
            }
        })?;
        Ok(Self::new(provider_name, provider))
    }
}

#[async_trait]
impl ScheduleModel for ProviderModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: &ExtractionRequest) -> Result<String, ScheduleError> {
        let document = ImageData::new(request.document.data.clone(), request.document.mime_type);
        let messages = vec![
            ChatMessage::system(schema_system_prompt()),
            ChatMessage::user_with_images(request.prompt.as_str(), vec![document]),
        ];
        let options = CompletionOptions {
            temperature: Some(request.temperature),
            max_tokens: Some(request.max_output_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ScheduleError::ExternalService {
                provider: self.name.clone(),
                message: format!("{e}"),
            })?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.name, response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }
}

/// Pick the model for a config, from most- to least-specific.
///
/// 1. a pre-built [`ScheduleModel`] (`model_backend`), used as-is;
/// 2. a named provider other than `gemini`, built by `edgequake-llm`;
/// 3. the native Gemini client with the configured credential.
pub fn resolve_model(config: &ExtractionConfig) -> Result<Arc<dyn ScheduleModel>, ScheduleError> {
    if let Some(ref model) = config.model_backend {
        return Ok(Arc::clone(model));
    }

    if let Some(ref name) = config.provider_name {
        if !name.eq_ignore_ascii_case("gemini") {
            debug!("Using edgequake-llm provider '{}' ({})", name, config.model);
            return Ok(Arc::new(ProviderModel::from_factory(name, &config.model)?));
        }
    }

    debug!("Using native Gemini client ({})", config.model);
    Ok(Arc::new(GeminiModel::new(config)?))
}
