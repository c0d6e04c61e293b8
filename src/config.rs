//! Configuration types for timetable extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. The API credential lives here too:
//! it is an explicit value handed to the model client at construction time,
//! never read from a global. [`ExtractionConfig::from_env`] is the one place
//! that consults the environment.

use crate::error::ScheduleError;
use crate::pipeline::llm::ScheduleModel;
use crate::schedule::DEFAULT_TIME_SLOTS;
use std::fmt;
use std::sync::Arc;

/// Environment variable holding the Gemini API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Root of the Gemini REST API.
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Configuration for one or more extractions.
///
/// # Example
/// ```rust
/// use edgequake_timetable::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .model("gemini-1.5-pro")
///     .api_key("my-key")
///     .time_slots(["08:30-10:00", "10:15-11:45"])
///     .build()
///     .unwrap();
/// assert_eq!(config.time_slots.len(), 2);
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Model identifier. Default: `gemini-1.5-flash`.
    pub model: String,

    /// API credential for the native Gemini client. Default: none.
    ///
    /// When absent the client still builds (with a warning) and the first
    /// request fails with an authentication error.
    pub api_key: Option<String>,

    /// Base URL of the Gemini REST API. Override for proxies.
    pub api_base_url: String,

    /// Provider routed through `edgequake-llm` (e.g. "openai", "anthropic").
    /// `None` or `"gemini"` selects the native Gemini client.
    pub provider_name: Option<String>,

    /// Pre-constructed model. Takes precedence over everything else.
    pub model_backend: Option<Arc<dyn ScheduleModel>>,

    /// Time ranges the model is told to map entries onto.
    pub time_slots: Vec<String>,

    /// Custom prompt template. `{filename}` and `{time_slots}` are substituted.
    pub prompt_template: Option<String>,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Extraction is transcription; anything above ~0.3 starts inventing rooms.
    pub temperature: f32,

    /// Output token cap for the single response. Default: 8192.
    ///
    /// A dense week for one cohort is ~40 entries, well under 4 000 tokens of
    /// JSON; the headroom avoids a truncated (and therefore malformed) body.
    pub max_output_tokens: usize,

    /// Optional HTTP timeout for the model call. Default: none.
    pub api_timeout_secs: Option<u64>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            provider_name: None,
            model_backend: None,
            time_slots: DEFAULT_TIME_SLOTS.iter().map(|s| s.to_string()).collect(),
            prompt_template: None,
            temperature: 0.1,
            max_output_tokens: 8192,
            api_timeout_secs: None,
            download_timeout_secs: 120,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url)
            .field("provider_name", &self.provider_name)
            .field(
                "model_backend",
                &self.model_backend.as_ref().map(|m| m.name().to_string()),
            )
            .field("time_slots", &self.time_slots)
            .field("prompt_template", &self.prompt_template.is_some())
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Default configuration with the credential taken from `GEMINI_API_KEY`.
    ///
    /// An unset or empty variable leaves `api_key` as `None`; it is not an error.
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty()),
            ..Self::default()
        }
    }

    /// The credential, or [`ScheduleError::CredentialMissing`].
    pub fn require_api_key(&self) -> Result<&str, ScheduleError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ScheduleError::CredentialMissing {
                var: API_KEY_ENV.to_string(),
            })
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn model_backend(mut self, model: Arc<dyn ScheduleModel>) -> Self {
        self.config.model_backend = Some(model);
        self
    }

    pub fn time_slots<I, S>(mut self, slots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.time_slots = slots.into_iter().map(Into::into).collect();
        self
    }

    pub fn prompt_template(mut self, template: impl Into<String>) -> Self {
        self.config.prompt_template = Some(template.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_output_tokens(mut self, n: usize) -> Self {
        self.config.max_output_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ScheduleError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(ScheduleError::InvalidConfig("Model name must not be empty".into()));
        }
        if c.time_slots.is_empty() {
            return Err(ScheduleError::InvalidConfig(
                "At least one time slot is required".into(),
            ));
        }
        if c.time_slots.iter().any(|s| s.trim().is_empty()) {
            return Err(ScheduleError::InvalidConfig(
                "Time slots must not be blank".into(),
            ));
        }
        if c.max_output_tokens == 0 {
            return Err(ScheduleError::InvalidConfig(
                "max_output_tokens must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
