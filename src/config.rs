//! Configuration for offer extraction.
//!
//! All batch behaviour is controlled through [`ExtractionConfig`], built via
//! its [`ExtractionConfigBuilder`]. Callers set only what they care about and
//! rely on documented defaults for the rest.

use crate::error::OffersError;
use crate::pipeline::llm::VisionModel;
use crate::progress::ProgressCallback;
use std::fmt;
use std::sync::Arc;

/// Model used when a provider is created by name and no model is given.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Configuration for an extraction batch.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_offers::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .model("gpt-4o")
///     .provider_name("openai")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Vision model identifier, e.g. "gpt-4o-mini", "gpt-4o".
    /// If None, uses [`DEFAULT_MODEL`] or the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "gemini", "ollama").
    /// If None along with `vision_model`, the provider is detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed model. Takes precedence over `provider_name`.
    pub vision_model: Option<Arc<dyn VisionModel>>,

    /// Custom system prompt. If None, uses [`crate::prompts::DEFAULT_SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,

    /// Sampling temperature. If None, the provider default applies.
    pub temperature: Option<f32>,

    /// Maximum tokens the model may generate per image. If None, the provider default applies.
    pub max_tokens: Option<usize>,

    /// Download timeout for URL inputs in seconds. Default: 60.
    pub download_timeout_secs: u64,

    /// Optional per-image progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            vision_model: None,
            system_prompt: None,
            temperature: None,
            max_tokens: None,
            download_timeout_secs: 60,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("vision_model", &self.vision_model.as_ref().map(|_| "<dyn VisionModel>"))
            .field("system_prompt", &self.system_prompt.as_ref().map(|p| p.len()))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExtractionProgressCallback>"),
            )
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

    /// The system prompt in effect: the override, or the built-in default.
    pub fn effective_system_prompt(&self) -> &str {
        self.system_prompt
            .as_deref()
            .unwrap_or(crate::prompts::DEFAULT_SYSTEM_PROMPT)
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn vision_model(mut self, model: Arc<dyn VisionModel>) -> Self {
        self.config.vision_model = Some(model);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = Some(n);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, OffersError> {
        let c = &self.config;
        if c.max_tokens == Some(0) {
            return Err(OffersError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.system_prompt.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err(OffersError::InvalidConfig(
                "system prompt override is empty".into(),
            ));
        }
        if c.download_timeout_secs == 0 {
            return Err(OffersError::InvalidConfig(
                "download timeout must be ≥ 1s".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::DEFAULT_SYSTEM_PROMPT;

    #[test]
    fn defaults() {
        let c = ExtractionConfig::default();
        assert!(c.model.is_none());
        assert!(c.vision_model.is_none());
        assert_eq!(c.temperature, None);
        assert_eq!(c.download_timeout_secs, 60);
        assert_eq!(c.effective_system_prompt(), DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn temperature_is_clamped() {
        let c = ExtractionConfig::builder().temperature(7.5).build().unwrap();
        assert_eq!(c.temperature, Some(2.0));
    }

    #[test]
    fn zero_max_tokens_is_rejected() {
        let err = ExtractionConfig::builder().max_tokens(0).build().unwrap_err();
        assert!(matches!(err, OffersError::InvalidConfig(_)));
    }

    #[test]
    fn blank_prompt_override_is_rejected() {
        assert!(ExtractionConfig::builder().system_prompt("  \n").build().is_err());
    }

    #[test]
    fn prompt_override_wins() {
        let c = ExtractionConfig::builder().system_prompt("only prices").build().unwrap();
        assert_eq!(c.effective_system_prompt(), "only prices");
    }

    #[test]
    fn debug_hides_trait_objects() {
        let s = format!("{:?}", ExtractionConfig::default());
        assert!(s.contains("ExtractionConfig"));
        assert!(s.contains("vision_model: None"));
    }
}
