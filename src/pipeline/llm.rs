//! VLM interaction: the request shape and the model seam.
//!
//! The pipeline talks to the vision model only through [`VisionModel`]:
//! "given a request carrying one image, return a text completion". The
//! production implementation, [`EdgequakeVisionModel`], forwards to any
//! `edgequake_llm` provider; tests plug in scripted models.
//!
//! No retry loop: a failed call surfaces as an
//! [`crate::error::ImageError`] for that image and the batch moves on.

use crate::config::ExtractionConfig;
use crate::error::ModelError;
use crate::pipeline::encode::EncodedImage;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::sync::Arc;
use tracing::debug;

/// Speaker of a [`PromptMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
}

/// One message of the exchange sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptMessage {
    pub role: Role,
    pub text: String,
    /// Image attached to this message (user turns only).
    pub image: Option<EncodedImage>,
}

impl PromptMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            text: text.into(),
            image: None,
        }
    }

    pub fn user_with_image(text: impl Into<String>, image: EncodedImage) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            image: Some(image),
        }
    }
}

/// Output format the model is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    /// A single JSON object, no surrounding prose.
    #[default]
    JsonObject,
}

impl ResponseFormat {
    /// Wire name of the format, as OpenAI-compatible APIs spell it.
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseFormat::JsonObject => "json_object",
        }
    }
}

/// Everything a [`VisionModel`] needs for one image.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    /// Model identifier, if one was configured.
    pub model: Option<String>,
    pub response_format: ResponseFormat,
    pub messages: Vec<PromptMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
}

impl ExtractionRequest {
    /// Assemble a request from prompt messages and the sampling settings in `config`.
    pub fn new(messages: Vec<PromptMessage>, config: &ExtractionConfig) -> Self {
        Self {
            model: config.model.clone(),
            response_format: ResponseFormat::JsonObject,
            messages,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// Raw completion returned by a [`VisionModel`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelReply {
    pub content: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl ModelReply {
    /// A reply with no token accounting.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// A vision-capable chat model.
///
/// Implementations must be `Send + Sync`; one instance serves a whole batch.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Run one completion and return its text.
    async fn complete(&self, request: &ExtractionRequest) -> Result<ModelReply, ModelError>;
}

/// [`VisionModel`] backed by an `edgequake_llm` provider.
///
/// The provider is already bound to a model when it is created, so
/// [`ExtractionRequest::model`] is informational here. The response format
/// is forwarded as `CompletionOptions::response_format`; providers without
/// a JSON mode ignore it and the response parser copes with prose.
pub struct EdgequakeVisionModel {
    provider: Arc<dyn LLMProvider>,
}

impl EdgequakeVisionModel {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl VisionModel for EdgequakeVisionModel {
    async fn complete(&self, request: &ExtractionRequest) -> Result<ModelReply, ModelError> {
        let messages: Vec<ChatMessage> = request.messages.iter().map(to_chat_message).collect();
        let options = build_options(request);

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ModelError::new(format!("{e}")))?;

        debug!(
            "{} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );

        Ok(ModelReply {
            content: response.content,
            input_tokens: response.prompt_tokens as u64,
            output_tokens: response.completion_tokens as u64,
        })
    }
}

fn to_chat_message(message: &PromptMessage) -> ChatMessage {
    match (message.role, &message.image) {
        (Role::System, _) => ChatMessage::system(message.text.as_str()),
        (Role::User, Some(image)) => ChatMessage::user_with_images(
            message.text.as_str(),
            vec![ImageData::new(image.data.clone(), image.mime_type.as_str()).with_detail("high")],
        ),
        (Role::User, None) => ChatMessage::user_with_images(message.text.as_str(), Vec::new()),
    }
}

/// Build `CompletionOptions` from the request's format and sampling settings.
fn build_options(request: &ExtractionRequest) -> CompletionOptions {
    CompletionOptions {
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        response_format: Some(request.response_format.as_str().to_string()),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::encode::encode_image;

    #[test]
    fn build_options_defaults_leave_provider_defaults() {
        let request = ExtractionRequest::new(Vec::new(), &ExtractionConfig::default());
        let opts = build_options(&request);
        assert_eq!(opts.temperature, None);
        assert_eq!(opts.max_tokens, None);
        assert_eq!(opts.response_format.as_deref(), Some("json_object"));
    }

    #[test]
    fn build_options_always_requests_json_object() {
        let config = ExtractionConfig::builder().temperature(0.3).build().unwrap();
        let opts = build_options(&ExtractionRequest::new(Vec::new(), &config));
        assert_eq!(opts.response_format.as_deref(), Some("json_object"));
        assert_eq!(ResponseFormat::default().as_str(), "json_object");
    }

    #[test]
    fn build_options_forwards_sampling_settings() {
        let config = ExtractionConfig::builder()
            .temperature(0.2)
            .max_tokens(2048)
            .build()
            .unwrap();
        let opts = build_options(&ExtractionRequest::new(Vec::new(), &config));
        assert_eq!(opts.temperature, Some(0.2));
        assert_eq!(opts.max_tokens, Some(2048));
    }

    #[test]
    fn request_asks_for_json_object_and_carries_model() {
        let config = ExtractionConfig::builder().model("gpt-4o").build().unwrap();
        let messages = vec![
            PromptMessage::system("rules"),
            PromptMessage::user_with_image("go", encode_image(b"x", "a.png")),
        ];
        let request = ExtractionRequest::new(messages.clone(), &config);
        assert_eq!(request.response_format, ResponseFormat::JsonObject);
        assert_eq!(request.model.as_deref(), Some("gpt-4o"));
        assert_eq!(request.messages, messages);
    }

    #[test]
    fn model_reply_text_has_zero_tokens() {
        let reply = ModelReply::text("{}");
        assert_eq!(reply.content, "{}");
        assert_eq!(reply.input_tokens, 0);
        assert_eq!(reply.output_tokens, 0);
    }
}
