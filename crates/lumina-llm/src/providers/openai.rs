//! OpenAI-compatible provider implementation
//!
//! This module implements the LLMProvider trait for any service that speaks
//! the OpenAI chat-completions protocol. The default endpoint is Together AI,
//! which hosts the Llama text and vision models used for analysis.
//! See: https://docs.together.ai/reference/chat-completions-1
//!
//! # Examples
//!
//! ## Basic usage with environment variable
//!
//! ```no_run
//! use lumina_llm::{CompletionRequest, Message, LLMProvider};
//! use lumina_llm::providers::OpenAIProvider;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Create provider from TOGETHER_API_KEY environment variable
//!     let provider = OpenAIProvider::from_env()?;
//!
//!     let request = CompletionRequest::builder("meta-llama/Llama-3.2-3B-Instruct-Turbo")
//!         .add_message(Message::user("Hello!"))
//!         .max_tokens(100)
//!         .build();
//!
//!     let response = provider.complete(request).await?;
//!     println!("{}", response.message.text().unwrap_or_default());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Streaming
//!
//! ```no_run
//! use futures::StreamExt;
//! use lumina_llm::{CompletionRequest, Message, LLMProvider};
//! use lumina_llm::providers::{OpenAIConfig, OpenAIProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = OpenAIProvider::with_config(
//!         OpenAIConfig::new("key").with_api_base("http://localhost:1234/v1"),
//!     )?;
//!
//!     let request = CompletionRequest::builder("local-model")
//!         .add_message(Message::user("Summarize today's market"))
//!         .build();
//!
//!     let mut stream = provider.complete_stream(request).await?;
//!     while let Some(delta) = stream.next().await {
//!         print!("{}", delta?);
//!     }
//!     Ok(())
//! }
//! ```

use crate::stream::{SseDecoder, SseEvent, TextStream};
use crate::{
    CompletionRequest, CompletionResponse, ContentBlock, ImageSource, LLMError, LLMProvider,
    Message, MessageContent, Result, Role, StopReason, TokenUsage,
};
use async_trait::async_trait;
use futures::{StreamExt, future, stream};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

const DEFAULT_API_BASE: &str = "https://api.together.xyz/v1";
const DEFAULT_PROVIDER_NAME: &str = "together";

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "TOGETHER_API_KEY";
/// Environment variable overriding the API base URL
pub const API_BASE_ENV: &str = "TOGETHER_API_BASE";

/// Configuration for an OpenAI-compatible provider
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API key for authentication
    pub api_key: String,

    /// Base URL for the API (default: "https://api.together.xyz/v1")
    pub api_base: String,
}

impl OpenAIConfig {
    /// Create a new config with the given API key and default settings
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Create config from environment variables
    ///
    /// Reads the API key from `TOGETHER_API_KEY`.
    /// Optionally reads base URL from `TOGETHER_API_BASE` if set.
    pub fn from_env() -> Result<Self> {
        let api_key = lumina_utils::require_env(API_KEY_ENV)?;
        let api_base = lumina_utils::env_or(API_BASE_ENV, DEFAULT_API_BASE);

        Ok(Self::new(api_key).with_api_base(api_base))
    }

    /// Set custom API base URL
    ///
    /// Useful for:
    /// - OpenAI: "https://api.openai.com/v1"
    /// - Local deployments: "http://localhost:1234/v1"
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

/// OpenAI-compatible provider
///
/// Works against Together AI (default), OpenAI, and local servers such as
/// LM Studio or vLLM through custom configuration.
pub struct OpenAIProvider {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIProvider {
    /// Create a new provider with custom configuration
    ///
    /// The HTTP client keeps reqwest's defaults; no request timeout is set.
    pub fn with_config(config: OpenAIConfig) -> Result<Self> {
        let client = Client::builder().build()?;

        Ok(Self { client, config })
    }

    /// Create a new provider with API key and default settings
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(OpenAIConfig::new(api_key))
    }

    /// Create a provider from environment variables
    ///
    /// See [`OpenAIConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        let config = OpenAIConfig::from_env()?;
        Self::with_config(config)
    }

    /// Get the current configuration
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    fn build_request(request: CompletionRequest, stream: bool) -> OpenAIRequest {
        OpenAIRequest {
            model: request.model,
            messages: build_openai_messages(request.system, request.messages),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream,
        }
    }

    /// Send the request and map non-success statuses to typed errors
    async fn send(&self, body: &OpenAIRequest) -> Result<Response> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.api_base))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let error_text = response.text().await?;
        Err(match status.as_u16() {
            401 => LLMError::AuthenticationFailed,
            402 | 429 => LLMError::RateLimitExceeded(error_text),
            400 => LLMError::InvalidRequest(error_text),
            404 => LLMError::ModelNotFound(body.model.clone()),
            _ => LLMError::RequestFailed(format!("HTTP {status}: {error_text}")),
        })
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    #[instrument(
        skip(self, request),
        fields(model = %request.model, api_base = %self.config.api_base)
    )]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        debug!("Sending request to {}", self.config.api_base);

        let openai_request = Self::build_request(request, false);
        let response = self.send(&openai_request).await?;

        let openai_response: OpenAIResponse = response.json().await.map_err(|e| {
            LLMError::UnexpectedResponse(format!("Failed to parse response: {e}"))
        })?;

        // Extract first choice (the API can return multiple but we use first)
        let choice = openai_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LLMError::UnexpectedResponse("No choices in response".to_string()))?;

        let usage = openai_response
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        debug!(
            "Received response - stop_reason: {:?}, tokens: {}/{}",
            choice.finish_reason, usage.input_tokens, usage.output_tokens
        );

        Ok(CompletionResponse {
            message: Message::assistant(choice.message.content.unwrap_or_default()),
            stop_reason: map_stop_reason(choice.finish_reason.as_deref()),
            usage,
        })
    }

    #[instrument(
        skip(self, request),
        fields(model = %request.model, api_base = %self.config.api_base)
    )]
    async fn complete_stream(&self, request: CompletionRequest) -> Result<TextStream> {
        debug!("Opening stream to {}", self.config.api_base);

        let openai_request = Self::build_request(request, true);
        let response = self.send(&openai_request).await?;

        let deltas = response
            .bytes_stream()
            .scan(SseDecoder::new(), |decoder, chunk| {
                if decoder.is_done() {
                    return future::ready(None);
                }
                let items: Vec<Result<String>> = match chunk {
                    Ok(bytes) => decoder
                        .push(&bytes)
                        .into_iter()
                        .filter_map(decode_stream_event)
                        .collect(),
                    Err(e) => vec![Err(LLMError::HttpError(e))],
                };
                future::ready(Some(stream::iter(items)))
            })
            .flatten();

        Ok(Box::pin(deltas))
    }

    fn name(&self) -> &str {
        DEFAULT_PROVIDER_NAME
    }
}

// ============================================================================
// OpenAI-specific request types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: OpenAIContent,
}

#[derive(Debug, Serialize, Clone)]
#[serde(untagged)]
enum OpenAIContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize, Clone)]
struct ContentPart {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<ImageUrl>,
}

#[derive(Debug, Serialize, Clone)]
struct ImageUrl {
    url: String,
}

// ============================================================================
// OpenAI-specific response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct OpenAIStreamChunk {
    #[serde(default)]
    choices: Vec<OpenAIStreamChoice>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct OpenAIStreamChoice {
    #[serde(default)]
    delta: OpenAIDelta,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAIDelta {
    #[serde(default)]
    content: Option<String>,
}

// ============================================================================
// Conversion functions
// ============================================================================

/// Build OpenAI messages from our generic format
///
/// System prompt goes first in the messages array.
fn build_openai_messages(system: Option<String>, messages: Vec<Message>) -> Vec<OpenAIMessage> {
    let mut result = Vec::with_capacity(messages.len() + 1);

    if let Some(sys) = system {
        result.push(OpenAIMessage {
            role: "system".to_string(),
            content: OpenAIContent::Text(sys),
        });
    }

    result.extend(messages.into_iter().map(convert_message));
    result
}

/// Convert a single message to OpenAI format
fn convert_message(msg: Message) -> OpenAIMessage {
    let role = match msg.role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
    };

    let content = match msg.content {
        Some(MessageContent::Text(text)) => OpenAIContent::Text(text),
        Some(MessageContent::Blocks(blocks)) => convert_blocks(blocks),
        None => OpenAIContent::Text(String::new()),
    };

    OpenAIMessage {
        role: role.to_string(),
        content,
    }
}

/// Convert content blocks to OpenAI content
fn convert_blocks(blocks: Vec<ContentBlock>) -> OpenAIContent {
    let mut parts: Vec<ContentPart> = blocks
        .into_iter()
        .map(|block| match block {
            ContentBlock::Text { text } => ContentPart {
                content_type: "text".to_string(),
                text: Some(text),
                image_url: None,
            },
            ContentBlock::Image { source } => {
                let url = match source {
                    ImageSource::Url { url } => url,
                    ImageSource::Base64 { media_type, data } => {
                        format!("data:{media_type};base64,{data}")
                    }
                };
                ContentPart {
                    content_type: "image_url".to_string(),
                    text: None,
                    image_url: Some(ImageUrl { url }),
                }
            }
        })
        .collect();

    // Single text part - use simple string format
    if parts.len() == 1 && parts[0].content_type == "text" {
        if let Some(text) = parts[0].text.take() {
            return OpenAIContent::Text(text);
        }
    }
    OpenAIContent::Parts(parts)
}

/// Turn one decoded SSE event into a text increment
///
/// Empty deltas (role announcements, keep-alives) produce nothing.
fn decode_stream_event(event: SseEvent) -> Option<Result<String>> {
    let SseEvent::Data(payload) = event else {
        return None;
    };

    let chunk: OpenAIStreamChunk = match serde_json::from_str(&payload) {
        Ok(chunk) => chunk,
        Err(e) => {
            warn!("Skipping malformed stream frame: {e}");
            return None;
        }
    };

    if let Some(error) = chunk.error {
        return Some(Err(LLMError::StreamError(error.to_string())));
    }

    chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .filter(|s| !s.is_empty())
        .map(Ok)
}

/// Map OpenAI stop reason to our format
fn map_stop_reason(reason: Option<&str>) -> StopReason {
    match reason {
        Some("stop" | "eos") | None => StopReason::EndTurn,
        Some("length") => StopReason::MaxTokens,
        Some(other) => {
            debug!("Unknown stop reason: {}", other);
            StopReason::EndTurn
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_creation() {
        let provider = OpenAIProvider::new("test-key");
        assert!(provider.is_ok());
        let provider = provider.unwrap();
        assert_eq!(provider.name(), "together");
        assert_eq!(provider.config().api_key, "test-key");
        assert_eq!(provider.config().api_base, "https://api.together.xyz/v1");
    }

    #[test]
    fn test_provider_with_custom_api_base() {
        let config = OpenAIConfig::new("test-key").with_api_base("http://localhost:1234/v1/");

        let provider = OpenAIProvider::with_config(config).unwrap();
        assert_eq!(provider.config().api_base, "http://localhost:1234/v1");
    }

    #[test]
    fn test_config_from_env() {
        unsafe {
            std::env::set_var(API_KEY_ENV, "test-key-from-env");
            std::env::set_var(API_BASE_ENV, "https://custom.example.com/v1");
        }

        let config = OpenAIConfig::from_env().unwrap();
        assert_eq!(config.api_key, "test-key-from-env");
        assert_eq!(config.api_base, "https://custom.example.com/v1");

        unsafe {
            std::env::remove_var(API_KEY_ENV);
            std::env::remove_var(API_BASE_ENV);
        }

        let result = OpenAIProvider::from_env();
        assert!(matches!(result, Err(LLMError::ConfigurationError(_))));
    }

    #[test]
    fn test_system_message_in_array() {
        let messages =
            build_openai_messages(Some("You are helpful".to_string()), vec![Message::user("Hi")]);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
        match &messages[0].content {
            OpenAIContent::Text(text) => assert_eq!(text, "You are helpful"),
            OpenAIContent::Parts(_) => panic!("Expected text content"),
        }
    }

    #[test]
    fn test_base64_image_conversion() {
        let msg = Message::user_with_image("What's this?", "image/png", "abc123");
        let converted = convert_message(msg);

        match &converted.content {
            OpenAIContent::Parts(parts) => {
                assert_eq!(parts.len(), 2);
                assert_eq!(parts[0].content_type, "text");
                assert_eq!(parts[1].content_type, "image_url");
                assert_eq!(
                    parts[1].image_url.as_ref().unwrap().url,
                    "data:image/png;base64,abc123"
                );
            }
            OpenAIContent::Text(_) => panic!("Expected multi-part content"),
        }
    }

    #[test]
    fn test_single_text_block_collapses() {
        let msg = Message {
            role: Role::User,
            content: Some(MessageContent::Blocks(vec![ContentBlock::Text {
                text: "only text".to_string(),
            }])),
        };
        match convert_message(msg).content {
            OpenAIContent::Text(text) => assert_eq!(text, "only text"),
            OpenAIContent::Parts(_) => panic!("Expected text content"),
        }
    }

    #[test]
    fn test_stream_flag_serialization() {
        let request = CompletionRequest::builder("m")
            .add_message(Message::user("x"))
            .build();
        let blocking = serde_json::to_value(OpenAIProvider::build_request(request.clone(), false))
            .unwrap();
        assert!(blocking.get("stream").is_none());

        let streaming = serde_json::to_value(OpenAIProvider::build_request(request, true)).unwrap();
        assert_eq!(streaming["stream"], true);
    }

    #[test]
    fn test_decode_stream_event() {
        let delta = decode_stream_event(SseEvent::Data(
            r#"{"choices":[{"delta":{"content":"Hello"}}]}"#.to_string(),
        ));
        assert_eq!(delta.unwrap().unwrap(), "Hello");

        let role_only = decode_stream_event(SseEvent::Data(
            r#"{"choices":[{"delta":{"role":"assistant"}}]}"#.to_string(),
        ));
        assert!(role_only.is_none());

        assert!(decode_stream_event(SseEvent::Data("not json".to_string())).is_none());
        assert!(decode_stream_event(SseEvent::Done).is_none());

        let error = decode_stream_event(SseEvent::Data(
            r#"{"error":{"message":"overloaded"}}"#.to_string(),
        ));
        assert!(matches!(error, Some(Err(LLMError::StreamError(_)))));
    }

    #[test]
    fn test_response_parsing_is_lenient() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"ok"}}]}"#;
        let parsed: OpenAIResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.usage.is_none());
        assert!(parsed.choices[0].finish_reason.is_none());
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("ok"));
    }

    #[test]
    fn test_stop_reason_mapping() {
        assert_eq!(map_stop_reason(Some("stop")), StopReason::EndTurn);
        assert_eq!(map_stop_reason(Some("eos")), StopReason::EndTurn);
        assert_eq!(map_stop_reason(Some("length")), StopReason::MaxTokens);
        assert_eq!(map_stop_reason(None), StopReason::EndTurn);
        assert_eq!(map_stop_reason(Some("unknown")), StopReason::EndTurn);
    }
}
