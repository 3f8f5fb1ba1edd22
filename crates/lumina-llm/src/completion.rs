//! Chat-completion request and response types

use crate::Message;
use serde::{Deserialize, Serialize};

const DEFAULT_MAX_TOKENS: usize = 1024;

/// One chat-completion call: model, optional system prompt and the turns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub max_tokens: usize,
    /// Provider default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn builder(model: impl Into<String>) -> CompletionRequestBuilder {
        CompletionRequestBuilder {
            request: CompletionRequest {
                model: model.into(),
                messages: Vec::new(),
                system: None,
                max_tokens: DEFAULT_MAX_TOKENS,
                temperature: None,
            },
        }
    }
}

/// Builder for [`CompletionRequest`]
pub struct CompletionRequestBuilder {
    request: CompletionRequest,
}

impl CompletionRequestBuilder {
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.request.system = Some(system.into());
        self
    }

    pub fn add_message(mut self, message: Message) -> Self {
        self.request.messages.push(message);
        self
    }

    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.request.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.request.temperature = Some(temperature);
        self
    }

    pub fn build(self) -> CompletionRequest {
        self.request
    }
}

/// A finished (non-streamed) completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub message: Message,
    pub stop_reason: StopReason,
    pub usage: TokenUsage,
}

/// Why generation ended
///
/// `MaxTokens` means the reply was cut off and may be incomplete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    MaxTokens,
}

/// Token counts reported by the provider; zero when it reports none
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl TokenUsage {
    pub fn total(&self) -> usize {
        self.input_tokens + self.output_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let request = CompletionRequest::builder("meta-llama/Llama-3.2-3B-Instruct-Turbo")
            .system("You are a financial analyst")
            .add_message(Message::user("Hello"))
            .max_tokens(2000)
            .temperature(0.3)
            .build();

        assert_eq!(request.model, "meta-llama/Llama-3.2-3B-Instruct-Turbo");
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.max_tokens, 2000);
        assert_eq!(request.temperature, Some(0.3));
        assert_eq!(request.system.as_deref(), Some("You are a financial analyst"));
    }

    #[test]
    fn test_builder_defaults() {
        let request = CompletionRequest::builder("m").build();
        assert_eq!(request.max_tokens, 1024);
        assert!(request.temperature.is_none());
        assert!(request.system.is_none());
    }

    #[test]
    fn test_request_omits_unset_fields() {
        let json = serde_json::to_value(CompletionRequest::builder("m").build()).unwrap();
        assert!(json.get("system").is_none());
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn test_token_usage_total() {
        let usage = TokenUsage {
            input_tokens: 100,
            output_tokens: 50,
        };
        assert_eq!(usage.total(), 150);
    }
}
