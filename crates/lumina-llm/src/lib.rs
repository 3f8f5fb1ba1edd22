//! Chat-completion provider layer for LuminaFi
//!
//! This crate provides provider-agnostic abstractions for talking to hosted
//! Large Language Models. It includes:
//!
//! - Message types with multi-modal (text + image) content
//! - Completion request/response types
//! - Provider trait with blocking and streamed completions
//! - Server-sent event decoding for streamed responses
//! - An OpenAI-compatible provider (Together AI by default, behind a feature flag)

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;
pub mod stream;

// Re-export main types
pub use completion::{CompletionRequest, CompletionResponse, StopReason, TokenUsage};
pub use error::{LLMError, Result};
pub use messages::{ContentBlock, ImageSource, Message, MessageContent, Role};
pub use provider::LLMProvider;
pub use stream::{SseDecoder, TextStream};

// Provider implementations (feature-gated)
#[cfg(feature = "openai")]
pub mod providers;
