//! Scripted language model used by unit tests

use async_trait::async_trait;
use futures::stream;
use lumina_llm::{
    CompletionRequest, CompletionResponse, LLMError, LLMProvider, Message, StopReason,
    TextStream, TokenUsage,
};
use std::collections::VecDeque;
use std::sync::Mutex;

/// One canned answer
pub(crate) enum Reply {
    /// Whole-text answer
    Text(String),
    /// Transport failure before any output
    Fail(String),
    /// Streamed increments; `Err` entries become mid-stream errors
    Chunks(Vec<Result<String, String>>),
}

/// Pops one [`Reply`] per call and records every request it receives
#[derive(Default)]
pub(crate) struct ScriptedProvider {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub(crate) fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next(&self, request: CompletionRequest) -> Reply {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::Fail("no scripted reply left".to_string()))
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn complete(&self, request: CompletionRequest) -> lumina_llm::Result<CompletionResponse> {
        let text = match self.next(request) {
            Reply::Text(text) => text,
            Reply::Fail(reason) => return Err(LLMError::RequestFailed(reason)),
            Reply::Chunks(chunks) => chunks.into_iter().filter_map(Result::ok).collect(),
        };
        Ok(CompletionResponse {
            message: Message::assistant(text),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        })
    }

    async fn complete_stream(&self, request: CompletionRequest) -> lumina_llm::Result<TextStream> {
        let chunks = match self.next(request) {
            Reply::Text(text) => vec![Ok(text)],
            Reply::Fail(reason) => return Err(LLMError::RequestFailed(reason)),
            Reply::Chunks(chunks) => chunks,
        };
        let items: Vec<lumina_llm::Result<String>> = chunks
            .into_iter()
            .map(|c| c.map_err(LLMError::StreamError))
            .collect();
        Ok(Box::pin(stream::iter(items)))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
