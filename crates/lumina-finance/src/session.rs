//! Per-user session state

use crate::chart::ChartArtifact;
use crate::models::MarketSnapshot;
use crate::news::NewsFeed;
use crate::workflow::Stage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn of the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Everything produced for the latest query
#[derive(Default)]
pub struct WorkflowData {
    pub symbols: Vec<String>,
    pub snapshot: Option<MarketSnapshot>,
    /// Shared with the background news task
    pub news: NewsFeed,
    pub chart: Option<ChartArtifact>,
    /// Empty when rasterization was skipped or failed
    pub chart_png: Vec<u8>,
    pub analysis: Option<String>,
}

/// State owned by one user across queries
///
/// A new query resets everything, including the chat history. The handle of
/// the background news task lives here so that a reset can abort it.
pub struct Session {
    id: Uuid,
    stage: Stage,
    messages: Vec<ChatMessage>,
    data: WorkflowData,
    news_task: Option<JoinHandle<()>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            stage: Stage::Idle,
            messages: Vec::new(),
            data: WorkflowData::default(),
            news_task: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub(crate) fn set_stage(&mut self, stage: Stage) {
        self.stage = stage;
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn push_message(&mut self, role: ChatRole, content: impl Into<String>) {
        self.messages.push(ChatMessage::new(role, content));
    }

    pub fn data(&self) -> &WorkflowData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut WorkflowData {
        &mut self.data
    }

    /// Clear chat history and workflow data and abort any news task
    ///
    /// The news feed is replaced rather than cleared so that an aborted task
    /// still holding the old feed cannot write into the new one.
    pub fn reset(&mut self) {
        self.abort_news_task();
        self.stage = Stage::Idle;
        self.messages.clear();
        self.data = WorkflowData::default();
        debug!("Session {} reset", self.id);
    }

    /// Hold `handle`, aborting any task held before
    pub fn attach_news_task(&mut self, handle: JoinHandle<()>) {
        self.abort_news_task();
        self.news_task = Some(handle);
    }

    pub fn news_task_running(&self) -> bool {
        self.news_task.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Wait for the background news task, if any
    ///
    /// Returns `false` when there was no task or it did not run to completion.
    pub async fn join_news(&mut self) -> bool {
        let Some(handle) = self.news_task.take() else {
            return false;
        };
        match handle.await {
            Ok(()) => true,
            Err(e) => {
                warn!("Background news task ended abnormally: {}", e);
                false
            }
        }
    }

    fn abort_news_task(&mut self) {
        if let Some(handle) = self.news_task.take() {
            handle.abort();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.abort_news_task();
    }
}
