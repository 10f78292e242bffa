use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Speaker of one persisted transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

/// Classifier label assigned to a learner turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnClassification {
    Good,
    NeedsFocusing,
}

/// Where a turn classification came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    Model,
    Heuristic,
}

/// Assistant prompt family used for a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptMode {
    Friction,
    Guidance,
}

/// Request body for the chat streaming endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatStreamRequest {
    pub session_id: String,
    pub message: String,
    /// Optional grounding context forwarded to the prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Arbitrary key-value pairs forwarded to the prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, Value>>,
    /// Request the guidance prompt for this turn (honored only if unlocked).
    #[serde(default)]
    pub use_guidance: bool,
}

impl ChatStreamRequest {
    #[must_use]
    pub fn new(session_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            message: message.into(),
            context: None,
            metadata: None,
            use_guidance: false,
        }
    }

    #[must_use]
    pub fn with_guidance(mut self, use_guidance: bool) -> Self {
        self.use_guidance = use_guidance;
        self
    }
}

/// One persisted transcript message as returned by the history endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_classification: Option<TurnClassification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification_rationale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification_source: Option<ClassificationSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatHistoryResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub messages: Vec<HistoryMessage>,
}

/// Server-side summary of one session; carries no user-chosen names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_count: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionListResponse {
    #[serde(default)]
    pub sessions: Vec<SessionSummary>,
}

/// Diagnostic guidance-unlock state for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrictionStateResponse {
    #[serde(default)]
    pub friction_attempts: u32,
    #[serde(default)]
    pub friction_threshold: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responses_needed: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_prompt: Option<PromptMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_prompt: Option<PromptMode>,
    #[serde(default)]
    pub guidance_ready: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_words: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification_label: Option<TurnClassification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification_rationale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification_source: Option<ClassificationSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification_raw: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetRequest {
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbandonRequest {
    pub session_id: String,
}
