use serde::{Deserialize, Serialize};

/// One locally known conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    /// User-editable label; a positional default is synthesized when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub created_at: String,
    /// RFC3339; drives most-recent-first ordering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// User+assistant turns only; system/welcome messages are excluded.
    #[serde(default)]
    pub message_count: u32,
}

impl SessionRecord {
    #[must_use]
    pub fn new(id: impl Into<String>, created_at: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            created_at: created_at.into(),
            updated_at: None,
            message_count: 0,
        }
    }
}

/// Positional fallback label for a session without a user-chosen name.
#[must_use]
pub fn default_display_name(position: usize) -> String {
    format!("Chat {position}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SessionListFile {
    pub version: u32,
    #[serde(default)]
    pub sessions: Vec<SessionRecord>,
}

impl SessionListFile {
    #[must_use]
    pub fn v1(sessions: Vec<SessionRecord>) -> Self {
        Self {
            version: 1,
            sessions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ActiveSessionFile {
    pub version: u32,
    pub session_id: String,
}

impl ActiveSessionFile {
    #[must_use]
    pub fn v1(session_id: impl Into<String>) -> Self {
        Self {
            version: 1,
            session_id: session_id.into(),
        }
    }
}
