use serde::{Deserialize, Serialize};

/// Stream event emitted by the decoder after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatStreamEvent {
    /// Incremental assistant text.
    Token { text: String },
    /// Server-signaled stream failure; terminates the stream.
    Error { message: String },
    /// Graceful end-of-reply marker.
    End,
}

/// Terminal summary of one streaming exchange.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamOutcome {
    /// Whether the producer emitted its end-of-reply marker before closing.
    pub ended: bool,
}
