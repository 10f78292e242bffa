//! Transport-only client primitives for the tutoring backend.
//!
//! This crate owns request building, response decoding, and the incremental
//! event-stream parser for the chat endpoints. It intentionally contains no
//! session bookkeeping, no transcript state, and no UI coupling.

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod headers;
pub mod payload;
pub mod sse;
pub mod url;

pub use client::{CancellationSignal, StreamResult, TutorApiClient};
pub use config::TutorApiConfig;
pub use error::TutorApiError;
pub use events::{ChatStreamEvent, StreamOutcome};
pub use payload::{
    ChatHistoryResponse, ChatRole, ChatStreamRequest, ClassificationSource, FrictionStateResponse,
    HistoryMessage, PromptMode, SessionListResponse, SessionSummary, TurnClassification,
};
pub use sse::EventStreamParser;
pub use url::normalize_base_url;
