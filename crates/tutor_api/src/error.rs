use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;

#[derive(Debug)]
pub enum TutorApiError {
    InvalidHeader(String),
    Request(reqwest::Error),
    Status(StatusCode, String),
    MalformedEvent(String),
    EventTooLarge { buffered: usize, limit: usize },
    StreamFailed { message: String },
    Cancelled,
}

/// FastAPI-style error body carried by non-2xx responses.
#[derive(Debug, Deserialize)]
pub(crate) struct DetailPayload {
    pub detail: Option<String>,
}

impl fmt::Display for TutorApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHeader(message) => write!(f, "invalid header: {message}"),
            Self::Request(error) => write!(f, "request error: {error}"),
            Self::Status(status, message) => write!(f, "HTTP {status} {message}"),
            Self::MalformedEvent(message) => write!(f, "malformed stream event: {message}"),
            Self::EventTooLarge { buffered, limit } => write!(
                f,
                "stream event exceeded buffer limit ({buffered} bytes buffered, limit {limit})"
            ),
            Self::StreamFailed { message } => write!(f, "{message}"),
            Self::Cancelled => write!(f, "request was cancelled"),
        }
    }
}

impl std::error::Error for TutorApiError {}

impl From<reqwest::Error> for TutorApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error)
    }
}

/// Extract a human-readable message from an error response body.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<DetailPayload>(body) {
        if let Some(detail) = payload.detail.filter(|value| !value.trim().is_empty()) {
            return detail;
        }
    }

    if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}
