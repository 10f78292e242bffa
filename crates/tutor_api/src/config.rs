use std::collections::BTreeMap;
use std::time::Duration;

use crate::url::DEFAULT_TUTOR_BASE_URL;

/// Buffered bytes allowed without seeing an event delimiter before the stream
/// is treated as malformed.
pub const DEFAULT_MAX_BUFFERED_EVENT_BYTES: usize = 256 * 1024;

/// Transport configuration for tutoring backend requests.
#[derive(Debug, Clone)]
pub struct TutorApiConfig {
    /// Base URL for the tutoring backend.
    pub base_url: String,
    /// Optional `User-Agent` override.
    pub user_agent: Option<String>,
    /// Additional headers merged into request headers.
    pub extra_headers: BTreeMap<String, String>,
    /// Optional request timeout for non-streaming calls.
    pub timeout: Option<Duration>,
    /// Decoder buffer bound for a single undelimited event.
    pub max_buffered_event_bytes: usize,
}

impl Default for TutorApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_TUTOR_BASE_URL.to_string(),
            user_agent: None,
            extra_headers: BTreeMap::new(),
            timeout: None,
            max_buffered_event_bytes: DEFAULT_MAX_BUFFERED_EVENT_BYTES,
        }
    }
}

impl TutorApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_buffered_event_bytes(mut self, limit: usize) -> Self {
        self.max_buffered_event_bytes = limit;
        self
    }

    pub fn insert_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(key.into(), value.into());
        self
    }

    pub fn with_headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.extra_headers.extend(headers);
        self
    }
}
