use std::collections::BTreeMap;

use crate::config::TutorApiConfig;

pub const HEADER_ACCEPT: &str = "accept";
pub const HEADER_CONTENT_TYPE: &str = "content-type";
pub const HEADER_USER_AGENT: &str = "user-agent";

pub const DEFAULT_USER_AGENT: &str = concat!("tutor-client/", env!("CARGO_PKG_VERSION"));

/// Build a deterministic header map for tutoring backend requests.
#[must_use]
pub fn build_headers(config: &TutorApiConfig, streaming: bool) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();

    let accept = if streaming {
        "text/event-stream"
    } else {
        "application/json"
    };
    headers.insert(HEADER_ACCEPT.to_owned(), accept.to_owned());
    headers.insert(
        HEADER_CONTENT_TYPE.to_owned(),
        "application/json".to_owned(),
    );

    let user_agent = config
        .user_agent
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_USER_AGENT);
    headers.insert(HEADER_USER_AGENT.to_owned(), user_agent.to_owned());

    for (key, value) in &config.extra_headers {
        headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_owned());
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streaming_requests_accept_event_streams() {
        let headers = build_headers(&TutorApiConfig::default(), true);
        assert_eq!(headers[HEADER_ACCEPT], "text/event-stream");
        assert_eq!(headers[HEADER_CONTENT_TYPE], "application/json");
        assert_eq!(headers[HEADER_USER_AGENT], DEFAULT_USER_AGENT);
    }

    #[test]
    fn extra_headers_are_normalized_and_override_defaults() {
        let config = TutorApiConfig::default()
            .with_user_agent("  custom-agent ")
            .insert_header(" X-Trace-Id ", " abc123 ");
        let headers = build_headers(&config, false);

        assert_eq!(headers[HEADER_ACCEPT], "application/json");
        assert_eq!(headers[HEADER_USER_AGENT], "custom-agent");
        assert_eq!(headers["x-trace-id"], "abc123");
    }
}
