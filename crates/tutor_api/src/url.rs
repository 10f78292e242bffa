/// Default base URL for the tutoring backend during local development.
pub const DEFAULT_TUTOR_BASE_URL: &str = "http://127.0.0.1:8000";

pub const CHAT_STREAM_ROUTE: &str = "/chat/stream";
pub const CHAT_HISTORY_ROUTE: &str = "/chat/history";
pub const CHAT_SESSIONS_ROUTE: &str = "/chat/sessions";
pub const CHAT_RESET_ROUTE: &str = "/chat/reset";
pub const CHAT_ABANDON_ROUTE: &str = "/chat/abandon";
pub const FRICTION_STATE_ROUTE: &str = "/debug/friction-state";

/// Normalize a configured base URL: trim whitespace, strip any trailing
/// slash, and fall back to the local development default when empty.
pub fn normalize_base_url(input: &str) -> String {
    let base = if input.trim().is_empty() {
        DEFAULT_TUTOR_BASE_URL
    } else {
        input.trim()
    };

    base.trim_end_matches('/').to_string()
}

#[must_use]
pub fn join_route(base_url: &str, route: &str) -> String {
    format!("{}{route}", normalize_base_url(base_url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_defaults_empty_input() {
        assert_eq!(normalize_base_url(""), DEFAULT_TUTOR_BASE_URL);
        assert_eq!(normalize_base_url("   "), DEFAULT_TUTOR_BASE_URL);
    }

    #[test]
    fn normalize_strips_trailing_slashes() {
        assert_eq!(
            normalize_base_url("https://tutor.example.com/"),
            "https://tutor.example.com"
        );
        assert_eq!(
            normalize_base_url("  https://tutor.example.com//  "),
            "https://tutor.example.com"
        );
    }

    #[test]
    fn join_route_appends_route_to_normalized_base() {
        assert_eq!(
            join_route("https://tutor.example.com/", CHAT_STREAM_ROUTE),
            "https://tutor.example.com/chat/stream"
        );
        assert_eq!(
            join_route("", FRICTION_STATE_ROUTE),
            "http://127.0.0.1:8000/debug/friction-state"
        );
    }
}
