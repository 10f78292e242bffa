use tutor_api::url::DEFAULT_TUTOR_BASE_URL;

pub const BASE_URL_ENV_VAR: &str = "TUTOR_CLIENT_BASE_URL";

/// Resolve the backend base URL, preferring the environment override.
#[must_use]
pub fn base_url_from_env() -> String {
    sanitize_base_url(std::env::var(BASE_URL_ENV_VAR).ok())
}

fn sanitize_base_url(raw: Option<String>) -> String {
    let Some(value) = raw else {
        return DEFAULT_TUTOR_BASE_URL.to_string();
    };

    let trimmed = value.trim();
    if trimmed.is_empty() {
        DEFAULT_TUTOR_BASE_URL.to_string()
    } else {
        trimmed.to_string()
    }
}
