use std::path::{Path, PathBuf};

pub const SESSIONS_FILE: &str = "sessions.json";
pub const ACTIVE_SESSION_FILE: &str = "active_session.json";

#[must_use]
pub fn sessions_path(root: &Path) -> PathBuf {
    root.join(SESSIONS_FILE)
}

#[must_use]
pub fn active_session_path(root: &Path) -> PathBuf {
    root.join(ACTIVE_SESSION_FILE)
}
