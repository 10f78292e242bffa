mod error;
mod paths;
mod reconcile;
mod registry;
mod schema;

pub use error::SessionRegistryError;
pub use paths::{active_session_path, sessions_path, ACTIVE_SESSION_FILE, SESSIONS_FILE};
pub use reconcile::{merge_sessions, ServerSession};
pub use registry::SessionRegistry;
pub use schema::{default_display_name, SessionRecord};
