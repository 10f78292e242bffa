//! Orchestration layer for the tutoring chat client.
//!
//! Ties the transport client, the local session registry, and the guidance
//! gate together behind one coordinator per screen. Rendering and layout are
//! out of scope; callers observe [`ChatApp`] state and drive the
//! [`ChatOrchestrator`] with user actions.

pub mod app;
pub mod config;
pub mod hydrate;
pub mod orchestrator;
pub mod transport;

pub use app::{welcome_message, ChatApp, Message, Phase, Role, TurnId, WELCOME_TEXT};
pub use config::{base_url_from_env, BASE_URL_ENV_VAR};
pub use hydrate::{hydrate_session, HydratedSession};
pub use orchestrator::{ChatOrchestrator, TurnOutcome};
pub use transport::ChatTransport;
