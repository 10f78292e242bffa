use tutor_api::payload::{ChatRole, FrictionStateResponse, HistoryMessage};
use tutor_api::TutorApiError;

use crate::app::{welcome_message, Message, Role};
use crate::transport::ChatTransport;

/// Display-ready view of one session assembled from server state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HydratedSession {
    /// Welcome message first, then any real history.
    pub messages: Vec<Message>,
    /// Diagnostic unlock state; `None` for a session the server has not seen.
    pub friction: Option<FrictionStateResponse>,
    /// User+assistant turns only.
    pub message_count: u32,
}

/// Fetch transcript history and diagnostic state concurrently and assemble
/// the display transcript.
///
/// "Session not found" on either fetch resolves to the empty default; a
/// freshly created, not-yet-populated session is a normal state. Any other
/// failure aborts hydration.
pub async fn hydrate_session<T: ChatTransport>(
    transport: &T,
    session_id: &str,
) -> Result<HydratedSession, TutorApiError> {
    let (history, friction) = tokio::join!(
        transport.fetch_history(session_id),
        transport.fetch_friction_state(session_id),
    );
    let history = history?;
    let friction = friction?;

    let mut messages = vec![welcome_message()];
    let mut message_count = 0_u32;

    if let Some(history) = history {
        for entry in &history.messages {
            messages.push(display_message(entry));
            message_count += 1;
        }
    }

    Ok(HydratedSession {
        messages,
        friction,
        message_count,
    })
}

fn display_message(entry: &HistoryMessage) -> Message {
    let role = match entry.role {
        ChatRole::User => Role::User,
        ChatRole::Assistant => Role::Assistant,
    };

    let mut message = Message::settled(role, entry.content.clone());
    if let Some(created_at) = &entry.created_at {
        message.created_at = created_at.clone();
    }
    message.turn_classification = entry.turn_classification;
    message.classification_rationale = entry.classification_rationale.clone();
    message.classification_source = entry.classification_source;
    message
}
