use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tutor_api::payload::{ClassificationSource, TurnClassification};
use uuid::Uuid;

pub type TurnId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Sending { turn_id: TurnId },
    Streaming { turn_id: TurnId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub text: String,
    pub created_at: String,
    pub streaming: bool,
    pub turn_id: Option<TurnId>,
    pub turn_classification: Option<TurnClassification>,
    pub classification_rationale: Option<String>,
    pub classification_source: Option<ClassificationSource>,
}

impl Message {
    fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            text: text.into(),
            created_at: now_rfc3339(),
            streaming: false,
            turn_id: None,
            turn_classification: None,
            classification_rationale: None,
            classification_source: None,
        }
    }

    #[must_use]
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }

    #[must_use]
    pub fn user(text: impl Into<String>, turn_id: TurnId) -> Self {
        let mut message = Self::new(Role::User, text);
        message.turn_id = Some(turn_id);
        message
    }

    /// A settled transcript entry, e.g. rebuilt from server history.
    #[must_use]
    pub fn settled(role: Role, text: impl Into<String>) -> Self {
        Self::new(role, text)
    }

    #[must_use]
    pub fn assistant_in_progress(turn_id: TurnId) -> Self {
        let mut message = Self::new(Role::Assistant, String::new());
        message.streaming = true;
        message.turn_id = Some(turn_id);
        message
    }
}

pub const WELCOME_TEXT: &str = "Hi, I'm your learning coach. Bring me the problem you're \
working on and we'll reason through it together. I'll start with hints and questions rather \
than answers.";

/// Synthetic greeting shown at the top of every fresh transcript. Lives only
/// on the client and is never sent to the server.
#[must_use]
pub fn welcome_message() -> Message {
    Message::system(WELCOME_TEXT)
}

/// Transcript state machine for the active session.
///
/// Handlers are keyed by turn id; events for a turn that is no longer active
/// (aborted, failed, or superseded) are ignored rather than reported, which
/// keeps late stream callbacks harmless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatApp {
    pub phase: Phase,
    pub transcript: Vec<Message>,
    hydrating: bool,
    awaiting_refresh: bool,
    advisory: Option<String>,
}

impl Default for ChatApp {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatApp {
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            transcript: vec![welcome_message()],
            hydrating: false,
            awaiting_refresh: false,
            advisory: None,
        }
    }

    /// A new turn may start only while idle and not waiting on hydration or
    /// the post-turn refresh.
    #[must_use]
    pub fn can_send(&self) -> bool {
        matches!(self.phase, Phase::Idle) && !self.hydrating && !self.awaiting_refresh
    }

    #[must_use]
    pub fn active_turn(&self) -> Option<TurnId> {
        match self.phase {
            Phase::Idle => None,
            Phase::Sending { turn_id } | Phase::Streaming { turn_id } => Some(turn_id),
        }
    }

    /// Optimistic transcript update before any network activity: the user
    /// message and an empty in-progress assistant message appear immediately.
    pub fn begin_turn(&mut self, turn_id: TurnId, text: &str) {
        self.transcript.push(Message::user(text, turn_id));
        self.transcript.push(Message::assistant_in_progress(turn_id));
        self.phase = Phase::Sending { turn_id };
    }

    /// Append one token to the in-progress assistant message, in arrival
    /// order. The first token advances `Sending` to `Streaming`.
    pub fn on_stream_token(&mut self, turn_id: TurnId, token: &str) {
        if self.active_turn() != Some(turn_id) {
            return;
        }

        if matches!(self.phase, Phase::Sending { .. }) {
            self.phase = Phase::Streaming { turn_id };
        }

        if let Some(message) = self.assistant_mut(turn_id) {
            message.text.push_str(token);
        }
    }

    /// End-of-reply marker; no transcript mutation.
    pub fn on_stream_end(&mut self, _turn_id: TurnId) {}

    /// Stream closed without an error: clear the in-progress flag.
    pub fn complete_turn(&mut self, turn_id: TurnId) {
        if self.active_turn() != Some(turn_id) {
            return;
        }

        if let Some(message) = self.assistant_mut(turn_id) {
            message.streaming = false;
        }
        self.phase = Phase::Idle;
    }

    /// Transport, decode, or server-signaled failure. The error indicator
    /// replaces an empty in-progress message and is appended after any tokens
    /// that already arrived.
    pub fn fail_turn(&mut self, turn_id: TurnId, error: &str) {
        if self.active_turn() != Some(turn_id) {
            return;
        }

        if let Some(message) = self.assistant_mut(turn_id) {
            if message.text.is_empty() {
                message.text = format!("Error: {error}");
            } else {
                message.text.push_str("\n\nError: ");
                message.text.push_str(error);
            }
            message.streaming = false;
        }
        self.phase = Phase::Idle;
    }

    /// Explicit cancellation: freeze the transcript at the abort point.
    pub fn abort_turn(&mut self, turn_id: TurnId) {
        if self.active_turn() != Some(turn_id) {
            return;
        }

        if let Some(message) = self.assistant_mut(turn_id) {
            message.streaming = false;
        }
        self.phase = Phase::Idle;
    }

    pub fn set_hydrating(&mut self, hydrating: bool) {
        self.hydrating = hydrating;
    }

    #[must_use]
    pub fn hydrating(&self) -> bool {
        self.hydrating
    }

    pub fn set_awaiting_refresh(&mut self, awaiting: bool) {
        self.awaiting_refresh = awaiting;
    }

    #[must_use]
    pub fn awaiting_refresh(&self) -> bool {
        self.awaiting_refresh
    }

    /// Replace the transcript with a hydrated one (welcome message first).
    pub fn replace_transcript(&mut self, messages: Vec<Message>) {
        self.transcript = messages;
        self.phase = Phase::Idle;
    }

    pub fn reset_to_welcome(&mut self) {
        self.transcript = vec![welcome_message()];
        self.phase = Phase::Idle;
    }

    /// Non-fatal advisory shown as a banner, e.g. a failed session-list sync.
    pub fn set_advisory(&mut self, text: impl Into<String>) {
        self.advisory = Some(text.into());
    }

    #[must_use]
    pub fn advisory(&self) -> Option<&str> {
        self.advisory.as_deref()
    }

    pub fn take_advisory(&mut self) -> Option<String> {
        self.advisory.take()
    }

    /// User+assistant turns currently in the transcript; excludes the
    /// synthetic welcome and any other system messages.
    #[must_use]
    pub fn turn_count(&self) -> u32 {
        self.transcript
            .iter()
            .filter(|message| matches!(message.role, Role::User | Role::Assistant))
            .count() as u32
    }

    fn assistant_mut(&mut self, turn_id: TurnId) -> Option<&mut Message> {
        self.transcript
            .iter_mut()
            .rev()
            .find(|message| message.role == Role::Assistant && message.turn_id == Some(turn_id))
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assistant_text(app: &ChatApp, turn_id: TurnId) -> String {
        app.transcript
            .iter()
            .find(|message| message.role == Role::Assistant && message.turn_id == Some(turn_id))
            .map(|message| message.text.clone())
            .expect("assistant message exists")
    }

    #[test]
    fn fresh_transcript_starts_with_welcome_only() {
        let app = ChatApp::new();
        assert_eq!(app.transcript.len(), 1);
        assert_eq!(app.transcript[0].role, Role::System);
        assert_eq!(app.transcript[0].text, WELCOME_TEXT);
        assert!(app.can_send());
    }

    #[test]
    fn begin_turn_appends_user_and_in_progress_assistant() {
        let mut app = ChatApp::new();
        app.begin_turn(1, "why is the sky blue?");

        assert_eq!(app.transcript.len(), 3);
        assert_eq!(app.transcript[1].role, Role::User);
        assert_eq!(app.transcript[1].text, "why is the sky blue?");
        assert_eq!(app.transcript[2].role, Role::Assistant);
        assert!(app.transcript[2].streaming);
        assert!(!app.can_send());
    }

    #[test]
    fn tokens_accumulate_in_arrival_order() {
        let mut app = ChatApp::new();
        app.begin_turn(1, "hi");
        app.on_stream_token(1, "Let's ");
        assert_eq!(app.phase, Phase::Streaming { turn_id: 1 });
        app.on_stream_token(1, "think");
        app.on_stream_token(1, " first.");

        assert_eq!(assistant_text(&app, 1), "Let's think first.");
    }

    #[test]
    fn stale_turn_events_are_ignored() {
        let mut app = ChatApp::new();
        app.begin_turn(1, "hi");
        app.on_stream_token(1, "kept");
        app.abort_turn(1);

        app.on_stream_token(1, " dropped");
        app.complete_turn(1);
        app.fail_turn(1, "late failure");

        assert_eq!(assistant_text(&app, 1), "kept");
        assert_eq!(app.phase, Phase::Idle);
    }

    #[test]
    fn complete_turn_clears_streaming_flag() {
        let mut app = ChatApp::new();
        app.begin_turn(4, "hi");
        app.on_stream_token(4, "done");
        app.complete_turn(4);

        let message = app
            .transcript
            .iter()
            .find(|message| message.turn_id == Some(4) && message.role == Role::Assistant)
            .expect("assistant message exists");
        assert!(!message.streaming);
        assert!(app.can_send());
    }

    #[test]
    fn fail_turn_replaces_empty_message_and_appends_otherwise() {
        let mut app = ChatApp::new();
        app.begin_turn(1, "hi");
        app.fail_turn(1, "connection refused");
        assert_eq!(assistant_text(&app, 1), "Error: connection refused");

        app.begin_turn(2, "again");
        app.on_stream_token(2, "partial reply");
        app.fail_turn(2, "stream cut off");
        assert_eq!(
            assistant_text(&app, 2),
            "partial reply\n\nError: stream cut off"
        );
    }

    #[test]
    fn next_turn_after_abort_gets_a_fresh_in_progress_message() {
        let mut app = ChatApp::new();
        app.begin_turn(1, "first");
        app.on_stream_token(1, "partial");
        app.abort_turn(1);

        app.begin_turn(2, "second");
        app.on_stream_token(2, "fresh");

        assert_eq!(assistant_text(&app, 1), "partial");
        assert_eq!(assistant_text(&app, 2), "fresh");
    }

    #[test]
    fn hydration_and_refresh_block_sending() {
        let mut app = ChatApp::new();
        app.set_hydrating(true);
        assert!(!app.can_send());
        app.set_hydrating(false);

        app.set_awaiting_refresh(true);
        assert!(!app.can_send());
        app.set_awaiting_refresh(false);
        assert!(app.can_send());
    }

    #[test]
    fn advisory_is_taken_once() {
        let mut app = ChatApp::new();
        app.set_advisory("sync failed");
        assert_eq!(app.advisory(), Some("sync failed"));
        assert_eq!(app.take_advisory().as_deref(), Some("sync failed"));
        assert_eq!(app.take_advisory(), None);
    }

    #[test]
    fn turn_count_excludes_system_messages() {
        let mut app = ChatApp::new();
        assert_eq!(app.turn_count(), 0);

        app.begin_turn(1, "hi");
        app.on_stream_token(1, "hello");
        app.complete_turn(1);

        assert_eq!(app.turn_count(), 2);
    }
}
