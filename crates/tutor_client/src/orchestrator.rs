use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use guidance_state::{GuidanceGate, TurnProgress};
use session_registry::{ServerSession, SessionRegistry, SessionRegistryError};
use tutor_api::client::CancellationSignal;
use tutor_api::payload::ChatStreamRequest;
use tutor_api::{ChatStreamEvent, TutorApiError};

use crate::app::{ChatApp, TurnId};
use crate::hydrate::hydrate_session;
use crate::transport::ChatTransport;

/// Upper bound on the fire-and-forget abandon notification so teardown never
/// blocks on a slow server.
const ABANDON_NOTIFY_TIMEOUT: Duration = Duration::from_millis(500);

const SYNC_ADVISORY: &str = "Could not refresh the session list; showing cached sessions.";

/// Terminal state of one send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed,
    Failed,
    Aborted,
    Rejected,
}

/// Top-level coordinator for the chat screens.
///
/// Owns the active session id, the guidance gate, and the in-flight turn's
/// cancellation handle; no other component mutates them. All failures are
/// converted to in-transcript or banner-level feedback here, so callers drive
/// the orchestrator with plain outcomes rather than error plumbing.
pub struct ChatOrchestrator<T: ChatTransport> {
    transport: T,
    registry: SessionRegistry,
    app: ChatApp,
    gate: GuidanceGate,
    active_session_id: String,
    active_cancellation: Option<CancellationSignal>,
    next_turn_id: TurnId,
}

impl<T: ChatTransport> ChatOrchestrator<T> {
    /// Resume the persisted active session (creating one when the registry is
    /// empty), hydrate it, and reconcile the session list.
    pub async fn initialize(
        transport: T,
        mut registry: SessionRegistry,
    ) -> Result<Self, SessionRegistryError> {
        let active = match registry.active_session_id() {
            Some(id) => id.to_string(),
            None => match registry.sessions().first() {
                Some(record) => record.id.clone(),
                None => registry.create_session()?.id,
            },
        };
        registry.set_active_session(&active)?;

        let mut orchestrator = Self {
            transport,
            registry,
            app: ChatApp::new(),
            gate: GuidanceGate::new(),
            active_session_id: active,
            active_cancellation: None,
            next_turn_id: 0,
        };
        orchestrator.hydrate_active(false).await;
        orchestrator.reconcile_sessions().await;
        Ok(orchestrator)
    }

    #[must_use]
    pub fn app(&self) -> &ChatApp {
        &self.app
    }

    #[must_use]
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    #[must_use]
    pub fn active_session_id(&self) -> &str {
        &self.active_session_id
    }

    pub fn take_advisory(&mut self) -> Option<String> {
        self.app.take_advisory()
    }

    #[must_use]
    pub fn guidance_progress(&self) -> TurnProgress {
        self.gate.progress()
    }

    #[must_use]
    pub fn guidance_ready(&self) -> bool {
        self.gate.ready()
    }

    #[must_use]
    pub fn guidance_toggle(&self) -> bool {
        self.gate.toggle()
    }

    /// Arm or clear the one-shot guidance toggle; rejected while locked.
    pub fn set_guidance_toggle(&mut self, enabled: bool) -> bool {
        self.gate.set_toggle(enabled)
    }

    /// One-shot flag for presenting the unlock notice.
    pub fn take_unlock_notice(&mut self) -> bool {
        self.gate.take_unlock_notice()
    }

    /// Send one user turn on the active session and drive the reply stream to
    /// completion. Rejected while a turn is in flight or a refresh is pending.
    pub async fn send_message(&mut self, text: &str) -> TurnOutcome {
        let message = text.trim().to_string();
        if message.is_empty() || !self.app.can_send() {
            return TurnOutcome::Rejected;
        }

        let use_guidance = self.gate.consume_for_send();
        self.next_turn_id += 1;
        let turn_id = self.next_turn_id;
        self.app.begin_turn(turn_id, &message);

        let cancellation: CancellationSignal = Arc::new(AtomicBool::new(false));
        self.active_cancellation = Some(Arc::clone(&cancellation));

        let request = ChatStreamRequest::new(self.active_session_id.clone(), message)
            .with_guidance(use_guidance);

        let result = {
            let app = &mut self.app;
            self.transport
                .stream_chat(&request, Some(&cancellation), &mut |event| match event {
                    ChatStreamEvent::Token { text } => app.on_stream_token(turn_id, &text),
                    ChatStreamEvent::End => app.on_stream_end(turn_id),
                    // Error events surface through the stream result.
                    ChatStreamEvent::Error { .. } => {}
                })
                .await
        };

        self.active_cancellation = None;
        // The toggle is use-once regardless of how the send settled.
        self.gate.finish_send();

        match result {
            Ok(_) => {
                self.app.complete_turn(turn_id);
                if let Err(error) = self
                    .registry
                    .record_turn(&self.active_session_id, self.app.turn_count())
                {
                    log::warn!(
                        "failed to record turn for session {}: {error}",
                        self.active_session_id
                    );
                }
                self.refresh_after_turn().await;
                TurnOutcome::Completed
            }
            Err(TutorApiError::Cancelled) => {
                self.app.abort_turn(turn_id);
                TurnOutcome::Aborted
            }
            Err(error) => {
                let message = match &error {
                    TutorApiError::StreamFailed { message } => message.clone(),
                    other => other.to_string(),
                };
                self.app.fail_turn(turn_id, &message);
                TurnOutcome::Failed
            }
        }
    }

    /// Switch the active session; always allowed and implicitly aborts any
    /// in-flight exchange for the session being left.
    pub async fn switch_session(&mut self, session_id: &str) -> bool {
        if session_id == self.active_session_id {
            return true;
        }

        self.abort_active_turn();

        if let Err(error) = self.registry.set_active_session(session_id) {
            log::warn!("cannot switch to session {session_id}: {error}");
            self.app
                .set_advisory(format!("Could not switch sessions: {error}"));
            return false;
        }

        self.active_session_id = session_id.to_string();
        self.gate.reset();
        self.app.reset_to_welcome();
        self.hydrate_active(false).await;
        true
    }

    /// Create a fresh session and make it active.
    pub async fn new_session(&mut self) -> Option<String> {
        self.abort_active_turn();

        let record = match self.registry.create_session() {
            Ok(record) => record,
            Err(error) => {
                log::warn!("failed to create session: {error}");
                self.app
                    .set_advisory(format!("Could not create a session: {error}"));
                return None;
            }
        };

        if let Err(error) = self.registry.set_active_session(&record.id) {
            log::warn!("failed to activate session {}: {error}", record.id);
            self.app
                .set_advisory(format!("Could not switch sessions: {error}"));
            return None;
        }

        self.active_session_id = record.id.clone();
        self.gate.reset();
        self.app.reset_to_welcome();
        self.hydrate_active(false).await;
        Some(record.id)
    }

    pub fn rename_session(&mut self, session_id: &str, name: &str) -> bool {
        match self.registry.rename_session(session_id, name) {
            Ok(()) => true,
            Err(error) => {
                log::warn!("failed to rename session {session_id}: {error}");
                self.app
                    .set_advisory(format!("Could not rename the session: {error}"));
                false
            }
        }
    }

    /// Delete a session server-side first, then locally. A failed server call
    /// leaves the cache untouched so client and server stay consistent.
    pub async fn delete_session(&mut self, session_id: &str) -> bool {
        if let Err(error) = self.transport.reset_session(session_id).await {
            log::warn!("server reset failed for session {session_id}: {error}");
            self.app
                .set_advisory(format!("Could not delete the session: {error}"));
            return false;
        }

        if let Err(error) = self.registry.remove_session(session_id) {
            log::warn!("failed to drop cached session {session_id}: {error}");
            self.app
                .set_advisory(format!("Could not delete the session: {error}"));
            return false;
        }

        if session_id == self.active_session_id {
            let next = self
                .registry
                .sessions()
                .first()
                .map(|record| record.id.clone());
            match next {
                Some(next) => {
                    self.active_session_id.clear();
                    self.switch_session(&next).await;
                }
                None => {
                    self.new_session().await;
                }
            }
        }

        true
    }

    /// Merge the server's session list into the cache. Failures are
    /// non-fatal: the cache is left untouched and the same action retries.
    pub async fn reconcile_sessions(&mut self) {
        match self.transport.list_sessions().await {
            Ok(Some(list)) => {
                let server: Vec<ServerSession> = list
                    .sessions
                    .into_iter()
                    .map(|summary| ServerSession {
                        id: summary.session_id,
                        updated_at: summary.updated_at,
                        message_count: summary.message_count,
                    })
                    .collect();

                if let Err(error) = self.registry.apply_server_sessions(&server) {
                    log::warn!("session reconciliation failed to persist: {error}");
                    self.app.set_advisory(SYNC_ADVISORY);
                }
            }
            // No server sessions; cache-only operation continues.
            Ok(None) => {}
            Err(error) => {
                log::warn!("session list fetch failed: {error}");
                self.app.set_advisory(SYNC_ADVISORY);
            }
        }
    }

    /// Clone of the in-flight turn's cancellation handle, if any.
    #[must_use]
    pub fn abort_handle(&self) -> Option<CancellationSignal> {
        self.active_cancellation.clone()
    }

    /// Cancel the in-flight exchange, if any. Idempotent; no transcript
    /// mutation occurs after the abort point.
    pub fn abort_active_turn(&mut self) {
        if let Some(cancellation) = &self.active_cancellation {
            cancellation.store(true, Ordering::Release);
        }
        if let Some(turn_id) = self.app.active_turn() {
            self.app.abort_turn(turn_id);
        }
    }

    /// Component teardown: cancel in-flight work and fire the best-effort
    /// abandon notification without blocking.
    pub async fn teardown(&mut self) {
        self.abort_active_turn();
        let _ = tokio::time::timeout(
            ABANDON_NOTIFY_TIMEOUT,
            self.transport.notify_abandon(&self.active_session_id),
        )
        .await;
    }

    async fn hydrate_active(&mut self, keep_local_when_empty: bool) {
        self.app.set_hydrating(true);

        match hydrate_session(&self.transport, &self.active_session_id).await {
            Ok(hydrated) => {
                match &hydrated.friction {
                    Some(state) => {
                        self.gate
                            .apply_progress(state.friction_attempts, state.friction_threshold);
                    }
                    None => self.gate.reset(),
                }

                // After a completed turn the server may not have persisted the
                // exchange yet; an empty hydration must not wipe the reply the
                // user just watched stream in.
                if !(keep_local_when_empty && hydrated.message_count == 0) {
                    let count = hydrated.message_count;
                    self.app.replace_transcript(hydrated.messages);

                    if let Err(error) = self
                        .registry
                        .set_message_count(&self.active_session_id, count)
                    {
                        log::warn!(
                            "failed to persist message count for session {}: {error}",
                            self.active_session_id
                        );
                    }
                }
            }
            Err(error) => {
                log::warn!(
                    "hydration failed for session {}: {error}",
                    self.active_session_id
                );
                self.app.reset_to_welcome();
                self.gate.reset();
                self.app
                    .set_advisory(format!("Could not load this chat: {error}"));
            }
        }

        self.app.set_hydrating(false);
    }

    /// Post-turn refresh: capture server-computed classification fields, then
    /// reconcile the session list.
    async fn refresh_after_turn(&mut self) {
        self.app.set_awaiting_refresh(true);
        self.hydrate_active(true).await;
        self.reconcile_sessions().await;
        self.app.set_awaiting_refresh(false);
    }
}
