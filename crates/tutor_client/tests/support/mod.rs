#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use tempfile::TempDir;

use session_registry::SessionRegistry;
use tutor_api::client::CancellationSignal;
use tutor_api::payload::{
    ChatHistoryResponse, ChatStreamRequest, FrictionStateResponse, SessionListResponse,
};
use tutor_api::{ChatStreamEvent, StreamOutcome, TutorApiError};
use tutor_client::ChatTransport;

/// One scripted step of a streaming reply.
pub enum StreamStep {
    Token(&'static str),
    End,
    /// Flip the call's cancellation signal, as an external abort would.
    Cancel,
}

/// How a scripted stream settles after its steps ran.
pub enum StreamTerminal {
    Complete,
    ServerError(&'static str),
    DecodeFailure(&'static str),
}

pub struct StreamScript {
    pub steps: Vec<StreamStep>,
    pub terminal: StreamTerminal,
}

impl StreamScript {
    pub fn reply(tokens: &[&'static str]) -> Self {
        let mut steps: Vec<StreamStep> =
            tokens.iter().copied().map(StreamStep::Token).collect();
        steps.push(StreamStep::End);
        Self {
            steps,
            terminal: StreamTerminal::Complete,
        }
    }
}

/// Scripted outcome of a GET endpoint.
pub enum FetchScript<T> {
    Found(T),
    NotFound,
    Fails(&'static str),
}

impl<T: Clone> FetchScript<T> {
    fn resolve(&self) -> Result<Option<T>, TutorApiError> {
        match self {
            Self::Found(value) => Ok(Some(value.clone())),
            Self::NotFound => Ok(None),
            Self::Fails(message) => Err(TutorApiError::MalformedEvent((*message).to_string())),
        }
    }
}

#[derive(Default)]
struct MockState {
    streams: VecDeque<StreamScript>,
    history: HashMap<String, FetchScript<ChatHistoryResponse>>,
    friction: HashMap<String, FetchScript<FrictionStateResponse>>,
    sessions: Option<FetchScript<SessionListResponse>>,
    reset_failures: HashSet<String>,
    stream_requests: Vec<ChatStreamRequest>,
    reset_calls: Vec<String>,
    abandon_calls: Vec<String>,
}

/// Scripted in-memory backend. Endpoints default to "not found", matching a
/// server that has never seen the session. Clones share state, so a test can
/// keep a handle for inspection after moving the transport into the
/// orchestrator.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Rc<RefCell<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_stream(&self, script: StreamScript) {
        self.state.borrow_mut().streams.push_back(script);
    }

    pub fn set_history(&self, session_id: &str, script: FetchScript<ChatHistoryResponse>) {
        self.state
            .borrow_mut()
            .history
            .insert(session_id.to_string(), script);
    }

    pub fn set_friction(&self, session_id: &str, script: FetchScript<FrictionStateResponse>) {
        self.state
            .borrow_mut()
            .friction
            .insert(session_id.to_string(), script);
    }

    pub fn set_sessions(&self, script: FetchScript<SessionListResponse>) {
        self.state.borrow_mut().sessions = Some(script);
    }

    pub fn fail_reset(&self, session_id: &str) {
        self.state
            .borrow_mut()
            .reset_failures
            .insert(session_id.to_string());
    }

    pub fn stream_requests(&self) -> Vec<ChatStreamRequest> {
        self.state.borrow().stream_requests.clone()
    }

    pub fn reset_calls(&self) -> Vec<String> {
        self.state.borrow().reset_calls.clone()
    }

    pub fn abandon_calls(&self) -> Vec<String> {
        self.state.borrow().abandon_calls.clone()
    }
}

#[async_trait(?Send)]
impl ChatTransport for MockTransport {
    async fn stream_chat(
        &self,
        request: &ChatStreamRequest,
        cancellation: Option<&CancellationSignal>,
        on_event: &mut (dyn FnMut(ChatStreamEvent) + '_),
    ) -> Result<StreamOutcome, TutorApiError> {
        let script = {
            let mut state = self.state.borrow_mut();
            state.stream_requests.push(request.clone());
            state.streams.pop_front()
        };

        let Some(script) = script else {
            return Err(TutorApiError::StreamFailed {
                message: "no scripted stream".to_string(),
            });
        };

        let is_cancelled = || cancellation.is_some_and(|signal| signal.load(Ordering::Acquire));
        let mut outcome = StreamOutcome::default();

        for step in script.steps {
            if is_cancelled() {
                return Err(TutorApiError::Cancelled);
            }

            match step {
                StreamStep::Token(text) => on_event(ChatStreamEvent::Token {
                    text: text.to_string(),
                }),
                StreamStep::End => {
                    outcome.ended = true;
                    on_event(ChatStreamEvent::End);
                }
                StreamStep::Cancel => {
                    if let Some(signal) = cancellation {
                        signal.store(true, Ordering::Release);
                    }
                }
            }
        }

        if is_cancelled() {
            return Err(TutorApiError::Cancelled);
        }

        match script.terminal {
            StreamTerminal::Complete => Ok(outcome),
            StreamTerminal::ServerError(message) => Err(TutorApiError::StreamFailed {
                message: message.to_string(),
            }),
            StreamTerminal::DecodeFailure(message) => {
                Err(TutorApiError::MalformedEvent(message.to_string()))
            }
        }
    }

    async fn fetch_history(
        &self,
        session_id: &str,
    ) -> Result<Option<ChatHistoryResponse>, TutorApiError> {
        self.state
            .borrow()
            .history
            .get(session_id)
            .map_or(Ok(None), FetchScript::resolve)
    }

    async fn fetch_friction_state(
        &self,
        session_id: &str,
    ) -> Result<Option<FrictionStateResponse>, TutorApiError> {
        self.state
            .borrow()
            .friction
            .get(session_id)
            .map_or(Ok(None), FetchScript::resolve)
    }

    async fn list_sessions(&self) -> Result<Option<SessionListResponse>, TutorApiError> {
        self.state
            .borrow()
            .sessions
            .as_ref()
            .map_or(Ok(None), FetchScript::resolve)
    }

    async fn reset_session(&self, session_id: &str) -> Result<(), TutorApiError> {
        let mut state = self.state.borrow_mut();
        state.reset_calls.push(session_id.to_string());

        if state.reset_failures.contains(session_id) {
            return Err(TutorApiError::StreamFailed {
                message: "reset rejected".to_string(),
            });
        }

        Ok(())
    }

    async fn notify_abandon(&self, session_id: &str) {
        self.state
            .borrow_mut()
            .abandon_calls
            .push(session_id.to_string());
    }
}

/// Registry seeded with one session, backed by a tempdir that outlives it.
pub fn seeded_registry() -> (TempDir, SessionRegistry, String) {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut registry = SessionRegistry::open(dir.path()).expect("registry opens");
    let session = registry.create_session().expect("session creates");
    let id = session.id;
    registry
        .set_active_session(&id)
        .expect("active session persists");
    (dir, registry, id)
}

pub fn friction_state(attempts: u32, threshold: u32) -> FrictionStateResponse {
    FrictionStateResponse {
        friction_attempts: attempts,
        friction_threshold: threshold,
        responses_needed: Some(threshold.saturating_sub(attempts)),
        guidance_ready: attempts >= threshold,
        ..FrictionStateResponse::default()
    }
}
