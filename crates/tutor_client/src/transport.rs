use async_trait::async_trait;

use tutor_api::client::CancellationSignal;
use tutor_api::payload::{
    ChatHistoryResponse, ChatStreamRequest, FrictionStateResponse, SessionListResponse,
};
use tutor_api::{ChatStreamEvent, StreamOutcome, TutorApiClient, TutorApiError};

/// Backend seam for the orchestrator; implemented by [`TutorApiClient`] and
/// by scripted mocks in tests.
///
/// Futures are `?Send`: the orchestration model is single-threaded and
/// cooperative, so implementations may hold non-`Send` state.
#[async_trait(?Send)]
pub trait ChatTransport {
    async fn stream_chat(
        &self,
        request: &ChatStreamRequest,
        cancellation: Option<&CancellationSignal>,
        on_event: &mut (dyn FnMut(ChatStreamEvent) + '_),
    ) -> Result<StreamOutcome, TutorApiError>;

    async fn fetch_history(
        &self,
        session_id: &str,
    ) -> Result<Option<ChatHistoryResponse>, TutorApiError>;

    async fn fetch_friction_state(
        &self,
        session_id: &str,
    ) -> Result<Option<FrictionStateResponse>, TutorApiError>;

    async fn list_sessions(&self) -> Result<Option<SessionListResponse>, TutorApiError>;

    async fn reset_session(&self, session_id: &str) -> Result<(), TutorApiError>;

    async fn notify_abandon(&self, session_id: &str);
}

#[async_trait(?Send)]
impl ChatTransport for TutorApiClient {
    async fn stream_chat(
        &self,
        request: &ChatStreamRequest,
        cancellation: Option<&CancellationSignal>,
        on_event: &mut (dyn FnMut(ChatStreamEvent) + '_),
    ) -> Result<StreamOutcome, TutorApiError> {
        self.stream_chat_with_handler(request, cancellation, |event| on_event(event))
            .await
    }

    async fn fetch_history(
        &self,
        session_id: &str,
    ) -> Result<Option<ChatHistoryResponse>, TutorApiError> {
        TutorApiClient::fetch_history(self, session_id).await
    }

    async fn fetch_friction_state(
        &self,
        session_id: &str,
    ) -> Result<Option<FrictionStateResponse>, TutorApiError> {
        TutorApiClient::fetch_friction_state(self, session_id).await
    }

    async fn list_sessions(&self) -> Result<Option<SessionListResponse>, TutorApiError> {
        TutorApiClient::list_sessions(self).await
    }

    async fn reset_session(&self, session_id: &str) -> Result<(), TutorApiError> {
        TutorApiClient::reset_session(self, session_id).await
    }

    async fn notify_abandon(&self, session_id: &str) {
        TutorApiClient::notify_abandon(self, session_id).await;
    }
}
