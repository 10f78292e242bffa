use std::future::Future;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::config::TutorApiConfig;
use crate::error::{parse_error_message, TutorApiError};
use crate::events::{ChatStreamEvent, StreamOutcome};
use crate::headers::build_headers;
use crate::payload::{
    AbandonRequest, ChatHistoryResponse, ChatStreamRequest, FrictionStateResponse, ResetRequest,
    SessionListResponse,
};
use crate::sse::EventStreamParser;
use crate::url::{
    join_route, CHAT_ABANDON_ROUTE, CHAT_HISTORY_ROUTE, CHAT_RESET_ROUTE, CHAT_SESSIONS_ROUTE,
    CHAT_STREAM_ROUTE, FRICTION_STATE_ROUTE,
};

/// Optional cancellation signal shared across request and stream loops.
pub type CancellationSignal = Arc<AtomicBool>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone)]
pub struct TutorApiClient {
    http: Client,
    config: TutorApiConfig,
}

/// Collected result of one streaming exchange.
#[derive(Debug, Clone)]
pub struct StreamResult {
    pub events: Vec<ChatStreamEvent>,
    pub outcome: StreamOutcome,
}

impl TutorApiClient {
    pub fn new(config: TutorApiConfig) -> Result<Self, TutorApiError> {
        let http = Client::builder().build().map_err(TutorApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &TutorApiConfig {
        &self.config
    }

    pub fn route_url(&self, route: &str) -> String {
        join_route(&self.config.base_url, route)
    }

    fn header_map(&self, streaming: bool) -> Result<HeaderMap, TutorApiError> {
        let headers = build_headers(&self.config, streaming);
        let mut out = HeaderMap::new();
        for (key, value) in headers {
            out.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| TutorApiError::InvalidHeader(format!("invalid key: {key}")))?,
                HeaderValue::from_str(&value).map_err(|_| {
                    TutorApiError::InvalidHeader(format!("invalid value for {key}"))
                })?,
            );
        }
        Ok(out)
    }

    /// Drive one chat exchange, forwarding each decoded event to `on_event`.
    ///
    /// A non-2xx status fails the call without retrying. A server-signaled
    /// `error` event or a decode failure terminates the stream immediately;
    /// events already forwarded stay forwarded. Cancellation stops further
    /// chunk reads and suppresses any further handler invocations.
    pub async fn stream_chat_with_handler<F>(
        &self,
        request: &ChatStreamRequest,
        cancellation: Option<&CancellationSignal>,
        mut on_event: F,
    ) -> Result<StreamOutcome, TutorApiError>
    where
        F: FnMut(ChatStreamEvent),
    {
        if is_cancelled(cancellation) {
            return Err(TutorApiError::Cancelled);
        }

        let send = self
            .http
            .post(self.route_url(CHAT_STREAM_ROUTE))
            .headers(self.header_map(true)?)
            .json(request)
            .send();
        let response = await_or_cancel(send, cancellation)
            .await?
            .map_err(TutorApiError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = await_or_cancel(response.text(), cancellation)
                .await?
                .unwrap_or_default();
            return Err(TutorApiError::Status(
                status,
                parse_error_message(status, &body),
            ));
        }

        let mut bytes = response.bytes_stream();
        let mut parser = EventStreamParser::with_buffer_limit(self.config.max_buffered_event_bytes);
        let mut outcome = StreamOutcome::default();

        loop {
            let Some(chunk) = await_or_cancel(bytes.next(), cancellation).await? else {
                break;
            };
            if is_cancelled(cancellation) {
                return Err(TutorApiError::Cancelled);
            }
            let chunk = chunk.map_err(TutorApiError::from)?;
            for event in parser.feed(&chunk)? {
                process_stream_event(event, &mut outcome, &mut on_event)?;
            }
        }

        if is_cancelled(cancellation) {
            return Err(TutorApiError::Cancelled);
        }

        if let Some(event) = parser.finish()? {
            process_stream_event(event, &mut outcome, &mut on_event)?;
        }

        Ok(outcome)
    }

    /// Like [`TutorApiClient::stream_chat_with_handler`], collecting events.
    pub async fn stream_chat(
        &self,
        request: &ChatStreamRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<StreamResult, TutorApiError> {
        let mut events = Vec::new();
        let outcome = self
            .stream_chat_with_handler(request, cancellation, |event| {
                events.push(event);
            })
            .await?;

        Ok(StreamResult { events, outcome })
    }

    /// Fetch the persisted transcript for one session. `Ok(None)` means the
    /// session has no server-side history yet.
    pub async fn fetch_history(
        &self,
        session_id: &str,
    ) -> Result<Option<ChatHistoryResponse>, TutorApiError> {
        self.get_optional(CHAT_HISTORY_ROUTE, &[("session_id", session_id)])
            .await
    }

    /// Fetch the guidance-unlock diagnostic state for one session. `Ok(None)`
    /// means the session has no state yet.
    pub async fn fetch_friction_state(
        &self,
        session_id: &str,
    ) -> Result<Option<FrictionStateResponse>, TutorApiError> {
        self.get_optional(FRICTION_STATE_ROUTE, &[("session_id", session_id)])
            .await
    }

    /// Fetch the server's authoritative session list. `Ok(None)` means the
    /// server reports no sessions; cache-only operation continues.
    pub async fn list_sessions(&self) -> Result<Option<SessionListResponse>, TutorApiError> {
        self.get_optional(CHAT_SESSIONS_ROUTE, &[]).await
    }

    /// Delete server-side state for one session.
    pub async fn reset_session(&self, session_id: &str) -> Result<(), TutorApiError> {
        let request = ResetRequest {
            session_id: session_id.to_owned(),
        };
        let mut builder = self
            .http
            .post(self.route_url(CHAT_RESET_ROUTE))
            .headers(self.header_map(false)?)
            .json(&request);
        if let Some(timeout) = self.config.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(TutorApiError::from)?;
        check_status(response).await.map(|_| ())
    }

    /// Best-effort end-of-session notification for page/tab teardown.
    /// Swallows every failure; the notification is at-most-once.
    pub async fn notify_abandon(&self, session_id: &str) {
        let request = AbandonRequest {
            session_id: session_id.to_owned(),
        };
        let Ok(headers) = self.header_map(false) else {
            return;
        };
        let _ = self
            .http
            .post(self.route_url(CHAT_ABANDON_ROUTE))
            .headers(headers)
            .json(&request)
            .send()
            .await;
    }

    async fn get_optional<T: DeserializeOwned>(
        &self,
        route: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<T>, TutorApiError> {
        let mut builder = self
            .http
            .get(self.route_url(route))
            .headers(self.header_map(false)?);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(timeout) = self.config.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(TutorApiError::from)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = check_status(response).await?;
        let value = response.json::<T>().await.map_err(TutorApiError::from)?;
        Ok(Some(value))
    }
}

async fn check_status(response: Response) -> Result<Response, TutorApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(TutorApiError::Status(
        status,
        parse_error_message(status, &body),
    ))
}

fn process_stream_event<F>(
    event: ChatStreamEvent,
    outcome: &mut StreamOutcome,
    on_event: &mut F,
) -> Result<(), TutorApiError>
where
    F: FnMut(ChatStreamEvent),
{
    if let ChatStreamEvent::Error { message } = &event {
        return Err(TutorApiError::StreamFailed {
            message: message.clone(),
        });
    }

    if matches!(event, ChatStreamEvent::End) {
        outcome.ended = true;
    }

    on_event(event);
    Ok(())
}

fn is_cancelled(cancel: Option<&CancellationSignal>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Acquire))
}

async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancellationSignal>,
) -> Result<F::Output, TutorApiError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancellation) {
            return Err(TutorApiError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancellation) {
                return Err(TutorApiError::Cancelled);
            }
            return Ok(output);
        }
    }
}
