mod support;

use support::{seeded_registry, MockTransport, StreamScript, StreamStep, StreamTerminal};
use tutor_client::{ChatOrchestrator, Role, TurnOutcome};

fn assistant_texts(orchestrator: &ChatOrchestrator<MockTransport>) -> Vec<String> {
    orchestrator
        .app()
        .transcript
        .iter()
        .filter(|message| message.role == Role::Assistant)
        .map(|message| message.text.clone())
        .collect()
}

#[tokio::test]
async fn cancellation_mid_stream_freezes_the_transcript() {
    let (_dir, registry, _session_id) = seeded_registry();
    let transport = MockTransport::new();
    transport.push_stream(StreamScript {
        steps: vec![
            StreamStep::Token("first"),
            StreamStep::Cancel,
            StreamStep::Token(" never delivered"),
        ],
        terminal: StreamTerminal::Complete,
    });

    let mut orchestrator = ChatOrchestrator::initialize(transport, registry)
        .await
        .expect("orchestrator initializes");

    let outcome = orchestrator.send_message("long question").await;

    assert_eq!(outcome, TurnOutcome::Aborted);
    assert_eq!(assistant_texts(&orchestrator), vec!["first".to_string()]);
    assert!(orchestrator.app().can_send());

    let message = orchestrator
        .app()
        .transcript
        .iter()
        .find(|message| message.role == Role::Assistant)
        .expect("aborted reply remains");
    assert!(!message.streaming);
}

#[tokio::test]
async fn next_send_after_abort_starts_a_fresh_reply() {
    let (_dir, registry, _session_id) = seeded_registry();
    let transport = MockTransport::new();
    transport.push_stream(StreamScript {
        steps: vec![StreamStep::Token("partial"), StreamStep::Cancel],
        terminal: StreamTerminal::Complete,
    });
    transport.push_stream(StreamScript::reply(&["fresh reply"]));

    let mut orchestrator = ChatOrchestrator::initialize(transport, registry)
        .await
        .expect("orchestrator initializes");

    assert_eq!(
        orchestrator.send_message("first question").await,
        TurnOutcome::Aborted
    );
    assert_eq!(
        orchestrator.send_message("second question").await,
        TurnOutcome::Completed
    );

    assert_eq!(
        assistant_texts(&orchestrator),
        vec!["partial".to_string(), "fresh reply".to_string()]
    );
}

#[tokio::test]
async fn abort_without_inflight_turn_is_a_noop() {
    let (_dir, registry, _session_id) = seeded_registry();
    let transport = MockTransport::new();

    let mut orchestrator = ChatOrchestrator::initialize(transport, registry)
        .await
        .expect("orchestrator initializes");

    assert!(orchestrator.abort_handle().is_none());
    orchestrator.abort_active_turn();
    orchestrator.abort_active_turn();

    assert_eq!(orchestrator.app().transcript.len(), 1);
    assert!(orchestrator.app().can_send());
}

#[tokio::test]
async fn teardown_sends_best_effort_abandon_notification() {
    let (_dir, registry, session_id) = seeded_registry();
    let transport = MockTransport::new();
    let handle = transport.clone();

    let mut orchestrator = ChatOrchestrator::initialize(transport, registry)
        .await
        .expect("orchestrator initializes");

    orchestrator.teardown().await;

    assert_eq!(handle.abandon_calls(), vec![session_id]);
}
