use crate::helpers::{
    GatewayEvent, GatewayScript, TEST_TOKEN, mock_negotiation, mock_negotiation_for,
    negotiation_url, spawn_gateway, spawn_silent_listener, texts,
};

use socket_core::ack::LoopExit;
use socket_core::config::MalformedFramePolicy;
use socket_core::error::{LifecycleError, NegotiationError, StreamError};
use socket_core::lifecycle::{LifecycleController, LifecycleState, ShutdownTrigger};
use socket_core::negotiator::SessionNegotiator;

use common::Credential;

use std::time::{Duration, Instant};

use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::MockServer;
use wiremock::matchers::method;
use wiremock::{Mock, ResponseTemplate};

// ============================================================================
// Full runs: mock negotiation + local gateway
// ============================================================================

const GRACE: Duration = Duration::from_secs(2);

fn controller(server: &MockServer, shutdown_timeout: Duration) -> LifecycleController {
    let negotiator =
        SessionNegotiator::new(&negotiation_url(server), Duration::from_secs(1)).unwrap();
    LifecycleController::with_negotiator(negotiator, shutdown_timeout, MalformedFramePolicy::Skip)
}

fn credential() -> Credential {
    Credential::new(TEST_TOKEN).unwrap()
}

/// **VALUE**: Verifies the happy path end to end: every envelope acknowledged, in order.
///
/// **WHY THIS MATTERS**: An unacknowledged envelope is redelivered by the gateway. Acks
/// out of order are still accepted but show the loop is not sequential.
///
/// **BUG THIS CATCHES**: Would catch acks for frames without an `envelope_id`, dropped
/// acks, or a run that does not end when the gateway closes.
#[tokio::test]
async fn given_gateway_closes_after_acks_when_run_then_terminates_with_acks_in_order() {
    // GIVEN: E1, a hello without an envelope, then E2
    let gateway = spawn_gateway(GatewayScript {
        frames: vec![
            json!({"envelope_id": "E1", "type": "events_api"}).to_string(),
            json!({"type": "hello"}).to_string(),
            json!({"envelope_id": "E2", "type": "events_api"}).to_string(),
        ],
        close_after_texts: Some(2),
        answer_close: true,
        read_replies: true,
    })
    .await;
    let server = mock_negotiation_for(&gateway.url).await;
    let mut controller = controller(&server, GRACE);

    // WHEN: Running until the gateway hangs up
    let summary = controller
        .run(&credential(), CancellationToken::new())
        .await
        .unwrap();

    // THEN: Ended by the loop, after every state
    assert_eq!(summary.trigger, ShutdownTrigger::ReceiveLoopEnded);
    assert!(matches!(summary.receive_loop.exit, LoopExit::PeerClosed));
    assert_eq!(summary.receive_loop.frames_received, 3);
    assert_eq!(summary.receive_loop.acks_sent, 2);
    assert_eq!(
        controller.history(),
        &[
            LifecycleState::Negotiating,
            LifecycleState::Connecting,
            LifecycleState::Streaming,
            LifecycleState::Closing,
            LifecycleState::Terminated,
        ]
    );

    // THEN: Exactly the two acks, in order
    let transcript = gateway.task.await.unwrap();
    assert_eq!(
        texts(&transcript),
        vec![
            String::from(r#"{"envelope_id":"E1"}"#),
            String::from(r#"{"envelope_id":"E2"}"#),
        ]
    );
}

/// **VALUE**: Verifies interrupt handling: one close frame, then a clean exit.
///
/// **WHY THIS MATTERS**: Ctrl-C is the normal way to stop the client. The gateway must
/// see a 1000 close, not a dropped TCP connection.
///
/// **BUG THIS CATCHES**: Would catch a missing close frame, a duplicate close, or a run
/// that keeps waiting after the close handshake completed.
#[tokio::test]
async fn given_streaming_when_interrupted_then_sends_one_close_and_terminates() {
    // GIVEN: A session that has acknowledged one envelope
    let mut gateway = spawn_gateway(GatewayScript::frames(&[r#"{"envelope_id":"E1"}"#])).await;
    let server = mock_negotiation_for(&gateway.url).await;
    let mut controller = controller(&server, GRACE);
    let shutdown = CancellationToken::new();

    let run = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            let result = controller.run(&credential(), shutdown).await;
            (result, controller)
        }
    });

    assert_eq!(
        gateway.events.recv().await,
        Some(GatewayEvent::Text(String::from(r#"{"envelope_id":"E1"}"#)))
    );

    // WHEN: Interrupted
    let started = Instant::now();
    shutdown.cancel();
    let (result, controller) = run.await.unwrap();

    // THEN: Terminated cleanly and promptly
    let summary = result.unwrap();
    assert_eq!(summary.trigger, ShutdownTrigger::Interrupt);
    assert!(summary.writer.close_sent);
    assert!(started.elapsed() < GRACE);
    assert_eq!(controller.state(), LifecycleState::Terminated);

    // THEN: Gateway saw the ack and exactly one normal close
    let transcript = gateway.task.await.unwrap();
    let closes: Vec<_> = transcript
        .iter()
        .filter(|event| matches!(event, GatewayEvent::Close(_)))
        .collect();
    assert_eq!(closes, vec![&GatewayEvent::Close(Some(1000))]);
    assert_eq!(texts(&transcript), vec![String::from(r#"{"envelope_id":"E1"}"#)]);
}

/// **VALUE**: Verifies that the shutdown wait is bounded.
///
/// **WHY THIS MATTERS**: A gateway that never answers the close frame must not keep the
/// process alive after Ctrl-C.
///
/// **BUG THIS CATCHES**: Would catch an unbounded join on the receive loop.
#[tokio::test]
async fn given_gateway_ignores_close_when_interrupted_then_times_out() {
    // GIVEN: A gateway that stops reading once it sees the close
    let mut gateway = spawn_gateway(GatewayScript {
        frames: vec![String::from(r#"{"envelope_id":"E1"}"#)],
        close_after_texts: None,
        answer_close: false,
        read_replies: true,
    })
    .await;
    let server = mock_negotiation_for(&gateway.url).await;
    let shutdown_timeout = Duration::from_millis(300);
    let mut controller = controller(&server, shutdown_timeout);
    let shutdown = CancellationToken::new();

    let run = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { controller.run(&credential(), shutdown).await }
    });
    gateway.events.recv().await;

    // WHEN: Interrupted
    let started = Instant::now();
    shutdown.cancel();
    let result = run.await.unwrap();

    // THEN: Shutdown timeout, reported quickly
    assert!(
        matches!(result, Err(LifecycleError::ShutdownTimeout { .. })),
        "got {result:?}"
    );
    assert!(started.elapsed() < Duration::from_secs(3));

    // THEN: The close frame was still sent
    assert_eq!(gateway.events.recv().await, Some(GatewayEvent::Close(Some(1000))));
    gateway.task.abort();
}

/// **VALUE**: Verifies that a blocked writer cannot stretch the shutdown past its bound.
///
/// **WHY THIS MATTERS**: A gateway that stops reading fills the socket buffers, and the
/// writer then sits in a write that never completes. The close frame queues behind it.
/// Ctrl-C must still end the process within `shutdown_timeout`.
///
/// **BUG THIS CATCHES**: Would catch an unbounded wait on the close frame or on the
/// writer task during Closing.
#[tokio::test]
async fn given_gateway_stops_reading_when_interrupted_then_times_out_within_bound() {
    // GIVEN: A gateway flooding large envelopes, so every ack is large, and never reading
    let padding = "x".repeat(256 * 1024);
    let frames = (0..200)
        .map(|i| json!({ "envelope_id": format!("E{i}-{padding}") }).to_string())
        .collect();
    let gateway = spawn_gateway(GatewayScript {
        frames,
        close_after_texts: None,
        answer_close: true,
        read_replies: false,
    })
    .await;
    let server = mock_negotiation_for(&gateway.url).await;
    let shutdown_timeout = Duration::from_millis(300);
    let mut controller = controller(&server, shutdown_timeout);
    let shutdown = CancellationToken::new();

    let run = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { controller.run(&credential(), shutdown).await }
    });

    // Let the acks back up until the writer is stuck
    tokio::time::sleep(Duration::from_secs(2)).await;

    // WHEN: Interrupted
    let started = Instant::now();
    shutdown.cancel();
    let result = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("run did not return after the shutdown bound")
        .unwrap();

    // THEN: Shutdown timeout, close to the bound
    assert!(
        matches!(result, Err(LifecycleError::ShutdownTimeout { .. })),
        "got {result:?}"
    );
    assert!(started.elapsed() < Duration::from_secs(2));
    gateway.task.abort();
}

/// **VALUE**: Verifies that Ctrl-C during a stalled handshake ends the run.
///
/// **WHY THIS MATTERS**: The signal handler replaces the default kill. If the handshake
/// ignores the cancel, a gateway that accepts TCP and never upgrades makes the process
/// unkillable short of SIGKILL.
///
/// **BUG THIS CATCHES**: Would catch a connect step that does not observe the token.
#[tokio::test]
async fn given_stalled_handshake_when_interrupted_then_terminates_from_connecting() {
    // GIVEN: Negotiation pointing at a listener that never upgrades
    let (socket_url, listener) = spawn_silent_listener().await;
    let server = mock_negotiation_for(&socket_url).await;
    let mut controller = controller(&server, GRACE);
    let shutdown = CancellationToken::new();

    let run = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            let result = controller.run(&credential(), shutdown).await;
            (result, controller)
        }
    });
    tokio::time::sleep(Duration::from_millis(500)).await;

    // WHEN: Interrupted mid-handshake
    shutdown.cancel();
    let (result, controller) = tokio::time::timeout(Duration::from_secs(2), run)
        .await
        .expect("run ignored the interrupt")
        .unwrap();

    // THEN: Interrupted, straight from Connecting to Terminated
    assert!(
        matches!(result, Err(LifecycleError::Interrupted { .. })),
        "got {result:?}"
    );
    assert_eq!(
        controller.history(),
        &[
            LifecycleState::Negotiating,
            LifecycleState::Connecting,
            LifecycleState::Terminated,
        ]
    );
    listener.abort();
}

/// **VALUE**: Verifies that a stalled handshake is bounded without any interrupt.
///
/// **WHY THIS MATTERS**: Unattended runs have nobody to press Ctrl-C.
///
/// **BUG THIS CATCHES**: Would catch a connect step with no timeout.
#[tokio::test]
async fn given_stalled_handshake_when_connect_timeout_elapses_then_returns_connect_error() {
    // GIVEN: A listener that never upgrades and a short connect bound
    let (socket_url, listener) = spawn_silent_listener().await;
    let server = mock_negotiation_for(&socket_url).await;
    let mut controller =
        controller(&server, GRACE).with_connect_timeout(Duration::from_millis(300));

    // WHEN: Running
    let result = tokio::time::timeout(
        Duration::from_secs(3),
        controller.run(&credential(), CancellationToken::new()),
    )
    .await
    .expect("handshake was not bounded");

    // THEN: Connect error naming the bound
    match result {
        Err(LifecycleError::Connect(StreamError::Connect { message, .. })) => {
            assert!(message.contains("did not complete"), "{message}");
        }
        other => panic!("expected Connect, got {other:?}"),
    }
    assert_eq!(controller.state(), LifecycleState::Terminated);
    listener.abort();
}

/// **VALUE**: Verifies that Ctrl-C during negotiation ends the run without dialing.
///
/// **BUG THIS CATCHES**: Would catch a cancel that is only observed once streaming starts.
#[tokio::test]
async fn given_slow_negotiation_when_interrupted_then_terminates_from_negotiating() {
    // GIVEN: A negotiation endpoint slower than the interrupt
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ok": true, "url": "ws://127.0.0.1:9/link"}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;
    let negotiator =
        SessionNegotiator::new(&negotiation_url(&server), Duration::from_secs(10)).unwrap();
    let mut controller =
        LifecycleController::with_negotiator(negotiator, GRACE, MalformedFramePolicy::Skip);
    let shutdown = CancellationToken::new();
    let canceller = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        canceller.cancel();
    });

    // WHEN: Running
    let started = Instant::now();
    let result = controller.run(&credential(), shutdown).await;

    // THEN: Interrupted promptly, never connected
    assert!(
        matches!(result, Err(LifecycleError::Interrupted { .. })),
        "got {result:?}"
    );
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(
        controller.history(),
        &[LifecycleState::Negotiating, LifecycleState::Terminated]
    );
}

/// **VALUE**: Verifies that a refused negotiation never dials.
///
/// **WHY THIS MATTERS**: With `ok: false` there is no URL to trust. Dialing anything
/// would mean reusing a stale or default address.
///
/// **BUG THIS CATCHES**: Would catch a run that ignores `ok` and connects anyway.
#[tokio::test]
async fn given_negotiation_refused_when_run_then_terminates_without_connecting() {
    // GIVEN: Refusal body naming a live gateway URL
    let mut gateway = spawn_gateway(GatewayScript::frames(&[])).await;
    let server = mock_negotiation(json!({
        "ok": false,
        "error": "invalid_auth",
        "url": gateway.url,
    }))
    .await;
    let mut controller = controller(&server, GRACE);

    // WHEN: Running
    let result = controller.run(&credential(), CancellationToken::new()).await;

    // THEN: Negotiation error, straight to Terminated
    match result {
        Err(LifecycleError::Negotiation(NegotiationError::Rejected { reason, .. })) => {
            assert_eq!(reason, "invalid_auth");
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
    assert_eq!(
        controller.history(),
        &[LifecycleState::Negotiating, LifecycleState::Terminated]
    );

    // THEN: Gateway never heard from us
    let heard = tokio::time::timeout(Duration::from_millis(200), gateway.events.recv()).await;
    assert!(heard.is_err());
    gateway.task.abort();
}

/// **VALUE**: Verifies that an undecodable negotiation response stops the run.
///
/// **BUG THIS CATCHES**: Would catch a decode failure treated as an empty success.
#[tokio::test]
async fn given_garbage_negotiation_body_when_run_then_returns_json_error() {
    // GIVEN: Non-JSON negotiation response
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;
    let mut controller = controller(&server, GRACE);

    // WHEN: Running
    let result = controller.run(&credential(), CancellationToken::new()).await;

    // THEN: JSON error, never connected
    assert!(
        matches!(
            result,
            Err(LifecycleError::Negotiation(NegotiationError::Json { .. }))
        ),
        "got {result:?}"
    );
    assert!(!controller.history().contains(&LifecycleState::Connecting));
}

/// **VALUE**: Verifies that a dead socket URL ends the run from Connecting.
///
/// **BUG THIS CATCHES**: Would catch a retry loop or a panic on dial failure.
#[tokio::test]
async fn given_dead_socket_url_when_run_then_returns_connect_error() {
    // GIVEN: Negotiation pointing at a port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let server = mock_negotiation_for(&format!("ws://127.0.0.1:{port}/link")).await;
    let mut controller = controller(&server, GRACE);

    // WHEN: Running
    let result = controller.run(&credential(), CancellationToken::new()).await;

    // THEN: Connect error after Connecting
    assert!(
        matches!(result, Err(LifecycleError::Connect(_))),
        "got {result:?}"
    );
    assert_eq!(
        controller.history(),
        &[
            LifecycleState::Negotiating,
            LifecycleState::Connecting,
            LifecycleState::Terminated,
        ]
    );
}

/// **VALUE**: Verifies that a controller runs at most once.
///
/// **BUG THIS CATCHES**: Would catch a second `run` reconnecting with a stale controller.
#[tokio::test]
async fn given_terminated_controller_when_run_again_then_returns_invalid_transition() {
    // GIVEN: A controller whose run already ended
    let server = mock_negotiation(json!({"ok": false, "error": "invalid_auth"})).await;
    let mut controller = controller(&server, GRACE);
    controller.run(&credential(), CancellationToken::new()).await.ok();

    // WHEN: Running again
    let result = controller.run(&credential(), CancellationToken::new()).await;

    // THEN: Refused
    assert!(matches!(
        result,
        Err(LifecycleError::InvalidTransition {
            from: LifecycleState::Terminated,
            ..
        })
    ));
}
