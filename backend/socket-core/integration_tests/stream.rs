use crate::helpers::{GatewayEvent, GatewayScript, spawn_gateway};

use socket_core::error::StreamError;
use socket_core::stream::StreamConnection;

use std::time::Duration;

use url::Url;

// ============================================================================
// Public API tests for StreamConnection against a local gateway
// ============================================================================

/// **VALUE**: Verifies a full socket round trip through the split halves.
///
/// **WHY THIS MATTERS**: The receive loop and the writer task each own one half. If the
/// split is wired wrong, acknowledgments never reach the gateway.
///
/// **BUG THIS CATCHES**: Would catch a writer that buffers without flushing, or a close
/// frame with the wrong status code.
#[tokio::test]
async fn given_open_socket_when_frames_exchanged_then_gateway_sees_text_and_close() {
    // GIVEN: A gateway that sends one frame
    let mut gateway = spawn_gateway(GatewayScript::frames(&[r#"{"envelope_id":"E1"}"#])).await;
    let url = Url::parse(&gateway.url).unwrap();
    let connection = StreamConnection::connect(&url).await.unwrap();
    assert_eq!(connection.url(), &url);
    let (mut receiver, sender, writer) = connection.into_parts();

    // WHEN: Reading the frame, answering it, then closing
    let frame = receiver.receive().await.unwrap().unwrap();
    sender
        .send_text(String::from(r#"{"envelope_id":"E1"}"#))
        .await
        .unwrap();
    sender.send_close().await.unwrap();

    // THEN: Frame arrived intact
    assert_eq!(frame.as_text_lossy(), r#"{"envelope_id":"E1"}"#);

    // THEN: Gateway saw the text then a normal close
    assert_eq!(
        gateway.events.recv().await,
        Some(GatewayEvent::Text(String::from(r#"{"envelope_id":"E1"}"#)))
    );
    assert_eq!(gateway.events.recv().await, Some(GatewayEvent::Close(Some(1000))));

    // THEN: The close reply ends the read half
    let after_close = tokio::time::timeout(Duration::from_secs(2), receiver.receive())
        .await
        .unwrap();
    assert!(matches!(after_close, Ok(None)), "got {after_close:?}");

    drop(sender);
    let report = writer.finish(Duration::from_secs(2)).await;
    assert_eq!(report.frames_sent, 1);
    assert!(report.close_sent);
}

/// **VALUE**: Verifies that writes after the close frame are refused.
///
/// **BUG THIS CATCHES**: Would catch an acknowledgment leaking onto the wire after close.
#[tokio::test]
async fn given_close_sent_when_text_sent_then_refused_and_not_on_wire() {
    // GIVEN: An open socket that has sent its close
    let gateway = spawn_gateway(GatewayScript::frames(&[])).await;
    let url = Url::parse(&gateway.url).unwrap();
    let (_receiver, sender, writer) = StreamConnection::connect(&url).await.unwrap().into_parts();
    sender.send_close().await.unwrap();

    // WHEN: Sending text and a second close
    let text = sender.send_text(String::from(r#"{"envelope_id":"late"}"#)).await;
    sender.send_close().await.ok();

    // THEN: Text refused
    assert!(matches!(text, Err(StreamError::Closed { .. })), "got {text:?}");

    drop(sender);
    let report = writer.finish(Duration::from_secs(2)).await;
    assert_eq!(report.frames_sent, 0);

    // THEN: Gateway saw one close and nothing else
    let transcript = gateway.task.await.unwrap();
    assert_eq!(transcript, vec![GatewayEvent::Close(Some(1000))]);
}

/// **VALUE**: Verifies that a refused dial is a connect error.
///
/// **BUG THIS CATCHES**: Would catch a panic on a dead endpoint.
#[tokio::test]
async fn given_nothing_listening_when_connect_then_returns_connect_error() {
    // GIVEN: A port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let url = Url::parse(&format!("ws://127.0.0.1:{port}/link")).unwrap();

    // WHEN: Connecting
    let result = StreamConnection::connect(&url).await;

    // THEN: Connect error
    assert!(matches!(result, Err(StreamError::Connect { .. })));
}
