// Unit tests for the single writer task
// These pin down the ordering and close-frame rules every outbound frame goes through.

use crate::error::StreamError;
use crate::stream::spawn_writer;
use crate::tests::support::{recording_sink, sent_closes, sent_texts};

use std::time::Duration;

use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

const WRITER_DRAIN: Duration = Duration::from_secs(1);

/// **VALUE**: Verifies that no text frame is written after the close frame.
///
/// **WHY THIS MATTERS**: An interrupt can land while an ack is being prepared. Writing
/// that ack after the close frame is a protocol violation the gateway may answer by
/// dropping the connection abruptly.
///
/// **BUG THIS CATCHES**: Would catch if the writer stops tracking that the close was sent.
#[tokio::test]
async fn given_close_sent_when_text_queued_then_refused_with_closed() {
    // GIVEN: A writer that has sent one ack and the close frame
    let (sink, sent) = recording_sink();
    let (sender, writer) = spawn_writer(sink);
    sender
        .send_text(r#"{"envelope_id":"E1"}"#.to_string())
        .await
        .unwrap();
    sender.send_close().await.unwrap();

    // WHEN: Another ack is queued
    let late = sender
        .send_text(r#"{"envelope_id":"E2"}"#.to_string())
        .await;
    drop(sender);
    let report = writer.finish(WRITER_DRAIN).await;

    // THEN: It is refused and never reaches the sink
    assert!(matches!(late, Err(StreamError::Closed { .. })));
    assert_eq!(sent_texts(&sent), vec![r#"{"envelope_id":"E1"}"#.to_string()]);
    assert_eq!(report.frames_sent, 1);
    assert!(report.close_sent);
}

/// **VALUE**: Verifies the close frame is normal closure with an empty reason, sent once.
///
/// **WHY THIS MATTERS**: The shutdown path and the loop-ended path both request a close.
/// Only one close frame may go on the wire.
///
/// **BUG THIS CATCHES**: Would catch a wrong close code or a duplicate close frame.
#[tokio::test]
async fn given_two_close_requests_when_writer_drains_then_one_normal_close_written() {
    // GIVEN: A writer
    let (sink, sent) = recording_sink();
    let (sender, writer) = spawn_writer(sink);

    // WHEN: Requesting close twice
    let first = sender.send_close().await;
    let second = sender.send_close().await;
    drop(sender);
    writer.finish(WRITER_DRAIN).await;

    // THEN: Both succeed, one frame with code 1000 and no reason
    assert!(first.is_ok());
    assert!(second.is_ok());
    assert_eq!(sent_closes(&sent), 1);

    let expected = Message::Close(Some(CloseFrame {
        code: CloseCode::Normal,
        reason: String::new().into(),
    }));
    assert_eq!(sent.lock().unwrap()[0], expected);
}

/// **VALUE**: Verifies that queued frames are written in the order they were queued.
///
/// **WHY THIS MATTERS**: Acks and the close frame share one queue. If the close could
/// overtake an ack already queued, that ack would be lost.
///
/// **BUG THIS CATCHES**: Would catch a writer that prioritizes close over pending text.
#[tokio::test]
async fn given_acks_then_close_when_written_then_order_is_preserved() {
    // GIVEN: A writer
    let (sink, sent) = recording_sink();
    let (sender, writer) = spawn_writer(sink);

    // WHEN: Two acks then the close
    for id in ["E1", "E2"] {
        sender
            .send_text(format!(r#"{{"envelope_id":"{id}"}}"#))
            .await
            .unwrap();
    }
    sender.send_close().await.unwrap();
    drop(sender);
    writer.finish(WRITER_DRAIN).await;

    // THEN: E1, E2, Close
    let messages = sent.lock().unwrap().clone();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0], Message::text(r#"{"envelope_id":"E1"}"#.to_string()));
    assert_eq!(messages[1], Message::text(r#"{"envelope_id":"E2"}"#.to_string()));
    assert!(matches!(messages[2], Message::Close(_)));
}

/// **VALUE**: Verifies that sends after the writer finished fail instead of hanging.
///
/// **WHY THIS MATTERS**: A sender outliving the writer must get an error, or the
/// receive loop would wait forever on a reply that never comes.
///
/// **BUG THIS CATCHES**: Would catch if the reply channel is not observed for closure.
#[tokio::test]
async fn given_writer_aborted_when_text_sent_then_returns_closed() {
    // GIVEN: A writer that is force-stopped while a sender is still alive
    let (sink, _sent) = recording_sink();
    let (sender, writer) = spawn_writer(sink);
    let report = writer.finish(Duration::from_millis(20)).await;

    // WHEN: Sending afterwards
    let result = sender.send_text("{}".to_string()).await;

    // THEN: Closed, and the timed-out finish reported nothing
    assert!(matches!(result, Err(StreamError::Closed { .. })));
    assert_eq!(report.frames_sent, 0);
}
