// Fake socket halves for exercising the writer and receive loop without a network.

use std::pin::Pin;
use std::sync::{Arc, Mutex};

use futures_util::stream::{self, BoxStream};
use futures_util::{Sink, StreamExt, sink};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

pub(crate) type SentFrames = Arc<Mutex<Vec<Message>>>;
pub(crate) type TestSink = Pin<Box<dyn Sink<Message, Error = WsError> + Send>>;

/// Sink that records every message it is given.
pub(crate) fn recording_sink() -> (TestSink, SentFrames) {
    let sent: SentFrames = Arc::new(Mutex::new(Vec::new()));
    let sink = sink::unfold(Arc::clone(&sent), |sent, message: Message| async move {
        sent.lock().unwrap().push(message);
        Ok::<_, WsError>(sent)
    });

    (Box::pin(sink), sent)
}

/// Sink whose every write fails as if the peer had gone away.
pub(crate) fn broken_sink() -> TestSink {
    let sink = sink::unfold((), |_, _message: Message| async move {
        Err::<(), WsError>(WsError::ConnectionClosed)
    });

    Box::pin(sink)
}

/// Stream yielding the given text frames, then ending.
pub(crate) fn text_frames(frames: &[&str]) -> BoxStream<'static, Result<Message, WsError>> {
    let messages: Vec<Result<Message, WsError>> = frames
        .iter()
        .map(|frame| Ok(Message::text(frame.to_string())))
        .collect();

    stream::iter(messages).boxed()
}

/// Text payloads among the recorded messages, in write order.
pub(crate) fn sent_texts(sent: &SentFrames) -> Vec<String> {
    sent.lock()
        .unwrap()
        .iter()
        .filter_map(|message| match message {
            Message::Text(text) => Some(text.as_str().to_string()),
            _ => None,
        })
        .collect()
}

/// Number of close frames among the recorded messages.
pub(crate) fn sent_closes(sent: &SentFrames) -> usize {
    sent.lock()
        .unwrap()
        .iter()
        .filter(|message| matches!(message, Message::Close(_)))
        .count()
}
