use crate::error::stream::StreamError;
use crate::stream::frame::InboundFrame;

use common::ErrorLocation;

use std::panic::Location;

use futures_util::{Stream, StreamExt};
use log::{info, trace};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

/// Read half of the socket.
pub struct FrameReceiver<S> {
    stream: S,
}

impl<S> FrameReceiver<S>
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Wait for the next data frame.
    ///
    /// Control frames are consumed here. Returns `Ok(None)` once the peer has
    /// sent a close frame or the stream has ended.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Transport`] if the read fails.
    pub async fn receive(&mut self) -> Result<Option<InboundFrame>, StreamError> {
        while let Some(message) = self.stream.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    return Ok(Some(InboundFrame::new(text.as_str().as_bytes())));
                }
                Ok(Message::Binary(data)) => {
                    return Ok(Some(InboundFrame::new(data.to_vec())));
                }
                Ok(Message::Close(frame)) => {
                    match frame {
                        Some(frame) => info!(
                            "Peer closed the socket: code={:?} reason='{}'",
                            frame.code,
                            frame.reason.as_str()
                        ),
                        None => info!("Peer closed the socket"),
                    }
                    return Ok(None);
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                    trace!("control frame");
                }
                Ok(Message::Frame(_)) => {}
                Err(e) => {
                    return Err(StreamError::Transport {
                        message: format!("read: {e}"),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }
            }
        }

        info!("Socket stream ended");
        Ok(None)
    }
}
