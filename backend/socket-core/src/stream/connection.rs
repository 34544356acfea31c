use crate::error::stream::StreamError;
use crate::negotiator::redact_ticket;
use crate::stream::receiver::FrameReceiver;
use crate::stream::writer::{FrameSender, WriterHandle, spawn_writer};

use common::ErrorLocation;

use std::panic::Location;

use futures_util::StreamExt;
use futures_util::stream::SplitStream;
use log::{debug, error, info};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// An open socket, not yet split.
pub struct StreamConnection {
    socket: WsStream,
    url: Url,
}

impl StreamConnection {
    /// Dial `url`. No extra headers, no subprotocol.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Connect`] if the TCP, TLS or WebSocket handshake fails.
    pub async fn connect(url: &Url) -> Result<Self, StreamError> {
        let display_url = redact_ticket(url.as_str());
        debug!("Dialing {display_url}");

        let (socket, response) = connect_async(url.as_str()).await.map_err(|e| {
            error!("dial: {e}");
            StreamError::Connect {
                message: format!("Failed to open socket to {display_url}: {e}"),
                location: ErrorLocation::from(Location::caller()),
            }
        })?;

        info!(
            "Socket open to {display_url} (HTTP {})",
            response.status().as_u16()
        );

        Ok(Self {
            socket,
            url: url.clone(),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Split into the read half and the writer task.
    ///
    /// Must be called inside a tokio runtime; the writer task is spawned here.
    pub fn into_parts(self) -> (FrameReceiver<SplitStream<WsStream>>, FrameSender, WriterHandle) {
        let (sink, stream) = self.socket.split();
        let (sender, writer) = spawn_writer(sink);

        (FrameReceiver::new(stream), sender, writer)
    }
}
