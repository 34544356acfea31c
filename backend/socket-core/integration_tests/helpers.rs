//! Test helpers for the public API tests.
//!
//! - An in-process gateway WebSocket server that plays a script and records
//!   what the client sends back
//! - A mock negotiation endpoint pointing at that gateway

use socket_core::CONNECTIONS_OPEN_METHOD;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_TOKEN: &str = "tok-A";

/// Something the client sent to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    Text(String),
    Close(Option<u16>),
}

pub struct GatewayScript {
    /// Frames sent to the client right after the handshake.
    pub frames: Vec<String>,
    /// Close the socket from the gateway side once this many text frames arrived.
    pub close_after_texts: Option<usize>,
    /// Answer the client's close frame. When false the gateway stops reading,
    /// so the client never sees the close reply.
    pub answer_close: bool,
    /// Read what the client sends. When false the gateway never reads, so the
    /// client's writes back up once the socket buffers are full.
    pub read_replies: bool,
}

impl GatewayScript {
    pub fn frames(frames: &[&str]) -> Self {
        Self {
            frames: frames.iter().map(|f| f.to_string()).collect(),
            close_after_texts: None,
            answer_close: true,
            read_replies: true,
        }
    }
}

pub struct Gateway {
    pub url: String,
    pub events: mpsc::UnboundedReceiver<GatewayEvent>,
    pub task: JoinHandle<Vec<GatewayEvent>>,
}

/// Start a gateway that accepts exactly one connection.
pub async fn spawn_gateway(script: GatewayScript) -> Gateway {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind gateway listener");
    let url = format!("ws://{}", listener.local_addr().expect("No local addr"));
    let (events_tx, events) = mpsc::unbounded_channel();

    let task = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("Failed to accept");
        let mut ws = accept_async(stream).await.expect("Handshake failed");

        let mut transcript = Vec::new();

        for frame in script.frames {
            if ws.send(Message::text(frame)).await.is_err() {
                return transcript;
            }
        }

        if !script.read_replies {
            std::future::pending::<()>().await;
        }

        let mut texts = 0;

        while let Some(message) = ws.next().await {
            let event = match message {
                Ok(Message::Text(text)) => GatewayEvent::Text(text.as_str().to_string()),
                Ok(Message::Close(frame)) => GatewayEvent::Close(frame.map(|f| u16::from(f.code))),
                Ok(_) => continue,
                Err(_) => break,
            };

            events_tx.send(event.clone()).ok();
            transcript.push(event.clone());

            match event {
                GatewayEvent::Text(_) => {
                    texts += 1;
                    if script.close_after_texts == Some(texts) {
                        ws.close(None).await.ok();
                    }
                }
                GatewayEvent::Close(_) if !script.answer_close => {
                    std::future::pending::<()>().await;
                }
                GatewayEvent::Close(_) => {}
            }
        }

        transcript
    });

    Gateway { url, events, task }
}

/// A listener that accepts TCP connections and never answers the upgrade.
///
/// Returns the `ws://` URL and the task holding the accepted sockets.
pub async fn spawn_silent_listener() -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind silent listener");
    let url = format!("ws://{}/link", listener.local_addr().expect("No local addr"));

    let task = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    (url, task)
}

/// Mock `apps.connections.open` that expects the test token and returns `body`.
pub async fn mock_negotiation(body: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/api/{CONNECTIONS_OPEN_METHOD}")))
        .and(header("authorization", format!("Bearer {TEST_TOKEN}").as_str()))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    server
}

/// Mock negotiation pointing at `socket_url`.
pub async fn mock_negotiation_for(socket_url: &str) -> MockServer {
    mock_negotiation(json!({ "ok": true, "url": socket_url })).await
}

pub fn negotiation_url(server: &MockServer) -> String {
    format!("{}/api/{CONNECTIONS_OPEN_METHOD}", server.uri())
}

/// Texts the client sent, in order.
pub fn texts(transcript: &[GatewayEvent]) -> Vec<String> {
    transcript
        .iter()
        .filter_map(|event| match event {
            GatewayEvent::Text(text) => Some(text.clone()),
            GatewayEvent::Close(_) => None,
        })
        .collect()
}
