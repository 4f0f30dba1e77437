#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Shared test utilities for Matchwire server integration tests.
//!
//! Provides server-spawning helpers and [`TestClient`], a WebSocket client
//! speaking the Matchwire wire protocol against a real listener.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, timeout_at, Instant};
use tokio_test::assert_ok;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use matchwire_server::{ClientEvent, ConnectionId, MatchwireServer, ServerConfig, ServerEvent};

/// How long `recv` waits before declaring an expected event missing.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Window used when asserting that no event arrives.
pub const SILENCE_WINDOW: Duration = Duration::from_millis(200);

// ── Server helpers ──────────────────────────────────────────────────

/// Start a server on an ephemeral port and return the address to connect to.
pub async fn start_server() -> SocketAddr {
    start_server_with(ServerConfig::default()).await
}

/// Start a server with custom settings on an ephemeral port.
pub async fn start_server_with(config: ServerConfig) -> SocketAddr {
    let config = config.with_bind_addr("127.0.0.1:0".parse().unwrap());
    let server = assert_ok!(MatchwireServer::bind(config).await);
    let addr = server.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    addr
}

// ── TestClient ──────────────────────────────────────────────────────

/// A WebSocket client speaking the Matchwire wire protocol.
///
/// [`connect`](TestClient::connect) consumes the `connected` greeting and
/// records the server-assigned id, so tests start from a clean stream.
pub struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    /// The id the server assigned to this connection.
    pub id: ConnectionId,
}

impl TestClient {
    /// Connect to `addr` and consume the `connected` greeting.
    pub async fn connect(addr: SocketAddr) -> Self {
        let url = format!("ws://{addr}");
        let (ws, _response) = tokio_tungstenite::connect_async(&url).await.unwrap();
        let mut client = Self {
            ws,
            id: uuid::Uuid::nil(),
        };

        let greeting = client.recv().await;
        let ServerEvent::Connected { connection_id } = greeting else {
            panic!("expected the connected greeting, got {greeting:?}");
        };
        client.id = connection_id;
        client
    }

    /// Send one client event as a JSON text frame.
    pub async fn send(&mut self, event: ClientEvent) {
        let json = serde_json::to_string(&event).unwrap();
        self.send_raw(&json).await;
    }

    /// Send an arbitrary text frame, bypassing event serialization.
    pub async fn send_raw(&mut self, text: &str) {
        self.ws
            .send(Message::Text(text.to_owned().into()))
            .await
            .unwrap();
    }

    /// Send an arbitrary binary frame.
    pub async fn send_bytes(&mut self, bytes: &[u8]) {
        self.ws
            .send(Message::Binary(bytes.to_vec().into()))
            .await
            .unwrap();
    }

    /// Receive the next protocol event, skipping transport-level frames.
    ///
    /// Panics if nothing arrives within [`RECV_TIMEOUT`] or the connection
    /// closes first.
    pub async fn recv(&mut self) -> ServerEvent {
        loop {
            let frame = timeout(RECV_TIMEOUT, self.ws.next())
                .await
                .expect("timed out waiting for a server event");
            let msg = frame
                .expect("connection ended while awaiting a server event")
                .unwrap();
            match msg {
                Message::Text(text) => {
                    return serde_json::from_str(text.as_str()).unwrap();
                }
                Message::Ping(_) | Message::Pong(_) => {}
                other => panic!("unexpected frame while awaiting a server event: {other:?}"),
            }
        }
    }

    /// Assert that no protocol event arrives within [`SILENCE_WINDOW`].
    pub async fn expect_silence(&mut self) {
        let deadline = Instant::now() + SILENCE_WINDOW;
        loop {
            let Ok(frame) = timeout_at(deadline, self.ws.next()).await else {
                return;
            };
            match frame {
                Some(Ok(Message::Text(text))) => {
                    panic!("expected silence, got: {}", text.as_str());
                }
                Some(Ok(_)) => {} // keepalive frames are fine
                Some(Err(e)) => panic!("transport error while expecting silence: {e}"),
                None => return,
            }
        }
    }

    /// Close the connection cleanly.
    pub async fn close(mut self) {
        self.ws.close(None).await.unwrap();
    }
}
