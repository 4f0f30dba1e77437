//! Per-connection WebSocket plumbing.
//!
//! Every accepted socket gets two tasks: a reader that decodes inbound text
//! frames into [`ClientEvent`]s for the coordinator, and a writer that drains
//! the connection's outbound channel back onto the wire. The coordinator
//! never touches a socket, so a slow or stalled client can only ever delay
//! its own traffic.
//!
//! Keepalive runs here too: the writer pings on an interval and the reader
//! applies a silence timeout to every frame, pongs included. A client that
//! stops answering is torn down exactly like one that closed the socket.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::coordination::Command;
use crate::error::{Result, ServerError};
use crate::protocol::{ClientEvent, ConnectionId, ServerEvent};

/// Reply sent for an inbound frame that did not decode to a known event.
const UNRECOGNIZED_MESSAGE: &str = "unrecognized message";

/// Drive one client connection from handshake to teardown.
///
/// Completes the WebSocket handshake, registers the connection with the
/// coordinator, and then pumps frames in both directions until the socket
/// closes, errors, or times out. Exactly one [`Command::Disconnect`] is sent
/// on the way out, no matter which side ended the connection.
///
/// # Errors
///
/// Returns [`ServerError::Handshake`] when the WebSocket upgrade fails.
/// Everything after the handshake is a normal end of connection, not an
/// error.
pub async fn handle(
    stream: TcpStream,
    peer: SocketAddr,
    commands: mpsc::UnboundedSender<Command>,
    config: ServerConfig,
) -> Result<()> {
    let mut ws = tokio_tungstenite::accept_async(stream)
        .await
        .map_err(|e| ServerError::Handshake(e.to_string()))?;

    let id: ConnectionId = Uuid::new_v4();
    debug!(connection_id = %id, peer = %peer, "WebSocket connection established");

    let (out_tx, out_rx) = mpsc::unbounded_channel::<ServerEvent>();
    let (ack, verdict) = oneshot::channel();
    if commands
        .send(Command::Connect {
            id,
            tx: out_tx.clone(),
            ack,
        })
        .is_err()
    {
        // The coordinator is gone; the server is shutting down.
        return Ok(());
    }

    // No traffic may flow under this id until the registry accepts it. A
    // refusal means a live connection already holds the id, so this one
    // closes without ever issuing a command that could touch the holder.
    if !matches!(verdict.await, Ok(true)) {
        warn!(connection_id = %id, peer = %peer, "registration refused, closing socket");
        let _ = ws.close(None).await;
        return Ok(());
    }

    let (sink, frames) = ws.split();
    let writer = tokio::spawn(write_loop(sink, out_rx, config.ping_interval, id));

    read_loop(frames, id, &commands, &out_tx, config.client_timeout).await;

    // The transport is done in at least one direction. Tell the coordinator,
    // then drop our sender so the writer can drain and exit once the registry
    // releases its clone.
    let _ = commands.send(Command::Disconnect { id });
    drop(out_tx);
    let _ = writer.await;

    debug!(connection_id = %id, "connection tasks finished");
    Ok(())
}

/// Drain the outbound channel onto the socket, pinging between events.
async fn write_loop(
    mut sink: SplitSink<WebSocketStream<TcpStream>, Message>,
    mut events: mpsc::UnboundedReceiver<ServerEvent>,
    ping_interval: Duration,
    id: ConnectionId,
) {
    let mut ping = interval_at(Instant::now() + ping_interval, ping_interval);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            event = events.recv() => {
                // All senders dropped means the connection is being torn down.
                let Some(event) = event else { break };
                let json = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        error!(connection_id = %id, error = %e, "failed to serialize outbound event");
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(json.into())).await {
                    debug!(connection_id = %id, error = %e, "outbound send failed, stopping writer");
                    break;
                }
            }
            _ = ping.tick() => {
                if sink.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
        }
    }

    let _ = sink.close().await;
}

/// Decode inbound frames into commands until the connection ends.
async fn read_loop(
    mut frames: SplitStream<WebSocketStream<TcpStream>>,
    id: ConnectionId,
    commands: &mpsc::UnboundedSender<Command>,
    replies: &mpsc::UnboundedSender<ServerEvent>,
    client_timeout: Duration,
) {
    loop {
        let frame = match tokio::time::timeout(client_timeout, frames.next()).await {
            Ok(frame) => frame,
            Err(_) => {
                debug!(connection_id = %id, "no frames within the keepalive window, dropping client");
                return;
            }
        };

        let msg = match frame {
            Some(Ok(msg)) => msg,
            Some(Err(e)) => {
                debug!(connection_id = %id, error = %e, "transport receive error");
                return;
            }
            None => {
                debug!(connection_id = %id, "transport closed");
                return;
            }
        };

        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientEvent>(text.as_str()) {
                Ok(event) => {
                    if commands.send(Command::Inbound { id, event }).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    // A frame we cannot decode poisons nothing; the sender is
                    // told and the connection carries on.
                    warn!(connection_id = %id, error = %e, "undecodable client frame");
                    let _ = replies.send(ServerEvent::Error {
                        message: UNRECOGNIZED_MESSAGE.to_owned(),
                    });
                }
            },
            Message::Close(frame) => {
                debug!(connection_id = %id, ?frame, "received WebSocket close frame");
                return;
            }
            Message::Ping(_) => {
                // tungstenite auto-queues a Pong reply; no manual response needed.
            }
            Message::Pong(_) => {
                // Keepalive answer; receiving it already reset the timeout.
            }
            Message::Binary(_) => {
                warn!(connection_id = %id, "received unexpected binary WebSocket frame, skipping");
            }
            Message::Frame(_) => {
                // This variant is never produced by the read half of the stream;
                // the arm exists to satisfy exhaustiveness checks.
                debug!(connection_id = %id, "received raw WebSocket frame, skipping");
            }
        }
    }
}
