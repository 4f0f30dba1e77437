//! Single-writer coordination of matchmaking, pairing, and relay.
//!
//! One [`Coordinator`] task owns the [`ConnectionRegistry`] and the
//! [`WaitQueue`]. Connection tasks never touch shared state; they serialize
//! everything into the coordinator's command channel, so each operation below
//! runs to completion before the next begins. Two `start_chat`s can never
//! race for the same queue head, and a disconnect is fully applied before the
//! next relay is examined.
//!
//! Operations return the events they want delivered instead of sending
//! inline; [`Coordinator::handle`] pushes them onto the per-connection
//! outbound channels afterwards. Delivery never blocks the coordinator.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::protocol::{ClientEvent, ConnectionId, EndReason, ServerEvent};
use crate::queue::WaitQueue;
use crate::registry::{ConnectionRegistry, ConnectionState};

/// Rejection text for a `start_chat` sent while already paired.
const ALREADY_IN_CHAT: &str = "You are already in a chat";

// ── Commands ───────────────────────────────────────────────────────────────

/// Everything a connection task can ask of the coordinator.
#[derive(Debug)]
pub enum Command {
    /// A transport finished its handshake; register the connection and greet
    /// the client with its assigned id.
    Connect {
        /// Server-assigned identifier for the new connection.
        id: ConnectionId,
        /// Sender half of the connection's outbound channel.
        tx: mpsc::UnboundedSender<ServerEvent>,
        /// Answered with the registry's verdict. A connection whose id is
        /// refused must close its socket instead of serving traffic under
        /// an id someone else holds.
        ack: oneshot::Sender<bool>,
    },
    /// A decoded client event, attributed to the connection that sent it.
    Inbound {
        /// The originating connection.
        id: ConnectionId,
        /// The decoded event.
        event: ClientEvent,
    },
    /// The transport is gone; release whatever state the connection held.
    Disconnect {
        /// The departed connection.
        id: ConnectionId,
    },
}

/// An outbound event bound for one connection.
#[derive(Debug)]
struct Delivery {
    to: ConnectionId,
    event: ServerEvent,
}

impl Delivery {
    fn new(to: ConnectionId, event: ServerEvent) -> Self {
        Self { to, event }
    }
}

// ── Coordinator ────────────────────────────────────────────────────────────

/// Owner of all shared matchmaking state.
#[derive(Debug, Default)]
pub struct Coordinator {
    registry: ConnectionRegistry,
    queue: WaitQueue,
}

impl Coordinator {
    /// Create a coordinator with no connections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain commands until every sender is dropped.
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        debug!("coordinator started");
        while let Some(command) = commands.recv().await {
            self.handle(command);
        }
        debug!("coordinator stopped");
    }

    /// Apply one command and deliver the events it produced.
    pub fn handle(&mut self, command: Command) {
        let deliveries = match command {
            Command::Connect { id, tx, ack } => self.connect(id, tx, ack),
            Command::Inbound { id, event } => match event {
                ClientEvent::StartChat => self.start_chat(id),
                ClientEvent::NextChat => self.next_chat(id),
                ClientEvent::Signal { to, signal } => self.relay_signal(id, to, signal),
                ClientEvent::SendMessage { message } => self.relay_message(id, message),
            },
            Command::Disconnect { id } => self.disconnect(id),
        };
        self.deliver(deliveries);
    }

    // ── Operations ─────────────────────────────────────────────────────────

    fn connect(
        &mut self,
        id: ConnectionId,
        tx: mpsc::UnboundedSender<ServerEvent>,
        ack: oneshot::Sender<bool>,
    ) -> Vec<Delivery> {
        let accepted = self.registry.register(id, tx);
        let _ = ack.send(accepted);
        if !accepted {
            warn!(connection_id = %id, "duplicate connection id, refusing the newcomer");
            return Vec::new();
        }
        info!(
            connection_id = %id,
            connections = self.registry.len(),
            "client connected"
        );
        vec![Delivery::new(id, ServerEvent::Connected { connection_id: id })]
    }

    fn start_chat(&mut self, id: ConnectionId) -> Vec<Delivery> {
        match self.registry.state(id) {
            None => {
                debug!(connection_id = %id, "start_chat from unknown connection, ignoring");
                Vec::new()
            }
            Some(ConnectionState::Paired { .. }) => {
                debug!(connection_id = %id, "start_chat while paired, rejecting");
                vec![Delivery::new(
                    id,
                    ServerEvent::Error {
                        message: ALREADY_IN_CHAT.to_owned(),
                    },
                )]
            }
            Some(ConnectionState::Waiting) => {
                // Already queued; repeating the request changes nothing.
                debug!(connection_id = %id, "start_chat while already waiting, ignoring");
                Vec::new()
            }
            Some(ConnectionState::Idle) => match self.queue.pop() {
                Some(partner_id) => self.pair(id, partner_id),
                None => {
                    self.queue.enqueue(id);
                    self.registry.transition(id, ConnectionState::Waiting);
                    debug!(connection_id = %id, "queued for matchmaking");
                    vec![Delivery::new(id, ServerEvent::Waiting)]
                }
            },
        }
    }

    /// Form a pairing between `id` and the dequeued `partner_id`.
    ///
    /// Both transitions happen here, in one uninterrupted step, so no other
    /// command can ever observe a half-formed pairing.
    fn pair(&mut self, id: ConnectionId, partner_id: ConnectionId) -> Vec<Delivery> {
        debug_assert_ne!(id, partner_id);
        let room_id = Uuid::new_v4();
        self.registry.transition(
            id,
            ConnectionState::Paired {
                room_id,
                partner_id,
            },
        );
        self.registry.transition(
            partner_id,
            ConnectionState::Paired {
                room_id,
                partner_id: id,
            },
        );
        info!(
            room_id = %room_id,
            a = %partner_id,
            b = %id,
            "pairing formed"
        );
        vec![
            Delivery::new(id, ServerEvent::ChatStarted { room_id }),
            Delivery::new(partner_id, ServerEvent::ChatStarted { room_id }),
            Delivery::new(id, ServerEvent::UserConnected { partner_id }),
            Delivery::new(
                partner_id,
                ServerEvent::UserConnected { partner_id: id },
            ),
        ]
    }

    fn next_chat(&mut self, id: ConnectionId) -> Vec<Delivery> {
        match self.registry.state(id) {
            None => {
                debug!(connection_id = %id, "next_chat from unknown connection, ignoring");
                Vec::new()
            }
            Some(ConnectionState::Paired {
                room_id,
                partner_id,
            }) => {
                let mut deliveries = Vec::new();
                // Partner first, then the acknowledgement to the caller.
                if self
                    .registry
                    .transition(partner_id, ConnectionState::Idle)
                    .is_some()
                {
                    deliveries.push(Delivery::new(
                        partner_id,
                        ServerEvent::ChatEnded {
                            reason: EndReason::PartnerLeft,
                        },
                    ));
                }
                self.registry.transition(id, ConnectionState::Idle);
                deliveries.push(Delivery::new(
                    id,
                    ServerEvent::ChatEnded {
                        reason: EndReason::YouLeft,
                    },
                ));
                info!(
                    room_id = %room_id,
                    leaver = %id,
                    partner = %partner_id,
                    "pairing dissolved"
                );
                deliveries
            }
            Some(ConnectionState::Waiting) => {
                self.queue.remove(id);
                self.registry.transition(id, ConnectionState::Idle);
                debug!(connection_id = %id, "left the matchmaking queue");
                vec![Delivery::new(
                    id,
                    ServerEvent::ChatEnded {
                        reason: EndReason::YouLeft,
                    },
                )]
            }
            // Nothing to leave; repeated next_chat lands here.
            Some(ConnectionState::Idle) => Vec::new(),
        }
    }

    fn relay_signal(
        &mut self,
        id: ConnectionId,
        to: ConnectionId,
        signal: serde_json::Value,
    ) -> Vec<Delivery> {
        match self.registry.state(id) {
            Some(ConnectionState::Paired { partner_id, .. }) if partner_id == to => {
                vec![Delivery::new(to, ServerEvent::Signal { from: id, signal })]
            }
            Some(ConnectionState::Paired { partner_id, .. }) => {
                debug!(
                    from = %id,
                    declared = %to,
                    partner = %partner_id,
                    "signal recipient is not the live partner, dropping"
                );
                Vec::new()
            }
            Some(_) => {
                debug!(from = %id, "signal from unpaired connection, dropping");
                Vec::new()
            }
            None => {
                debug!(from = %id, "signal from unknown connection, ignoring");
                Vec::new()
            }
        }
    }

    fn relay_message(&mut self, id: ConnectionId, message: String) -> Vec<Delivery> {
        match self.registry.state(id) {
            Some(ConnectionState::Paired { partner_id, .. }) => {
                vec![Delivery::new(
                    partner_id,
                    ServerEvent::ReceiveMessage { from: id, message },
                )]
            }
            Some(_) => {
                debug!(from = %id, "chat message from unpaired connection, dropping");
                Vec::new()
            }
            None => {
                debug!(from = %id, "chat message from unknown connection, ignoring");
                Vec::new()
            }
        }
    }

    fn disconnect(&mut self, id: ConnectionId) -> Vec<Delivery> {
        let Some(state) = self.registry.state(id) else {
            debug!(connection_id = %id, "disconnect for unknown connection, ignoring");
            return Vec::new();
        };

        let mut deliveries = Vec::new();
        match state {
            ConnectionState::Paired {
                room_id,
                partner_id,
            } => {
                if self
                    .registry
                    .transition(partner_id, ConnectionState::Idle)
                    .is_some()
                {
                    deliveries.push(Delivery::new(
                        partner_id,
                        ServerEvent::ChatEnded {
                            reason: EndReason::PartnerLeft,
                        },
                    ));
                }
                info!(
                    room_id = %room_id,
                    leaver = %id,
                    partner = %partner_id,
                    "pairing dissolved by disconnect"
                );
            }
            ConnectionState::Waiting => {
                self.queue.remove(id);
            }
            ConnectionState::Idle => {}
        }

        // Removal comes last; every step above must still see the entry.
        self.registry.remove(id);
        info!(
            connection_id = %id,
            connections = self.registry.len(),
            "client disconnected"
        );
        deliveries
    }

    /// Push each event onto its recipient's outbound channel.
    ///
    /// A recipient can vanish between the state change that produced an event
    /// and this point (its channel closes when its writer task exits); such
    /// events are dropped here rather than surfaced to anyone.
    fn deliver(&self, deliveries: Vec<Delivery>) {
        for Delivery { to, event } in deliveries {
            if !self.registry.send(to, event) {
                debug!(connection_id = %to, "dropped event for vanished connection");
            }
        }
    }
}
