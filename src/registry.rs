//! Authoritative store of every live connection and its session state.
//!
//! The registry is the single source of truth for who is connected and what
//! they are doing. Every state mutation in the server goes through
//! [`ConnectionRegistry::transition`]; nothing else touches a connection's
//! state. Pairings are not stored separately, they are derived from the two
//! `Paired` entries that reference each other.

use std::collections::HashMap;

use tokio::sync::mpsc;

use crate::protocol::{ConnectionId, RoomId, ServerEvent};

// ── Session state ──────────────────────────────────────────────────────────

/// What one connection is currently doing.
///
/// The `Paired` variant carries both the room and the partner, so a
/// connection either has a complete pairing or none at all. Half-formed
/// pairings are unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Connected, neither waiting nor paired.
    Idle,
    /// Enqueued for matchmaking.
    Waiting,
    /// Member of an active pairing.
    Paired {
        /// The pairing's correlation id, shared by both members.
        room_id: RoomId,
        /// The other member of the pairing.
        partner_id: ConnectionId,
    },
}

// ── Connections ────────────────────────────────────────────────────────────

/// One live client connection.
#[derive(Debug)]
pub struct Connection {
    /// Identifier assigned at accept time, stable for the connection's life.
    pub id: ConnectionId,
    state: ConnectionState,
    /// Buffered outbound channel drained by the connection's writer task.
    tx: mpsc::UnboundedSender<ServerEvent>,
}

impl Connection {
    /// The connection's current session state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }
}

/// Registry mapping connection ids to live connections.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Connection>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection in the `Idle` state.
    ///
    /// Returns `false` if the id is already taken, in which case the
    /// registry is unchanged and `tx` is dropped.
    pub fn register(&mut self, id: ConnectionId, tx: mpsc::UnboundedSender<ServerEvent>) -> bool {
        if self.connections.contains_key(&id) {
            return false;
        }
        self.connections.insert(
            id,
            Connection {
                id,
                state: ConnectionState::Idle,
                tx,
            },
        );
        true
    }

    /// Look up a connection by id.
    pub fn lookup(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// The session state of `id`, if it is registered.
    pub fn state(&self, id: ConnectionId) -> Option<ConnectionState> {
        self.connections.get(&id).map(|connection| connection.state)
    }

    /// Replace the session state of `id`, returning the prior state.
    ///
    /// Returns `None` for unknown ids, leaving the registry unchanged.
    pub fn transition(
        &mut self,
        id: ConnectionId,
        state: ConnectionState,
    ) -> Option<ConnectionState> {
        let connection = self.connections.get_mut(&id)?;
        Some(std::mem::replace(&mut connection.state, state))
    }

    /// Remove `id` from the registry, returning its entry.
    pub fn remove(&mut self, id: ConnectionId) -> Option<Connection> {
        self.connections.remove(&id)
    }

    /// Deliver `event` to `id`'s outbound channel.
    ///
    /// Returns `false` when the connection is unknown or its writer task is
    /// gone; liveness is checked here, at delivery time, not when the event
    /// was produced.
    pub fn send(&self, id: ConnectionId, event: ServerEvent) -> bool {
        match self.connections.get(&id) {
            Some(connection) => connection.tx.send(event).is_ok(),
            None => false,
        }
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn registered() -> (
        ConnectionRegistry,
        ConnectionId,
        mpsc::UnboundedReceiver<ServerEvent>,
    ) {
        let mut registry = ConnectionRegistry::new();
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        assert!(registry.register(id, tx));
        (registry, id, rx)
    }

    #[test]
    fn register_starts_idle() {
        let (registry, id, _rx) = registered();
        assert_eq!(registry.state(id), Some(ConnectionState::Idle));
        assert_eq!(registry.len(), 1);

        let connection = registry.lookup(id).unwrap();
        assert_eq!(connection.id, id);
        assert_eq!(connection.state(), ConnectionState::Idle);
    }

    #[test]
    fn register_rejects_duplicate_ids() {
        let (mut registry, id, _rx) = registered();
        let (tx, _rx2) = mpsc::unbounded_channel();
        assert!(!registry.register(id, tx));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn transition_returns_prior_state() {
        let (mut registry, id, _rx) = registered();
        let room_id = Uuid::new_v4();
        let partner_id = Uuid::new_v4();

        let prior = registry.transition(id, ConnectionState::Waiting);
        assert_eq!(prior, Some(ConnectionState::Idle));

        let prior = registry.transition(
            id,
            ConnectionState::Paired {
                room_id,
                partner_id,
            },
        );
        assert_eq!(prior, Some(ConnectionState::Waiting));
        assert_eq!(
            registry.state(id),
            Some(ConnectionState::Paired {
                room_id,
                partner_id,
            })
        );
    }

    #[test]
    fn transition_of_unknown_id_is_a_noop() {
        let mut registry = ConnectionRegistry::new();
        assert_eq!(registry.transition(Uuid::new_v4(), ConnectionState::Waiting), None);
    }

    #[test]
    fn send_delivers_to_the_outbound_channel() {
        let (registry, id, mut rx) = registered();
        assert!(registry.send(id, ServerEvent::Waiting));

        let delivered = rx.try_recv().unwrap();
        assert!(matches!(delivered, ServerEvent::Waiting));
    }

    #[test]
    fn send_to_unknown_id_reports_failure() {
        let registry = ConnectionRegistry::new();
        assert!(!registry.send(Uuid::new_v4(), ServerEvent::Waiting));
    }

    #[test]
    fn send_after_receiver_drop_reports_failure() {
        let (registry, id, rx) = registered();
        drop(rx);
        assert!(!registry.send(id, ServerEvent::Waiting));
    }

    #[test]
    fn remove_forgets_the_connection() {
        let (mut registry, id, _rx) = registered();
        assert!(registry.remove(id).is_some());
        assert!(registry.is_empty());
        assert_eq!(registry.state(id), None);
        assert!(registry.remove(id).is_none());
    }
}
