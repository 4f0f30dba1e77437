//! Wire protocol types for the Matchwire signaling protocol.
//!
//! Every event travels as a single JSON text frame shaped
//! `{"type": "<event>", "data": { ... }}`, with `data` omitted for
//! payload-less events. Event names are `snake_case`; payload keys keep the
//! web client's casing (`roomId`, `partnerId`, `connectionId`).
//!
//! Signal payloads are `serde_json::Value` on purpose: the server forwards
//! them between the two members of a pairing without inspecting their
//! contents (SDP offers, ICE candidates, or anything else the clients
//! negotiate).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Type aliases ────────────────────────────────────────────────────

/// Unique identifier for a live client connection, assigned at accept time.
pub type ConnectionId = Uuid;

/// Unique identifier for an active pairing.
pub type RoomId = Uuid;

// ── Enums ───────────────────────────────────────────────────────────

/// Why a pairing ended, from the perspective of the notified client.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The other member left, skipped ahead, or disconnected.
    PartnerLeft,
    /// The notified client ended the chat itself.
    YouLeft,
}

// ── Messages ────────────────────────────────────────────────────────

/// Event types sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Request a partner: pair with the queue head, or start waiting.
    StartChat,
    /// Leave the current pairing (or stop waiting) and return to idle.
    NextChat,
    /// Opaque session-negotiation payload addressed to the current partner.
    ///
    /// `to` must name the caller's live partner; anything else is dropped.
    Signal {
        to: ConnectionId,
        signal: serde_json::Value,
    },
    /// Chat text for the current partner.
    SendMessage { message: String },
}

/// Event types sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// First event on every connection: the id assigned to this client.
    #[serde(rename_all = "camelCase")]
    Connected { connection_id: ConnectionId },
    /// Enqueued; no partner available yet.
    Waiting,
    /// A pairing formed.
    #[serde(rename_all = "camelCase")]
    ChatStarted { room_id: RoomId },
    /// Names the other member of a freshly formed pairing.
    #[serde(rename_all = "camelCase")]
    UserConnected { partner_id: ConnectionId },
    /// The pairing dissolved (or a wait was cancelled).
    ChatEnded { reason: EndReason },
    /// Opaque relayed signal from the partner.
    Signal {
        from: ConnectionId,
        signal: serde_json::Value,
    },
    /// Relayed chat text from the partner.
    ReceiveMessage {
        from: ConnectionId,
        message: String,
    },
    /// An operation was rejected; state is unchanged.
    Error { message: String },
}
