//! Error types for the Matchwire server.
//!
//! Protocol-level rejections are never errors here: an invalid request gets
//! an `error` event on the offending connection and the server moves on.
//! These variants cover the listener and handshake faults the server itself
//! can hit.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Faults surfaced by the server itself.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The WebSocket upgrade on a freshly accepted socket failed.
    #[error("WebSocket handshake failed: {0}")]
    Handshake(String),

    /// Listener-level I/O failure (bind, accept, local address).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
