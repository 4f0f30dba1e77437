//! # Matchwire Server
//!
//! In-memory WebSocket matchmaking and signaling relay for anonymous
//! one-on-one chat sessions.
//!
//! Clients hold a persistent WebSocket to this server, ask for a partner
//! with `start_chat`, and are paired with the longest-waiting stranger.
//! Once paired, the server relays opaque session-negotiation payloads and
//! chat text strictly between the two members; media never flows through
//! this process.
//!
//! ## Features
//!
//! - **Single-writer state** — one coordinator task owns all registry and
//!   queue state; connection tasks only exchange messages with it
//! - **FIFO matchmaking** — strict arrival order, no priority tiers
//! - **Scoped relay** — signals and messages are forwarded only between the
//!   two members of a live pairing, never to arbitrary connections
//! - **In-memory only** — no database, no persistence; restart and the
//!   state is gone
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # async fn example() -> matchwire_server::Result<()> {
//! use matchwire_server::{MatchwireServer, ServerConfig};
//!
//! let server = MatchwireServer::bind(ServerConfig::from_env()).await?;
//! server.run().await
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod coordination;
pub mod error;
pub mod protocol;
pub mod queue;
pub mod registry;
pub mod server;

// Re-export primary types for ergonomic imports.
pub use config::ServerConfig;
pub use coordination::{Command, Coordinator};
pub use error::{Result, ServerError};
pub use protocol::{ClientEvent, ConnectionId, EndReason, RoomId, ServerEvent};
pub use server::MatchwireServer;
