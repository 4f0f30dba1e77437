//! Server assembly: listener, coordinator task, and the accept loop.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::connection;
use crate::coordination::{Command, Coordinator};
use crate::error::Result;

/// The Matchwire server: one listener, one coordinator, and a pair of tasks
/// per connection.
///
/// # Example
///
/// ```rust,no_run
/// # async fn example() -> matchwire_server::Result<()> {
/// use matchwire_server::{MatchwireServer, ServerConfig};
///
/// let server = MatchwireServer::bind(ServerConfig::from_env()).await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug)]
pub struct MatchwireServer {
    listener: TcpListener,
    config: ServerConfig,
}

impl MatchwireServer {
    /// Bind the configured listen address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`](crate::ServerError::Io) when the address
    /// cannot be bound.
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let listener = TcpListener::bind(config.bind_addr).await?;
        info!(addr = %listener.local_addr()?, "matchwire server listening");
        Ok(Self { listener, config })
    }

    /// The address the server is actually bound to.
    ///
    /// Differs from the configured address when binding to port 0.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`](crate::ServerError::Io) if the socket
    /// cannot report its address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the listener fails.
    ///
    /// Runs indefinitely; callers wanting graceful shutdown select against
    /// this future, as the binary does with `ctrl_c`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`](crate::ServerError::Io) when accepting a
    /// connection fails.
    pub async fn run(self) -> Result<()> {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<Command>();
        tokio::spawn(Coordinator::new().run(cmd_rx));

        loop {
            let (stream, peer) = self.listener.accept().await?;
            // Signaling traffic is small and latency-sensitive.
            let _ = stream.set_nodelay(true);
            debug!(peer = %peer, "TCP connection accepted");

            let commands = cmd_tx.clone();
            let config = self.config.clone();
            tokio::spawn(async move {
                if let Err(e) = connection::handle(stream, peer, commands, config).await {
                    warn!(peer = %peer, error = %e, "connection handler failed");
                }
            });
        }
    }
}
