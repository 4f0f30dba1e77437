//! Server configuration.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use tracing::warn;

/// Port used when neither `MATCHWIRE_BIND_ADDR` nor `PORT` is set.
pub const DEFAULT_PORT: u16 = 3002;

const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(25);
const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for a [`MatchwireServer`](crate::server::MatchwireServer).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: SocketAddr,
    /// How often idle client sockets are pinged.
    pub ping_interval: Duration,
    /// How long a connection may stay silent (no frames, pongs included)
    /// before it is treated as lost. Must exceed `ping_interval` or healthy
    /// but quiet clients will be dropped.
    pub client_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            ping_interval: DEFAULT_PING_INTERVAL,
            client_timeout: DEFAULT_CLIENT_TIMEOUT,
        }
    }
}

impl ServerConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from the environment.
    ///
    /// `MATCHWIRE_BIND_ADDR` overrides the full listen address; otherwise
    /// `PORT` overrides just the port. Unparseable values are logged and
    /// fall back to the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(addr) = std::env::var("MATCHWIRE_BIND_ADDR") {
            match addr.parse() {
                Ok(addr) => config.bind_addr = addr,
                Err(_) => warn!(value = %addr, "ignoring unparseable MATCHWIRE_BIND_ADDR"),
            }
        } else if let Ok(port) = std::env::var("PORT") {
            match port.parse::<u16>() {
                Ok(port) => config.bind_addr.set_port(port),
                Err(_) => warn!(value = %port, "ignoring unparseable PORT"),
            }
        }
        config
    }

    /// Set the listen address.
    #[must_use]
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the keepalive ping interval.
    #[must_use]
    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    /// Set the client silence timeout.
    #[must_use]
    pub fn with_client_timeout(mut self, timeout: Duration) -> Self {
        self.client_timeout = timeout;
        self
    }
}
