use serde::Deserialize;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;

use crate::error::RelayError;
use crate::logger::LogConfig;

/// Sent once to every newly accepted peer.
pub const DEFAULT_WELCOME: &str =
    "You are not in a trust relationship with others in this chat room, please be mindful of privacy.";

pub const DEFAULT_PORT: u16 = 8000;

/// Bytes requested per read call during a drain cycle.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024;

/// Readiness events fetched per poll.
pub const DEFAULT_EVENTS_CAPACITY: usize = 128;

/// Bytes a slow peer may have waiting in its outbound queue before it is dropped.
pub const DEFAULT_MAX_OUTBOUND_BYTES: usize = 64 * 1024 * 1024;

/// Configuration options for the relay server.
///
/// Every key is optional in the JSON form; missing keys take the defaults
/// above.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// IP or hostname to listen on
    pub host: String,

    /// Port number to listen on (0 picks a free port)
    pub port: u16,

    /// Size of the fixed read buffer used by the drain loop
    pub read_buffer_size: usize,

    /// Capacity of the `mio::Events` buffer
    pub events_capacity: usize,

    /// Text written to each peer right after it is registered
    pub welcome_message: String,

    /// Per-peer cap on bytes queued while its socket is full
    pub max_outbound_bytes: usize,

    pub log: LogConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            events_capacity: DEFAULT_EVENTS_CAPACITY,
            welcome_message: DEFAULT_WELCOME.to_string(),
            max_outbound_bytes: DEFAULT_MAX_OUTBOUND_BYTES,
            log: LogConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, RelayError> {
        let config: ServerConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, RelayError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), RelayError> {
        if self.host.trim().is_empty() {
            return Err(RelayError::Config("host must not be empty".into()));
        }
        if self.read_buffer_size == 0 {
            return Err(RelayError::Config("read_buffer_size must be greater than 0".into()));
        }
        if self.events_capacity == 0 {
            return Err(RelayError::Config("events_capacity must be greater than 0".into()));
        }
        if self.max_outbound_bytes == 0 {
            return Err(RelayError::Config("max_outbound_bytes must be greater than 0".into()));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, RelayError> {
        resolve_addr(&self.host, self.port)
    }
}

/// Resolves `host:port` to the first address the system returns.
pub(crate) fn resolve_addr(host: &str, port: u16) -> Result<SocketAddr, RelayError> {
    let addr = format!("{}:{}", host, port);
    addr.to_socket_addrs()?
        .next()
        .ok_or(RelayError::Resolve(addr))
}
