use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;

use crate::error::RelayError;
use crate::logger::LogConfig;
use crate::server::config::{DEFAULT_PORT, DEFAULT_READ_BUFFER_SIZE, resolve_addr};

/// Where the client connects and how it reads.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Server host to connect to
    pub host: String,

    /// Server port
    pub port: u16,

    /// Size of the receiver's fixed read buffer
    pub read_buffer_size: usize,

    pub log: LogConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            log: LogConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Connect to an already known address, e.g. a server bound to port 0.
    pub fn for_addr(addr: SocketAddr) -> Self {
        ClientConfig {
            host: addr.ip().to_string(),
            port: addr.port(),
            ..ClientConfig::default()
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, RelayError> {
        let config: ClientConfig = serde_json::from_str(raw)?;
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
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, RelayError> {
        resolve_addr(&self.host, self.port)
    }
}
