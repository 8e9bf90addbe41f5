//! Error type shared by the server, the client and config loading.

use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Failures that stop a reactor or prevent one from starting.
///
/// Per-connection problems (a peer that fails a read or a write) never become a
/// `RelayError`; they are logged and the peer is evicted.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("readiness poll failed: {0}")]
    Poll(#[source] io::Error),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("no address resolved for {0}")]
    Resolve(String),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("receiver thread for {0} panicked")]
    Receiver(SocketAddr),
}
