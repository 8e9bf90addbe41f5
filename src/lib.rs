//! A text broadcast relay built on a single-threaded readiness loop.
//!
//! The [`Server`] multiplexes every peer through one `mio::Poll` and rebroadcasts
//! whatever UTF-8 text a peer sends to all other peers. The [`Client`] keeps one
//! connection open and prints what the server relays.
//!
//! The wire carries raw text with no framing: what counts as one payload is
//! whatever arrived within one drain cycle, which depends on OS buffering.

// Declare modules from this crate:
// - `logger`, `server` and `client` are the public surface
// - `drain` and `text` are the read path shared by both reactors
pub mod client;
pub mod drain;
pub mod error;
pub mod logger;
pub mod server;
pub mod shutdown;
pub mod text;

pub use client::Client;
pub use client::config::ClientConfig;
pub use client::sink::{ConsoleSink, TextSink};
pub use error::RelayError;
pub use logger::{LogConfig, Logger, get_logger};
pub use server::Server;
pub use server::config::ServerConfig;
pub use server::stats::ServerStats;
pub use shutdown::ShutdownHandle;
