// === IMPORTS ===

// Readiness selector, its event buffer and the non-blocking TCP types it drives.
use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token};

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::thread::{self, JoinHandle};

// === MODULES ===

pub mod broadcast;
pub mod config;
mod handler;
pub mod registry;
pub mod stats;

use crate::error::RelayError;
use crate::logger::Logger;
use crate::shutdown::ShutdownHandle;
use crate::server::config::ServerConfig;
use crate::server::registry::ConnectionRegistry;
use crate::server::stats::ServerStats;

// === TOKENS ===

pub const LISTENER: Token = Token(0);
pub const WAKER: Token = Token(1);
const FIRST_PEER_TOKEN: usize = 2;

// === SERVER ===

/// The relay: one listener, one poll, one registry, one thread.
///
/// Every accept, read and write happens inside [`Server::run`]; nothing else
/// touches the registry, so it needs no lock.
pub struct Server {
    poll: Poll,
    listener: TcpListener,
    local_addr: SocketAddr,
    registry: ConnectionRegistry<TcpStream>,
    read_buf: Vec<u8>,
    config: ServerConfig,
    shutdown: ShutdownHandle,
    stats: ServerStats,
    logger: Logger,
}

impl Server {
    /// Binds the listener and registers it for accept-readiness.
    pub fn bind(config: ServerConfig, logger: Logger) -> Result<Self, RelayError> {
        config.validate()?;

        // Resolve "host:port" so the OS knows where to listen
        let addr = config.socket_addr()?;
        let mut listener = TcpListener::bind(addr).map_err(|source| RelayError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        let local_addr = listener.local_addr()?;

        let poll = Poll::new()?;
        poll.registry().register(&mut listener, LISTENER, Interest::READABLE)?;
        let shutdown = ShutdownHandle::new(poll.registry(), WAKER)?;

        logger.info(&format!("🚀 Relay server listening on {}", local_addr));

        Ok(Server {
            poll,
            listener,
            local_addr,
            registry: ConnectionRegistry::new(FIRST_PEER_TOKEN),
            read_buf: vec![0u8; config.read_buffer_size],
            config,
            shutdown,
            stats: ServerStats::default(),
            logger,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Counters that stay readable after the server moves to its thread.
    pub fn stats(&self) -> ServerStats {
        self.stats.clone()
    }

    /// Runs the reactor on a dedicated thread.
    pub fn spawn(self) -> std::io::Result<JoinHandle<Result<(), RelayError>>> {
        thread::Builder::new()
            .name("relay-reactor".to_string())
            .spawn(move || self.run())
    }

    /// The event loop. Returns only on a poll failure or a shutdown request.
    pub fn run(mut self) -> Result<(), RelayError> {
        let mut events = Events::with_capacity(self.config.events_capacity);

        loop {
            // The only blocking call in the server
            if let Err(e) = self.poll.poll(&mut events, None) {
                if e.kind() == ErrorKind::Interrupted {
                    continue;
                }
                self.logger.error(&format!("💥 Readiness poll failed, stopping reactor: {}", e));
                return Err(RelayError::Poll(e));
            }

            // Spurious wake-up; nothing to dispatch
            if events.is_empty() {
                continue;
            }

            for event in events.iter() {
                match event.token() {
                    LISTENER => self.accept_pending(),
                    WAKER => {
                        if self.shutdown.is_requested() {
                            self.logger.info("🧹 Server received shutdown signal.");
                            return Ok(());
                        }
                    }
                    token => {
                        if event.is_readable() || event.is_read_closed() || event.is_error() {
                            self.handle_readable(token);
                        }
                        // No-op if the read above evicted the peer
                        if event.is_writable() {
                            self.handle_writable(token);
                        }
                    }
                }
            }
        }
    }
}
