//! Client side: a blocking send path on the caller's thread and a
//! single-connection receive reactor on its own thread.

use std::io::{ErrorKind, Write};
use std::net::SocketAddr;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub mod config;
mod receiver;
pub mod sink;

use crate::error::RelayError;
use crate::logger::Logger;
use crate::shutdown::ShutdownHandle;
use config::ClientConfig;
use receiver::Receiver;
use sink::TextSink;

/// Back-off when the shared socket reports a full send buffer.
const SEND_RETRY_DELAY: Duration = Duration::from_millis(5);

pub struct Client {
    writer: std::net::TcpStream,
    server_addr: SocketAddr,
    local_addr: SocketAddr,
    shutdown: ShutdownHandle,
    receiver: Option<JoinHandle<Result<(), RelayError>>>,
    logger: Logger,
}

impl Client {
    /// Connects to the server and starts the receiver thread, which hands
    /// every decoded payload to `sink`.
    pub fn connect<K: TextSink>(config: &ClientConfig, sink: K, logger: Logger) -> Result<Self, RelayError> {
        config.validate()?;
        let server_addr = config.socket_addr()?;

        let writer = std::net::TcpStream::connect(server_addr).map_err(|source| RelayError::Connect {
            addr: server_addr.to_string(),
            source,
        })?;
        writer.set_nodelay(true)?;
        let local_addr = writer.local_addr()?;

        // Both handles share one socket, so the writer is non-blocking too
        let reader = writer.try_clone()?;
        reader.set_nonblocking(true)?;
        let stream = mio::net::TcpStream::from_std(reader);

        let receiver = Receiver::new(stream, server_addr, config.read_buffer_size, sink, logger.clone())?;
        let shutdown = receiver.shutdown_handle();
        let handle = thread::Builder::new()
            .name(format!("relay-receiver-{}", local_addr.port()))
            .spawn(move || receiver.run())?;

        logger.info(&format!("🔌 Connected to {} from {}", server_addr, local_addr));

        Ok(Client {
            writer,
            server_addr,
            local_addr,
            shutdown,
            receiver: Some(handle),
            logger,
        })
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Writes `text` as raw UTF-8, with no framing.
    pub fn send(&mut self, text: &str) -> Result<(), RelayError> {
        let mut remaining = text.as_bytes();
        while !remaining.is_empty() {
            match self.writer.write(remaining) {
                Ok(0) => return Err(std::io::Error::from(ErrorKind::WriteZero).into()),
                Ok(n) => remaining = &remaining[n..],
                Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(SEND_RETRY_DELAY),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    self.logger.warn(&format!("❌ Failed to send to {}: {}", self.server_addr, e));
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }

    /// True once the receiver thread has stopped, e.g. because the server
    /// closed the connection.
    pub fn is_receiver_finished(&self) -> bool {
        self.receiver.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Stops the receiver thread and waits for it.
    pub fn shutdown(mut self) -> Result<(), RelayError> {
        self.stop_and_join()
    }

    fn stop_and_join(&mut self) -> Result<(), RelayError> {
        let Some(handle) = self.receiver.take() else {
            return Ok(());
        };
        if !handle.is_finished() {
            self.shutdown.shutdown()?;
        }
        handle.join().map_err(|_| RelayError::Receiver(self.server_addr))?
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Err(e) = self.stop_and_join() {
            self.logger.warn(&format!("⚠️ Receiver for {} ended with error: {}", self.server_addr, e));
        }
    }
}
