use bytes::BytesMut;
use mio::net::TcpStream;
use mio::{Events, Interest, Poll, Token};
use std::io::ErrorKind;
use std::net::SocketAddr;

use crate::client::sink::TextSink;
use crate::drain::{DrainOutcome, drain};
use crate::error::RelayError;
use crate::logger::Logger;
use crate::shutdown::ShutdownHandle;
use crate::text::Utf8Accumulator;

const STREAM: Token = Token(0);
const WAKER: Token = Token(1);
const EVENTS_CAPACITY: usize = 8;

/// Single-connection reactor for the client's receive path.
pub(crate) struct Receiver<K> {
    poll: Poll,
    stream: TcpStream,
    server_addr: SocketAddr,
    decoder: Utf8Accumulator,
    read_buf: Vec<u8>,
    sink: K,
    shutdown: ShutdownHandle,
    logger: Logger,
}

impl<K: TextSink> Receiver<K> {
    pub(crate) fn new(
        mut stream: TcpStream,
        server_addr: SocketAddr,
        read_buffer_size: usize,
        sink: K,
        logger: Logger,
    ) -> Result<Self, RelayError> {
        let poll = Poll::new()?;
        poll.registry().register(&mut stream, STREAM, Interest::READABLE)?;
        let shutdown = ShutdownHandle::new(poll.registry(), WAKER)?;

        Ok(Receiver {
            poll,
            stream,
            server_addr,
            decoder: Utf8Accumulator::new(),
            read_buf: vec![0u8; read_buffer_size],
            sink,
            shutdown,
            logger,
        })
    }

    pub(crate) fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Loops until the server closes the connection, a read fails, or a
    /// shutdown is requested.
    pub(crate) fn run(mut self) -> Result<(), RelayError> {
        let mut events = Events::with_capacity(EVENTS_CAPACITY);

        loop {
            if let Err(e) = self.poll.poll(&mut events, None) {
                if e.kind() == ErrorKind::Interrupted {
                    continue;
                }
                self.logger.error(&format!("💥 Receiver poll failed: {}", e));
                return Err(RelayError::Poll(e));
            }

            for event in events.iter() {
                match event.token() {
                    STREAM => {
                        if !self.handle_readable() {
                            return Ok(());
                        }
                    }
                    WAKER if self.shutdown.is_requested() => {
                        self.logger.info("🛑 Receiver stopping on request.");
                        return Ok(());
                    }
                    _ => {}
                }
            }
        }
    }

    /// Returns whether the connection is still usable.
    fn handle_readable(&mut self) -> bool {
        let mut raw = BytesMut::new();
        let outcome = drain(&mut self.stream, &mut self.read_buf, &mut raw);

        let mut decoded = self.decoder.push(&raw);
        if !outcome.is_open() {
            let tail = self.decoder.finish();
            decoded.text.push_str(&tail.text);
            decoded.replaced += tail.replaced;
        }
        if decoded.replaced > 0 {
            self.logger.warn(&format!(
                "⚠️ {} invalid UTF-8 sequence(s) from {} replaced.",
                decoded.replaced, self.server_addr
            ));
        }

        let open = match outcome {
            DrainOutcome::Drained => {
                match self.poll.registry().reregister(&mut self.stream, STREAM, Interest::READABLE) {
                    Ok(()) => true,
                    Err(e) => {
                        self.logger.warn(&format!("⚠️ Failed to re-arm {}: {}", self.server_addr, e));
                        false
                    }
                }
            }
            DrainOutcome::Closed => {
                self.logger.info(&format!("⚠️ {} closed the connection.", self.server_addr));
                false
            }
            DrainOutcome::Failed(e) => {
                self.logger.warn(&format!("❌ Error reading from {}: {}", self.server_addr, e));
                false
            }
        };

        if !decoded.text.is_empty() {
            self.sink.deliver(&decoded.text);
        }
        open
    }
}
