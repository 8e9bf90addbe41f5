use bytes::BytesMut;
use mio::{Interest, Token};
use mio::net::TcpStream;
use std::io::{self, ErrorKind};

use crate::drain::{DrainOutcome, drain};
use crate::server::Server;
use crate::server::broadcast::{broadcast, take_failed};
use crate::server::registry::{Peer, SendState};

/// What a single accept attempt produced.
#[derive(Debug, PartialEq, Eq)]
enum AcceptOutcome {
    Accepted,
    /// A connection was taken off the backlog but could not be kept.
    Discarded,
    /// Nothing more to accept for this readiness event.
    Idle,
}

/// Maps a failed `accept` to what the accept loop does next.
///
/// Errors tied to one aborted handshake leave the rest of the backlog
/// acceptable. Anything else (EMFILE, ENFILE, ENOBUFS) would fail again on the
/// next call, so the loop stops; connections still queued are picked up on the
/// next listener readiness event, i.e. when another client connects.
fn accept_error_outcome(e: &io::Error) -> AcceptOutcome {
    match e.kind() {
        ErrorKind::WouldBlock => AcceptOutcome::Idle,
        ErrorKind::Interrupted | ErrorKind::ConnectionAborted | ErrorKind::ConnectionReset => {
            AcceptOutcome::Discarded
        }
        _ => AcceptOutcome::Idle,
    }
}

impl Server {
    /// mio readiness is edge-triggered, so one listener event may stand for
    /// several queued connections; keep accepting until the backlog is empty.
    pub(super) fn accept_pending(&mut self) {
        while self.accept_one() != AcceptOutcome::Idle {}
    }

    /// Accepts one connection, registers it for read-readiness, then greets it.
    fn accept_one(&mut self) -> AcceptOutcome {
        let (mut stream, addr) = match self.listener.accept() {
            Ok(pair) => pair,
            Err(e) => {
                let outcome = accept_error_outcome(&e);
                match outcome {
                    AcceptOutcome::Discarded => {
                        self.logger.warn(&format!("⚠️ Failed to accept connection: {}", e));
                    }
                    AcceptOutcome::Idle if e.kind() != ErrorKind::WouldBlock => {
                        self.logger.error(&format!(
                            "💥 Failed to accept connection: {}; queued connections wait for the next accept event.",
                            e
                        ));
                    }
                    _ => {}
                }
                return outcome;
            }
        };

        let token = self.registry.allocate_token();
        if let Err(e) = self.poll.registry().register(&mut stream, token, Interest::READABLE) {
            self.logger.warn(&format!("⚠️ Failed to register {}: {}", addr, e));
            return AcceptOutcome::Discarded;
        }
        self.registry.insert(token, Peer::new(addr, stream));
        self.stats.record_accepted(self.registry.len());
        self.logger.info(&format!("🔌 {} connected ({} online).", addr, self.registry.len()));

        let limit = self.config.max_outbound_bytes;
        let greeted = match self.registry.get_mut(token) {
            Some(peer) => peer.send(self.config.welcome_message.as_bytes(), limit),
            None => return AcceptOutcome::Discarded,
        };
        match greeted {
            Ok(SendState::Sent) => {}
            Ok(SendState::Queued) => self.sync_interest(token),
            Err(e) => {
                self.logger.warn(&format!("❌ Failed to send welcome to {}: {}", addr, e));
                self.stats.record_failed_deliveries(1);
                self.evict(token);
                return AcceptOutcome::Discarded;
            }
        }

        AcceptOutcome::Accepted
    }

    /// Drains a readable peer, re-arms it, and fans out whatever text arrived.
    pub(super) fn handle_readable(&mut self, token: Token) {
        // Stale event for a peer evicted earlier in this poll cycle
        let Some(peer) = self.registry.get_mut(token) else {
            return;
        };
        let addr = peer.addr;

        let mut raw = BytesMut::new();
        let outcome = drain(&mut peer.stream, &mut self.read_buf, &mut raw);

        let mut decoded = peer.decoder.push(&raw);
        if !outcome.is_open() {
            let tail = peer.decoder.finish();
            decoded.text.push_str(&tail.text);
            decoded.replaced += tail.replaced;
        }
        if decoded.replaced > 0 {
            self.logger.warn(&format!(
                "⚠️ {} invalid UTF-8 sequence(s) from {} replaced.",
                decoded.replaced, addr
            ));
        }

        let keep = match &outcome {
            DrainOutcome::Drained => {
                let wanted = peer.wanted_interest();
                match self.poll.registry().reregister(&mut peer.stream, token, wanted) {
                    Ok(()) => {
                        peer.interest = wanted;
                        true
                    }
                    Err(e) => {
                        self.logger.warn(&format!("⚠️ Failed to re-arm {}: {}", addr, e));
                        false
                    }
                }
            }
            DrainOutcome::Closed => {
                self.logger.info(&format!("⚠️ {} disconnected gracefully.", addr));
                false
            }
            DrainOutcome::Failed(e) => {
                self.logger.warn(&format!("❌ Error reading from {}: {}", addr, e));
                false
            }
        };

        if !decoded.text.is_empty() {
            self.logger.debug(&format!("📨 From {}: {} bytes", addr, decoded.text.len()));
            let deliveries = broadcast(
                &mut self.registry,
                token,
                &decoded.text,
                self.config.max_outbound_bytes,
                &self.logger,
            );

            let failed = take_failed(&mut self.registry, &deliveries);
            self.stats.record_failed_deliveries(failed.len());
            for (_, peer) in failed {
                self.release(peer);
            }
            for delivery in deliveries.iter().filter(|d| d.is_queued()) {
                self.sync_interest(delivery.token);
            }
        }

        if !keep {
            self.evict(token);
        }
    }

    /// Pushes a peer's outbound queue into its socket once it has room again.
    pub(super) fn handle_writable(&mut self, token: Token) {
        let Some(peer) = self.registry.get_mut(token) else {
            return;
        };
        match peer.flush_outbound() {
            Ok(_) => self.sync_interest(token),
            Err(e) => {
                self.logger.warn(&format!("❌ Failed to send to client {}: {}", peer.addr, e));
                self.stats.record_failed_deliveries(1);
                self.evict(token);
            }
        }
    }

    /// Registers write interest while a peer has queued bytes and drops it
    /// once the queue is empty.
    fn sync_interest(&mut self, token: Token) {
        let Some(peer) = self.registry.get_mut(token) else {
            return;
        };
        let wanted = peer.wanted_interest();
        if wanted == peer.interest {
            return;
        }
        match self.poll.registry().reregister(&mut peer.stream, token, wanted) {
            Ok(()) => peer.interest = wanted,
            Err(e) => {
                self.logger.warn(&format!("⚠️ Failed to re-arm {}: {}", peer.addr, e));
                self.evict(token);
            }
        }
    }

    /// Removes a peer from the registry and the poll; the stream closes on drop.
    pub(super) fn evict(&mut self, token: Token) {
        if let Some(peer) = self.registry.remove(token) {
            self.release(peer);
        }
    }

    /// Deregisters a peer already taken out of the registry.
    fn release(&mut self, mut peer: Peer<TcpStream>) {
        if let Err(e) = self.poll.registry().deregister(&mut peer.stream) {
            self.logger.debug(&format!("Deregistering {} failed: {}", peer.addr, e));
        }
        self.stats.record_evicted(self.registry.len());
        self.logger.info(&format!(
            "{} connection closed ({} online).",
            peer.addr,
            self.registry.len()
        ));
    }
}
