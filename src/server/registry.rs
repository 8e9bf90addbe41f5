use bytes::{Buf, BytesMut};
use mio::{Interest, Token};
use std::collections::BTreeMap;
use std::io::{self, ErrorKind, Write};
use std::net::SocketAddr;

use crate::text::Utf8Accumulator;

/// Whether everything handed to a peer has reached its socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendState {
    Sent,
    /// Part of the data waits in the outbound queue for a writable event.
    Queued,
}

/// One accepted peer connection.
#[derive(Debug)]
pub struct Peer<S> {
    pub addr: SocketAddr,
    pub stream: S,
    /// Carries an incomplete UTF-8 tail between drain cycles.
    pub decoder: Utf8Accumulator,
    /// Bytes accepted for this peer that its socket has not taken yet.
    pub outbound: BytesMut,
    /// Interest currently registered with the poll.
    pub interest: Interest,
}

impl<S> Peer<S> {
    pub fn new(addr: SocketAddr, stream: S) -> Self {
        Peer {
            addr,
            stream,
            decoder: Utf8Accumulator::new(),
            outbound: BytesMut::new(),
            interest: Interest::READABLE,
        }
    }

    /// Always readable; writable too while the outbound queue is non-empty.
    pub fn wanted_interest(&self) -> Interest {
        if self.outbound.is_empty() {
            Interest::READABLE
        } else {
            Interest::READABLE | Interest::WRITABLE
        }
    }
}

impl<S: Write> Peer<S> {
    /// Sends `bytes` behind anything already queued. Whatever the socket does
    /// not take right now is queued, up to `limit` queued bytes; going past the
    /// limit is an error and the caller drops the peer.
    pub fn send(&mut self, bytes: &[u8], limit: usize) -> io::Result<SendState> {
        let mut rest = bytes;
        if self.outbound.is_empty() {
            let written = write_available(&mut self.stream, rest)?;
            rest = &rest[written..];
        }
        if rest.is_empty() {
            return Ok(SendState::Sent);
        }
        if self.outbound.len() + rest.len() > limit {
            return Err(io::Error::other(format!(
                "outbound queue would exceed {} bytes",
                limit
            )));
        }
        self.outbound.extend_from_slice(rest);
        Ok(SendState::Queued)
    }

    /// Writes as much of the outbound queue as the socket accepts.
    pub fn flush_outbound(&mut self) -> io::Result<SendState> {
        let written = write_available(&mut self.stream, &self.outbound)?;
        self.outbound.advance(written);
        if self.outbound.is_empty() {
            Ok(SendState::Sent)
        } else {
            Ok(SendState::Queued)
        }
    }
}

/// Writes until `bytes` is exhausted or the writer reports `WouldBlock`.
fn write_available<W: Write>(writer: &mut W, bytes: &[u8]) -> io::Result<usize> {
    let mut written = 0;
    while written < bytes.len() {
        match writer.write(&bytes[written..]) {
            Ok(0) => return Err(ErrorKind::WriteZero.into()),
            Ok(n) => written += n,
            Err(e) if e.kind() == ErrorKind::WouldBlock => break,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(written)
}

/// The set of open peer connections, owned by a single reactor thread.
///
/// The listening socket is never stored here, so every entry is a broadcast
/// target candidate. Iteration is in token order, which is accept order.
#[derive(Debug)]
pub struct ConnectionRegistry<S> {
    peers: BTreeMap<Token, Peer<S>>,
    next_token: usize,
}

impl<S> ConnectionRegistry<S> {
    /// Tokens below `first_token` are left to the caller (listener, waker).
    pub fn new(first_token: usize) -> Self {
        ConnectionRegistry {
            peers: BTreeMap::new(),
            next_token: first_token,
        }
    }

    /// Hands out a token that has never been used by this registry.
    pub fn allocate_token(&mut self) -> Token {
        let token = Token(self.next_token);
        self.next_token += 1;
        token
    }

    pub fn insert(&mut self, token: Token, peer: Peer<S>) {
        self.peers.insert(token, peer);
    }

    pub fn get_mut(&mut self, token: Token) -> Option<&mut Peer<S>> {
        self.peers.get_mut(&token)
    }

    pub fn remove(&mut self, token: Token) -> Option<Peer<S>> {
        self.peers.remove(&token)
    }

    pub fn contains(&self, token: Token) -> bool {
        self.peers.contains_key(&token)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn tokens(&self) -> impl Iterator<Item = Token> + '_ {
        self.peers.keys().copied()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (Token, &mut Peer<S>)> {
        self.peers.iter_mut().map(|(token, peer)| (*token, peer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    /// Accepts at most `budget` bytes, then reports `WouldBlock`.
    struct Throttled {
        accepted: Vec<u8>,
        budget: usize,
    }

    impl Write for Throttled {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.budget == 0 {
                return Err(ErrorKind::WouldBlock.into());
            }
            let n = buf.len().min(self.budget);
            self.accepted.extend_from_slice(&buf[..n]);
            self.budget -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn throttled_peer(budget: usize) -> Peer<Throttled> {
        Peer::new(addr(5000), Throttled { accepted: Vec::new(), budget })
    }

    #[test]
    fn tokens_are_never_reused() {
        let mut registry: ConnectionRegistry<Vec<u8>> = ConnectionRegistry::new(2);
        let first = registry.allocate_token();
        registry.insert(first, Peer::new(addr(1), Vec::new()));
        registry.remove(first);

        let second = registry.allocate_token();
        assert_eq!(first, Token(2));
        assert_eq!(second, Token(3));
        assert!(registry.is_empty());
        assert!(!registry.contains(first));
    }

    #[test]
    fn iterates_in_accept_order() {
        let mut registry: ConnectionRegistry<Vec<u8>> = ConnectionRegistry::new(10);
        for port in [3000, 3001, 3002] {
            let token = registry.allocate_token();
            registry.insert(token, Peer::new(addr(port), Vec::new()));
        }

        let ports: Vec<u16> = registry.iter_mut().map(|(_, peer)| peer.addr.port()).collect();
        assert_eq!(ports, vec![3000, 3001, 3002]);
        assert_eq!(registry.tokens().collect::<Vec<_>>(), vec![Token(10), Token(11), Token(12)]);
    }

    #[test]
    fn unsent_tail_is_queued_and_flushed_in_order() {
        let mut peer = throttled_peer(4);

        assert_eq!(peer.send(b"0123456789", 1024).unwrap(), SendState::Queued);
        assert_eq!(&peer.outbound[..], b"456789");
        assert_eq!(peer.wanted_interest(), Interest::READABLE | Interest::WRITABLE);

        // Later data goes behind the queue even if the socket has room again
        peer.stream.budget = 100;
        assert_eq!(peer.send(b"abc", 1024).unwrap(), SendState::Queued);
        assert_eq!(&peer.stream.accepted, b"0123");

        assert_eq!(peer.flush_outbound().unwrap(), SendState::Sent);
        assert_eq!(&peer.stream.accepted, b"0123456789abc");
        assert_eq!(peer.wanted_interest(), Interest::READABLE);
    }

    #[test]
    fn partial_flush_keeps_the_remainder() {
        let mut peer = throttled_peer(0);
        assert_eq!(peer.send(b"hello world", 1024).unwrap(), SendState::Queued);

        peer.stream.budget = 6;
        assert_eq!(peer.flush_outbound().unwrap(), SendState::Queued);
        assert_eq!(&peer.outbound[..], b"world");
    }

    #[test]
    fn queue_limit_is_enforced() {
        let mut peer = throttled_peer(0);
        assert_eq!(peer.send(b"12345678", 10).unwrap(), SendState::Queued);

        let err = peer.send(b"abc", 10).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert_eq!(&peer.outbound[..], b"12345678");
    }

    #[test]
    fn fast_socket_queues_nothing() {
        let mut peer = Peer::new(addr(1), Vec::new());
        assert_eq!(peer.send(b"all at once", 0).unwrap(), SendState::Sent);
        assert!(peer.outbound.is_empty());
        assert_eq!(peer.stream, b"all at once");
    }
}
