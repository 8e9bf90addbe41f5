// tests/common/mod.rs

//! Shared fixtures: a relay server on an ephemeral port and raw TCP peers.

#![allow(dead_code)]

use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::mpsc::Receiver;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use relay_reactor::server::config::DEFAULT_WELCOME;
use relay_reactor::{Logger, RelayError, Server, ServerConfig, ServerStats, ShutdownHandle};

pub const IO_TIMEOUT: Duration = Duration::from_secs(5);
pub const QUIET_PERIOD: Duration = Duration::from_millis(250);

pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: ShutdownHandle,
    pub stats: ServerStats,
    pub join: Option<JoinHandle<Result<(), RelayError>>>,
}

impl TestServer {
    pub fn start() -> Self {
        Self::start_with(ServerConfig::default())
    }

    pub fn start_with(config: ServerConfig) -> Self {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..config
        };
        let server = Server::bind(config, Logger).expect("bind test server");
        let addr = server.local_addr();
        let shutdown = server.shutdown_handle();
        let stats = server.stats();
        let join = server.spawn().expect("spawn reactor thread");
        TestServer {
            addr,
            shutdown,
            stats,
            join: Some(join),
        }
    }

    pub fn stop(mut self) -> Result<(), RelayError> {
        self.shutdown.shutdown().expect("wake reactor");
        self.join.take().unwrap().join().expect("reactor thread panicked")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(join) = self.join.take() {
            let _ = self.shutdown.shutdown();
            let _ = join.join();
        }
    }
}

/// Connects a raw peer and consumes its welcome notice, which also proves the
/// server has registered it.
pub fn connect_peer(addr: SocketAddr) -> TcpStream {
    let mut stream = TcpStream::connect(addr).expect("connect peer");
    stream.set_read_timeout(Some(IO_TIMEOUT)).unwrap();
    assert_eq!(read_exactly(&mut stream, DEFAULT_WELCOME.len()), DEFAULT_WELCOME);
    stream
}

pub fn read_exactly(stream: &mut TcpStream, len: usize) -> String {
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf).expect("read expected bytes");
    String::from_utf8(buf).expect("relayed text is UTF-8")
}

pub fn send(stream: &mut TcpStream, text: &str) {
    stream.write_all(text.as_bytes()).expect("send text");
}

/// Asserts nothing arrives on `stream` for a short while.
pub fn assert_silent(stream: &mut TcpStream) {
    stream.set_read_timeout(Some(QUIET_PERIOD)).unwrap();
    let mut buf = [0u8; 256];
    match stream.read(&mut buf) {
        Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
        Ok(n) => panic!("unexpected {} bytes: {:?}", n, String::from_utf8_lossy(&buf[..n])),
        Err(e) => panic!("unexpected read error: {}", e),
    }
    stream.set_read_timeout(Some(IO_TIMEOUT)).unwrap();
}

/// Polls `cond` until it holds or the I/O timeout runs out.
pub fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + IO_TIMEOUT;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    cond()
}

/// Concatenates payloads from a channel sink until `len` bytes have arrived.
pub fn collect_text(rx: &Receiver<String>, len: usize) -> String {
    let deadline = Instant::now() + IO_TIMEOUT;
    let mut text = String::new();
    while text.len() < len {
        let left = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(left) {
            Ok(chunk) => text.push_str(&chunk),
            Err(e) => panic!("only got {:?} before {}", text, e),
        }
    }
    text
}
