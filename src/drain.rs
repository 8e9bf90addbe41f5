//! The drain cycle: read a non-blocking source until it has nothing more to offer.

use bytes::BytesMut;
use std::io::{self, ErrorKind, Read};

/// How a drain cycle ended.
#[derive(Debug)]
pub enum DrainOutcome {
    /// The source reported `WouldBlock`; it stays open.
    Drained,
    /// The peer closed its side (`read` returned 0).
    Closed,
    /// The read failed with something other than `WouldBlock`/`Interrupted`.
    Failed(io::Error),
}

impl DrainOutcome {
    pub fn is_open(&self) -> bool {
        matches!(self, DrainOutcome::Drained)
    }
}

/// Reads `source` chunk by chunk through `buf` and appends every chunk to
/// `into`, stopping at the first `WouldBlock`, EOF or hard error.
///
/// Bytes read before a close or failure are kept in `into`.
pub fn drain<R: Read>(source: &mut R, buf: &mut [u8], into: &mut BytesMut) -> DrainOutcome {
    loop {
        match source.read(buf) {
            Ok(0) => return DrainOutcome::Closed,
            Ok(n) => into.extend_from_slice(&buf[..n]),
            Err(e) if e.kind() == ErrorKind::WouldBlock => return DrainOutcome::Drained,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return DrainOutcome::Failed(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// A reader that replays a fixed script of chunks and errors, then
    /// reports `WouldBlock` forever.
    struct ScriptedReader {
        steps: VecDeque<io::Result<Vec<u8>>>,
        reads: usize,
    }

    impl ScriptedReader {
        fn new(steps: Vec<io::Result<Vec<u8>>>) -> Self {
            ScriptedReader { steps: steps.into(), reads: 0 }
        }
    }

    impl Read for ScriptedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reads += 1;
            match self.steps.pop_front() {
                None => Err(ErrorKind::WouldBlock.into()),
                Some(Err(e)) => Err(e),
                Some(Ok(mut chunk)) => {
                    if chunk.len() > buf.len() {
                        let rest = chunk.split_off(buf.len());
                        self.steps.push_front(Ok(rest));
                    }
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
            }
        }
    }

    #[test]
    fn stops_at_would_block() {
        let mut reader = ScriptedReader::new(vec![Ok(b"hello".to_vec())]);
        let mut buf = [0u8; 16];
        let mut out = BytesMut::new();

        assert!(drain(&mut reader, &mut buf, &mut out).is_open());
        assert_eq!(&out[..], b"hello");
        assert_eq!(reader.reads, 2);
    }

    #[test]
    fn nothing_available_is_an_empty_open_drain() {
        let mut reader = ScriptedReader::new(vec![]);
        let mut buf = [0u8; 16];
        let mut out = BytesMut::new();

        assert!(drain(&mut reader, &mut buf, &mut out).is_open());
        assert!(out.is_empty());
    }

    #[test]
    fn full_buffer_then_more_is_one_payload() {
        let mut payload = vec![b'a'; 8];
        payload.extend_from_slice(b"tail");
        let mut reader = ScriptedReader::new(vec![Ok(payload.clone())]);
        let mut buf = [0u8; 8];
        let mut out = BytesMut::new();

        assert!(drain(&mut reader, &mut buf, &mut out).is_open());
        assert_eq!(&out[..], &payload[..]);
        assert_eq!(reader.reads, 3);
    }

    #[test]
    fn interrupted_reads_are_retried() {
        let mut reader = ScriptedReader::new(vec![
            Ok(b"ab".to_vec()),
            Err(ErrorKind::Interrupted.into()),
            Ok(b"cd".to_vec()),
        ]);
        let mut buf = [0u8; 4];
        let mut out = BytesMut::new();

        assert!(drain(&mut reader, &mut buf, &mut out).is_open());
        assert_eq!(&out[..], b"abcd");
    }

    #[test]
    fn eof_keeps_bytes_read_before_it() {
        let mut reader = ScriptedReader::new(vec![Ok(b"bye".to_vec()), Ok(Vec::new())]);
        let mut buf = [0u8; 4];
        let mut out = BytesMut::new();

        assert!(matches!(drain(&mut reader, &mut buf, &mut out), DrainOutcome::Closed));
        assert_eq!(&out[..], b"bye");
    }

    #[test]
    fn hard_errors_end_the_cycle() {
        let mut reader = ScriptedReader::new(vec![Err(ErrorKind::ConnectionReset.into())]);
        let mut buf = [0u8; 4];
        let mut out = BytesMut::new();

        match drain(&mut reader, &mut buf, &mut out) {
            DrainOutcome::Failed(e) => assert_eq!(e.kind(), ErrorKind::ConnectionReset),
            other => panic!("unexpected outcome {:?}", other),
        }
    }
}
