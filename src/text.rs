//! Incremental UTF-8 decoding for unframed byte streams.
//!
//! A drain cycle can end in the middle of a multi-byte character. The
//! accumulator decodes everything that is complete and keeps the unfinished
//! tail for the next cycle of the same connection.

use bytes::{Buf, BytesMut};

/// Text decoded from one batch of bytes.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Decoded {
    pub text: String,
    /// Invalid sequences replaced with U+FFFD.
    pub replaced: usize,
}

/// Per-connection decoder state.
#[derive(Debug, Default)]
pub struct Utf8Accumulator {
    pending: BytesMut,
}

impl Utf8Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes of an incomplete character waiting for the next push.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn push(&mut self, bytes: &[u8]) -> Decoded {
        self.pending.extend_from_slice(bytes);
        let mut out = Decoded::default();

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(valid) => {
                    out.text.push_str(valid);
                    self.pending.clear();
                    return out;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.text.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        Some(bad) => {
                            out.text.push(char::REPLACEMENT_CHARACTER);
                            out.replaced += 1;
                            self.pending.advance(valid + bad);
                        }
                        // Incomplete sequence at the end: wait for more bytes
                        None => {
                            self.pending.advance(valid);
                            return out;
                        }
                    }
                }
            }
        }
    }

    /// Flushes a dangling partial character once the stream has ended.
    pub fn finish(&mut self) -> Decoded {
        if self.pending.is_empty() {
            return Decoded::default();
        }
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Decoded { text, replaced: 1 }
    }
}
