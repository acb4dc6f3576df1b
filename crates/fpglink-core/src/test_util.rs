//! Scripted in-memory link for unit tests.

use std::collections::VecDeque;

use crate::transport::{Transport, TransportError};

/// Records everything sent and replays a pre-scripted byte stream on reads.
pub struct ScriptedLink {
    /// One entry per `send` call — the engine writes one packet per send,
    /// so this is the packet log.
    pub sent: Vec<Vec<u8>>,
    /// Flat reply stream, drained by `recv_exact`.
    pub replies: VecDeque<u8>,
}

impl ScriptedLink {
    pub fn new() -> Self {
        Self {
            sent: Vec::new(),
            replies: VecDeque::new(),
        }
    }

    pub fn queue_reply(&mut self, bytes: &[u8]) {
        self.replies.extend(bytes.iter().copied());
    }
}

impl Transport for ScriptedLink {
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.sent.push(bytes.to_vec());
        Ok(())
    }

    fn recv_exact(&mut self, len: usize) -> Result<Vec<u8>, TransportError> {
        if self.replies.len() < len {
            return Err(TransportError::ShortRead {
                wanted: len,
                got: self.replies.len(),
            });
        }
        Ok(self.replies.drain(..len).collect())
    }

    fn bytes_available(&mut self) -> Result<bool, TransportError> {
        Ok(!self.replies.is_empty())
    }
}
