//! The byte-stream boundary the protocol runs over.
//!
//! One exclusively-owned, ordered, reliable byte pipe. The protocol layer
//! never sees partial reads: `recv_exact` either returns the full count or
//! fails. Timeouts are configured on the concrete transport and surface
//! here as ordinary errors — the protocol does not interpret them.
//!
//! Not thread-safe by design. Every protocol operation is a strict
//! request-then-response round trip over the single handle; a second
//! channel is required for any concurrent access.

/// I/O failure on the link. Propagated to the caller unchanged.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("link i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("short read: wanted {wanted} bytes, link yielded {got}")]
    ShortRead { wanted: usize, got: usize },
}

/// Blocking byte-stream transport.
pub trait Transport {
    /// Write all of `bytes` to the link.
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Read exactly `len` bytes, blocking until satisfied or the
    /// transport's timeout fires. A short read is an error, never a
    /// smaller result.
    fn recv_exact(&mut self, len: usize) -> Result<Vec<u8>, TransportError>;

    /// True if at least one byte can be read without blocking. Never
    /// consumes.
    fn bytes_available(&mut self) -> Result<bool, TransportError>;
}
