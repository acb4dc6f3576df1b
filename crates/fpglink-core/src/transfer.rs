//! Chunked transfer — mapping a logical byte range onto protocol-sized
//! blocks, for upload and for read-back verification.
//!
//! Upload and verify must walk the identical block sequence: the device has
//! no notion of a "range", only of the individual packets, so a verify pass
//! that chunked differently from the upload that produced the data would
//! desynchronize from the 1024-byte stride at the boundary blocks.

use crate::image::MemoryRange;
use crate::transport::{Transport, TransportError};
use crate::wire::{self, WireError, ADDR_SPACE, INPUT_BLOCK, RAM_BLOCK};

// ── Block plan ────────────────────────────────────────────────────────────────

/// One protocol-sized block of a larger transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub addr: u64,
    pub len: usize,
}

/// The ordered block partition of `[start, end)` at a given capacity:
/// contiguous, strictly increasing, every block `capacity` long except
/// possibly the last, which is shorter but never empty.
#[derive(Debug, Clone)]
pub struct TransferPlan {
    next: u64,
    end: u64,
    capacity: usize,
}

impl TransferPlan {
    /// Callers guarantee `end > start` (enforced by [`MemoryRange`]) and
    /// `capacity > 0`.
    pub fn new(start: u64, end: u64, capacity: usize) -> Self {
        debug_assert!(end > start);
        debug_assert!(capacity > 0);
        Self {
            next: start,
            end,
            capacity,
        }
    }
}

impl Iterator for TransferPlan {
    type Item = Block;

    fn next(&mut self) -> Option<Block> {
        if self.next >= self.end {
            return None;
        }
        let len = (self.capacity as u64).min(self.end - self.next) as usize;
        let block = Block {
            addr: self.next,
            len,
        };
        self.next += len as u64;
        Some(block)
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Read-back of `[start, end)` did not match what was written. Fatal to
    /// the load sequence; nothing after the failing block was checked.
    #[error("ram verify mismatch in [{start:#x}, {end:#x})")]
    VerifyMismatch {
        start: u64,
        end: u64,
        expected: Vec<u8>,
        actual: Vec<u8>,
    },
}

// ── Upload ────────────────────────────────────────────────────────────────────

/// Reject a range that does not fit the 24-bit device address space before
/// any packet is built — otherwise the failure would land mid-stream with
/// part of the image already on the wire.
fn check_range(range: &MemoryRange) -> Result<(), WireError> {
    if range.end() > ADDR_SPACE {
        return Err(WireError::AddressOutOfRange {
            start: range.start(),
            end: range.end(),
        });
    }
    Ok(())
}

/// Upload one memory range in 1024-byte blocks. A range without content is
/// synthesized as zeros. Fire-and-forget: the only integrity signal is a
/// later [`verify_ram`] pass.
pub fn upload_ram<T: Transport>(link: &mut T, range: &MemoryRange) -> Result<(), TransferError> {
    check_range(range)?;
    let zeros = [0u8; RAM_BLOCK];
    let base = range.start();
    let mut blocks = 0usize;
    for block in TransferPlan::new(range.start(), range.end(), RAM_BLOCK) {
        let offset = (block.addr - base) as usize;
        let payload = match range.content() {
            Some(bytes) => &bytes[offset..offset + block.len],
            None => &zeros[..block.len],
        };
        let pkt = wire::encode_upload_ram(block.addr as u32, payload)?;
        link.send(&pkt)?;
        tracing::debug!(addr = block.addr, len = block.len, "ram block sent");
        blocks += 1;
    }
    tracing::info!(
        start = range.start(),
        end = range.end(),
        blocks,
        zero_fill = range.content().is_none(),
        "ram range uploaded"
    );
    Ok(())
}

/// Stream the input buffer in 64-byte blocks. Inputs have no address space
/// and are never synthesized — an empty buffer uploads nothing.
pub fn upload_input<T: Transport>(link: &mut T, data: &[u8]) -> Result<(), TransferError> {
    if data.is_empty() {
        tracing::debug!("no input to upload");
        return Ok(());
    }
    for chunk in data.chunks(INPUT_BLOCK) {
        let pkt = wire::encode_upload_input(chunk)?;
        link.send(&pkt)?;
    }
    tracing::info!(bytes = data.len(), "input uploaded");
    Ok(())
}

// ── Verify ────────────────────────────────────────────────────────────────────

/// Read every block of the range back and compare, failing at the first
/// mismatching block. Chunks exactly as [`upload_ram`] does.
pub fn verify_ram<T: Transport>(link: &mut T, range: &MemoryRange) -> Result<(), TransferError> {
    check_range(range)?;
    let zeros = [0u8; RAM_BLOCK];
    let base = range.start();
    for block in TransferPlan::new(range.start(), range.end(), RAM_BLOCK) {
        let pkt = wire::encode_get_ram(block.addr as u32, block.len as u16)?;
        link.send(&pkt)?;
        let actual = link.recv_exact(block.len)?;

        let offset = (block.addr - base) as usize;
        let expected: &[u8] = match range.content() {
            Some(bytes) => &bytes[offset..offset + block.len],
            None => &zeros[..block.len],
        };
        if actual != expected {
            let diff = expected
                .iter()
                .zip(&actual)
                .position(|(e, a)| e != a)
                .unwrap_or(0);
            tracing::warn!(
                addr = block.addr,
                offset = diff,
                expected = hex::encode(&expected[diff..(diff + 8).min(expected.len())]),
                actual = hex::encode(&actual[diff..(diff + 8).min(actual.len())]),
                "ram verify mismatch"
            );
            return Err(TransferError::VerifyMismatch {
                start: block.addr,
                end: block.addr + block.len as u64,
                expected: expected.to_vec(),
                actual,
            });
        }
    }
    tracing::info!(start = range.start(), end = range.end(), "ram range verified");
    Ok(())
}

/// Read `len` bytes starting at `start` into one buffer, chunked at the RAM
/// stride. Debug path — no comparison, the caller interprets the bytes.
pub fn read_ram<T: Transport>(link: &mut T, start: u64, len: u64) -> Result<Vec<u8>, TransferError> {
    if len == 0 {
        return Ok(Vec::new());
    }
    if start + len > ADDR_SPACE {
        return Err(WireError::AddressOutOfRange {
            start,
            end: start + len,
        }
        .into());
    }
    let mut out = Vec::with_capacity(len as usize);
    for block in TransferPlan::new(start, start + len, RAM_BLOCK) {
        let pkt = wire::encode_get_ram(block.addr as u32, block.len as u16)?;
        link.send(&pkt)?;
        out.extend_from_slice(&link.recv_exact(block.len)?);
    }
    Ok(out)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
