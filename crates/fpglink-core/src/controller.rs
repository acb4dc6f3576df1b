//! Device controller — one session over one exclusively-owned transport.
//!
//! The controller makes the session's state machine explicit:
//!
//! ```text
//! Disconnected ──link──▶ Linked ──load──▶ Loaded ──start──▶ Running
//!                                            ▲                │ ▲
//!                                            └──(reload)   pause │ start
//!                                                              ▼ │
//!                                                             Paused
//! ```
//!
//! An operation issued in the wrong state is rejected before any bytes
//! reach the wire. `Loaded` is only reachable through a successful verify
//! pass — verify is the single integrity gate for the whole upload
//! pipeline.

use crate::image::MemoryRange;
use crate::transfer::{self, TransferError};
use crate::transport::{Transport, TransportError};
use crate::wire::{self, Command, WireError, OUTPUT_END, PC_REPLY_LEN};

// ── Session state ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport owned but liveness unproven.
    Disconnected,
    /// Ping round trip succeeded; device memory content unknown.
    Linked,
    /// Memory image uploaded and verified.
    Loaded,
    Running,
    Paused,
}

/// One byte of the device's output stream, or the end-of-stream marker
/// (a 0x00 byte, by device convention — never surfaced as data).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Byte(u8),
    End,
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// The ping echo came back wrong. Fatal to the session: the link state is
/// unknown, so no further protocol traffic is attempted by the core. Retry
/// policy belongs to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("ping mismatch: sent {:?}, device echoed {:?}",
        String::from_utf8_lossy(.expected), String::from_utf8_lossy(.actual))]
pub struct LivenessError {
    pub expected: Vec<u8>,
    pub actual: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("{op} is not valid while the session is {state:?}")]
    InvalidState {
        op: &'static str,
        state: SessionState,
    },

    #[error(transparent)]
    Liveness(#[from] LivenessError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Wire(#[from] WireError),
}

// ── Controller ────────────────────────────────────────────────────────────────

pub struct Controller<T: Transport> {
    transport: T,
    state: SessionState,
}

impl<T: Transport> Controller<T> {
    /// Take exclusive ownership of an opened transport. Liveness is not
    /// assumed — call [`Controller::link`] first.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: SessionState::Disconnected,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn require(&self, op: &'static str, allowed: &[SessionState]) -> Result<(), ControllerError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(ControllerError::InvalidState {
                op,
                state: self.state,
            })
        }
    }

    /// Liveness check: send a Ping carrying `text`, read back exactly
    /// `text.len()` bytes, require a byte-for-byte echo.
    pub fn link(&mut self, text: &[u8]) -> Result<(), ControllerError> {
        self.require("link", &[SessionState::Disconnected])?;
        let pkt = wire::encode_ping(text)?;
        self.transport.send(&pkt)?;
        let echo = self.transport.recv_exact(text.len())?;
        if echo != text {
            return Err(LivenessError {
                expected: text.to_vec(),
                actual: echo,
            }
            .into());
        }
        self.state = SessionState::Linked;
        tracing::info!(probe = %String::from_utf8_lossy(text), "link alive");
        Ok(())
    }

    /// Upload every range of the image. Leaves the session `Linked`: the
    /// device's memory content is indeterminate until a verify pass says
    /// otherwise, even on a reload.
    pub fn upload_image(&mut self, ranges: &[MemoryRange]) -> Result<(), ControllerError> {
        self.require("upload_image", &[SessionState::Linked, SessionState::Loaded])?;
        self.state = SessionState::Linked;
        for range in ranges {
            transfer::upload_ram(&mut self.transport, range)?;
        }
        Ok(())
    }

    /// Stream the input buffer to the device. Empty input is a no-op.
    pub fn push_input(&mut self, input: &[u8]) -> Result<(), ControllerError> {
        self.require("push_input", &[SessionState::Linked, SessionState::Loaded])?;
        transfer::upload_input(&mut self.transport, input)?;
        Ok(())
    }

    /// Read the whole image back and compare. Success is the only path to
    /// `Loaded`; a mismatch fails fast and leaves the session `Linked`.
    pub fn verify_image(&mut self, ranges: &[MemoryRange]) -> Result<(), ControllerError> {
        self.require("verify_image", &[SessionState::Linked, SessionState::Loaded])?;
        self.state = SessionState::Linked;
        for range in ranges {
            transfer::verify_ram(&mut self.transport, range)?;
        }
        self.state = SessionState::Loaded;
        tracing::info!(ranges = ranges.len(), "image verified, session loaded");
        Ok(())
    }

    /// Full load sequence: upload every range, push the input stream, then
    /// verify every range. Callers that need settle delays between the
    /// phases use the three phase methods directly.
    pub fn load(&mut self, ranges: &[MemoryRange], input: &[u8]) -> Result<(), ControllerError> {
        self.upload_image(ranges)?;
        self.push_input(input)?;
        self.verify_image(ranges)
    }

    /// Start (or resume) execution. No reply is expected.
    pub fn start(&mut self) -> Result<(), ControllerError> {
        self.require("start", &[SessionState::Loaded, SessionState::Paused])?;
        self.transport.send(&wire::encode_command(Command::StartRun))?;
        self.state = SessionState::Running;
        tracing::info!("device running");
        Ok(())
    }

    /// Pause execution. No reply is expected.
    pub fn pause(&mut self) -> Result<(), ControllerError> {
        self.require("pause", &[SessionState::Running])?;
        self.transport.send(&wire::encode_command(Command::PauseRun))?;
        self.state = SessionState::Paused;
        tracing::info!("device paused");
        Ok(())
    }

    /// Read the program counter: bare GET_PC, 4-byte little-endian reply.
    /// Meaningful primarily while running or paused, permitted any time
    /// after the link is up.
    pub fn read_pc(&mut self) -> Result<u32, ControllerError> {
        self.require(
            "read_pc",
            &[
                SessionState::Linked,
                SessionState::Loaded,
                SessionState::Running,
                SessionState::Paused,
            ],
        )?;
        self.transport.send(&wire::encode_command(Command::GetPc))?;
        let reply = self.transport.recv_exact(PC_REPLY_LEN)?;
        let mut raw = [0u8; PC_REPLY_LEN];
        raw.copy_from_slice(&reply);
        Ok(wire::decode_pc(raw))
    }

    /// Non-blocking output poll. `None` when the device has produced
    /// nothing; otherwise exactly one byte is drained. Permitted any time
    /// after the link is up — a paused or freshly loaded device may still
    /// have undrained output sitting in its FIFO.
    pub fn poll_output(&mut self) -> Result<Option<Output>, ControllerError> {
        self.require(
            "poll_output",
            &[
                SessionState::Linked,
                SessionState::Loaded,
                SessionState::Running,
                SessionState::Paused,
            ],
        )?;
        if !self.transport.bytes_available()? {
            return Ok(None);
        }
        let byte = self.transport.recv_exact(1)?[0];
        Ok(Some(if byte == OUTPUT_END {
            Output::End
        } else {
            Output::Byte(byte)
        }))
    }

    /// Debug read-back of an arbitrary device RAM range, chunked like any
    /// other transfer.
    pub fn read_ram(&mut self, addr: u64, len: u64) -> Result<Vec<u8>, ControllerError> {
        self.require(
            "read_ram",
            &[
                SessionState::Linked,
                SessionState::Loaded,
                SessionState::Running,
                SessionState::Paused,
            ],
        )?;
        Ok(transfer::read_ram(&mut self.transport, addr, len)?)
    }

    /// Give the transport back, ending the session.
    pub fn into_transport(self) -> T {
        self.transport
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
