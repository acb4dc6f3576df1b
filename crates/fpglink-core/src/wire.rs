//! fpglink wire format — on-wire shapes for every host→device message.
//!
//! These encodings ARE the protocol. Every tag value, every field width and
//! every capacity limit here matches the debug interface baked into the
//! gateware; changing anything is a breaking change on hardware that cannot
//! be patched in the field.
//!
//! All multi-byte fields are little-endian on the wire. Encoding is explicit
//! byte assembly (shift and mask) rather than repr(C) structs: the UploadRam
//! and GetRam headers pack a 24-bit address against a 16-bit size, and
//! native bit-fields have no portable layout.

// ── Packet tags ───────────────────────────────────────────────────────────────

/// One-byte message tag, first byte of every packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    Ping = 0x00,
    GetPc = 0x01,
    PauseRun = 0x03,
    StartRun = 0x04,
    UploadInput = 0x05,
    GetRam = 0x09,
    UploadRam = 0x0A,
}

impl From<PacketType> for u8 {
    fn from(t: PacketType) -> u8 {
        t as u8
    }
}

/// The bare single-byte commands. Encoding these is infallible — they carry
/// no payload and no parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    GetPc,
    StartRun,
    PauseRun,
}

impl Command {
    pub fn tag(self) -> PacketType {
        match self {
            Command::GetPc => PacketType::GetPc,
            Command::StartRun => PacketType::StartRun,
            Command::PauseRun => PacketType::PauseRun,
        }
    }
}

// ── Capacities ────────────────────────────────────────────────────────────────

/// Maximum Ping payload in bytes.
pub const PING_CAPACITY: usize = 32;

/// Maximum UploadRam / GetRam block payload in bytes. Also the stride used
/// by the chunked transfer engine for RAM traffic.
pub const RAM_BLOCK: usize = 1024;

/// Structural UploadInput payload capacity. The transfer engine chunks
/// input at [`INPUT_BLOCK`], well below this — both limits are real.
pub const INPUT_CAPACITY: usize = 1024;

/// Input chunk stride. The device drains its input FIFO slowly enough that
/// full 1024-byte packets overrun it; 64 is the pacing the hardware keeps
/// up with. Documented contract, not a tunable.
pub const INPUT_BLOCK: usize = 64;

/// Device addresses are 24 bits wide. Exclusive upper bound.
pub const ADDR_SPACE: u64 = 1 << 24;

/// A GET_PC reply is exactly this many raw bytes, little-endian u32.
pub const PC_REPLY_LEN: usize = 4;

/// Output-stream byte that marks end of stream, by device convention.
pub const OUTPUT_END: u8 = 0x00;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Encode-time failures. Nothing has been transmitted when one of these is
/// returned — validation runs before any byte assembly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("payload of {len} bytes exceeds packet capacity {capacity}")]
    PayloadTooLarge { len: usize, capacity: usize },

    #[error("address range [{start:#x}, {end:#x}) exceeds 24-bit device address space")]
    AddressOutOfRange { start: u64, end: u64 },
}

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Append the packed `addr:u24` + `size:u16` header shared by UploadRam and
/// GetRam. 5 bytes, little-endian, fields adjacent — bit-exact with the
/// device's header decoder.
fn put_addr_size(out: &mut Vec<u8>, addr: u32, size: u16) {
    out.push((addr & 0xff) as u8);
    out.push((addr >> 8 & 0xff) as u8);
    out.push((addr >> 16 & 0xff) as u8);
    out.push((size & 0xff) as u8);
    out.push((size >> 8) as u8);
}

fn check_capacity(len: usize, capacity: usize) -> Result<(), WireError> {
    if len > capacity {
        return Err(WireError::PayloadTooLarge { len, capacity });
    }
    Ok(())
}

fn check_addr(addr: u64, len: u64) -> Result<(), WireError> {
    if addr + len > ADDR_SPACE {
        return Err(WireError::AddressOutOfRange {
            start: addr,
            end: addr + len,
        });
    }
    Ok(())
}

/// `[0x00][size:u16][data]` — the device echoes `data` back verbatim.
pub fn encode_ping(data: &[u8]) -> Result<Vec<u8>, WireError> {
    check_capacity(data.len(), PING_CAPACITY)?;
    let mut out = Vec::with_capacity(3 + data.len());
    out.push(PacketType::Ping.into());
    out.extend_from_slice(&(data.len() as u16).to_le_bytes());
    out.extend_from_slice(data);
    Ok(out)
}

/// `[0x0A][addr:u24][size:u16][data]` — write `data` into device RAM at
/// `addr`. Fire-and-forget; the device sends no acknowledgment.
pub fn encode_upload_ram(addr: u32, data: &[u8]) -> Result<Vec<u8>, WireError> {
    check_capacity(data.len(), RAM_BLOCK)?;
    check_addr(addr as u64, data.len() as u64)?;
    let mut out = Vec::with_capacity(6 + data.len());
    out.push(PacketType::UploadRam.into());
    put_addr_size(&mut out, addr, data.len() as u16);
    out.extend_from_slice(data);
    Ok(out)
}

/// `[0x09][addr:u24][size:u16]` — header only. The device answers with
/// exactly `size` raw bytes of RAM content.
pub fn encode_get_ram(addr: u32, size: u16) -> Result<Vec<u8>, WireError> {
    check_capacity(size as usize, RAM_BLOCK)?;
    check_addr(addr as u64, size as u64)?;
    let mut out = Vec::with_capacity(6);
    out.push(PacketType::GetRam.into());
    put_addr_size(&mut out, addr, size);
    Ok(out)
}

/// `[0x05][size:u16][data]` — append `data` to the device's input stream.
/// No address space; the device consumes input in arrival order.
pub fn encode_upload_input(data: &[u8]) -> Result<Vec<u8>, WireError> {
    check_capacity(data.len(), INPUT_CAPACITY)?;
    let mut out = Vec::with_capacity(3 + data.len());
    out.push(PacketType::UploadInput.into());
    out.extend_from_slice(&(data.len() as u16).to_le_bytes());
    out.extend_from_slice(data);
    Ok(out)
}

/// Single-byte command packet.
pub fn encode_command(cmd: Command) -> [u8; 1] {
    [cmd.tag().into()]
}

/// Decode a GET_PC reply: 4 raw bytes, little-endian program counter.
pub fn decode_pc(reply: [u8; PC_REPLY_LEN]) -> u32 {
    u32::from_le_bytes(reply)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
