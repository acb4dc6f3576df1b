//! Emulated device — a software model of the gateware's debug interface.
//!
//! The emulator consumes the host's byte stream exactly as the hardware
//! does: incrementally, packet by packet, with raw un-framed replies. Tests
//! hold a second handle to the shared state so they can inspect RAM, flip
//! bytes between upload and verify, or set the program counter.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use fpglink_core::transport::{Transport, TransportError};

/// What the device "executes" when it receives START_RUN.
pub enum RunProgram {
    /// Emit a fixed byte string, then the 0x00 terminator.
    Script(Vec<u8>),
    /// Emit the uppercased input stream, then the terminator. Exercises
    /// input delivery and ordering end-to-end.
    UppercaseInput,
}

pub struct EmulatedDevice {
    /// Unparsed bytes from the host.
    rx: Vec<u8>,
    /// Bytes queued for the host.
    tx: VecDeque<u8>,

    ram: HashMap<u32, u8>,
    input: Vec<u8>,
    pub pc: u32,
    pub running: bool,
    pub program: RunProgram,

    /// Corrupt the ping echo (flip the first byte) — simulates a half-dead
    /// link for liveness tests.
    pub mangle_ping: bool,

    /// `(addr, len)` of every UploadRam packet, in arrival order.
    pub ram_writes: Vec<(u32, usize)>,
    /// Payload length of every UploadInput packet, in arrival order.
    pub input_writes: Vec<usize>,
}

/// Cloneable transport handle over the shared device state.
#[derive(Clone)]
pub struct DeviceHandle(Rc<RefCell<EmulatedDevice>>);

impl EmulatedDevice {
    pub fn new(program: RunProgram) -> DeviceHandle {
        DeviceHandle(Rc::new(RefCell::new(Self {
            rx: Vec::new(),
            tx: VecDeque::new(),
            ram: HashMap::new(),
            input: Vec::new(),
            pc: 0,
            running: false,
            program,
            mangle_ping: false,
            ram_writes: Vec::new(),
            input_writes: Vec::new(),
        })))
    }

    pub fn ram_at(&self, addr: u32) -> u8 {
        self.ram.get(&addr).copied().unwrap_or(0)
    }

    pub fn ram_slice(&self, addr: u32, len: usize) -> Vec<u8> {
        (0..len).map(|i| self.ram_at(addr + i as u32)).collect()
    }

    pub fn flip_ram(&mut self, addr: u32) {
        let v = self.ram_at(addr);
        self.ram.insert(addr, v ^ 0xff);
    }

    pub fn input(&self) -> &[u8] {
        &self.input
    }

    /// Parse as many complete packets as the rx buffer holds.
    fn process(&mut self) {
        loop {
            let Some(&tag) = self.rx.first() else { return };
            let consumed = match tag {
                // Ping: [0x00][size:u16][data] — echo data
                0x00 => {
                    let Some((size, payload)) = self.sized_payload(3) else {
                        return;
                    };
                    let mut echo = payload;
                    if self.mangle_ping && !echo.is_empty() {
                        echo[0] ^= 0xff;
                    }
                    self.tx.extend(&echo);
                    3 + size
                }
                // GetPc — 4 raw bytes, little-endian
                0x01 => {
                    let pc = self.pc;
                    self.tx.extend(pc.to_le_bytes());
                    1
                }
                0x03 => {
                    self.running = false;
                    1
                }
                0x04 => {
                    self.running = true;
                    self.emit_output();
                    1
                }
                // UploadInput: [0x05][size:u16][data]
                0x05 => {
                    let Some((size, payload)) = self.sized_payload(3) else {
                        return;
                    };
                    self.input.extend_from_slice(&payload);
                    self.input_writes.push(size);
                    3 + size
                }
                // GetRam: [0x09][addr:u24][size:u16] — reply with raw RAM
                0x09 => {
                    if self.rx.len() < 6 {
                        return;
                    }
                    let (addr, size) = self.addr_size();
                    let reply = self.ram_slice(addr, size);
                    self.tx.extend(&reply);
                    6
                }
                // UploadRam: [0x0A][addr:u24][size:u16][data]
                0x0A => {
                    if self.rx.len() < 6 {
                        return;
                    }
                    let (addr, size) = self.addr_size();
                    if self.rx.len() < 6 + size {
                        return;
                    }
                    assert!(
                        addr as u64 + size as u64 <= 1 << 24,
                        "host wrote past the 24-bit address space"
                    );
                    for (i, &b) in self.rx[6..6 + size].iter().enumerate() {
                        self.ram.insert(addr + i as u32, b);
                    }
                    self.ram_writes.push((addr, size));
                    6 + size
                }
                other => panic!("unknown packet tag {other:#04x}"),
            };
            self.rx.drain(..consumed);
        }
    }

    /// For `[tag][size:u16][payload]` packets: payload if fully arrived.
    fn sized_payload(&self, header: usize) -> Option<(usize, Vec<u8>)> {
        if self.rx.len() < header {
            return None;
        }
        let size = u16::from_le_bytes([self.rx[1], self.rx[2]]) as usize;
        if self.rx.len() < header + size {
            return None;
        }
        Some((size, self.rx[header..header + size].to_vec()))
    }

    /// The packed u24 addr + u16 size header at rx[1..6].
    fn addr_size(&self) -> (u32, usize) {
        let addr =
            self.rx[1] as u32 | (self.rx[2] as u32) << 8 | (self.rx[3] as u32) << 16;
        let size = u16::from_le_bytes([self.rx[4], self.rx[5]]) as usize;
        (addr, size)
    }

    fn emit_output(&mut self) {
        match &self.program {
            RunProgram::Script(bytes) => {
                let bytes = bytes.clone();
                self.tx.extend(&bytes);
            }
            RunProgram::UppercaseInput => {
                let out: Vec<u8> = self.input.iter().map(|b| b.to_ascii_uppercase()).collect();
                self.tx.extend(&out);
            }
        }
        self.tx.push_back(0x00);
    }
}

impl DeviceHandle {
    /// Borrow the device state for inspection or tampering.
    pub fn state(&self) -> std::cell::RefMut<'_, EmulatedDevice> {
        self.0.borrow_mut()
    }
}

impl Transport for DeviceHandle {
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut dev = self.0.borrow_mut();
        dev.rx.extend_from_slice(bytes);
        dev.process();
        Ok(())
    }

    fn recv_exact(&mut self, len: usize) -> Result<Vec<u8>, TransportError> {
        let mut dev = self.0.borrow_mut();
        if dev.tx.len() < len {
            return Err(TransportError::ShortRead {
                wanted: len,
                got: dev.tx.len(),
            });
        }
        Ok(dev.tx.drain(..len).collect())
    }

    fn bytes_available(&mut self) -> Result<bool, TransportError> {
        Ok(!self.0.borrow().tx.is_empty())
    }
}
