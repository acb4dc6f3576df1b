//! Serial transport — the one concrete [`Transport`] the ctl binary ships.
//!
//! Wire characteristics come from [`LinkConfig`]; the defaults (115200
//! 8-O-1) are what the gateware's UART is synthesized for. Read timeouts
//! scale with the requested length so a full 1024-byte block read does not
//! trip the per-read timeout.

use std::io::{Read, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use serialport::{DataBits, SerialPort, StopBits};

use fpglink_core::config::{LinkConfig, Parity};
use fpglink_core::transport::{Transport, TransportError};

pub struct SerialLink {
    port: Box<dyn SerialPort>,
    read_timeout_constant: Duration,
    read_timeout_per_byte: Duration,
}

impl SerialLink {
    /// Open and configure the device named in the config.
    pub fn open(cfg: &LinkConfig) -> Result<Self> {
        let data_bits = match cfg.data_bits {
            5 => DataBits::Five,
            6 => DataBits::Six,
            7 => DataBits::Seven,
            8 => DataBits::Eight,
            other => anyhow::bail!("unsupported data_bits: {other}"),
        };
        let stop_bits = match cfg.stop_bits {
            1 => StopBits::One,
            2 => StopBits::Two,
            other => anyhow::bail!("unsupported stop_bits: {other}"),
        };
        let parity = match cfg.parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        };

        let port = serialport::new(&cfg.port, cfg.baud_rate)
            .data_bits(data_bits)
            .parity(parity)
            .stop_bits(stop_bits)
            .timeout(Duration::from_millis(cfg.write_timeout_ms))
            .open()
            .with_context(|| format!("failed to open serial port {}", cfg.port))?;

        tracing::info!(port = %cfg.port, baud = cfg.baud_rate, "serial link open");
        Ok(Self {
            port,
            read_timeout_constant: Duration::from_millis(cfg.read_timeout_constant_ms),
            read_timeout_per_byte: Duration::from_millis(cfg.read_timeout_per_byte_ms),
        })
    }
}

impl Transport for SerialLink {
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.port.write_all(bytes)?;
        Ok(())
    }

    fn recv_exact(&mut self, len: usize) -> Result<Vec<u8>, TransportError> {
        let timeout = self.read_timeout_constant + self.read_timeout_per_byte * len as u32;
        self.port
            .set_timeout(timeout)
            .map_err(std::io::Error::from)?;
        let mut buf = vec![0u8; len];
        self.port.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn bytes_available(&mut self) -> Result<bool, TransportError> {
        let pending = self.port.bytes_to_read().map_err(std::io::Error::from)?;
        Ok(pending > 0)
    }
}
