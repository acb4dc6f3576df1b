use anyhow::Result;
use clap::Args;

use fpglink_core::config::LinkConfig;

/// Hex-dump a range of device RAM.
#[derive(Args)]
pub struct PeekCmd {
    /// Start address (hex with 0x prefix, or decimal).
    #[arg(value_parser = super::parse_addr)]
    addr: u64,

    /// Number of bytes to read.
    #[arg(value_parser = super::parse_addr, default_value = "64")]
    len: u64,

    /// Serial device (overrides config).
    #[arg(long)]
    port: Option<String>,
}

impl PeekCmd {
    pub fn run(self, cfg: &LinkConfig) -> Result<()> {
        let mut session = super::open_session(cfg, self.port)?;
        let bytes = session.read_ram(self.addr, self.len)?;
        dump(self.addr, &bytes);
        Ok(())
    }
}

fn dump(base: u64, bytes: &[u8]) {
    for (i, row) in bytes.chunks(16).enumerate() {
        let ascii: String = row
            .iter()
            .map(|&b| if (0x20..0x7f).contains(&b) { b as char } else { '.' })
            .collect();
        println!(
            "{:08x}  {:<47}  |{}|",
            base + (i * 16) as u64,
            hex_row(row),
            ascii
        );
    }
}

fn hex_row(row: &[u8]) -> String {
    row.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}
