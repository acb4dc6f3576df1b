//! Subcommand implementations.

mod peek;
mod ping;
mod pc;
mod run;

pub use peek::PeekCmd;
pub use ping::PingCmd;
pub use pc::PcCmd;
pub use run::RunCmd;

use anyhow::Result;
use fpglink_core::config::LinkConfig;
use fpglink_core::Controller;

use crate::serial::SerialLink;

/// Open the serial port and prove liveness. Every subcommand starts here —
/// the device cannot be trusted with anything until the ping echoes.
fn open_session(cfg: &LinkConfig, port: Option<String>) -> Result<Controller<SerialLink>> {
    let mut cfg = cfg.clone();
    if let Some(port) = port {
        cfg.port = port;
    }
    let link = SerialLink::open(&cfg)?;
    let mut session = Controller::new(link);
    session.link(cfg.ping_text.as_bytes())?;
    Ok(session)
}

/// Pause between session phases so the device can drain its FIFOs.
fn settle(cfg: &LinkConfig) {
    if cfg.settle_ms > 0 {
        std::thread::sleep(std::time::Duration::from_millis(cfg.settle_ms));
    }
}

/// Accept `0x`-prefixed hex or plain decimal.
fn parse_addr(s: &str) -> Result<u64, std::num::ParseIntError> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    }
}
