use anyhow::Result;
use clap::Args;

use fpglink_core::config::LinkConfig;

/// Read the program counter once.
#[derive(Args)]
pub struct PcCmd {
    /// Serial device (overrides config).
    #[arg(long)]
    port: Option<String>,
}

impl PcCmd {
    pub fn run(self, cfg: &LinkConfig) -> Result<()> {
        let mut session = super::open_session(cfg, self.port)?;
        let pc = session.read_pc()?;
        println!("pc: {pc:08x}");
        Ok(())
    }
}
