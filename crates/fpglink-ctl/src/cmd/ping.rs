use anyhow::Result;
use clap::Args;

use fpglink_core::config::LinkConfig;

/// Check link liveness and exit.
#[derive(Args)]
pub struct PingCmd {
    /// Serial device (overrides config).
    #[arg(long)]
    port: Option<String>,
}

impl PingCmd {
    pub fn run(self, cfg: &LinkConfig) -> Result<()> {
        super::open_session(cfg, self.port)?;
        println!("device alive");
        Ok(())
    }
}
