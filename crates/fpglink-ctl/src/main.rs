//! fpglink-ctl — command-line driver for the soft-processor debug link.

use anyhow::Result;
use clap::{Parser, Subcommand};

use fpglink_core::config::LinkConfig;

mod cmd;
mod loader;
mod serial;

#[derive(Parser)]
#[command(name = "fpglink-ctl", about = "Host driver for the FPGA soft-processor debug link")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Run(cmd::RunCmd),
    Ping(cmd::PingCmd),
    Pc(cmd::PcCmd),
    Peek(cmd::PeekCmd),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = LinkConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let cfg = LinkConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        LinkConfig::default()
    });

    match Cli::parse().command {
        Command::Run(c) => c.run(&cfg),
        Command::Ping(c) => c.run(&cfg),
        Command::Pc(c) => c.run(&cfg),
        Command::Peek(c) => c.run(&cfg),
    }
}
