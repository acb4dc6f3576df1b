use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::Args;

use fpglink_core::config::LinkConfig;
use fpglink_core::{Controller, MemoryRange, Output, SessionState, Transport};

/// Load an executable onto the device, verify it, and run it.
#[derive(Args)]
pub struct RunCmd {
    /// Executable to load (ELF unless --raw).
    image: PathBuf,

    /// Input stream file, consumed by the running program.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Treat the image as a flat binary loaded at address 0.
    #[arg(long)]
    raw: bool,

    /// Drop into the r/p/q control loop instead of running to completion.
    #[arg(short, long)]
    interactive: bool,

    /// Serial device (overrides config).
    #[arg(long)]
    port: Option<String>,
}

impl RunCmd {
    pub fn run(self, cfg: &LinkConfig) -> Result<()> {
        let ranges = if self.raw {
            let data = std::fs::read(&self.image)
                .with_context(|| format!("failed to read image {}", self.image.display()))?;
            anyhow::ensure!(!data.is_empty(), "empty ram image");
            vec![MemoryRange::with_content(0, Bytes::from(data))?]
        } else {
            crate::loader::load_ranges(&self.image)?
        };
        let input = match &self.input {
            Some(path) => std::fs::read(path)
                .with_context(|| format!("failed to read input {}", path.display()))?,
            None => Vec::new(),
        };

        let mut session = super::open_session(cfg, self.port)?;
        super::settle(cfg);

        session.upload_image(&ranges)?;
        super::settle(cfg);
        session.push_input(&input)?;
        super::settle(cfg);
        session.verify_image(&ranges)?;

        if self.interactive {
            interactive_loop(&mut session)
        } else {
            run_to_completion(&mut session)
        }
    }
}

/// Start the device and stream its output to stdout until the end-of-stream
/// byte, reporting wall-clock time.
fn run_to_completion<T: Transport>(session: &mut Controller<T>) -> Result<()> {
    session.start()?;
    let started = Instant::now();
    drain_output(session)?;
    tracing::info!(elapsed_ms = started.elapsed().as_millis() as u64, "run complete");
    Ok(())
}

fn drain_output<T: Transport>(session: &mut Controller<T>) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    loop {
        match session.poll_output()? {
            None => std::thread::sleep(Duration::from_millis(1)),
            Some(Output::Byte(b)) => {
                out.write_all(&[b])?;
                out.flush()?;
            }
            Some(Output::End) => break,
        }
    }
    Ok(())
}

/// Bring-up loop: r runs to the end of output, p prints the program
/// counter, q quits.
fn interactive_loop<T: Transport>(session: &mut Controller<T>) -> Result<()> {
    let stdin = std::io::stdin();
    loop {
        println!("enter r to run, p to read pc, q to quit");
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(());
        }
        match line.trim() {
            "q" => return Ok(()),
            "p" => {
                let pc = session.read_pc()?;
                println!("pc: {pc:08x}");
            }
            "r" => {
                let started = Instant::now();
                // already Running after a completed run — START_RUN again
                // would be rejected, and the device is still going anyway
                if session.state() != SessionState::Running {
                    session.start()?;
                }
                drain_output(session)?;
                println!();
                tracing::info!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "run complete"
                );
            }
            "" => {}
            other => println!("unknown command: {other}"),
        }
    }
}
