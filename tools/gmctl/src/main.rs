//! gmctl — клиент /dev/gmdev / /dev/gmdev client
//!
//! Пишет "<pid>\0" в узел устройства; драйвер переключает
//! SIGNAL_UNKILLABLE (Default ↔ Unkillable).
//! Writes "<pid>\0" to the device node; the driver toggles
//! SIGNAL_UNKILLABLE (Default ↔ Unkillable).
//!
//! Исход переключения драйвер не возвращает — смотрите dmesg.
//! The driver does not return the toggle outcome — check dmesg.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;

use gmdev::config::{DATA_MAX, DEFAULT_NODE_PATH};

#[derive(Parser)]
#[command(name = "gmctl")]
#[command(about = "Toggle SIGNAL_UNKILLABLE on a process via the godMode device", long_about = None)]
struct Cli {
    /// Device node
    #[arg(short, long, default_value = DEFAULT_NODE_PATH)]
    device: PathBuf,

    /// Target process ID
    #[arg(allow_negative_numbers = true)]
    pid: i64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let payload = encode_payload(cli.pid)?;
    let written = submit(&cli.device, &payload)?;

    println!(
        "submitted PID {} to {} ({written} bytes); see the kernel log for the result",
        cli.pid,
        cli.device.display()
    );
    Ok(())
}

/// "<pid>\0", не длиннее DATA_MAX / no longer than DATA_MAX
fn encode_payload(pid: i64) -> Result<Vec<u8>> {
    let mut payload = pid.to_string().into_bytes();
    payload.push(0);
    if payload.len() > DATA_MAX {
        bail!("payload of {} bytes exceeds the {DATA_MAX} byte limit", payload.len());
    }
    Ok(payload)
}

fn submit(device: &Path, payload: &[u8]) -> Result<usize> {
    let mut node = match OpenOptions::new().write(true).open(device) {
        Ok(node) => node,
        Err(e) if e.raw_os_error() == Some(gmdev::error::Errno::EBUSY.0) => {
            bail!("{}: device busy, another session is open", device.display())
        }
        Err(e) => return Err(e).with_context(|| format!("opening {}", device.display())),
    };

    // Один write(): драйвер разбирает каждый вызов отдельно.
    // A single write(): the driver parses every call on its own.
    let written = node
        .write(payload)
        .and_then(|n| if n == payload.len() { Ok(n) } else { Err(io::ErrorKind::WriteZero.into()) })
        .with_context(|| format!("writing to {}", device.display()))?;
    Ok(written)
}
