//! # AIO Devices Binary
//!
//! Brings up the AIO drivers described by a configuration file and
//! performs one device operation, for bench bring-up and inspection.
//!
//! # Usage
//!
//! ```bash
//! # List registered drivers
//! aio_devices --config config/devices.toml list
//!
//! # Read 4 bytes (two samples) from ADC channel 0
//! aio_devices --config config/devices.toml read /dev/serial/aio/in/0 4
//!
//! # Write raw bytes to a loopback instance and read them back
//! aio_devices --config config/devices.toml write /dev/aio/loop/0 1 2 3
//!
//! # Verbose JSON logging
//! aio_devices --config config/devices.toml -v --json ioctl /dev/serial/aio/out/0 1
//! ```

use aio_common::config::{AioConfig, ConfigLoader};
use aio_common::consts::DEFAULT_CONFIG_PATH;
use aio_common::device::OpenFlags;
use aio_common::error::IntoStatus;
use aio_devices::AioDevices;
use aio_devices::drivers::from_config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// AIO Devices - POSIX-like dispatch over pluggable AIO drivers
#[derive(Parser, Debug)]
#[command(name = "aio_devices")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "AIO device dispatch layer with pluggable driver registry")]
#[command(long_about = None)]
struct Args {
    /// Path to the device configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Enable verbose logging (overrides the configured level)
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered drivers
    List,
    /// Read up to N bytes from a device
    Read {
        /// Device path, e.g. /dev/serial/aio/in/0
        path: String,
        /// Maximum number of bytes to read
        count: usize,
    },
    /// Write bytes to a device (read back if the device is readable)
    Write {
        /// Device path
        path: String,
        /// Bytes to write
        bytes: Vec<u8>,
    },
    /// Issue a driver-defined control request without parameter
    Ioctl {
        /// Device path
        path: String,
        /// Request code
        request: i32,
    },
}

fn main() {
    if let Err(e) = run() {
        error!("aio_devices failed: {}", e);
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = AioConfig::load(&args.config)?;
    config.validate()?;

    setup_tracing(&args, &config);
    info!("AIO devices v{} starting...", env!("CARGO_PKG_VERSION"));

    let devices = from_config(&config)?;
    execute(&devices, &args.command)?;

    info!("AIO devices shutdown complete");
    Ok(())
}

fn execute(devices: &AioDevices, command: &Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::List => {
            for (id, desc) in devices.registry().iter() {
                println!(
                    "{id}\t{}\t{} instances\t{:?}{}",
                    desc.root_path(),
                    desc.instances(),
                    desc.capabilities(),
                    if desc.is_exclusive() { "\texclusive" } else { "" }
                );
            }
        }
        Command::Read { path, count } => {
            let handle = devices.open(path, OpenFlags::RDONLY)?;
            let mut buf = vec![0u8; *count];
            let result = devices.read(&handle, &mut buf);
            devices.close(&handle)?;
            let n = result?;
            println!("{n} bytes: {:02x?}", &buf[..n]);
        }
        Command::Write { path, bytes } => {
            let handle = devices
                .open(path, OpenFlags::RDWR)
                .or_else(|_| devices.open(path, OpenFlags::WRONLY))?;
            let written = devices.write(&handle, bytes);
            let written = match written {
                Ok(n) => n,
                Err(e) => {
                    devices.close(&handle)?;
                    return Err(e.into());
                }
            };
            println!("wrote {written} bytes");
            let readback = if handle.mode().can_read() {
                let mut buf = vec![0u8; written];
                devices.read(&handle, &mut buf).map(|n| {
                    buf.truncate(n);
                    Some(buf)
                })
            } else {
                Ok(None)
            };
            devices.close(&handle)?;
            if let Some(buf) = readback? {
                println!("read back {} bytes: {:02x?}", buf.len(), buf);
            }
        }
        Command::Ioctl { path, request } => {
            let handle = devices
                .open(path, OpenFlags::RDONLY)
                .or_else(|_| devices.open(path, OpenFlags::WRONLY))?;
            let result = devices.ioctl(&handle, *request, None);
            devices.close(&handle)?;
            println!("status {}", result.into_status());
            result?;
        }
    }
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments and configured level.
fn setup_tracing(args: &Args, config: &AioConfig) {
    let level = if args.verbose {
        "debug"
    } else {
        config.shared.log_level.as_directive()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
