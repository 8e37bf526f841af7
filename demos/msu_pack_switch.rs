//! MSU-1 pack switch demonstration.
//!
//! Demonstrates:
//! - Connecting, listing devices and attaching
//! - Reading device info
//! - Reading the pack counter and current pack from WRAM
//! - Selecting a new pack with a memory write
//!
//! Usage:
//!   cargo run --example msu_pack_switch
//!   cargo run --example msu_pack_switch -- 2
//!   cargo run --example msu_pack_switch -- --device "SD2SNES COM3" --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use anyhow::{Context, Result, bail};

use common::Args;
use qusb2snes_client::{Client, WriteOp};

// ============================================================================
// Constants
// ============================================================================

/// Pack count followed by the pack currently playing.
const PACK_STATUS: u32 = 0xF650AA;

/// Pack to switch to on the next track change.
const PACK_SELECT: u32 = 0xF650AC;

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== MSU pack switch ===\n");

    let pack: u8 = match args.positional.first() {
        Some(value) => value.parse().context("pack must be a number 0-255")?,
        None => 0,
    };

    let client = Client::builder().url(&args.url).build()?;
    client.connect().await?;

    let devices = client.device_list().await?;
    println!("[Devices] {devices:?}");

    let device = match args.device {
        Some(device) => device,
        None => devices.into_iter().next().context("no device available")?,
    };
    client.attach(&device).await?;
    println!("[Attach]  {device} ({:?})", client.device_kind());

    let info = client.info().await?;
    println!(
        "[Info]    firmware={} rom={}",
        info.firmware_version.as_deref().unwrap_or("?"),
        info.rom_running.as_deref().unwrap_or("?")
    );

    let status = client.get_address(PACK_STATUS, 2).await?;
    let (count, current) = (status[0], status[1]);
    println!("[Packs]   {count} available, playing {current}");

    if count > 0 && pack >= count {
        bail!("pack {pack} out of range, only {count} available");
    }

    client
        .put_address(&[WriteOp::new(PACK_SELECT, [pack])])
        .await?;
    println!("[Switch]  selected pack {pack}");

    client.disconnect().await;
    Ok(())
}
