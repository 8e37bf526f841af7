//! File transfer demonstration.
//!
//! Demonstrates:
//! - Creating a directory on the SD card
//! - Uploading a local file, with the completion probe for large files
//! - Listing the destination directory
//! - Downloading the file back and comparing
//!
//! Usage:
//!   cargo run --example put_file -- <local file> <device dir>
//!   cargo run --example put_file -- game.sfc /romloader --debug
//!   cargo run --example put_file -- game.sfc /

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::path::Path;

use anyhow::{Context, Result, bail};

use common::Args;
use qusb2snes_client::Client;

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
    println!("=== PutFile ===\n");

    let [src, dir] = args.positional.as_slice() else {
        bail!("usage: put_file <local file> <device dir>");
    };
    let name = Path::new(src)
        .file_name()
        .and_then(|n| n.to_str())
        .context("source has no file name")?;
    let dst = common::device_path(dir, name);

    let client = Client::builder().url(&args.url).build()?;
    client.connect().await?;

    let device = match args.device {
        Some(device) => device,
        None => client
            .device_list()
            .await?
            .into_iter()
            .next()
            .context("no device available")?,
    };
    client.attach(&device).await?;
    println!("[Attach]   {device}");

    if !common::is_root(dir) {
        client.make_dir(dir).await?;
    }

    let report = client.put_file(src, &dst).await?;
    println!(
        "[Upload]   {} bytes in {} chunks{}",
        report.bytes,
        report.chunks,
        if report.probed { ", completion probed" } else { "" }
    );

    for entry in client.list(dir).await? {
        let kind = if entry.is_dir() { "dir " } else { "file" };
        println!("[List]     {kind} {}", entry.name);
    }

    let local = tokio::fs::read(src).await?;
    let remote = client.get_file(&dst).await?;
    if local != remote {
        bail!("downloaded copy differs from {src}");
    }
    println!("[Verify]   {dst} matches");

    client.disconnect().await;
    Ok(())
}
