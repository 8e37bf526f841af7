//! Shared utilities for demos.
//!
//! Provides common functionality used across all demos:
//! - Command-line argument parsing
//! - Logging initialization
//! - Device path joining

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use tracing_subscriber::EnvFilter;

use qusb2snes_client::client::DEFAULT_URL;

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments for demos.
#[derive(Debug, Clone)]
pub struct Args {
    /// Verbose logging.
    pub debug: bool,
    /// Server endpoint (`--url ws://host:port`).
    pub url: String,
    /// Device to attach to (`--device NAME`); the first listed when unset.
    pub device: Option<String>,
    /// Remaining positional arguments.
    pub positional: Vec<String>,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse() -> Self {
        let mut parsed = Self {
            debug: false,
            url: DEFAULT_URL.to_string(),
            device: None,
            positional: Vec::new(),
        };

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--debug" => parsed.debug = true,
                "--url" => parsed.url = args.next().unwrap_or(parsed.url),
                "--device" => parsed.device = args.next(),
                _ => parsed.positional.push(arg),
            }
        }
        parsed
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Initialize tracing/logging.
pub fn init_logging(debug: bool) {
    let filter = if debug {
        "qusb2snes_client=debug"
    } else {
        "qusb2snes_client=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

/// Whether `dir` names the SD card root.
pub fn is_root(dir: &str) -> bool {
    dir.trim_end_matches('/').is_empty()
}

/// Joins a device directory and a file name.
pub fn device_path(dir: &str, name: &str) -> String {
    format!("{}/{name}", dir.trim_end_matches('/'))
}

// ============================================================================
// Tests
// ============================================================================
