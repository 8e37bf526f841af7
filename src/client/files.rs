//! Device filesystem operations and file transfer.
//!
//! Paths are absolute on the device SD card: either the root (`""` or
//! `"/"`) or a string that starts with `/` and does not end with one.
//! Malformed paths are rejected before anything is sent.
//!
//! # Completion heuristic
//!
//! The device never acknowledges a `PutFile` upload. It simply stops
//! answering until the data is written. Uploads larger than
//! [`ClientConfig::large_transfer_threshold`] therefore wait
//! [`ClientConfig::settle_delay`] and then list the destination directory;
//! the upload is only reported done once that listing answers.
//!
//! [`ClientConfig::large_transfer_threshold`]: super::ClientConfig::large_transfer_threshold
//! [`ClientConfig::settle_delay`]: super::ClientConfig::settle_delay

// ============================================================================
// Imports
// ============================================================================

use std::path::Path;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::protocol::{DirEntry, Opcode, Request, hex};
use crate::session::SessionState;

use super::Client;
use super::core::Link;

// ============================================================================
// Types
// ============================================================================

/// Summary of a finished upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReport {
    /// Payload size in bytes.
    pub bytes: usize,
    /// Binary frames sent.
    pub chunks: usize,
    /// Whether the completion heuristic ran.
    pub probed: bool,
}

// ============================================================================
// Client - Filesystem
// ============================================================================

impl Client {
    /// Lists a directory, without the `.` and `..` entries.
    ///
    /// Every component of a non-root path is confirmed to exist
    /// (case-insensitively) in its parent before the final listing.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidPath`] for a malformed path, before any I/O
    /// - [`Error::NotReady`] unless attached
    /// - [`Error::NotFound`] if a component does not exist
    pub async fn list(&self, path: &str) -> Result<Vec<DirEntry>> {
        validate_path(path)?;

        let _exchange = self.exchange().await;
        let link = self.require(SessionState::Attached)?;
        self.resolve_dir(&link, path).await
    }

    /// Creates a directory unless it already exists.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidPath`] for a malformed or root path
    /// - [`Error::NotReady`] unless attached
    pub async fn make_dir(&self, path: &str) -> Result<()> {
        validate_target(path)?;

        let _exchange = self.exchange().await;
        let link = self.require(SessionState::Attached)?;

        match self.resolve_dir(&link, path).await {
            Ok(_) => {
                debug!(path, "Directory already exists");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                info!(path, "Creating directory");
                let request = Request::new(Opcode::MakeDir).operand(path);
                self.send_request(&link, &request).await
            }
            Err(e) => Err(e),
        }
    }

    /// Removes a file or an empty directory.
    ///
    /// Best effort: the device does not confirm, and a missing path is
    /// not reported.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidPath`] for a malformed or root path
    /// - [`Error::NotReady`] unless attached
    pub async fn remove(&self, path: &str) -> Result<()> {
        validate_target(path)?;
        info!(path, "Removing");
        self.send_command(Request::new(Opcode::Remove).operand(path))
            .await
    }

    /// Renames a file or directory within its parent directory.
    ///
    /// Best effort, like [`Client::remove`].
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidPath`] for a malformed or root path, or a
    ///   `new_name` that is empty or contains `/`
    /// - [`Error::NotReady`] unless attached
    pub async fn rename(&self, path: &str, new_name: &str) -> Result<()> {
        validate_target(path)?;
        if new_name.is_empty() || new_name.contains('/') {
            return Err(Error::invalid_path(new_name, "new name must be a single path component"));
        }

        info!(path, new_name, "Renaming");
        let request = Request::new(Opcode::Rename)
            .operand(path)
            .operand(new_name);
        self.send_command(request).await
    }

    /// Downloads a file.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidPath`] for a malformed or root path
    /// - [`Error::NotReady`] unless attached
    /// - [`Error::NotFound`] if the device reports no size for the file;
    ///   like any reply failure this drops the connection
    /// - [`Error::ShortRead`] if the bytes that arrive do not match the
    ///   announced size; the connection is dropped
    pub async fn get_file(&self, path: &str) -> Result<Vec<u8>> {
        validate_target(path)?;

        let _exchange = self.exchange().await;
        let link = self.require(SessionState::Attached)?;

        let request = Request::new(Opcode::GetFile).operand(path);
        self.send_request(&link, &request).await?;
        let reply = self.recv_reply(&link, Opcode::GetFile).await?;

        let Some(size) = reply.get(0) else {
            return self.fail(&link, Error::not_found(path)).await;
        };
        let size = match usize::from_str_radix(size, 16) {
            Ok(size) => size,
            Err(_) => {
                let error = Error::protocol(format!("GetFile {path}: bad size \"{size}\""));
                return self.fail(&link, error).await;
            }
        };

        debug!(path, size, "Downloading file");
        self.recv_binary(&link, size, |received| Error::ShortRead {
            address: 0,
            requested: size,
            received,
        })
        .await
    }
}

// ============================================================================
// Client - Upload
// ============================================================================

impl Client {
    /// Uploads a local file to `dst` on the device.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if the local file cannot be read
    /// - everything [`Client::put_file_bytes`] returns
    pub async fn put_file(&self, src: impl AsRef<Path>, dst: &str) -> Result<TransferReport> {
        validate_target(dst)?;
        let data = tokio::fs::read(src.as_ref()).await?;
        debug!(src = %src.as_ref().display(), dst, len = data.len(), "Read local file");
        self.put_file_bytes(&data, dst).await
    }

    /// Uploads `data` to `dst` on the device.
    ///
    /// Streams the data in [`ClientConfig::chunk_size`] frames and runs the
    /// completion heuristic for large uploads.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidPath`] for a malformed or root path
    /// - [`Error::NotReady`] unless attached
    /// - a connection error if any chunk fails to send
    ///
    /// [`ClientConfig::chunk_size`]: super::ClientConfig::chunk_size
    pub async fn put_file_bytes(&self, data: &[u8], dst: &str) -> Result<TransferReport> {
        validate_target(dst)?;

        let _exchange = self.exchange().await;
        let link = self.require(SessionState::Attached)?;

        info!(dst, bytes = data.len(), "Uploading file");
        let request = Request::new(Opcode::PutFile)
            .operand(dst)
            .operand(hex(data.len() as u64));
        self.send_request(&link, &request).await?;

        let mut chunks = 0;
        for chunk in data.chunks(self.inner.config.chunk_size) {
            self.send_binary(&link, chunk.to_vec()).await?;
            chunks += 1;
        }

        let probed = self.needs_completion_probe(data.len());
        if probed {
            self.await_transfer_completion(&link, dst).await?;
        }

        info!(dst, bytes = data.len(), chunks, probed, "Upload finished");
        Ok(TransferReport {
            bytes: data.len(),
            chunks,
            probed,
        })
    }

    /// Returns `true` if an upload of `len` bytes runs the completion
    /// heuristic.
    #[inline]
    #[must_use]
    pub fn needs_completion_probe(&self, len: usize) -> bool {
        len > self.inner.config.large_transfer_threshold
    }

    /// Completion heuristic: waits for the device to settle, then lists
    /// the destination directory.
    async fn await_transfer_completion(&self, link: &Link, dst: &str) -> Result<()> {
        let delay = self.inner.config.settle_delay;
        debug!(dst, delay_ms = delay.as_millis() as u64, "Waiting for upload to settle");

        tokio::time::sleep(delay).await;
        self.query_dir(link, parent_of(dst)).await?;
        Ok(())
    }
}

// ============================================================================
// Client - Internal
// ============================================================================

impl Client {
    /// Confirms each component of `path` exists, then lists it.
    async fn resolve_dir(&self, link: &Link, path: &str) -> Result<Vec<DirEntry>> {
        let mut parent = String::from("/");

        for component in path.split('/').filter(|c| !c.is_empty()) {
            let entries = self.query_dir(link, &parent).await?;
            if !entries.iter().any(|e| e.name.eq_ignore_ascii_case(component)) {
                debug!(path, missing = component, "Path component not found");
                return Err(Error::not_found(path));
            }

            if parent != "/" {
                parent.push('/');
            }
            parent.push_str(component);
        }

        self.query_dir(link, path).await
    }

    /// Issues one `List` query.
    async fn query_dir(&self, link: &Link, path: &str) -> Result<Vec<DirEntry>> {
        let request = Request::new(Opcode::List).operand(path);
        self.send_request(link, &request).await?;
        let reply = self.recv_reply(link, Opcode::List).await?;

        let entries = reply
            .results
            .as_deref()
            .map(DirEntry::from_results)
            .unwrap_or_default();
        debug!(path, count = entries.len(), "Listed directory");
        Ok(entries)
    }
}

// ============================================================================
// Path Validation
// ============================================================================

/// Returns `true` for the two spellings of the root directory.
#[inline]
fn is_root(path: &str) -> bool {
    path.is_empty() || path == "/"
}

/// Accepts the root or an absolute path without a trailing slash.
fn validate_path(path: &str) -> Result<()> {
    if is_root(path) {
        return Ok(());
    }
    if !path.starts_with('/') {
        return Err(Error::invalid_path(path, "path must start with \"/\""));
    }
    if path.ends_with('/') {
        return Err(Error::invalid_path(path, "path must not end with \"/\""));
    }
    Ok(())
}

/// Like [`validate_path`] but also rejects the root.
fn validate_target(path: &str) -> Result<()> {
    if is_root(path) {
        return Err(Error::invalid_path(path, "path cannot be the root directory"));
    }
    validate_path(path)
}

fn parent_of(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some(("", _)) | None => "/",
        Some((dir, _)) => dir,
    }
}

// ============================================================================
// Tests
// ============================================================================
