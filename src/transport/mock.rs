//! In-process QUsb2snes emulator for tests.
//!
//! [`MockDevice`] is a [`Connector`] whose connections talk to a small
//! model of a QUsb2snes server: a device list, device info, console
//! memory (including execution of compiled SD2SNES routines), and a
//! case-insensitive filesystem. Every frame the client sends is logged.

// ============================================================================
// Imports
// ============================================================================

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::protocol::WRAM_START;

use super::{Connector, Frame, FrameSink, FrameStream};

// ============================================================================
// Constants
// ============================================================================

const CONSOLE_WRAM: u32 = 0x7E0000;
const PREAMBLE_LEN: usize = 6;
const DEFAULT_READ_CHUNK: usize = 1024;

// ============================================================================
// Model
// ============================================================================

/// What the next binary frame means.
#[derive(Debug, Default)]
enum Pending {
    #[default]
    None,
    /// Memory write of `remaining` bytes at `address`.
    Write { address: u32, remaining: usize },
    /// Compiled SD2SNES routine.
    Command,
    /// File upload.
    Upload {
        path: String,
        size: usize,
        data: Vec<u8>,
    },
}

#[derive(Debug)]
struct Model {
    connects: usize,
    refuse: bool,
    silent: bool,
    fail_sends: bool,
    withheld: usize,
    surplus: usize,
    read_chunk: usize,
    file_size: Option<String>,

    devices: Vec<String>,
    info: Vec<String>,
    memory: HashMap<u32, u8>,
    /// Lower-cased path to display path.
    dirs: BTreeMap<String, String>,
    /// Lower-cased path to display path and contents.
    files: BTreeMap<String, (String, Vec<u8>)>,
    pending: Pending,
    commands_run: usize,

    received: Vec<Frame>,
    replies: Option<mpsc::UnboundedSender<Frame>>,
    client_closed: bool,
    stream_dropped: bool,
}

impl Default for Model {
    fn default() -> Self {
        let mut dirs = BTreeMap::new();
        dirs.insert("/".to_string(), "/".to_string());

        Self {
            connects: 0,
            refuse: false,
            silent: false,
            fail_sends: false,
            withheld: 0,
            surplus: 0,
            read_chunk: DEFAULT_READ_CHUNK,
            file_size: None,
            devices: vec!["SD2SNES COM3".to_string()],
            info: vec![
                "1.10.3".to_string(),
                "USB v11".to_string(),
                "/sd2snes/m3nu.bin".to_string(),
            ],
            memory: HashMap::new(),
            dirs,
            files: BTreeMap::new(),
            pending: Pending::None,
            commands_run: 0,
            received: Vec::new(),
            replies: None,
            client_closed: false,
            stream_dropped: false,
        }
    }
}

// ============================================================================
// MockDevice
// ============================================================================

/// Shared handle to an emulated QUsb2snes server.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockDevice {
    model: Arc<Mutex<Model>>,
}

impl MockDevice {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------------
    // Setup
    // ------------------------------------------------------------------------

    pub(crate) fn with_devices(self, devices: &[&str]) -> Self {
        self.model.lock().devices = devices.iter().map(|d| d.to_string()).collect();
        self
    }

    pub(crate) fn with_info(self, info: &[&str]) -> Self {
        self.model.lock().info = info.iter().map(|i| i.to_string()).collect();
        self
    }

    pub(crate) fn with_dir(self, path: &str) -> Self {
        self.model.lock().make_dir(path);
        self
    }

    pub(crate) fn with_file(self, path: &str, data: &[u8]) -> Self {
        self.model.lock().store_file(path, data.to_vec());
        self
    }

    /// Refuses new connections.
    pub(crate) fn refuse_connections(&self, refuse: bool) {
        self.model.lock().refuse = refuse;
    }

    /// Swallows every reply.
    pub(crate) fn set_silent(&self, silent: bool) {
        self.model.lock().silent = silent;
    }

    /// Makes every client send fail.
    pub(crate) fn fail_sends(&self, fail: bool) {
        self.model.lock().fail_sends = fail;
    }

    /// Drops the last `bytes` bytes of every memory read reply.
    pub(crate) fn withhold_bytes(&self, bytes: usize) {
        self.model.lock().withheld = bytes;
    }

    /// Appends `bytes` unrequested bytes to every memory read reply.
    pub(crate) fn surplus_bytes(&self, bytes: usize) {
        self.model.lock().surplus = bytes;
    }

    /// Announces `size` in every GetFile reply instead of the real size.
    pub(crate) fn announce_file_size(&self, size: &str) {
        self.model.lock().file_size = Some(size.to_string());
    }

    /// Sends an unsolicited frame on the current connection.
    pub(crate) fn inject(&self, frame: Frame) {
        if let Some(tx) = &self.model.lock().replies {
            let _ = tx.send(frame);
        }
    }

    /// Splits memory read replies into frames of at most `bytes` bytes.
    pub(crate) fn set_read_chunk(&self, bytes: usize) {
        self.model.lock().read_chunk = bytes.max(1);
    }

    /// Ends the current connection from the server side.
    pub(crate) fn drop_connection(&self) {
        self.model.lock().replies = None;
    }

    pub(crate) fn write_memory(&self, address: u32, data: &[u8]) {
        self.model.lock().write(address, data);
    }

    // ------------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------------

    pub(crate) fn connects(&self) -> usize {
        self.model.lock().connects
    }

    pub(crate) fn client_closed(&self) -> bool {
        self.model.lock().client_closed
    }

    pub(crate) fn stream_dropped(&self) -> bool {
        self.model.lock().stream_dropped
    }

    /// Number of frames received from the client.
    pub(crate) fn received_count(&self) -> usize {
        self.model.lock().received.len()
    }

    /// Every text frame received, decoded.
    pub(crate) fn requests(&self) -> Vec<Value> {
        self.model
            .lock()
            .received
            .iter()
            .filter_map(|frame| match frame {
                Frame::Text(text) => serde_json::from_str(text).ok(),
                Frame::Binary(_) => None,
            })
            .collect()
    }

    /// Every binary frame received.
    pub(crate) fn payloads(&self) -> Vec<Vec<u8>> {
        self.model
            .lock()
            .received
            .iter()
            .filter_map(|frame| match frame {
                Frame::Binary(data) => Some(data.clone()),
                Frame::Text(_) => None,
            })
            .collect()
    }

    pub(crate) fn read_memory(&self, address: u32, len: usize) -> Vec<u8> {
        self.model.lock().read(address, len)
    }

    pub(crate) fn commands_run(&self) -> usize {
        self.model.lock().commands_run
    }

    pub(crate) fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.model
            .lock()
            .files
            .get(&path.to_lowercase())
            .map(|(_, data)| data.clone())
    }

    pub(crate) fn has_dir(&self, path: &str) -> bool {
        self.model.lock().dirs.contains_key(&normalize(path))
    }
}

#[async_trait]
impl Connector for MockDevice {
    async fn connect(&self, _url: &str) -> Result<(Box<dyn FrameSink>, Box<dyn FrameStream>)> {
        let mut model = self.model.lock();
        if model.refuse {
            return Err(Error::connection("Connection refused"));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        model.connects += 1;
        model.replies = Some(tx);
        model.client_closed = false;
        model.stream_dropped = false;
        model.pending = Pending::None;

        let sink = MockSink {
            model: Arc::clone(&self.model),
            connection: model.connects,
            closed: false,
        };
        let stream = MockStream {
            model: Arc::clone(&self.model),
            rx,
        };
        Ok((Box::new(sink), Box::new(stream)))
    }
}

// ============================================================================
// MockSink / MockStream
// ============================================================================

struct MockSink {
    model: Arc<Mutex<Model>>,
    connection: usize,
    closed: bool,
}

#[async_trait]
impl FrameSink for MockSink {
    async fn send(&mut self, frame: Frame) -> Result<()> {
        if self.closed {
            return Err(Error::ConnectionClosed);
        }

        let mut model = self.model.lock();
        if model.fail_sends {
            self.closed = true;
            return Err(Error::connection("Broken pipe"));
        }

        model.received.push(frame.clone());
        let replies = model.handle(frame);

        if !model.silent
            && let Some(tx) = &model.replies
        {
            for reply in replies {
                let _ = tx.send(reply);
            }
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        let mut model = self.model.lock();
        model.client_closed = true;
        if model.connects == self.connection {
            model.replies = None;
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

struct MockStream {
    model: Arc<Mutex<Model>>,
    rx: mpsc::UnboundedReceiver<Frame>,
}

#[async_trait]
impl FrameStream for MockStream {
    async fn next_frame(&mut self) -> Option<Result<Frame>> {
        self.rx.recv().await.map(Ok)
    }
}

impl Drop for MockStream {
    fn drop(&mut self) {
        self.model.lock().stream_dropped = true;
    }
}

// ============================================================================
// Server Emulation
// ============================================================================

impl Model {
    fn handle(&mut self, frame: Frame) -> Vec<Frame> {
        match frame {
            Frame::Text(text) => match serde_json::from_str::<Value>(&text) {
                Ok(request) => self.handle_request(&request),
                Err(_) => Vec::new(),
            },
            Frame::Binary(data) => {
                self.handle_payload(data);
                Vec::new()
            }
        }
    }

    fn handle_request(&mut self, request: &Value) -> Vec<Frame> {
        let operands: Vec<String> = request["Operands"]
            .as_array()
            .map(|ops| {
                ops.iter()
                    .filter_map(|op| op.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        let operand = |i: usize| operands.get(i).cloned().unwrap_or_default();

        match request["Opcode"].as_str().unwrap_or_default() {
            "DeviceList" => vec![results(&self.devices)],
            "Info" => vec![results(&self.info)],

            "GetAddress" => {
                let size = parse_hex(&operand(1)) as usize;
                let mut data = self.read(parse_hex(&operand(0)), size);
                data.truncate(size.saturating_sub(self.withheld));
                data.resize(data.len() + self.surplus, 0xFF);
                data.chunks(self.read_chunk)
                    .map(|chunk| Frame::Binary(chunk.to_vec()))
                    .collect()
            }

            "PutAddress" if request["Space"] == "CMD" => {
                self.pending = Pending::Command;
                Vec::new()
            }

            "PutAddress" => {
                self.pending = Pending::Write {
                    address: parse_hex(&operand(0)),
                    remaining: parse_hex(&operand(1)) as usize,
                };
                Vec::new()
            }

            "List" => {
                let entries = self.list(&operand(0)).unwrap_or_default();
                vec![results(&entries)]
            }

            "MakeDir" => {
                self.make_dir(&operand(0));
                Vec::new()
            }

            "Remove" => {
                let key = normalize(&operand(0));
                self.files.remove(&key);
                self.dirs.remove(&key);
                Vec::new()
            }

            "Rename" => {
                self.rename(&operand(0), &operand(1));
                Vec::new()
            }

            "PutFile" => {
                let path = operand(0);
                let size = parse_hex(&operand(1)) as usize;
                if size == 0 {
                    self.store_file(&path, Vec::new());
                } else {
                    self.pending = Pending::Upload {
                        path,
                        size,
                        data: Vec::with_capacity(size),
                    };
                }
                Vec::new()
            }

            "GetFile" => match self.files.get(&normalize(&operand(0))) {
                Some((_, data)) => {
                    let size = self
                        .file_size
                        .clone()
                        .unwrap_or_else(|| format!("{:x}", data.len()));
                    let mut frames = vec![results(&[size])];
                    frames.extend(
                        data.chunks(self.read_chunk)
                            .map(|chunk| Frame::Binary(chunk.to_vec())),
                    );
                    frames
                }
                None => vec![results(&[])],
            },

            _ => Vec::new(),
        }
    }

    fn handle_payload(&mut self, data: Vec<u8>) {
        match std::mem::take(&mut self.pending) {
            Pending::None => {}

            Pending::Write { address, remaining } => {
                let take = remaining.min(data.len());
                self.write(address, &data[..take]);
                if remaining > take {
                    self.pending = Pending::Write {
                        address: address + take as u32,
                        remaining: remaining - take,
                    };
                }
            }

            Pending::Command => self.execute(&data),

            Pending::Upload {
                path,
                size,
                data: mut received,
            } => {
                received.extend_from_slice(&data);
                if received.len() >= size {
                    self.store_file(&path, received);
                } else {
                    self.pending = Pending::Upload {
                        path,
                        size,
                        data: received,
                    };
                }
            }
        }
    }

    /// Runs a compiled routine: every `LDA #v; STA.l addr` pair stores into
    /// WRAM until the store that clears the exec flag.
    fn execute(&mut self, code: &[u8]) {
        self.commands_run += 1;

        for op in code.get(PREAMBLE_LEN..).unwrap_or_default().chunks_exact(6) {
            if op[0] != 0xA9 || op[2] != 0x8F {
                break;
            }
            let target = u32::from_le_bytes([op[3], op[4], op[5], 0]);
            let Some(offset) = target.checked_sub(CONSOLE_WRAM) else {
                break;
            };
            self.write(WRAM_START + offset, &[op[1]]);
        }
    }

    // ------------------------------------------------------------------------
    // Memory
    // ------------------------------------------------------------------------

    fn read(&self, address: u32, len: usize) -> Vec<u8> {
        (0..len as u32)
            .map(|offset| self.memory.get(&(address + offset)).copied().unwrap_or(0))
            .collect()
    }

    fn write(&mut self, address: u32, data: &[u8]) {
        for (offset, &value) in (0u32..).zip(data) {
            self.memory.insert(address + offset, value);
        }
    }

    // ------------------------------------------------------------------------
    // Filesystem
    // ------------------------------------------------------------------------

    /// Flat `[type, name, ...]` listing including `.` and `..`.
    fn list(&self, path: &str) -> Option<Vec<String>> {
        let key = normalize(path);
        if !self.dirs.contains_key(&key) {
            return None;
        }

        let mut entries = vec![
            "0".to_string(),
            ".".to_string(),
            "0".to_string(),
            "..".to_string(),
        ];
        for (child, display) in &self.dirs {
            if child != "/" && parent(child) == key {
                entries.extend(["0".to_string(), name(display).to_string()]);
            }
        }
        for (child, (display, _)) in &self.files {
            if parent(child) == key {
                entries.extend(["1".to_string(), name(display).to_string()]);
            }
        }
        Some(entries)
    }

    fn make_dir(&mut self, path: &str) {
        let display = path.trim_end_matches('/').to_string();
        self.dirs.insert(normalize(path), display);
    }

    fn store_file(&mut self, path: &str, data: Vec<u8>) {
        self.files
            .insert(normalize(path), (path.to_string(), data));
    }

    fn rename(&mut self, path: &str, new_name: &str) {
        let key = normalize(path);
        let target = match parent(&key).as_str() {
            "/" => format!("/{new_name}"),
            dir => format!("{dir}/{new_name}"),
        };

        if let Some((_, data)) = self.files.remove(&key) {
            self.files.insert(target.to_lowercase(), (target, data));
        } else if self.dirs.remove(&key).is_some() {
            self.dirs.insert(target.to_lowercase(), target);
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn results(values: &[String]) -> Frame {
    Frame::Text(json!({ "Results": values }).to_string())
}

fn parse_hex(value: &str) -> u32 {
    u32::from_str_radix(value, 16).unwrap_or(0)
}

/// Lower-cased lookup key; `""` and `"/"` are both the root.
fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_lowercase()
    }
}

fn parent(key: &str) -> String {
    match key.rsplit_once('/') {
        Some(("", _)) | None => "/".to_string(),
        Some((dir, _)) => dir.to_string(),
    }
}

fn name(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, name)| name)
}
