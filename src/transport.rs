use anyhow::{Context, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serialport::SerialPort;
use std::io::{self, Write};
use std::thread;
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::config::LinkConfig;
use crate::protocol::hex_dump;

/// Largest sub-write in chunked mode
pub const DEFAULT_MAX_CHUNK: usize = 3;

/// Pause between sub-writes in chunked mode
pub const DEFAULT_CHUNK_DELAY: Duration = Duration::from_millis(200);

/// How a frame is pushed onto the link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SendMode {
    /// One write and one flush per frame
    #[default]
    Bulk,
    /// Random 1..=max_chunk byte writes, each flushed, paced by a fixed delay
    Chunked,
}

/// Chunk sizing and pacing for [`SendMode::Chunked`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPolicy {
    pub max_chunk: usize,
    pub delay: Duration,
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self {
            max_chunk: DEFAULT_MAX_CHUNK,
            delay: DEFAULT_CHUNK_DELAY,
        }
    }
}

/// Split `len` bytes into chunk sizes drawn from `1..=min(max_chunk, remaining)`
pub fn plan_chunks<R: Rng>(len: usize, max_chunk: usize, rng: &mut R) -> Vec<usize> {
    let max_chunk = max_chunk.max(1);
    let mut sizes = Vec::new();
    let mut remaining = len;

    while remaining > 0 {
        let size = rng.gen_range(1..=max_chunk.min(remaining));
        sizes.push(size);
        remaining -= size;
    }

    sizes
}

/// Writes built frames to any `Write` link.
///
/// Byte content and order are never altered; chunked mode only changes
/// write granularity and timing. I/O errors are returned unchanged.
pub struct FrameWriter<W, R> {
    inner: W,
    rng: R,
    policy: ChunkPolicy,
}

impl<W: Write, R: Rng> FrameWriter<W, R> {
    pub fn new(inner: W, rng: R, policy: ChunkPolicy) -> Self {
        Self { inner, rng, policy }
    }

    /// Emit `bytes` to the link in the given mode
    pub fn send(&mut self, bytes: &[u8], mode: SendMode) -> io::Result<()> {
        match mode {
            SendMode::Bulk => self.send_bulk(bytes),
            SendMode::Chunked => self.send_chunked(bytes),
        }
    }

    fn send_bulk(&mut self, bytes: &[u8]) -> io::Result<()> {
        trace!(len = bytes.len(), frame = %hex_dump(bytes), "bulk write");
        self.inner.write_all(bytes)?;
        self.inner.flush()
    }

    fn send_chunked(&mut self, bytes: &[u8]) -> io::Result<()> {
        let sizes = plan_chunks(bytes.len(), self.policy.max_chunk, &mut self.rng);
        debug!(len = bytes.len(), chunks = sizes.len(), "sending in random chunks");

        let mut offset = 0;
        for (i, size) in sizes.iter().enumerate() {
            let chunk = &bytes[offset..offset + size];
            self.inner.write_all(chunk)?;
            self.inner.flush()?;
            trace!(size, chunk = %hex_dump(chunk), "sent chunk");
            offset += size;

            // Pace between chunks only, never after the last one
            if i + 1 < sizes.len() && !self.policy.delay.is_zero() {
                thread::sleep(self.policy.delay);
            }
        }

        Ok(())
    }

    #[allow(dead_code)]
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    #[allow(dead_code)]
    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Open the serial link to the controller
pub fn open_link(config: &LinkConfig) -> Result<Box<dyn SerialPort>> {
    let mut port = serialport::new(&config.port, config.baud_rate)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .flow_control(serialport::FlowControl::None)
        .timeout(Duration::from_millis(config.timeout_ms))
        .open()
        .context(format!("Failed to open serial port {}", config.port))?;

    // Match pyserial's defaults
    if let Err(e) = port.write_data_terminal_ready(true) {
        warn!(port = %config.port, error = %e, "failed to set DTR");
    }

    // Allow device to initialize
    thread::sleep(Duration::from_millis(100));

    debug!(port = %config.port, baud = config.baud_rate, "serial link open");
    Ok(port)
}
