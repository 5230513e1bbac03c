use anyhow::{Context, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serialport::SerialPort;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::color::{self, Rgb};
use crate::config::Config;
use crate::error::ProtocolError;
use crate::protocol::{hex_dump, malformed_recovery_vector, Command, MAX_PAYLOAD_SIZE};
use crate::transport::{open_link, FrameWriter, SendMode};

/// Most LEDs one manual color frame can carry: (1024 - 2) / 3
pub const MAX_LEDS_PER_FRAME: usize = (MAX_PAYLOAD_SIZE - 2) / 3;

/// A session with one LED controller over an exclusively owned link.
///
/// Commands are encoded and sent one at a time. The link is released when
/// the controller is dropped.
pub struct Controller<W, R> {
    writer: FrameWriter<W, R>,
    mode: SendMode,
    strip_length: usize,
    frames_sent: u64,
    bytes_sent: u64,
    running: Arc<AtomicBool>,
}

pub type SerialController = Controller<Box<dyn SerialPort>, ChaCha8Rng>;

impl SerialController {
    /// Open the serial link described by `config`
    pub fn open(config: &Config) -> Result<Self> {
        let port = open_link(&config.link)?;
        let rng = match config.transport.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        info!(
            port = %config.link.port,
            baud = config.link.baud_rate,
            mode = ?config.transport.mode,
            strip_length = config.strip.length,
            "connected to LED controller"
        );
        Ok(Controller::new(port, rng, config))
    }
}

impl<W: Write, R: Rng> Controller<W, R> {
    pub fn new(link: W, rng: R, config: &Config) -> Self {
        Controller {
            writer: FrameWriter::new(link, rng, config.transport.chunk_policy()),
            mode: config.transport.mode,
            strip_length: config.strip.length,
            frames_sent: 0,
            bytes_sent: 0,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Get a clone of the running flag for signal handlers
    pub fn get_running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn strip_length(&self) -> usize {
        self.strip_length
    }

    #[allow(dead_code)]
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    #[allow(dead_code)]
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    /// Encode, frame and transmit one command.
    ///
    /// Validation errors are returned before anything touches the link.
    pub fn send_command(&mut self, command: &Command) -> Result<()> {
        let frame = command.to_frame(self.strip_length)?;

        debug!(
            action = command.action().name(),
            payload_len = frame.payload_len(),
            "sending frame"
        );
        self.transmit(&frame)?;
        self.frames_sent += 1;

        info!("Sent {}", command);
        Ok(())
    }

    /// Send a corrupt frame followed by a valid ON frame
    pub fn send_malformed(&mut self) -> Result<()> {
        let vector = malformed_recovery_vector()?;

        info!(bytes = %hex_dump(&vector), "sending malformed + valid frame");
        self.transmit(&vector)?;
        // Only the trailing ON frame is a valid frame
        self.frames_sent += 1;

        info!("Test data sent. Device should skip malformed frame and process valid frame.");
        Ok(())
    }

    /// Set consecutive LEDs from `start_index`, splitting across frames when
    /// the run does not fit in one payload.
    pub fn send_colors(&mut self, start_index: usize, colors: &[Rgb]) -> Result<()> {
        // Validate the whole run up front so no partial update is sent
        self.check_range(start_index, colors.len())?;

        for (i, segment) in colors.chunks(MAX_LEDS_PER_FRAME).enumerate() {
            let command = Command::manual_colors(start_index + i * MAX_LEDS_PER_FRAME, segment.to_vec())?;
            self.send_command(&command)?;
        }
        Ok(())
    }

    /// Set `count` LEDs from `start_index` to one color
    pub fn fill(&mut self, color: Rgb, start_index: usize, count: usize) -> Result<()> {
        // Check before allocating the run
        self.check_range(start_index, count)?;
        self.send_colors(start_index, &color::uniform(color, count))
    }

    /// Turn every LED on the strip off
    pub fn clear(&mut self) -> Result<()> {
        self.fill(Rgb::OFF, 0, self.strip_length)
    }

    /// Move a single red pixel along the strip until stopped.
    ///
    /// Stops when `duration` elapses or the running flag is cleared; the
    /// current frame is always completed first. The strip is cleared on exit.
    pub fn animate(&mut self, fps: u32, duration: Option<Duration>) -> Result<u64> {
        if fps == 0 {
            anyhow::bail!("Animation FPS must be greater than 0");
        }

        let frame_delay = Duration::from_secs_f64(1.0 / fps as f64);
        let started = Instant::now();
        let mut position = 0usize;
        let mut frame_count = 0u64;

        info!(fps, "starting animation: red pixel moving");

        while self.is_running() {
            let tick = Instant::now();

            let colors = color::single_pixel(self.strip_length, position, Rgb::RED);
            self.send_colors(0, &colors)?;

            position = (position + 1) % self.strip_length;
            frame_count += 1;

            if frame_count % fps as u64 == 0 {
                let elapsed = started.elapsed().as_secs_f64();
                info!(
                    "Frame {:5} | Position: {:3} | Elapsed: {:.1}s | Actual FPS: {:.1}",
                    frame_count,
                    position,
                    elapsed,
                    frame_count as f64 / elapsed
                );
            }

            if duration.is_some_and(|limit| started.elapsed() >= limit) {
                break;
            }

            thread::sleep(frame_delay.saturating_sub(tick.elapsed()));
        }

        info!(frames = frame_count, "animation stopped, turning off LEDs");
        self.clear()?;
        Ok(frame_count)
    }

    /// Log session statistics
    pub fn shutdown(&self) {
        info!(
            frames = self.frames_sent,
            bytes = self.bytes_sent,
            "session closed"
        );
    }

    fn check_range(&self, start_index: usize, count: usize) -> Result<(), ProtocolError> {
        match start_index.checked_add(count) {
            Some(end) if end <= self.strip_length => Ok(()),
            end => Err(ProtocolError::LedRangeExceedsStrip {
                start: start_index,
                end: end.unwrap_or(usize::MAX),
                strip_length: self.strip_length,
            }),
        }
    }

    fn transmit(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer
            .send(bytes, self.mode)
            .context("Failed to write to serial link")?;
        self.bytes_sent += bytes.len() as u64;
        Ok(())
    }

    #[cfg(test)]
    fn link(&self) -> &W {
        self.writer.get_ref()
    }
}
