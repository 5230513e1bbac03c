use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::transport::{ChunkPolicy, SendMode, DEFAULT_CHUNK_DELAY, DEFAULT_MAX_CHUNK};

/// LED count the controller firmware is built with
pub const DEFAULT_STRIP_LENGTH: usize = 280;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub link: LinkConfig,
    pub strip: StripConfig,
    pub transport: TransportConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LinkConfig {
    pub port: String,
    pub baud_rate: u32,
    /// Read timeout for the serial port
    pub timeout_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: "/dev/mcu0".to_string(),
            baud_rate: 115200,
            timeout_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StripConfig {
    /// Number of physical LEDs on the device
    pub length: usize,
}

impl Default for StripConfig {
    fn default() -> Self {
        Self {
            length: DEFAULT_STRIP_LENGTH,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    pub mode: SendMode,
    pub max_chunk: usize,
    pub chunk_delay_ms: u64,
    /// Fixed seed for chunk boundaries; random when unset
    pub seed: Option<u64>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            mode: SendMode::Bulk,
            max_chunk: DEFAULT_MAX_CHUNK,
            chunk_delay_ms: DEFAULT_CHUNK_DELAY.as_millis() as u64,
            seed: None,
        }
    }
}

impl TransportConfig {
    pub fn chunk_policy(&self) -> ChunkPolicy {
        ChunkPolicy {
            max_chunk: self.max_chunk,
            delay: Duration::from_millis(self.chunk_delay_ms),
        }
    }
}

impl Config {
    /// Load a JSON configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .context(format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&data)
            .context(format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.link.port.is_empty() {
            anyhow::bail!("link.port must not be empty");
        }
        if self.link.baud_rate == 0 {
            anyhow::bail!("link.baud_rate must be greater than 0");
        }
        if self.strip.length == 0 || self.strip.length > u16::MAX as usize {
            anyhow::bail!("strip.length must be between 1 and {}", u16::MAX);
        }
        if self.transport.max_chunk == 0 {
            anyhow::bail!("transport.max_chunk must be at least 1");
        }
        Ok(())
    }
}
