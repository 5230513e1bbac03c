use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{info, warn};

mod color;
mod config;
mod controller;
mod error;
mod logging;
mod protocol;
mod transport;

use color::Rgb;
use config::Config;
use controller::SerialController;
use logging::{init_logging, level_for, LogFormat};
use protocol::{decode_all, hex_dump, Action, Command, StripSetting};
use transport::SendMode;

#[derive(Parser)]
#[command(name = "led_ctl")]
#[command(about = "Serial LED controller host\n\nFrames commands for an addressable-LED controller and sends them over a serial link.", long_about = None)]
struct Cli {
    /// Path to configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serial port device path
    #[arg(long)]
    port: Option<String>,

    /// Serial baud rate
    #[arg(long)]
    baud: Option<u32>,

    /// Number of LEDs on the strip
    #[arg(long)]
    strip_length: Option<usize>,

    /// Send frames in small random chunks with delays (tests device buffering)
    #[arg(long)]
    chunked: bool,

    /// Delay between chunks in chunked mode
    #[arg(long)]
    chunk_delay_ms: Option<u64>,

    /// Seed for chunk sizes, for reproducible chunk boundaries
    #[arg(long)]
    seed: Option<u64>,

    /// Enable debug output (per-frame summaries)
    #[arg(long)]
    debug: bool,

    /// Enable detailed debug (hex dumps every frame and chunk)
    #[arg(long)]
    ddebug: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Turn LED strip ON
    On,
    /// Turn LED strip OFF
    Off,
    /// Set global brightness (0.0 to 1.0)
    Brightness { value: f32 },
    /// Set strip setting: 0=Custom, 1=Breathing, 2=SolidColor, 3=RainbowCycle
    Setting {
        id: u8,
        /// Color for Breathing and SolidColor (RRGGBB)
        #[arg(long)]
        color: Option<Rgb>,
        /// Rainbow cycles across the strip for RainbowCycle
        #[arg(long)]
        cycles: Option<f32>,
    },
    /// Set frame per cycle (animation phase step, 0.0 to 1.0)
    FrameStep { value: f32 },
    /// Set number of LEDs to update
    LedsToUpdate { count: u32 },
    /// Set frames per second (0-255)
    Fps { fps: u32 },
    /// Run animations in reverse
    Reverse,
    /// Run animations forward
    Forward,
    /// Set LED colors from a start index (RRGGBB per LED)
    Colors {
        #[arg(long, default_value_t = 0)]
        start: usize,
        #[arg(required = true)]
        colors: Vec<Rgb>,
    },
    /// Set a range of LEDs to one color
    Fill {
        color: Rgb,
        #[arg(long, default_value_t = 0)]
        start: usize,
        /// Defaults to the rest of the strip
        #[arg(long)]
        count: Option<usize>,
    },
    /// Turn every LED off
    Clear,
    /// Send malformed data followed by a valid ON frame (tests error recovery)
    Malformed,
    /// Animate a red pixel moving along the strip until Ctrl-C
    Animate {
        #[arg(long, default_value_t = 30)]
        fps: u32,
        #[arg(long)]
        duration_secs: Option<f64>,
    },
    /// Decode hex bytes offline and list the frames they contain
    Decode {
        #[arg(required = true)]
        hex: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format, level_for(cli.debug, cli.ddebug));

    // Offline, no link needed
    if let Cmd::Decode { hex } = &cli.command {
        return decode(hex);
    }

    let config = load_config(&cli)?;
    let mut controller = SerialController::open(&config)?;

    // Ctrl-C stops between frames so a chunked send always completes its frame
    let running = controller.get_running_flag();
    let result = ctrlc::set_handler(move || {
        info!("Shutting down...");
        running.store(false, Ordering::Relaxed);
    });

    if let Err(e) = result {
        warn!("Could not set Ctrl-C handler: {}", e);
    }

    let result = run(&mut controller, cli.command);
    controller.shutdown();
    result
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    if let Some(port) = &cli.port {
        config.link.port = port.clone();
    }
    if let Some(baud) = cli.baud {
        config.link.baud_rate = baud;
    }
    if let Some(length) = cli.strip_length {
        config.strip.length = length;
    }
    if cli.chunked {
        config.transport.mode = SendMode::Chunked;
    }
    if let Some(delay) = cli.chunk_delay_ms {
        config.transport.chunk_delay_ms = delay;
    }
    if cli.seed.is_some() {
        config.transport.seed = cli.seed;
    }

    config.validate()?;
    Ok(config)
}

fn run(controller: &mut SerialController, cmd: Cmd) -> Result<()> {
    match cmd {
        Cmd::On => controller.send_command(&Command::Power(true)),
        Cmd::Off => controller.send_command(&Command::Power(false)),
        Cmd::Brightness { value } => controller.send_command(&Command::Brightness(value)),
        Cmd::Setting { id, color, cycles } => {
            let setting = StripSetting::from_id(id, color, cycles)?;
            controller.send_command(&Command::StripSetting(setting))
        }
        Cmd::FrameStep { value } => controller.send_command(&Command::FrameStep(value)),
        Cmd::LedsToUpdate { count } => controller.send_command(&Command::leds_to_update(count)?),
        Cmd::Fps { fps } => controller.send_command(&Command::frames_per_second(fps)?),
        Cmd::Reverse => controller.send_command(&Command::ReverseAnimation(true)),
        Cmd::Forward => controller.send_command(&Command::ReverseAnimation(false)),
        Cmd::Colors { start, colors } => controller.send_colors(start, &colors),
        Cmd::Fill {
            color,
            start,
            count,
        } => {
            let count = count.unwrap_or(controller.strip_length().saturating_sub(start));
            controller.fill(color, start, count)
        }
        Cmd::Clear => controller.clear(),
        Cmd::Malformed => controller.send_malformed(),
        Cmd::Animate { fps, duration_secs } => {
            let duration = duration_secs
                .map(Duration::try_from_secs_f64)
                .transpose()
                .context("Invalid animation duration")?;
            let frames = controller.animate(fps, duration)?;
            info!(frames, "animation finished");
            Ok(())
        }
        Cmd::Decode { .. } => unreachable!("decode runs before the link is opened"),
    }
}

/// Print every frame found in a hex byte stream
fn decode(hex: &[String]) -> Result<()> {
    let bytes = parse_hex(&hex.join(""))?;
    let (frames, rejections) = decode_all(&bytes);

    let mut out = std::io::stdout().lock();
    for frame in &frames {
        let name = Action::from_byte(frame.action).map_or("unknown", Action::name);
        writeln!(
            out,
            "action 0x{:02X} ({}) length {}: {}",
            frame.action,
            name,
            frame.payload.len(),
            hex_dump(&frame.payload)
        )?;
    }
    for rejection in &rejections {
        writeln!(out, "rejected: {:?}", rejection)?;
    }

    info!(frames = frames.len(), rejected = rejections.len(), "decode complete");
    Ok(())
}

/// Parse hex digits, ignoring whitespace, `:` separators and `0x` prefixes
fn parse_hex(input: &str) -> Result<Vec<u8>> {
    let digits: String = input
        .replace("0x", "")
        .replace("0X", "")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();

    hex::decode(&digits).context(format!("Invalid hex input {:?}", digits))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("AA 01 00 01 01 D1 64").unwrap(), vec![0xAA, 0x01, 0x00, 0x01, 0x01, 0xD1, 0x64]);
        assert_eq!(parse_hex("aa:01").unwrap(), vec![0xAA, 0x01]);
        assert_eq!(parse_hex("0xAA0x01").unwrap(), vec![0xAA, 0x01]);
        assert!(parse_hex("AAA").is_err());
        assert!(parse_hex("ZZ").is_err());
        assert!(parse_hex("AÿA").is_err());
        assert_eq!(parse_hex("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "led_ctl", "--port", "/dev/ttyUSB1", "--chunked", "--seed", "4", "--strip-length", "88", "on",
        ]);
        let config = load_config(&cli).unwrap();

        assert_eq!(config.link.port, "/dev/ttyUSB1");
        assert_eq!(config.strip.length, 88);
        assert_eq!(config.transport.mode, SendMode::Chunked);
        assert_eq!(config.transport.seed, Some(4));
    }

    #[test]
    fn test_cli_parses_colors() {
        let cli = Cli::parse_from(["led_ctl", "colors", "--start", "100", "00FF00", "#FF0000"]);
        match cli.command {
            Cmd::Colors { start, colors } => {
                assert_eq!(start, 100);
                assert_eq!(colors, vec![Rgb::GREEN, Rgb::RED]);
            }
            _ => panic!("expected colors subcommand"),
        }
    }

    #[test]
    fn test_cli_rejects_bad_color() {
        assert!(Cli::try_parse_from(["led_ctl", "fill", "nothex"]).is_err());
    }
}
