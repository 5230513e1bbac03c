use std::fmt;

use crate::color::Rgb;
use crate::error::{ProtocolError, Result};
use crate::protocol::frame::{build_frame, Frame, MAX_PAYLOAD_SIZE};

/// Operation codes understood by the controller firmware.
///
/// The frame builder never interprets these; they only select the payload
/// encoding on the host side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Action {
    ControlOnOff = 0x01,
    SetBrightness = 0x02,
    SetStripSetting = 0x03,
    ManualColorInput = 0x04,
    SetFramePerCycle = 0x05,
    SetNumLedsToUpdate = 0x06,
    SetFramesPerSecond = 0x07,
    SetReverseAnimation = 0x08,
}

impl Action {
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Action::ControlOnOff),
            0x02 => Some(Action::SetBrightness),
            0x03 => Some(Action::SetStripSetting),
            0x04 => Some(Action::ManualColorInput),
            0x05 => Some(Action::SetFramePerCycle),
            0x06 => Some(Action::SetNumLedsToUpdate),
            0x07 => Some(Action::SetFramesPerSecond),
            0x08 => Some(Action::SetReverseAnimation),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Action::ControlOnOff => "control_onoff",
            Action::SetBrightness => "set_brightness",
            Action::SetStripSetting => "set_strip_setting",
            Action::ManualColorInput => "manual_color_input",
            Action::SetFramePerCycle => "set_frame_per_cycle",
            Action::SetNumLedsToUpdate => "set_num_leds_to_update",
            Action::SetFramesPerSecond => "set_frames_per_second",
            Action::SetReverseAnimation => "set_reverse_animation",
        }
    }
}

/// Rendering mode selected on the device
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StripSetting {
    /// Pixels are driven by manual color frames
    Custom,
    Breathing(Rgb),
    SolidColor(Rgb),
    /// `cycles` full rainbows across the strip length
    RainbowCycle { cycles: f32 },
}

impl StripSetting {
    pub const CUSTOM_ID: u8 = 0x00;
    pub const BREATHING_ID: u8 = 0x01;
    pub const SOLID_COLOR_ID: u8 = 0x02;
    pub const RAINBOW_CYCLE_ID: u8 = 0x03;

    pub fn id(&self) -> u8 {
        match self {
            StripSetting::Custom => Self::CUSTOM_ID,
            StripSetting::Breathing(_) => Self::BREATHING_ID,
            StripSetting::SolidColor(_) => Self::SOLID_COLOR_ID,
            StripSetting::RainbowCycle { .. } => Self::RAINBOW_CYCLE_ID,
        }
    }

    /// Build a setting from its wire id and optional parameters.
    ///
    /// Unknown ids fail with [`ProtocolError::InvalidSetting`].
    pub fn from_id(id: u8, color: Option<Rgb>, cycles: Option<f32>) -> Result<Self> {
        match id {
            Self::CUSTOM_ID => Ok(StripSetting::Custom),
            Self::BREATHING_ID => color.map(StripSetting::Breathing).ok_or(
                ProtocolError::MissingParameter {
                    setting: "Breathing",
                    parameter: "an RGB color",
                },
            ),
            Self::SOLID_COLOR_ID => color.map(StripSetting::SolidColor).ok_or(
                ProtocolError::MissingParameter {
                    setting: "SolidColor",
                    parameter: "an RGB color",
                },
            ),
            Self::RAINBOW_CYCLE_ID => cycles
                .map(|cycles| StripSetting::RainbowCycle { cycles })
                .ok_or(ProtocolError::MissingParameter {
                    setting: "RainbowCycle",
                    parameter: "a cycle count",
                }),
            other => Err(ProtocolError::InvalidSetting(other)),
        }
    }

    fn encode_into(&self, payload: &mut Vec<u8>) -> Result<()> {
        payload.push(self.id());
        match self {
            StripSetting::Custom => {}
            StripSetting::Breathing(color) | StripSetting::SolidColor(color) => {
                payload.extend_from_slice(&color.to_bytes());
            }
            StripSetting::RainbowCycle { cycles } => {
                if !cycles.is_finite() || *cycles <= 0.0 {
                    return Err(ProtocolError::OutOfRange {
                        field: "rainbow cycles",
                        value: cycles.to_string(),
                        allowed: "> 0.0",
                    });
                }
                payload.extend_from_slice(&cycles.to_be_bytes());
            }
        }
        Ok(())
    }
}

/// A single host-to-device command with typed parameters
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Power(bool),
    Brightness(f32),
    StripSetting(StripSetting),
    /// Colors for consecutive LEDs starting at `start_index`
    ManualColors { start_index: u16, colors: Vec<Rgb> },
    FrameStep(f32),
    LedsToUpdate(u16),
    FramesPerSecond(u8),
    ReverseAnimation(bool),
}

impl Command {
    /// Frames-per-second from a wider integer; values above 255 are rejected.
    pub fn frames_per_second(fps: u32) -> Result<Self> {
        u8::try_from(fps)
            .map(Command::FramesPerSecond)
            .map_err(|_| ProtocolError::OutOfRange {
                field: "frames per second",
                value: fps.to_string(),
                allowed: "0..=255",
            })
    }

    /// LED count from a wider integer; values that do not fit in 16 bits are rejected.
    pub fn leds_to_update(count: u32) -> Result<Self> {
        u16::try_from(count)
            .map(Command::LedsToUpdate)
            .map_err(|_| ProtocolError::OutOfRange {
                field: "LEDs to update",
                value: count.to_string(),
                allowed: "0..=65535",
            })
    }

    /// Manual colors from a wider start index
    pub fn manual_colors(start_index: usize, colors: Vec<Rgb>) -> Result<Self> {
        let start_index = u16::try_from(start_index).map_err(|_| ProtocolError::OutOfRange {
            field: "start index",
            value: start_index.to_string(),
            allowed: "0..=65535",
        })?;
        Ok(Command::ManualColors {
            start_index,
            colors,
        })
    }

    pub fn action(&self) -> Action {
        match self {
            Command::Power(_) => Action::ControlOnOff,
            Command::Brightness(_) => Action::SetBrightness,
            Command::StripSetting(_) => Action::SetStripSetting,
            Command::ManualColors { .. } => Action::ManualColorInput,
            Command::FrameStep(_) => Action::SetFramePerCycle,
            Command::LedsToUpdate(_) => Action::SetNumLedsToUpdate,
            Command::FramesPerSecond(_) => Action::SetFramesPerSecond,
            Command::ReverseAnimation(_) => Action::SetReverseAnimation,
        }
    }

    /// Validate parameters and encode the action-specific payload.
    ///
    /// `strip_length` is the number of physical LEDs on the device.
    pub fn encode_payload(&self, strip_length: usize) -> Result<Vec<u8>> {
        match self {
            Command::Power(on) | Command::ReverseAnimation(on) => Ok(vec![*on as u8]),
            Command::Brightness(value) => {
                check_unit_interval("brightness", *value)?;
                Ok(value.to_be_bytes().to_vec())
            }
            Command::FrameStep(value) => {
                check_unit_interval("frame step", *value)?;
                Ok(value.to_be_bytes().to_vec())
            }
            Command::StripSetting(setting) => {
                let mut payload = Vec::with_capacity(5);
                setting.encode_into(&mut payload)?;
                Ok(payload)
            }
            Command::LedsToUpdate(count) => {
                if *count as usize > strip_length {
                    return Err(ProtocolError::OutOfRange {
                        field: "LEDs to update",
                        value: count.to_string(),
                        allowed: "0..=strip length",
                    });
                }
                Ok(count.to_be_bytes().to_vec())
            }
            Command::FramesPerSecond(fps) => Ok(vec![*fps]),
            Command::ManualColors {
                start_index,
                colors,
            } => encode_manual_colors(*start_index, colors, strip_length),
        }
    }

    /// Validate, encode, and frame this command
    pub fn to_frame(&self, strip_length: usize) -> Result<Frame> {
        let payload = self.encode_payload(strip_length)?;
        build_frame(self.action().as_byte(), &payload)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Power(on) => write!(f, "LED strip {}", if *on { "ON" } else { "OFF" }),
            Command::Brightness(value) => write!(f, "brightness {}", value),
            Command::StripSetting(StripSetting::Breathing(c)) => write!(f, "strip setting Breathing({})", c),
            Command::StripSetting(StripSetting::SolidColor(c)) => write!(f, "strip setting SolidColor({})", c),
            Command::StripSetting(StripSetting::RainbowCycle { cycles }) => {
                write!(f, "strip setting RainbowCycle(cycles={})", cycles)
            }
            Command::StripSetting(StripSetting::Custom) => write!(f, "strip setting Custom"),
            Command::ManualColors {
                start_index,
                colors,
            } => write!(f, "manual colors for {} LEDs from index {}", colors.len(), start_index),
            Command::FrameStep(value) => write!(f, "frame step {}", value),
            Command::LedsToUpdate(count) => write!(f, "LEDs to update {}", count),
            Command::FramesPerSecond(fps) => write!(f, "frames per second {}", fps),
            Command::ReverseAnimation(reverse) => {
                write!(f, "animation {}", if *reverse { "REVERSE" } else { "FORWARD" })
            }
        }
    }
}

/// Brightness and frame step are carried as f32 in [0.0, 1.0]. Never clamped.
fn check_unit_interval(field: &'static str, value: f32) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ProtocolError::OutOfRange {
            field,
            value: value.to_string(),
            allowed: "0.0..=1.0",
        })
    }
}

/// Start index (u16 BE) followed by R,G,B per LED
fn encode_manual_colors(start_index: u16, colors: &[Rgb], strip_length: usize) -> Result<Vec<u8>> {
    let start = start_index as usize;
    let end = start + colors.len();
    if end > strip_length {
        return Err(ProtocolError::LedRangeExceedsStrip {
            start,
            end,
            strip_length,
        });
    }

    let size = 2 + colors.len() * 3;
    if size > MAX_PAYLOAD_SIZE {
        return Err(ProtocolError::PayloadTooLarge {
            size,
            max: MAX_PAYLOAD_SIZE,
        });
    }

    let mut payload = Vec::with_capacity(size);
    payload.extend_from_slice(&start_index.to_be_bytes());
    for color in colors {
        payload.extend_from_slice(&color.to_bytes());
    }
    Ok(payload)
}
