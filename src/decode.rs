//! Display-oriented decoding of the fixed frame layout.
//!
//! Field layout after the `AA 55` header (from observed wallpad traffic):
//!
//! ```text
//! AA 55 | tt tt | dd dd | rr | cc | payload... | ks ks | 0D 0D
//!        type    device  room cmd               checksum
//! ```
//!
//! Decoding is side-effect-free and used only for operator-facing display.
//! Classification never depends on it; frames are classified as opaque byte
//! sequences. The checksum bytes are captured verbatim and never validated —
//! their coverage is unknown.

use std::fmt;

use crate::frame::Frame;

/// Coarse device class derived from the two-byte device code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    /// `00 0E` — room lighting.
    Light,
    /// `00 2C` — gas valve.
    GasValve,
    /// `00 36` — thermostat / floor heating.
    Thermostat,
    /// `00 39` — air conditioner.
    AirConditioner,
    /// `00 3B` — wall outlet.
    Outlet,
    /// `00 44` — elevator call.
    Elevator,
    /// `00 48` — ventilation fan.
    Fan,
    /// `00 98` — air-quality sensor.
    AirQuality,
    /// Any code outside the known table. Not an error; the bus carries
    /// device classes we have no name for.
    Unknown([u8; 2]),
}

impl DeviceClass {
    /// Maps a two-byte device code through the static table.
    pub fn from_code(code: [u8; 2]) -> Self {
        match code {
            [0x00, 0x0E] => Self::Light,
            [0x00, 0x2C] => Self::GasValve,
            [0x00, 0x36] => Self::Thermostat,
            [0x00, 0x39] => Self::AirConditioner,
            [0x00, 0x3B] => Self::Outlet,
            [0x00, 0x44] => Self::Elevator,
            [0x00, 0x48] => Self::Fan,
            [0x00, 0x98] => Self::AirQuality,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Light => write!(f, "light"),
            Self::GasValve => write!(f, "gas valve"),
            Self::Thermostat => write!(f, "thermostat"),
            Self::AirConditioner => write!(f, "air conditioner"),
            Self::Outlet => write!(f, "outlet"),
            Self::Elevator => write!(f, "elevator"),
            Self::Fan => write!(f, "fan"),
            Self::AirQuality => write!(f, "air quality"),
            Self::Unknown(code) => write!(f, "unknown({:02X} {:02X})", code[0], code[1]),
        }
    }
}

/// Borrowed field view over a [`Frame`]'s fixed layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedFrame<'a> {
    /// Two-byte frame type field.
    pub frame_type: [u8; 2],
    /// Device class mapped through the static table.
    pub device: DeviceClass,
    /// Room / unit byte.
    pub room: u8,
    /// Command byte.
    pub command: u8,
    /// Variable-length payload between the command byte and the checksum.
    pub payload: &'a [u8],
    /// Trailing checksum bytes, captured but never validated. Absent on the
    /// 10-byte minimal frame, which has no room for one.
    pub checksum: Option<[u8; 2]>,
}

impl<'a> DecodedFrame<'a> {
    /// Decodes a frame's fixed layout.
    ///
    /// Total decoding: every constructed [`Frame`] meets the 10-byte layout
    /// minimum, so each field position is in bounds.
    pub fn decode(frame: &'a Frame) -> Self {
        let b = frame.as_bytes();
        let n = b.len();
        let (payload, checksum) = if n >= 12 {
            (&b[8..n - 4], Some([b[n - 4], b[n - 3]]))
        } else {
            (&b[8..8], None)
        };
        Self {
            frame_type: [b[2], b[3]],
            device: DeviceClass::from_code([b[4], b[5]]),
            room: b[6],
            command: b[7],
            payload,
            checksum,
        }
    }

    /// One-line operator-facing summary.
    ///
    /// Includes the thermostat temperature hint and light on/off annotation
    /// where the payload supports them.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "{} | room {:02X} | cmd {:02X}",
            self.device, self.room, self.command
        );
        match self.device {
            DeviceClass::Light => match self.command {
                0x01 => out.push_str(" (on)"),
                0x00 => out.push_str(" (off)"),
                _ => {}
            },
            DeviceClass::Thermostat => {
                if let Some(&temp) = self.payload.first() {
                    if temp > 0 {
                        out.push_str(&format!(" | {temp}\u{00B0}C"));
                    }
                }
            }
            _ => {}
        }
        out
    }
}
