//! Bus frame representation and its canonical hex text form.
//!
//! A [`Frame`] is one complete protocol message: an immutable byte sequence
//! starting with the `AA 55` header marker and ending with the `0D 0D`
//! trailer marker, both inclusive. The canonical textual form — used for
//! display, classification keys, and the persisted catalog — is uppercase
//! hex with space-separated byte pairs:
//!
//! ```text
//! AA 55 30 BC 00 0E 01 01 65 00 0D 0D
//! ```

use std::fmt;

use anyhow::{bail, Result};

use crate::constants::{FRAME_HEADER, FRAME_TRAILER, MIN_FRAME_LEN};

/// One complete bus frame, markers included.
///
/// Construction goes through [`Frame::from_bytes`] (extractor output) or
/// [`Frame::from_hex`] (catalog text form), both of which enforce the
/// marker and length invariants. The byte content is immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Frame(Vec<u8>);

impl Frame {
    /// Builds a frame from raw bytes, checking the structural invariants:
    /// header marker at the start, trailer marker at the end, even length,
    /// and the minimum length that fits the device/room/command layout.
    /// Marker-bounded spans shorter than that exist on a noisy line but are
    /// never valid frames.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() < MIN_FRAME_LEN {
            bail!(
                "frame too short: {} bytes (minimum {MIN_FRAME_LEN})",
                bytes.len()
            );
        }
        if bytes[..FRAME_HEADER.len()] != FRAME_HEADER {
            bail!("frame does not start with header marker");
        }
        if bytes[bytes.len() - FRAME_TRAILER.len()..] != FRAME_TRAILER {
            bail!("frame does not end with trailer marker");
        }
        if bytes.len() % 2 != 0 {
            bail!("frame length {} is odd", bytes.len());
        }
        Ok(Self(bytes))
    }

    /// Parses the canonical text form back into a frame.
    ///
    /// Accepts both spaced (`"AA 55 0D 0D"`) and unspaced (`"aa550d0d"`)
    /// hex, case-insensitively, since hand-edited catalogs contain both.
    pub fn from_hex(text: &str) -> Result<Self> {
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.len() % 2 != 0 {
            bail!("hex text has odd digit count: {:?}", text);
        }
        let mut bytes = Vec::with_capacity(compact.len() / 2);
        for pair in compact.as_bytes().chunks(2) {
            let pair = std::str::from_utf8(pair)?;
            let byte = u8::from_str_radix(pair, 16)
                .map_err(|_| anyhow::anyhow!("invalid hex byte {:?} in {:?}", pair, text))?;
            bytes.push(byte);
        }
        Self::from_bytes(bytes)
    }

    /// Raw frame bytes, markers included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Total frame length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the frame holds no bytes (never the case after construction).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Canonical text form: uppercase hex, byte pairs space-separated.
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(self.0.len() * 3);
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(&format!("{byte:02X}"));
        }
        out
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
