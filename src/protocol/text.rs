//! # Text Frames
//!
//! The firmware renders text itself. A text frame carries one byte per
//! character and a NUL terminator:
//!
//! ```text
//! TEXT_PRINT    [0x20, c0, c1, ..., cn, 0x00]
//! TEXT_PRINTLN  [0x21, c0, c1, ..., cn, 0x00]
//! ```
//!
//! Text rows are addressed in 8-dot bands, so a record whose `y` is not a
//! multiple of 8 cannot be placed and is rejected. A NUL inside the text
//! would terminate the frame early, so it is rejected too. The encoder neither
//! escapes nor truncates; callers that need to respect a write-size limit
//! check [`Frame::len`] against it.

use serde::{Deserialize, Serialize};

use super::commands::Opcode;
use super::frame::Frame;
use crate::error::EncodeError;

/// Height of one text band in dots.
pub const TEXT_BAND_DOTS: u16 = 8;

/// Which text opcode a record is sent with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMode {
    /// TEXT_PRINT (0x20): no line advance.
    Print,
    /// TEXT_PRINTLN (0x21): advance one line afterwards.
    #[default]
    Println,
}

impl TextMode {
    pub const fn opcode(self) -> Opcode {
        match self {
            Self::Print => Opcode::TextPrint,
            Self::Println => Opcode::TextPrintln,
        }
    }
}

/// One positioned string in a text job.
///
/// `font_size` and `x` describe the layout on the host side; only `y` (for
/// validation) and the characters reach the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRecord {
    pub text: String,
    #[serde(default)]
    pub font_size: u8,
    #[serde(default)]
    pub x: u16,
    #[serde(default)]
    pub y: u16,
    #[serde(default)]
    pub mode: TextMode,
}

impl TextRecord {
    /// A TEXT_PRINTLN record at the origin.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font_size: 0,
            x: 0,
            y: 0,
            mode: TextMode::default(),
        }
    }

    pub fn at(mut self, x: u16, y: u16) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn font_size(mut self, size: u8) -> Self {
        self.font_size = size;
        self
    }

    pub fn mode(mut self, mode: TextMode) -> Self {
        self.mode = mode;
        self
    }
}

/// # Encode a Text Record (TEXT_PRINT 0x20 / TEXT_PRINTLN 0x21)
///
/// ## Errors
///
/// - [`EncodeError::InvalidRow`] when `y` is not on an 8-dot band
/// - [`EncodeError::EmptyText`] when there is nothing to print
/// - [`EncodeError::UnsupportedChar`] for a character above U+00FF, or
///   for U+0000, which would end the frame early
///
/// ## Example
///
/// ```
/// use thermoline::protocol::text::{self, TextRecord};
///
/// let frame = text::encode_text(&TextRecord::new("HI"))?;
/// assert_eq!(frame.as_bytes(), &[0x21, b'H', b'I', 0x00]);
/// # Ok::<(), thermoline::error::EncodeError>(())
/// ```
pub fn encode_text(record: &TextRecord) -> Result<Frame, EncodeError> {
    if record.y % TEXT_BAND_DOTS != 0 {
        return Err(EncodeError::InvalidRow(record.y));
    }
    if record.text.is_empty() {
        return Err(EncodeError::EmptyText);
    }

    let mut payload = record
        .text
        .chars()
        .map(|c| match u8::try_from(c) {
            Ok(0) | Err(_) => Err(EncodeError::UnsupportedChar(c)),
            Ok(byte) => Ok(byte),
        })
        .collect::<Result<Vec<u8>, _>>()?;
    payload.push(0);

    Ok(Frame::new(record.mode.opcode(), &payload))
}
