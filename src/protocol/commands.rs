//! # Printer Command Catalog
//!
//! Every frame the printer understands starts with a one-byte opcode. The
//! catalog is fixed by the firmware:
//!
//! | Opcode | Name | Payload |
//! |--------|------|---------|
//! | 0x00 | RESET | none |
//! | 0x01 | TEST | none |
//! | 0x02 | TESTPAGE | none |
//! | 0x03 | SET_DEFAULT | none |
//! | 0x04 | WAKE | none |
//! | 0x05 | SLEEP | none |
//! | 0x06 | FEED | `lines` |
//! | 0x10 | BITMAP_WRITE | `yL yH chunk d0..d15` |
//! | 0x11 | BITMAP_FLUSH | `hL hH` |
//! | 0x20 | TEXT_PRINT | `c0..cn 0x00` |
//! | 0x21 | TEXT_PRINTLN | `c0..cn 0x00` |
//!
//! ## Byte Order
//!
//! Multi-byte integers use **little-endian** encoding:
//! - `u16` value 0x1234 is sent as bytes `[0x34, 0x12]`
//!
//! This module holds the opcode table and builders for the payload-free
//! control commands. Bitmap frames live in [`super::graphics`], text frames
//! in [`super::text`].

use std::fmt;

use super::frame::Frame;

/// One-byte command identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Reset = 0x00,
    Test = 0x01,
    TestPage = 0x02,
    SetDefault = 0x03,
    Wake = 0x04,
    Sleep = 0x05,
    Feed = 0x06,
    BitmapWrite = 0x10,
    BitmapFlush = 0x11,
    TextPrint = 0x20,
    TextPrintln = 0x21,
}

impl Opcode {
    /// Decode the leading byte of a frame.
    pub const fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            0x00 => Self::Reset,
            0x01 => Self::Test,
            0x02 => Self::TestPage,
            0x03 => Self::SetDefault,
            0x04 => Self::Wake,
            0x05 => Self::Sleep,
            0x06 => Self::Feed,
            0x10 => Self::BitmapWrite,
            0x11 => Self::BitmapFlush,
            0x20 => Self::TextPrint,
            0x21 => Self::TextPrintln,
            _ => return None,
        })
    }

    #[inline]
    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// Protocol name, as used in logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Reset => "RESET",
            Self::Test => "TEST",
            Self::TestPage => "TESTPAGE",
            Self::SetDefault => "SET_DEFAULT",
            Self::Wake => "WAKE",
            Self::Sleep => "SLEEP",
            Self::Feed => "FEED",
            Self::BitmapWrite => "BITMAP_WRITE",
            Self::BitmapFlush => "BITMAP_FLUSH",
            Self::TextPrint => "TEXT_PRINT",
            Self::TextPrintln => "TEXT_PRINTLN",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// CONTROL COMMANDS
// ============================================================================

/// # Reset (0x00)
///
/// Clears the frame buffer and returns the firmware to its power-on state.
#[inline]
pub fn reset() -> Frame {
    Frame::control(Opcode::Reset)
}

/// # Self Test (0x01)
#[inline]
pub fn test() -> Frame {
    Frame::control(Opcode::Test)
}

/// # Test Page (0x02)
///
/// Prints the firmware's built-in test page.
#[inline]
pub fn test_page() -> Frame {
    Frame::control(Opcode::TestPage)
}

/// # Set Defaults (0x03)
///
/// Resets print settings. Sent right after [`wake`] at the start of each job.
#[inline]
pub fn set_default() -> Frame {
    Frame::control(Opcode::SetDefault)
}

/// # Wake (0x04)
///
/// Powers up the print head. First frame of every job.
///
/// ## Example
///
/// ```
/// use thermoline::protocol::commands;
///
/// assert_eq!(commands::wake().as_bytes(), &[0x04]);
/// ```
#[inline]
pub fn wake() -> Frame {
    Frame::control(Opcode::Wake)
}

/// # Sleep (0x05)
///
/// Powers down the print head. Last frame of every job.
#[inline]
pub fn sleep() -> Frame {
    Frame::control(Opcode::Sleep)
}

/// # Feed (0x06 n)
///
/// Advances the paper by `lines` text lines.
///
/// ## Example
///
/// ```
/// use thermoline::protocol::commands;
///
/// assert_eq!(commands::feed(1).as_bytes(), &[0x06, 0x01]);
/// ```
#[inline]
pub fn feed(lines: u8) -> Frame {
    Frame::new(Opcode::Feed, &[lines])
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Encode a u16 value as little-endian bytes [low, high]
///
/// ## Example
///
/// ```
/// use thermoline::protocol::commands::u16_le;
///
/// assert_eq!(u16_le(0x1234), [0x34, 0x12]);
/// assert_eq!(u16_le(100), [0x64, 0x00]);
/// ```
#[inline]
pub const fn u16_le(value: u16) -> [u8; 2] {
    [value as u8, (value >> 8) as u8]
}
