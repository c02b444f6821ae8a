//! # Error Types
//!
//! This module defines error types used throughout the thermoline library.
//!
//! The taxonomy follows how each failure affects a print job:
//!
//! | Error | Scope | Effect |
//! |-------|-------|--------|
//! | [`EncodeError`] | one record/frame | skipped, job continues |
//! | [`TransportError`] | one write | job fails, caller may start a new job |
//! | [`PreconditionError`] | whole job | rejected before any frame is sent |

use std::fmt;

use thiserror::Error;

use crate::device::DeviceState;

/// Malformed encoder input.
///
/// For text jobs these are local: the offending record is dropped and the
/// rest of the job proceeds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// Raster width must be a positive multiple of 8.
    #[error("raster width {0} is not a positive multiple of 8")]
    InvalidWidth(u32),

    /// Raster height must fit the 16-bit row address.
    #[error("raster height {0} is outside 1..=65535")]
    InvalidHeight(u32),

    /// Scanline index past the bottom of the raster.
    #[error("scanline {y} out of range for raster of height {height}")]
    RowOutOfRange { y: u16, height: u16 },

    /// Text rows are addressed in 8-dot bands.
    #[error("text row {0} is not a multiple of 8")]
    InvalidRow(u16),

    /// Nothing to print.
    #[error("text is empty")]
    EmptyText,

    /// The protocol carries one non-NUL byte per character.
    #[error("character {0:?} cannot be sent in a text frame")]
    UnsupportedChar(char),

    /// Frame exceeds the characteristic's maximum write length.
    #[error("frame of {len} bytes exceeds the {max} byte write limit")]
    FrameTooLong { len: usize, max: usize },

    /// Packed buffer does not match the declared dimensions.
    #[error("packed buffer has {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },
}

/// Category of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Link dropped while the operation was in flight.
    Disconnected,
    /// Operation attempted on a link that was never established.
    NotConnected,
    /// The GATT layer rejected the operation.
    Gatt,
    /// The host stack gave up waiting.
    Timeout,
    /// Anything else the host stack reports.
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::NotConnected => "not connected",
            Self::Gatt => "GATT error",
            Self::Timeout => "timeout",
            Self::Other => "transport failure",
        };
        f.write_str(s)
    }
}

/// A failed read or write against the printer characteristic.
///
/// Carries the device and characteristic identity so the failure can be
/// logged and diagnosed without re-running the job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} on {device}/{characteristic}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub device: String,
    pub characteristic: String,
    pub message: String,
}

impl TransportError {
    pub fn new(
        kind: TransportErrorKind,
        device: impl Into<String>,
        characteristic: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            device: device.into(),
            characteristic: characteristic.into(),
            message: message.into(),
        }
    }
}

/// A job (or connection request) made against a device in the wrong state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionError {
    #[error("device {device} is not connected")]
    NotConnected { device: String },

    #[error("device {device} is already connecting or connected")]
    AlreadyConnecting { device: String },

    #[error("device {device} has not been discovered")]
    UnknownDevice { device: String },

    #[error("device {device} cannot go from {from:?} to {to:?}")]
    InvalidTransition {
        device: String,
        from: DeviceState,
        to: DeviceState,
    },
}

/// Job phase a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Opening,
    Transmitting,
    Closing,
    Control,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Opening => "opening",
            Self::Transmitting => "transmitting",
            Self::Closing => "closing",
            Self::Control => "control",
        };
        f.write_str(s)
    }
}

/// Why a print job did not reach `Done`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("job rejected: {0}")]
    Precondition(#[from] PreconditionError),

    #[error("job failed while {phase}: {source}")]
    Transport {
        phase: Phase,
        #[source]
        source: TransportError,
    },
}

impl JobError {
    /// The phase a transport failure occurred in, if any.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Transport { phase, .. } => Some(*phase),
            Self::Precondition(_) => None,
        }
    }
}

/// Main error type for thermoline operations
#[derive(Debug, Error)]
pub enum ThermolineError {
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("{0}")]
    Precondition(#[from] PreconditionError),

    #[error("{0}")]
    Job(#[from] JobError),

    /// Invalid or unreadable configuration
    #[error("Config error: {0}")]
    Config(String),

    /// Image loading error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
