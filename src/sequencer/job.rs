//! Print job definitions and results.

use std::fmt;

use crate::error::EncodeError;
use crate::protocol::graphics::Raster;
use crate::protocol::text::TextRecord;

/// One wake → content → sleep transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum PrintJob {
    /// A raster, sent scanline by scanline.
    Image(Raster),
    /// Positioned strings, sent as one unordered batch.
    Text(Vec<TextRecord>),
}

impl PrintJob {
    pub fn kind(&self) -> JobKind {
        match self {
            Self::Image(_) => JobKind::Image,
            Self::Text(_) => JobKind::Text,
        }
    }
}

impl From<Raster> for PrintJob {
    fn from(raster: Raster) -> Self {
        Self::Image(raster)
    }
}

impl From<Vec<TextRecord>> for PrintJob {
    fn from(records: Vec<TextRecord>) -> Self {
        Self::Text(records)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Image,
    Text,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Image => "image",
            Self::Text => "text",
        })
    }
}

/// Lifecycle of a job.
///
/// ```text
/// Idle ─► Opening ─► Transmitting ─► Closing ─► Done
///   └────────┴────────────┴─────────────┴─────► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Opening,
    Transmitting,
    Closing,
    Done,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// A text record the encoder refused, by position in the job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub index: usize,
    pub error: EncodeError,
}

/// Outcome of a completed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub kind: JobKind,
    /// Frames the transport acknowledged, bracket included.
    pub frames_written: usize,
    /// Scanlines fully transmitted (image jobs).
    pub rows: u16,
    /// Text records dropped at encode time.
    pub skipped: Vec<SkippedRecord>,
}

impl JobReport {
    pub(crate) fn new(kind: JobKind) -> Self {
        Self {
            kind,
            frames_written: 0,
            rows: 0,
            skipped: Vec::new(),
        }
    }
}
