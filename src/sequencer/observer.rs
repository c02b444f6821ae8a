//! Progress and event sinks for running jobs.
//!
//! Observers are for presentation only; nothing they do feeds back into the
//! job. Any `FnMut(u8)` closure works as a progress-only observer:
//!
//! ```
//! use thermoline::sequencer::JobObserver;
//!
//! let mut last = 0;
//! let mut progress = |percent: u8| last = percent;
//! progress.on_progress(42);
//! assert_eq!(last, 42);
//! ```

use tracing::{debug, info};

use super::job::JobState;
use crate::error::EncodeError;
use crate::protocol::frame::Frame;
use crate::protocol::text::TextRecord;

/// Receives job events as they happen.
pub trait JobObserver: Send {
    fn on_state(&mut self, _state: JobState) {}

    /// Called as each frame is handed to the transport.
    fn on_frame(&mut self, _frame: &Frame) {}

    /// Called after each scanline settles, 0..=100.
    fn on_progress(&mut self, _percent: u8) {}

    fn on_skipped(&mut self, _record: &TextRecord, _error: &EncodeError) {}
}

impl<F: FnMut(u8) + Send> JobObserver for F {
    fn on_progress(&mut self, percent: u8) {
        self(percent)
    }
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl JobObserver for Silent {}

/// Observer that reports through `tracing`.
///
/// Progress is logged at every `step` percent so long jobs don't flood the
/// log.
#[derive(Debug, Clone)]
pub struct LogObserver {
    step: u8,
    last: Option<u8>,
}

impl LogObserver {
    pub fn new(step: u8) -> Self {
        Self {
            step: step.max(1),
            last: None,
        }
    }
}

impl Default for LogObserver {
    fn default() -> Self {
        Self::new(10)
    }
}

impl JobObserver for LogObserver {
    fn on_state(&mut self, state: JobState) {
        debug!(?state, "job state");
        if state == JobState::Opening {
            self.last = None;
        }
    }

    fn on_progress(&mut self, percent: u8) {
        let due = match self.last {
            None => true,
            Some(last) => percent >= last.saturating_add(self.step) || percent == 100,
        };
        if due && self.last != Some(percent) {
            info!("progress {}%", percent);
            self.last = Some(percent);
        }
    }
}
