//! # Print Sequencer
//!
//! Drives a [`PrintJob`] through a [`Transport`]: brackets the job with
//! wake/reset commands, streams the content, and closes with flush, feed and
//! sleep.
//!
//! ## Ordering
//!
//! ```text
//! Opening       WAKE ─► SET_DEFAULT                      (one at a time)
//! Transmitting  ┌ row 0: chunk 0 ┬ chunk 1 ┬ ... ┐       (concurrent within a row)
//!               └────────────────┴─────────┴─────┘ barrier
//!               ┌ row 1: ...                     ┐
//!               ...
//! Closing       BITMAP_FLUSH ─► FEED ─► SLEEP            (one at a time)
//! ```
//!
//! The printer's frame buffer is scanline addressed: chunks of the same
//! scanline may land in any order, but scanline N+1 must not reach the device
//! before every chunk of scanline N has been accepted. Each row is therefore
//! issued as one batch of concurrent writes, and the next row starts only
//! once the whole batch has settled.
//!
//! Text jobs send all their frames as a single batch; the printer places
//! each string by its own coordinates.
//!
//! ## Failure
//!
//! The first failed write fails the job. Writes already in flight in the
//! same batch are allowed to settle, then nothing else is sent: no further
//! rows and no closing bracket. There are no retries; start a new job.
//! Dropping the future returned by [`PrintSequencer::run`] (for example
//! under `tokio::time::timeout`) aborts any in-flight batch, sends nothing
//! further and leaves [`PrintSequencer::state`] at `Failed`.
//!
//! ## Example
//!
//! ```
//! use thermoline::protocol::graphics::Raster;
//! use thermoline::sequencer::{PrintJob, PrintSequencer};
//! use thermoline::transport::RecordingTransport;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut sequencer = PrintSequencer::new(RecordingTransport::new());
//! let raster = Raster::from_fn(128, 100, |x, y| (x + y) % 2 == 0)?;
//!
//! let report = sequencer.run(&PrintJob::Image(raster)).await?;
//! assert_eq!(report.rows, 100);
//! # Ok(())
//! # }
//! ```

mod job;
mod observer;

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

pub use job::{JobKind, JobReport, JobState, PrintJob, SkippedRecord};
pub use observer::{JobObserver, LogObserver, Silent};

use crate::error::{
    EncodeError, JobError, Phase, PreconditionError, TransportError, TransportErrorKind,
};
use crate::printer::PrinterConfig;
use crate::protocol::commands;
use crate::protocol::frame::Frame;
use crate::protocol::graphics::{self, Raster};
use crate::protocol::text::{self, TextRecord};
use crate::transport::Transport;

/// Job executor for one device.
///
/// Jobs take `&mut self`, so a sequencer never runs two jobs against its
/// characteristic at once. Sequencers for different devices are independent.
pub struct PrintSequencer<T> {
    transport: Arc<T>,
    config: PrinterConfig,
    state: JobState,
}

impl<T: Transport + 'static> PrintSequencer<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, PrinterConfig::default())
    }

    pub fn with_config(transport: T, config: PrinterConfig) -> Self {
        Self {
            transport: Arc::new(transport),
            config,
            state: JobState::Idle,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &PrinterConfig {
        &self.config
    }

    /// State of the most recent job.
    ///
    /// A job whose future was dropped before it finished reads as
    /// [`JobState::Failed`].
    pub fn state(&self) -> JobState {
        self.state
    }

    /// Run a job without an observer.
    pub async fn run(&mut self, job: &PrintJob) -> Result<JobReport, JobError> {
        self.run_with(job, &mut Silent).await
    }

    /// Run a job, reporting state, frames and progress to `observer`.
    pub async fn run_with(
        &mut self,
        job: &PrintJob,
        observer: &mut dyn JobObserver,
    ) -> Result<JobReport, JobError> {
        let Self {
            transport,
            config,
            state,
        } = self;
        let transport: &Arc<T> = transport;
        let mut run = Run {
            transport,
            config,
            state: StateGuard { state },
        };
        run.state.enter(JobState::Idle, observer);

        if let Err(e) = ensure_connected(&**transport).await {
            warn!(device = %transport.device_id(), "{}", e);
            run.state.enter(JobState::Failed, observer);
            return Err(e.into());
        }

        let mut report = JobReport::new(job.kind());
        info!(device = %transport.device_id(), kind = %report.kind, "starting job");

        match run.drive(job, observer, &mut report).await {
            Ok(()) => {
                run.state.enter(JobState::Done, observer);
                info!(
                    device = %transport.device_id(),
                    frames = report.frames_written,
                    skipped = report.skipped.len(),
                    "job done"
                );
                Ok(report)
            }
            Err(e) => {
                run.state.enter(JobState::Failed, observer);
                error!(device = %transport.device_id(), "{}", e);
                Err(e)
            }
        }
    }

    /// Send one stand-alone frame, e.g. RESET or TESTPAGE.
    pub async fn send_control(&mut self, frame: Frame) -> Result<(), JobError> {
        ensure_connected(&*self.transport).await?;
        debug!(device = %self.transport.device_id(), "control {}", frame);
        self.transport
            .write(frame.as_bytes())
            .await
            .map_err(|source| JobError::Transport {
                phase: Phase::Control,
                source,
            })
    }

    /// Read the command characteristic.
    pub async fn read_status(&self) -> Result<Vec<u8>, JobError> {
        ensure_connected(&*self.transport).await?;
        let value = self
            .transport
            .read()
            .await
            .map_err(|source| JobError::Transport {
                phase: Phase::Control,
                source,
            })?;
        debug!(device = %self.transport.device_id(), "read {:02x?}", value);
        Ok(value)
    }
}

async fn ensure_connected<T: Transport>(transport: &T) -> Result<(), PreconditionError> {
    if transport.is_connected().await {
        Ok(())
    } else {
        Err(PreconditionError::NotConnected {
            device: transport.device_id().to_string(),
        })
    }
}

/// Records the job state, falling back to `Failed` if the job is dropped
/// before it reached a terminal state.
struct StateGuard<'a> {
    state: &'a mut JobState,
}

impl StateGuard<'_> {
    fn enter(&mut self, state: JobState, observer: &mut dyn JobObserver) {
        *self.state = state;
        observer.on_state(state);
    }
}

impl Drop for StateGuard<'_> {
    fn drop(&mut self) {
        if !self.state.is_terminal() {
            warn!(state = ?*self.state, "job abandoned");
            *self.state = JobState::Failed;
        }
    }
}

/// One job in flight.
struct Run<'a, T> {
    transport: &'a Arc<T>,
    config: &'a PrinterConfig,
    state: StateGuard<'a>,
}

impl<T: Transport + 'static> Run<'_, T> {
    async fn drive(
        &mut self,
        job: &PrintJob,
        observer: &mut dyn JobObserver,
        report: &mut JobReport,
    ) -> Result<(), JobError> {
        self.state.enter(JobState::Opening, observer);
        for frame in [commands::wake(), commands::set_default()] {
            self.send(frame, Phase::Opening, observer, report).await?;
        }

        self.state.enter(JobState::Transmitting, observer);
        let closing = match job {
            PrintJob::Image(raster) => {
                self.transmit_image(raster, observer, report).await?;
                vec![
                    graphics::encode_flush(raster.height()),
                    commands::feed(self.config.feed_lines),
                    commands::sleep(),
                ]
            }
            PrintJob::Text(records) => {
                self.transmit_text(records, observer, report).await?;
                vec![commands::feed(self.config.feed_lines), commands::sleep()]
            }
        };

        self.state.enter(JobState::Closing, observer);
        for frame in closing {
            self.send(frame, Phase::Closing, observer, report).await?;
        }
        Ok(())
    }

    async fn transmit_image(
        &self,
        raster: &Raster,
        observer: &mut dyn JobObserver,
        report: &mut JobReport,
    ) -> Result<(), JobError> {
        let height = raster.height();
        for y in 0..height {
            let frames = graphics::scanline_frames(raster, y);
            self.batch(frames, observer, report).await?;
            report.rows += 1;
            observer.on_progress(progress(y, height));
        }
        Ok(())
    }

    async fn transmit_text(
        &self,
        records: &[TextRecord],
        observer: &mut dyn JobObserver,
        report: &mut JobReport,
    ) -> Result<(), JobError> {
        let mut frames = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            match self.encode_record(record) {
                Ok(frame) => frames.push(frame),
                Err(error) => {
                    warn!(
                        index,
                        text = %record.text,
                        y = record.y,
                        "skipping text record: {}",
                        error
                    );
                    observer.on_skipped(record, &error);
                    report.skipped.push(SkippedRecord { index, error });
                }
            }
        }
        self.batch(frames, observer, report).await
    }

    fn encode_record(&self, record: &TextRecord) -> Result<Frame, EncodeError> {
        let frame = text::encode_text(record)?;
        if frame.len() > self.config.max_write_len {
            return Err(EncodeError::FrameTooLong {
                len: frame.len(),
                max: self.config.max_write_len,
            });
        }
        Ok(frame)
    }

    /// Write one frame and wait for it.
    async fn send(
        &self,
        frame: Frame,
        phase: Phase,
        observer: &mut dyn JobObserver,
        report: &mut JobReport,
    ) -> Result<(), JobError> {
        observer.on_frame(&frame);
        debug!("{} {}", phase, frame);
        self.transport
            .write(frame.as_bytes())
            .await
            .map_err(|source| JobError::Transport { phase, source })?;
        report.frames_written += 1;
        Ok(())
    }

    /// Write all frames concurrently and wait until every one has settled.
    ///
    /// Dropping the returned future drops the `JoinSet`, which aborts the
    /// writes still in flight.
    async fn batch(
        &self,
        frames: Vec<Frame>,
        observer: &mut dyn JobObserver,
        report: &mut JobReport,
    ) -> Result<(), JobError> {
        let mut writes = JoinSet::new();
        for frame in frames {
            observer.on_frame(&frame);
            debug!("{} {}", Phase::Transmitting, frame);
            let transport = Arc::clone(self.transport);
            writes.spawn(async move { transport.write(frame.as_bytes()).await });
        }

        let mut failure: Option<TransportError> = None;
        while let Some(joined) = writes.join_next().await {
            let result = joined.unwrap_or_else(|e| {
                Err(TransportError::new(
                    TransportErrorKind::Other,
                    self.transport.device_id(),
                    self.transport.characteristic_id(),
                    format!("write task aborted: {}", e),
                ))
            });
            match result {
                Ok(()) => report.frames_written += 1,
                Err(e) => {
                    warn!("write failed: {}", e);
                    failure.get_or_insert(e);
                }
            }
        }

        match failure {
            None => Ok(()),
            Some(source) => Err(JobError::Transport {
                phase: Phase::Transmitting,
                source,
            }),
        }
    }
}

/// Percentage of scanlines done after row `y`, rounded down.
fn progress(y: u16, height: u16) -> u8 {
    ((y as u32 + 1) * 100 / height as u32) as u8
}
