//! # Recording Transport
//!
//! Keeps every write in memory instead of sending it anywhere. Used by the
//! CLI's `--dry-run` mode and by tests that need to observe what the
//! sequencer sent and in which order.
//!
//! Each write is logged twice: once when it is submitted
//! ([`WriteEvent::Started`]) and once when it settles
//! ([`WriteEvent::Settled`]). Between the two the write yields to the
//! runtime, so concurrent writes interleave the way real GATT writes do.
//!
//! ## Scripted Failures
//!
//! ```
//! use thermoline::transport::RecordingTransport;
//!
//! // Fail the third write
//! let transport = RecordingTransport::new().fail_on_write(2);
//!
//! // Fail every FEED frame
//! let transport = RecordingTransport::new().fail_when(|frame| frame[0] == 0x06);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use super::Transport;
use crate::error::{TransportError, TransportErrorKind};

/// Default device id reported by a recording transport.
pub const DEFAULT_DEVICE: &str = "dry-run";

type FailPredicate = Box<dyn Fn(&[u8]) -> bool + Send + Sync>;

/// One entry in the write log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteEvent {
    Started(Vec<u8>),
    Settled { frame: Vec<u8>, ok: bool },
}

#[derive(Default)]
struct Log {
    events: Vec<WriteEvent>,
    submitted: usize,
}

/// In-memory [`Transport`].
pub struct RecordingTransport {
    device: String,
    characteristic: String,
    connected: AtomicBool,
    latency: Option<Duration>,
    fail_on: Option<usize>,
    fail_when: Option<FailPredicate>,
    read_value: Vec<u8>,
    log: Mutex<Log>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            characteristic: crate::printer::PrinterConfig::LIFF_THERMAL
                .characteristic
                .to_string(),
            connected: AtomicBool::new(true),
            latency: None,
            fail_on: None,
            fail_when: None,
            read_value: Vec::new(),
            log: Mutex::new(Log::default()),
        }
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }

    /// Simulated acknowledgement delay per write.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Value returned by [`Transport::read`].
    pub fn with_read_value(mut self, value: Vec<u8>) -> Self {
        self.read_value = value;
        self
    }

    /// Fail the `n`th submitted write (0-based).
    pub fn fail_on_write(mut self, n: usize) -> Self {
        self.fail_on = Some(n);
        self
    }

    /// Fail every write whose bytes match `predicate`.
    pub fn fail_when(mut self, predicate: impl Fn(&[u8]) -> bool + Send + Sync + 'static) -> Self {
        self.fail_when = Some(Box::new(predicate));
        self
    }

    /// Simulate the link dropping (or coming back).
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Full start/settle log.
    pub fn events(&self) -> Vec<WriteEvent> {
        self.lock().events.clone()
    }

    /// Every frame submitted, in submission order, whether or not it succeeded.
    pub fn submitted(&self) -> Vec<Vec<u8>> {
        self.lock()
            .events
            .iter()
            .filter_map(|event| match event {
                WriteEvent::Started(frame) => Some(frame.clone()),
                WriteEvent::Settled { .. } => None,
            })
            .collect()
    }

    /// Frames the "device" acknowledged, in completion order.
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.lock()
            .events
            .iter()
            .filter_map(|event| match event {
                WriteEvent::Settled { frame, ok: true } => Some(frame.clone()),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Log> {
        // A panicking writer leaves the log readable.
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn error(&self, kind: TransportErrorKind, message: &str) -> TransportError {
        TransportError::new(kind, &self.device, &self.characteristic, message)
    }
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn write(&self, frame: &[u8]) -> Result<(), TransportError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(self.error(TransportErrorKind::NotConnected, "link is down"));
        }

        let index = {
            let mut log = self.lock();
            log.events.push(WriteEvent::Started(frame.to_vec()));
            log.submitted += 1;
            log.submitted - 1
        };

        match self.latency {
            Some(latency) => tokio::time::sleep(latency).await,
            None => tokio::task::yield_now().await,
        }

        let failed = self.fail_on == Some(index)
            || self.fail_when.as_ref().is_some_and(|predicate| predicate(frame));

        self.lock().events.push(WriteEvent::Settled {
            frame: frame.to_vec(),
            ok: !failed,
        });

        if failed {
            Err(self.error(
                TransportErrorKind::Gatt,
                &format!("scripted failure on write #{}", index),
            ))
        } else {
            Ok(())
        }
    }

    async fn read(&self) -> Result<Vec<u8>, TransportError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(self.error(TransportErrorKind::NotConnected, "link is down"));
        }
        Ok(self.read_value.clone())
    }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn device_id(&self) -> &str {
        &self.device
    }

    fn characteristic_id(&self) -> &str {
        &self.characteristic
    }
}
