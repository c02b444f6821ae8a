//! # Printer Transport Layer
//!
//! The printer is driven through a single GATT characteristic. This module
//! defines the [`Transport`] boundary the sequencer writes through, plus the
//! backends that implement it.
//!
//! ## Available Transports
//!
//! - [`recording`]: In-memory transport for dry runs and tests
//! - `ble`: btleplug-backed GATT transport (feature `ble`)
//!
//! ## Contract
//!
//! - One `write` is one frame; there is no framing beyond the GATT write.
//! - Writes may be issued concurrently from several tasks, so methods take
//!   `&self`.
//! - Failures are reported as [`TransportError`] with device and
//!   characteristic identity attached. Transports never retry.
//! - Timeouts, if any, are the transport's business.

use async_trait::async_trait;

use crate::error::TransportError;

#[cfg(feature = "ble")]
pub mod ble;
pub mod recording;

#[cfg(feature = "ble")]
pub use ble::BleTransport;
pub use recording::{RecordingTransport, WriteEvent};

/// Byte-oriented access to the printer's command characteristic.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Write one frame, resolving once the device acknowledged it.
    async fn write(&self, frame: &[u8]) -> Result<(), TransportError>;

    /// Read the characteristic's current value.
    async fn read(&self) -> Result<Vec<u8>, TransportError>;

    /// Whether the link is up. Jobs are rejected up front when it is not.
    async fn is_connected(&self) -> bool;

    /// Identity of the connected device, for error context and logs.
    fn device_id(&self) -> &str;

    /// Identity of the command characteristic, for error context and logs.
    fn characteristic_id(&self) -> &str;
}
