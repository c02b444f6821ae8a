//! # Thermoline - BLE Thermal Printer Library
//!
//! Thermoline drives small thermal printers that expose a single GATT
//! command characteristic. It provides:
//!
//! - **Protocol implementation**: frame encoders for bitmaps, text and
//!   control commands
//! - **Sequencing**: a job runner that brackets jobs with wake/sleep
//!   commands and keeps scanlines in order while writing chunks concurrently
//! - **Transport**: an async transport boundary, an in-memory recorder, and
//!   a btleplug backend (feature `ble`)
//!
//! ## Quick Start
//!
//! ```
//! use thermoline::{
//!     protocol::{graphics::Raster, text::TextRecord},
//!     sequencer::{PrintJob, PrintSequencer},
//!     transport::RecordingTransport,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Any Transport works here; the recorder just keeps the frames
//! let mut printer = PrintSequencer::new(RecordingTransport::new());
//!
//! // Print a raster (already dithered to black and white)
//! let raster = Raster::from_fn(128, 100, |x, _| x % 16 < 8)?;
//! printer.run(&PrintJob::Image(raster)).await?;
//!
//! // Print some text
//! let lines = vec![TextRecord::new("HELLO").at(0, 0), TextRecord::new("WORLD").at(0, 8)];
//! printer.run(&PrintJob::Text(lines)).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`protocol`] | Frame encoders |
//! | [`sequencer`] | Job state machine and write ordering |
//! | [`transport`] | Communication backends |
//! | [`device`] | Per-device connection state |
//! | [`printer`] | Printer configurations |
//! | [`error`] | Error types |
//!
//! ## Supported Printers
//!
//! Currently tested with:
//! - LINE Things thermal printer (128 × 100 dot frame buffer, ESP32)

pub mod device;
pub mod error;
pub mod printer;
pub mod protocol;
pub mod sequencer;
pub mod transport;

// Re-exports for convenience
pub use error::ThermolineError;
pub use printer::PrinterConfig;
pub use sequencer::{PrintJob, PrintSequencer};
pub use transport::Transport;
