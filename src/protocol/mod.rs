//! # Printer Protocol Implementation
//!
//! This module provides the frame encoders for the BLE thermal printer
//! command protocol. Encoding is pure: no I/O, no hidden state, identical
//! input always yields byte-identical frames.
//!
//! ## Module Structure
//!
//! - [`commands`]: Opcode catalog and control commands (wake, sleep, feed)
//! - [`frame`]: The [`Frame`] type, one BLE write each
//! - [`graphics`]: Raster input and bitmap scanline frames
//! - [`text`]: Text records and text frames
//!
//! ## Usage Example
//!
//! ```
//! use thermoline::protocol::{commands, graphics::{self, Raster}};
//!
//! let raster = Raster::from_fn(128, 2, |x, _y| x < 64)?;
//!
//! let mut frames = vec![commands::wake(), commands::set_default()];
//! for y in 0..raster.height() {
//!     frames.extend(graphics::encode_scanline(&raster, y)?);
//! }
//! frames.push(graphics::encode_flush(raster.height()));
//! frames.push(commands::feed(1));
//! frames.push(commands::sleep());
//!
//! assert_eq!(frames.len(), 7);
//! # Ok::<(), thermoline::error::EncodeError>(())
//! ```

pub mod commands;
pub mod frame;
pub mod graphics;
pub mod text;

pub use commands::Opcode;
pub use frame::Frame;
