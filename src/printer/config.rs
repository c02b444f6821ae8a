//! # Printer Configuration
//!
//! This module defines hardware specifications for supported BLE thermal
//! printers.
//!
//! ## Supported Printers
//!
//! | Model | Frame buffer | Chunk | Max write |
//! |-------|--------------|-------|-----------|
//! | LINE Things thermal printer | 128 × 100 dots | 16 bytes | 512 bytes |
//!
//! ## Usage
//!
//! ```
//! use thermoline::printer::PrinterConfig;
//!
//! let config = PrinterConfig::LIFF_THERMAL;
//! println!("Frame buffer: {}x{} dots", config.width_dots, config.height_dots);
//! ```
//!
//! Profiles for other firmware builds can be loaded from JSON; missing
//! fields fall back to [`PrinterConfig::LIFF_THERMAL`]:
//!
//! ```json
//! { "height_dots": 200, "feed_lines": 3 }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ThermolineError;
use crate::protocol::graphics::{BITMAP_WRITE_LEN, CHUNK_DOTS};

/// Largest attribute value GATT allows in a single write.
pub const GATT_MAX_ATTR_LEN: usize = 512;

/// # Printer Configuration
///
/// Defines the hardware characteristics of a BLE thermal printer.
///
/// ## Physical Properties
///
/// - **width_dots**: Frame buffer width (a multiple of 8)
/// - **height_dots**: Frame buffer height (scanlines per image job)
///
/// ## BLE Properties
///
/// - **service**: Primary GATT service advertised by the printer
/// - **characteristic**: Command characteristic every frame is written to
/// - **max_write_len**: Largest single write the characteristic accepts
///
/// ## Job Properties
///
/// - **feed_lines**: Lines fed before SLEEP at the end of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterConfig {
    pub width_dots: u16,
    pub height_dots: u16,
    pub service: Uuid,
    pub characteristic: Uuid,
    pub max_write_len: usize,
    pub feed_lines: u8,
}

impl PrinterConfig {
    /// # LINE Things Thermal Printer
    ///
    /// ESP32-based reference printer with a 128 × 100 dot frame buffer.
    ///
    /// ```text
    /// ├────────── 128 dots = 1 chunk ──────────┤
    /// │ scanline 0                             │
    /// │ ...                                    │  100 scanlines
    /// │ scanline 99                            │
    /// ```
    pub const LIFF_THERMAL: Self = Self {
        width_dots: 128,
        height_dots: 100,
        service: Uuid::from_u128(0x4a40d898_cb8a_49fa_9471_c16aaef23b56),
        characteristic: Uuid::from_u128(0x2064e034_2e6a_40e1_9682_20742caa9987),
        max_write_len: GATT_MAX_ATTR_LEN,
        feed_lines: 1,
    };

    /// Load a profile from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ThermolineError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents).map_err(|e| {
            ThermolineError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check the profile is usable for encoding.
    pub fn validate(&self) -> Result<(), ThermolineError> {
        if self.width_dots == 0 || self.width_dots % 8 != 0 {
            return Err(ThermolineError::Config(format!(
                "width_dots must be a positive multiple of 8, got {}",
                self.width_dots
            )));
        }
        if self.height_dots == 0 {
            return Err(ThermolineError::Config("height_dots must be non-zero".into()));
        }
        if self.max_write_len < BITMAP_WRITE_LEN {
            return Err(ThermolineError::Config(format!(
                "max_write_len {} cannot hold a {} byte bitmap frame",
                self.max_write_len, BITMAP_WRITE_LEN
            )));
        }
        Ok(())
    }

    /// BITMAP_WRITE frames per scanline.
    #[inline]
    pub fn chunks_per_row(&self) -> usize {
        (self.width_dots as u32).div_ceil(CHUNK_DOTS) as usize
    }
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self::LIFF_THERMAL
    }
}
