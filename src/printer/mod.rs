//! # Printer Module
//!
//! This module provides printer-specific configurations.
//!
//! ## Modules
//!
//! - [`config`]: Printer hardware and BLE specifications

pub mod config;

pub use config::PrinterConfig;
