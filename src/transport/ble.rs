//! # BLE GATT Transport
//!
//! Talks to the printer through the host's Bluetooth stack via `btleplug`
//! (BlueZ on Linux, CoreBluetooth on macOS, WinRT on Windows).
//!
//! ## Connecting
//!
//! ```no_run
//! use std::time::Duration;
//! use thermoline::printer::PrinterConfig;
//! use thermoline::transport::BleTransport;
//!
//! # async fn example() -> Result<(), thermoline::ThermolineError> {
//! let config = PrinterConfig::LIFF_THERMAL;
//! let transport = BleTransport::connect(&config, None, Duration::from_secs(5)).await?;
//! # Ok(())
//! # }
//! ```
//!
//! The printer advertises its primary service UUID; scanning is filtered on
//! it so unrelated peripherals never show up. Every frame is written with
//! response so `write` only resolves once the firmware acknowledged it,
//! which is what the sequencer's batch barrier relies on.

use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{
    Central, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use tracing::{debug, info};

use super::Transport;
use crate::error::{ThermolineError, TransportError, TransportErrorKind};
use crate::printer::PrinterConfig;

/// A printer seen during a scan.
#[derive(Debug, Clone)]
pub struct Discovered {
    pub id: String,
    pub name: Option<String>,
    pub rssi: Option<i16>,
    peripheral: Peripheral,
}

/// GATT transport bound to one printer's command characteristic.
pub struct BleTransport {
    peripheral: Peripheral,
    characteristic: Characteristic,
    device: String,
    characteristic_id: String,
}

impl BleTransport {
    /// Scan for printers advertising `config.service`.
    pub async fn scan(
        config: &PrinterConfig,
        scan_time: Duration,
    ) -> Result<Vec<Discovered>, ThermolineError> {
        let adapter = first_adapter().await?;
        adapter
            .start_scan(ScanFilter {
                services: vec![config.service],
            })
            .await
            .map_err(|e| adapter_error("start_scan", e))?;
        tokio::time::sleep(scan_time).await;
        let peripherals = adapter
            .peripherals()
            .await
            .map_err(|e| adapter_error("peripherals", e))?;
        // Best effort; the results are already in hand.
        let _ = adapter.stop_scan().await;

        let mut found = Vec::new();
        for peripheral in peripherals {
            let Ok(Some(props)) = peripheral.properties().await else {
                continue;
            };
            if !props.services.contains(&config.service) {
                continue;
            }
            let id = peripheral.address().to_string();
            debug!(device = %id, name = ?props.local_name, rssi = ?props.rssi, "printer found");
            found.push(Discovered {
                id,
                name: props.local_name,
                rssi: props.rssi,
                peripheral,
            });
        }
        Ok(found)
    }

    /// Scan, pick the first printer (optionally matching `name`) and connect.
    pub async fn connect(
        config: &PrinterConfig,
        name: Option<&str>,
        scan_time: Duration,
    ) -> Result<Self, ThermolineError> {
        let candidates = Self::scan(config, scan_time).await?;
        let target = candidates
            .into_iter()
            .find(|d| match name {
                Some(wanted) => d.name.as_deref() == Some(wanted) || d.id == wanted,
                None => true,
            })
            .ok_or_else(|| {
                ThermolineError::Transport(TransportError::new(
                    TransportErrorKind::NotConnected,
                    name.unwrap_or("<any>"),
                    config.characteristic.to_string(),
                    "no printer found during scan",
                ))
            })?;
        Self::open(config, target).await
    }

    /// Connect to a previously discovered printer.
    pub async fn open(config: &PrinterConfig, target: Discovered) -> Result<Self, ThermolineError> {
        let device = target.id;
        let characteristic_id = config.characteristic.to_string();
        let peripheral = target.peripheral;
        let fail = |op: &str, e: btleplug::Error| {
            TransportError::new(
                kind_of(&e),
                device.clone(),
                characteristic_id.clone(),
                format!("{} failed: {}", op, e),
            )
        };

        info!(device = %device, "connecting");
        peripheral.connect().await.map_err(|e| fail("connect", e))?;
        peripheral
            .discover_services()
            .await
            .map_err(|e| fail("discover_services", e))?;

        let characteristic = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == config.characteristic && c.service_uuid == config.service)
            .ok_or_else(|| {
                TransportError::new(
                    TransportErrorKind::Gatt,
                    device.clone(),
                    characteristic_id.clone(),
                    "command characteristic not found",
                )
            })?;
        info!(device = %device, characteristic = %characteristic_id, "connected");

        Ok(Self {
            peripheral,
            characteristic,
            device,
            characteristic_id,
        })
    }

    pub async fn disconnect(&self) -> Result<(), TransportError> {
        self.peripheral
            .disconnect()
            .await
            .map_err(|e| self.error("disconnect", e))
    }

    fn error(&self, op: &str, e: btleplug::Error) -> TransportError {
        TransportError::new(
            kind_of(&e),
            self.device.clone(),
            self.characteristic_id.clone(),
            format!("{} failed: {}", op, e),
        )
    }
}

#[async_trait]
impl Transport for BleTransport {
    async fn write(&self, frame: &[u8]) -> Result<(), TransportError> {
        self.peripheral
            .write(&self.characteristic, frame, WriteType::WithResponse)
            .await
            .map_err(|e| self.error("write", e))
    }

    async fn read(&self) -> Result<Vec<u8>, TransportError> {
        self.peripheral
            .read(&self.characteristic)
            .await
            .map_err(|e| self.error("read", e))
    }

    async fn is_connected(&self) -> bool {
        self.peripheral.is_connected().await.unwrap_or(false)
    }

    fn device_id(&self) -> &str {
        &self.device
    }

    fn characteristic_id(&self) -> &str {
        &self.characteristic_id
    }
}

async fn first_adapter() -> Result<Adapter, ThermolineError> {
    let manager = Manager::new()
        .await
        .map_err(|e| adapter_error("manager", e))?;
    manager
        .adapters()
        .await
        .map_err(|e| adapter_error("adapters", e))?
        .into_iter()
        .next()
        .ok_or_else(|| ThermolineError::Config("no Bluetooth adapter available".into()))
}

fn adapter_error(op: &str, e: btleplug::Error) -> ThermolineError {
    ThermolineError::Transport(TransportError::new(
        kind_of(&e),
        "adapter",
        "-",
        format!("{} failed: {}", op, e),
    ))
}

/// Translate a btleplug failure into the transport taxonomy.
fn kind_of(e: &btleplug::Error) -> TransportErrorKind {
    use btleplug::Error;
    match e {
        Error::NotConnected => TransportErrorKind::NotConnected,
        Error::DeviceNotFound => TransportErrorKind::Disconnected,
        Error::TimedOut(_) => TransportErrorKind::Timeout,
        Error::PermissionDenied
        | Error::NoSuchCharacteristic
        | Error::UnexpectedCharacteristic
        | Error::NotSupported(_) => TransportErrorKind::Gatt,
        _ => TransportErrorKind::Other,
    }
}
