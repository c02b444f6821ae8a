//! # Device Registry
//!
//! Tracks the connection state of every printer the host has seen, keyed by
//! device id. Each device moves through a small state machine:
//!
//! ```text
//!              discover
//!                 │
//!                 ▼
//!   ┌──────► Discovered ──begin_connect──► Connecting ──mark_connected──► Connected
//!   │                                          │                              │
//!   │                                     mark_failed                 mark_disconnected
//!   │                                          ▼                              ▼
//!   └─────────── begin_connect ───────────── Error / Disconnected ◄───────────┘
//! ```
//!
//! Any other transition is rejected with
//! [`PreconditionError::InvalidTransition`] and emits no event.
//!
//! UIs observe changes through [`DeviceRegistry::subscribe`]; the registry
//! itself holds no presentation state. Print jobs consult
//! [`DeviceRegistry::require_connected`] before opening.

use std::collections::BTreeMap;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::PreconditionError;

const EVENT_CAPACITY: usize = 64;

/// Connection state of one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Discovered,
    Connecting,
    Connected,
    Disconnected,
    Error,
}

/// What the registry knows about a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
    pub id: String,
    pub name: Option<String>,
    pub rssi: Option<i16>,
    pub state: DeviceState,
}

/// State change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEvent {
    pub id: String,
    pub state: DeviceState,
}

/// Per-device connection state machine, keyed by device id.
pub struct DeviceRegistry {
    devices: BTreeMap<String, DeviceEntry>,
    events: broadcast::Sender<DeviceEvent>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            devices: BTreeMap::new(),
            events,
        }
    }

    /// Receive every state change from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.events.subscribe()
    }

    /// Record a scan result. Returns `true` for a device not seen before.
    ///
    /// A rediscovered device keeps its state; only name and RSSI refresh.
    pub fn discover(&mut self, id: &str, name: Option<String>, rssi: Option<i16>) -> bool {
        if let Some(entry) = self.devices.get_mut(id) {
            entry.rssi = rssi;
            if name.is_some() {
                entry.name = name;
            }
            return false;
        }

        debug!(device = %id, name = ?name, "device discovered");
        self.devices.insert(
            id.to_string(),
            DeviceEntry {
                id: id.to_string(),
                name,
                rssi,
                state: DeviceState::Discovered,
            },
        );
        self.emit(id, DeviceState::Discovered);
        true
    }

    /// Start connecting. Rejected while a connection is pending or up.
    pub fn begin_connect(&mut self, id: &str) -> Result<(), PreconditionError> {
        let entry = self.entry_mut(id)?;
        match entry.state {
            DeviceState::Connecting | DeviceState::Connected => {
                warn!(device = %id, "already connected to this device");
                Err(PreconditionError::AlreadyConnecting {
                    device: id.to_string(),
                })
            }
            _ => {
                entry.state = DeviceState::Connecting;
                self.emit(id, DeviceState::Connecting);
                Ok(())
            }
        }
    }

    /// Finish a pending connection.
    pub fn mark_connected(&mut self, id: &str) -> Result<(), PreconditionError> {
        self.transition(id, DeviceState::Connected, &[DeviceState::Connecting])?;
        info!(device = %id, "connected");
        Ok(())
    }

    /// Close a connection, or abandon one still pending.
    pub fn mark_disconnected(&mut self, id: &str) -> Result<(), PreconditionError> {
        self.transition(
            id,
            DeviceState::Disconnected,
            &[DeviceState::Connecting, DeviceState::Connected],
        )?;
        info!(device = %id, "disconnected");
        Ok(())
    }

    /// Record a failed connection attempt or a link error.
    pub fn mark_failed(&mut self, id: &str) -> Result<(), PreconditionError> {
        self.transition(
            id,
            DeviceState::Error,
            &[DeviceState::Connecting, DeviceState::Connected],
        )?;
        warn!(device = %id, "connection failed");
        Ok(())
    }

    pub fn state(&self, id: &str) -> Option<DeviceState> {
        self.devices.get(id).map(|entry| entry.state)
    }

    pub fn get(&self, id: &str) -> Option<&DeviceEntry> {
        self.devices.get(id)
    }

    /// All known devices, ordered by id.
    pub fn devices(&self) -> impl Iterator<Item = &DeviceEntry> {
        self.devices.values()
    }

    /// Gate for starting a print job.
    pub fn require_connected(&self, id: &str) -> Result<(), PreconditionError> {
        match self.state(id) {
            Some(DeviceState::Connected) => Ok(()),
            Some(_) => Err(PreconditionError::NotConnected {
                device: id.to_string(),
            }),
            None => Err(PreconditionError::UnknownDevice {
                device: id.to_string(),
            }),
        }
    }

    fn transition(
        &mut self,
        id: &str,
        to: DeviceState,
        from: &[DeviceState],
    ) -> Result<(), PreconditionError> {
        let entry = self.entry_mut(id)?;
        if !from.contains(&entry.state) {
            return Err(PreconditionError::InvalidTransition {
                device: id.to_string(),
                from: entry.state,
                to,
            });
        }
        entry.state = to;
        self.emit(id, to);
        Ok(())
    }

    fn entry_mut(&mut self, id: &str) -> Result<&mut DeviceEntry, PreconditionError> {
        self.devices
            .get_mut(id)
            .ok_or_else(|| PreconditionError::UnknownDevice {
                device: id.to_string(),
            })
    }

    fn emit(&self, id: &str, state: DeviceState) {
        // No subscribers is fine.
        let _ = self.events.send(DeviceEvent {
            id: id.to_string(),
            state,
        });
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
