//! # Connection Registry
//!
//! Keeps track of the connections that extensions open to external devices
//! so the host can report what it is connected to and in which state.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::debug;

use crate::error::RegistryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionPurpose {
    Mocap,
    Uav,
    Debug,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionEntry {
    pub name: String,
    pub description: String,
    pub purpose: ConnectionPurpose,
    pub state: ConnectionState,
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    entries: Mutex<BTreeMap<String, ConnectionEntry>>,
}

impl ConnectionRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers a connection for as long as the returned guard lives.
    pub fn register(
        self: &Arc<Self>,
        name: &str,
        description: &str,
        purpose: ConnectionPurpose,
    ) -> Result<ConnectionRegistration, RegistryError> {
        let mut entries = self.lock();
        if entries.contains_key(name) {
            return Err(RegistryError::AlreadyRegistered(name.to_string()));
        }

        entries.insert(
            name.to_string(),
            ConnectionEntry {
                name: name.to_string(),
                description: description.to_string(),
                purpose,
                state: ConnectionState::Disconnected,
            },
        );
        debug!("Registered connection {name}");

        Ok(ConnectionRegistration {
            registry: Arc::clone(self),
            name: name.to_string(),
        })
    }

    pub fn set_state(&self, name: &str, state: ConnectionState) {
        if let Some(entry) = self.lock().get_mut(name) {
            if entry.state != state {
                debug!("Connection {name} is now {state}");
                entry.state = state;
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<ConnectionEntry> {
        self.lock().get(name).cloned()
    }

    pub fn entries(&self) -> Vec<ConnectionEntry> {
        self.lock().values().cloned().collect()
    }

    fn unregister(&self, name: &str) {
        if self.lock().remove(name).is_some() {
            debug!("Unregistered connection {name}");
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, ConnectionEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Removes its connection from the registry when dropped.
#[derive(Debug)]
pub struct ConnectionRegistration {
    registry: Arc<ConnectionRegistry>,
    name: String,
}

impl ConnectionRegistration {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_state(&self, state: ConnectionState) {
        self.registry.set_state(&self.name, state);
    }
}

impl Drop for ConnectionRegistration {
    fn drop(&mut self) {
        self.registry.unregister(&self.name);
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
