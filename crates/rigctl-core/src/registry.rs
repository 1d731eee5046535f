//! Hardware registry synchronized with the robot's JSON document.
//!
//! The remote document looks like:
//!
//! ```json
//! {
//!     "_comment": "...",
//!     "hw": [
//!         { "hw_name": "CAM", "hw_sim_mode": false, "extra": 1 }
//!     ]
//! }
//! ```
//!
//! Only `hw[].hw_name` and `hw[].hw_sim_mode` are interpreted. Everything
//! else, including unknown keys inside device entries, is kept verbatim and
//! written back on persist.

use crate::error::TransportError;
use crate::session::RemoteSession;
use crate::{Error, Result};
use rigctl_types::HardwareDevice;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use std::collections::HashSet;
use tracing::{debug, info};

const DEVICES_KEY: &str = "hw";
const NAME_KEY: &str = "hw_name";
const SIM_MODE_KEY: &str = "hw_sim_mode";

#[derive(Deserialize)]
struct DocumentView {
    hw: Vec<DeviceView>,
}

#[derive(Deserialize)]
struct DeviceView {
    hw_name: String,
    hw_sim_mode: bool,
}

/// In-memory copy of the remote hardware registry.
#[derive(Debug, Clone)]
pub struct HardwareRegistry {
    devices: Vec<HardwareDevice>,
    document: Value,
    remote_path: String,
}

impl HardwareRegistry {
    /// Download and parse the registry at `remote_path`.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigParse` if the file cannot be fetched in time or is
    /// not a valid registry document, and a transport error otherwise.
    pub async fn load<S>(session: &S, remote_path: &str) -> Result<Self>
    where
        S: RemoteSession + ?Sized,
    {
        if !session.is_connected() {
            return Err(TransportError::NotConnected.into());
        }

        debug!("Loading hardware registry from {remote_path}");
        let bytes = match session.download(remote_path).await {
            Ok(bytes) => bytes,
            Err(e @ TransportError::Timeout { .. }) => {
                return Err(Error::ConfigParse(format!(
                    "could not read {remote_path}: {e}"
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let registry = Self::from_slice(&bytes, remote_path)?;
        info!(
            "Loaded {} hardware devices from {remote_path}",
            registry.len()
        );
        Ok(registry)
    }

    /// Parse a registry document already in memory.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigParse` for malformed JSON, a missing or mistyped
    /// `hw` list or device field, or a device name that appears twice.
    pub fn from_slice(bytes: &[u8], remote_path: &str) -> Result<Self> {
        let document: Value = serde_json::from_slice(bytes)
            .map_err(|e| Error::ConfigParse(format!("{remote_path}: {e}")))?;

        let view = DocumentView::deserialize(&document)
            .map_err(|e| Error::ConfigParse(format!("{remote_path}: {e}")))?;

        let mut seen = HashSet::new();
        let mut devices = Vec::with_capacity(view.hw.len());
        for entry in view.hw {
            if !seen.insert(entry.hw_name.clone()) {
                return Err(Error::ConfigParse(format!(
                    "{remote_path}: duplicate device '{}'",
                    entry.hw_name
                )));
            }
            devices.push(HardwareDevice::new(entry.hw_name, entry.hw_sim_mode));
        }

        Ok(Self {
            devices,
            document,
            remote_path: remote_path.to_string(),
        })
    }

    #[must_use]
    pub fn remote_path(&self) -> &str {
        &self.remote_path
    }

    /// Devices in document order.
    #[must_use]
    pub fn devices(&self) -> &[HardwareDevice] {
        &self.devices
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&HardwareDevice> {
        self.devices.iter().find(|d| d.name == name)
    }

    /// Simulation flag of `name`, if the device exists.
    #[must_use]
    pub fn simulation_mode(&self, name: &str) -> Option<bool> {
        self.get(name).map(|d| d.simulation_mode)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.devices.iter().map(|d| d.name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// The full document as it will be written back.
    #[must_use]
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Set the simulation flag of `name` in memory.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownDevice` if no device has that name; the registry
    /// is left unchanged.
    pub fn set_simulation_mode(&mut self, name: &str, enabled: bool) -> Result<()> {
        let index = self
            .devices
            .iter()
            .position(|d| d.name == name)
            .ok_or_else(|| Error::UnknownDevice(name.to_string()))?;

        let entry = self
            .document
            .get_mut(DEVICES_KEY)
            .and_then(Value::as_array_mut)
            .and_then(|entries| {
                entries
                    .iter_mut()
                    .find(|e| e.get(NAME_KEY).and_then(Value::as_str) == Some(name))
            })
            .and_then(Value::as_object_mut)
            .ok_or_else(|| Error::UnknownDevice(name.to_string()))?;

        entry.insert(SIM_MODE_KEY.to_string(), Value::Bool(enabled));
        self.devices[index].simulation_mode = enabled;

        debug!("Set {name} simulation mode to {enabled}");
        Ok(())
    }

    /// Flip the simulation flag of `name` and return the new value.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownDevice` if no device has that name.
    pub fn toggle_simulation_mode(&mut self, name: &str) -> Result<bool> {
        let current = self
            .simulation_mode(name)
            .ok_or_else(|| Error::UnknownDevice(name.to_string()))?;
        self.set_simulation_mode(name, !current)?;
        Ok(!current)
    }

    /// Serialize the document with four-space indentation.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if serialization fails.
    pub fn to_document_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.document.serialize(&mut serializer)?;
        buffer.push(b'\n');
        Ok(buffer)
    }

    /// Upload the whole document, replacing the remote file.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the upload fails; the in-memory state is
    /// kept so the caller may retry.
    pub async fn persist<S>(&self, session: &S) -> Result<()>
    where
        S: RemoteSession + ?Sized,
    {
        if !session.is_connected() {
            return Err(TransportError::NotConnected.into());
        }

        let bytes = self.to_document_bytes()?;
        session.upload(&bytes, &self.remote_path).await?;
        info!("Saved hardware registry to {}", self.remote_path);
        Ok(())
    }
}
