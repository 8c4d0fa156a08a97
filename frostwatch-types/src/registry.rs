//! Injectable device lookup tables.
//!
//! The mapping from a human device identifier to its backend table name and
//! fleet-status key is deployment configuration, not derived data. Callers
//! load it (from a config file, typically) and hand it to the pollers; the
//! pollers never hardcode device knowledge.

use serde::{Deserialize, Serialize};

/// Static configuration for one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceMapping {
    /// Human device identifier used throughout the UI, e.g. `"IDM-01"`.
    pub name: String,
    /// Backend table name for the per-device register snapshot.
    pub table: String,
    /// Key this device appears under in the fleet-status snapshot.
    pub status_key: String,
    /// Legacy fault-log table override. Exactly one unit in the fleet logs
    /// faults under a table that does not follow the naming scheme; leave
    /// `None` everywhere else and do not repurpose this for anything new.
    #[serde(default)]
    pub fault_table: Option<String>,
}

/// The full set of device mappings for a deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRegistry {
    pub devices: Vec<DeviceMapping>,
}

impl DeviceRegistry {
    pub fn new(devices: Vec<DeviceMapping>) -> Self {
        Self { devices }
    }

    fn find(&self, device: &str) -> Option<&DeviceMapping> {
        self.devices.iter().find(|d| d.name == device)
    }

    /// Backend table name for a device, if the identifier is known.
    pub fn table_name(&self, device: &str) -> Option<&str> {
        self.find(device).map(|d| d.table.as_str())
    }

    /// Fleet-status key for a device, if the identifier is known.
    pub fn status_key(&self, device: &str) -> Option<&str> {
        self.find(device).map(|d| d.status_key.as_str())
    }

    /// Legacy fault-log table override, if this device carries one.
    pub fn fault_table_override(&self, device: &str) -> Option<&str> {
        self.find(device).and_then(|d| d.fault_table.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }
}
