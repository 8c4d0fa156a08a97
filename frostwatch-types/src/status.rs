//! Fleet status model - per-device entries and the committed snapshot.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One device record as the fleet-status endpoint reports it.
///
/// The backend is loose about this shape: flag fields arrive as booleans,
/// numbers, or strings depending on controller firmware, and any field may be
/// missing. Everything is optional or coerced here; [`RawDeviceRecord::normalize`]
/// produces the strict [`DeviceStatusEntry`] the rest of the system consumes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDeviceRecord {
    #[serde(default, rename = "machineName")]
    pub machine_name: Option<String>,
    #[serde(default, rename = "lastUpdate")]
    pub last_update: Option<String>,
    #[serde(default, rename = "recordId")]
    pub record_id: Option<i64>,
    #[serde(default, rename = "hasNewData")]
    pub has_new_data: Value,
    #[serde(default, rename = "machineStatus")]
    pub machine_status: Value,
    #[serde(default, rename = "coolingStatus")]
    pub cooling_status: Value,
    #[serde(default, rename = "internetStatus")]
    pub internet_status: Value,
}

impl RawDeviceRecord {
    /// Normalize a raw record into a strict entry.
    ///
    /// `index` is the record's position in the response, used to synthesize a
    /// placeholder name (`"Machine {index+1}"`) when the backend omits one.
    pub fn normalize(self, index: usize) -> DeviceStatusEntry {
        let device_name = match self.machine_name {
            Some(name) if !name.is_empty() => name,
            _ => format!("Machine {}", index + 1),
        };
        DeviceStatusEntry {
            device_name,
            last_update: self.last_update,
            record_id: self.record_id,
            has_new_data: coerce_flag(&self.has_new_data),
            is_running: coerce_flag(&self.machine_status),
            is_cooling: coerce_flag(&self.cooling_status),
            is_online: coerce_flag(&self.internet_status),
        }
    }
}

/// Coerce a loosely-typed backend flag into a boolean.
///
/// Mirrors the truthiness the controllers rely on: non-zero numbers and
/// non-empty strings are true, `null` and missing fields are false.
pub fn coerce_flag(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// One fleet member's last-known state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatusEntry {
    /// Stable identifier; unique within one snapshot.
    pub device_name: String,
    /// Timestamp of the backend's most recent record, as reported.
    pub last_update: Option<String>,
    /// Monotonic marker from the backend; detects "new data" independent of
    /// status flags.
    pub record_id: Option<i64>,
    pub has_new_data: bool,
    pub is_running: bool,
    pub is_cooling: bool,
    pub is_online: bool,
}

/// The most recently committed view of all devices' coarse status.
///
/// Snapshots are replaced wholesale on every successful poll and never
/// mutated in place: the previous snapshot stays valid for readers until the
/// new one is committed.
///
/// Absence of a device from `entries` means "unknown", not "offline" -
/// lookups default to a safe-false state rather than erroring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetSnapshot {
    pub entries: Vec<DeviceStatusEntry>,
    /// Logical AND of `is_running` over all entries (vacuously true when
    /// empty; a deliberate simplification, not a guarantee of meaning).
    pub all_running: bool,
    /// Logical AND of `is_cooling` over all entries.
    pub all_cooling: bool,
    /// Logical AND of `is_online` over all entries.
    pub all_online: bool,
}

impl FleetSnapshot {
    /// Build a snapshot from normalized entries, folding the aggregates.
    pub fn from_entries(entries: Vec<DeviceStatusEntry>) -> Self {
        let all_running = entries.iter().all(|e| e.is_running);
        let all_cooling = entries.iter().all(|e| e.is_cooling);
        let all_online = entries.iter().all(|e| e.is_online);
        Self {
            entries,
            all_running,
            all_cooling,
            all_online,
        }
    }

    /// Normalize raw backend records into a snapshot in one step.
    pub fn from_raw(records: Vec<RawDeviceRecord>) -> Self {
        let entries = records
            .into_iter()
            .enumerate()
            .map(|(i, r)| r.normalize(i))
            .collect();
        Self::from_entries(entries)
    }

    /// Look up a device by name.
    pub fn get(&self, device_name: &str) -> Option<&DeviceStatusEntry> {
        self.entries.iter().find(|e| e.device_name == device_name)
    }

    /// Whether the named device is reported running.
    ///
    /// An absent device is not running - never an error.
    pub fn is_running(&self, device_name: &str) -> bool {
        self.get(device_name).is_some_and(|e| e.is_running)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
