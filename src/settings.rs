//! Settings loading for the frostwatch CLI.
//!
//! Settings come from three layers, later layers overriding earlier ones:
//! built-in defaults, an optional `frostwatch.toml`, and `FROSTWATCH_*`
//! environment variables (e.g. `FROSTWATCH_BASE_URL`).

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use frostwatch_types::{DeviceMapping, DeviceRegistry};

/// Resolved CLI settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Backend base URL.
    pub base_url: String,
    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,
    /// Fleet-status poll cadence in seconds.
    pub status_interval_secs: u64,
    /// Per-device telemetry poll cadence in seconds.
    pub telemetry_interval_secs: u64,
    /// Fault-log refresh cadence in seconds.
    pub fault_refresh_secs: u64,
    /// Device name to backend table mappings.
    #[serde(default)]
    pub devices: Vec<DeviceMapping>,
}

impl Settings {
    /// Load settings, optionally from an explicit config file path.
    ///
    /// Without an explicit path, `frostwatch.toml` in the working directory
    /// is read if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("base_url", "http://localhost:8080")?
            .set_default("timeout_secs", 10)?
            .set_default("status_interval_secs", 18)?
            .set_default("telemetry_interval_secs", 10)?
            .set_default("fault_refresh_secs", 60)?;

        builder = match path {
            Some(path) => {
                let path = path
                    .to_str()
                    .context("config path is not valid UTF-8")?;
                builder.add_source(File::new(path, FileFormat::Toml))
            }
            None => builder.add_source(File::new("frostwatch.toml", FileFormat::Toml).required(false)),
        };

        let settings = builder
            .add_source(Environment::with_prefix("FROSTWATCH"))
            .build()
            .context("failed to assemble configuration")?
            .try_deserialize()
            .context("invalid configuration")?;

        Ok(settings)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs)
    }

    pub fn telemetry_interval(&self) -> Duration {
        Duration::from_secs(self.telemetry_interval_secs)
    }

    pub fn fault_refresh(&self) -> Duration {
        Duration::from_secs(self.fault_refresh_secs)
    }

    /// The device registry configured in the `[[devices]]` tables.
    pub fn registry(&self) -> DeviceRegistry {
        DeviceRegistry::new(self.devices.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_without_config_file() {
        let settings = Settings::load(Some(write_toml(""))).unwrap();
        assert_eq!(settings.base_url, "http://localhost:8080");
        assert_eq!(settings.timeout(), Duration::from_secs(10));
        assert_eq!(settings.status_interval(), Duration::from_secs(18));
        assert_eq!(settings.telemetry_interval(), Duration::from_secs(10));
        assert_eq!(settings.fault_refresh(), Duration::from_secs(60));
        assert!(settings.devices.is_empty());
    }

    #[test]
    fn config_file_overrides_defaults_and_maps_devices() {
        let settings = Settings::load(Some(write_toml(
            r#"
            base_url = "http://fleet.local:9000"
            status_interval_secs = 30

            [[devices]]
            name = "IDM-01"
            table = "idm01_data"
            status_key = "IDM-01"

            [[devices]]
            name = "IDM-03"
            table = "idm03_data"
            status_key = "IDM-03"
            fault_table = "dryer_legacy_faults"
            "#,
        )))
        .unwrap();

        assert_eq!(settings.base_url, "http://fleet.local:9000");
        assert_eq!(settings.status_interval(), Duration::from_secs(30));
        assert_eq!(settings.telemetry_interval(), Duration::from_secs(10));

        let registry = settings.registry();
        assert_eq!(registry.table_name("IDM-01"), Some("idm01_data"));
        assert_eq!(registry.fault_table_override("IDM-01"), None);
        assert_eq!(
            registry.fault_table_override("IDM-03"),
            Some("dryer_legacy_faults")
        );
    }

    fn write_toml(contents: &str) -> &'static Path {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        // Keep the file alive for the rest of the test process.
        let (_, path) = file.keep().unwrap();
        Box::leak(path.into_boxed_path())
    }
}
