//! Gated per-device telemetry polling.
//!
//! Detail polling is expensive, so it only happens for devices the fleet
//! feed currently reports as running. A poller is parameterized by one device
//! identifier; switching identifiers re-initializes the interval and bumps a
//! generation counter so a response still in flight for the previous device
//! is discarded instead of overwriting fresh state.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};

use frostwatch_types::{format_value, DeviceRegistry, TelemetryReading};

use crate::backend::Backend;
use crate::status_feed::StatusHandle;

/// Cadence of the per-device telemetry poll.
pub const TELEMETRY_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Default)]
struct TelemetryInner {
    reading: TelemetryReading,
    is_connected: bool,
    error: Option<String>,
    retry_count: u32,
    is_loading: bool,
    /// Bumped on every identifier change; in-flight fetches tagged with an
    /// older generation are discarded on arrival.
    generation: u64,
}

/// Repeating poller for one device's register snapshot.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use frostwatch_client::ApiClient;
/// use frostwatch_poll::{DeviceTelemetryPoller, StatusFeed};
/// use frostwatch_types::DeviceRegistry;
///
/// #[tokio::main]
/// async fn main() {
///     let client = Arc::new(ApiClient::builder().build());
///     let registry = Arc::new(DeviceRegistry::default());
///     let mut feed = StatusFeed::new(client.clone());
///     feed.start();
///
///     let mut poller = DeviceTelemetryPoller::new(client, registry, feed.handle(), "IDM-01");
///     poller.start();
/// }
/// ```
pub struct DeviceTelemetryPoller {
    backend: Arc<dyn Backend>,
    registry: Arc<DeviceRegistry>,
    status: StatusHandle,
    device: String,
    interval: Duration,
    inner: Arc<RwLock<TelemetryInner>>,
    stop_tx: Option<watch::Sender<bool>>,
}

impl DeviceTelemetryPoller {
    pub fn new(
        backend: Arc<dyn Backend>,
        registry: Arc<DeviceRegistry>,
        status: StatusHandle,
        device: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            registry,
            status,
            device: device.into(),
            interval: TELEMETRY_POLL_INTERVAL,
            inner: Arc::new(RwLock::new(TelemetryInner::default())),
            stop_tx: None,
        }
    }

    /// Override the poll cadence. Takes effect on the next `start()`.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// The device identifier this poller currently targets.
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Switch to a different device identifier.
    ///
    /// Resets published state, invalidates any fetch still in flight for the
    /// previous identifier, and re-initializes the interval if running.
    pub fn set_device(&mut self, device: impl Into<String>) {
        self.device = device.into();
        {
            let mut inner = self.inner.write();
            inner.generation += 1;
            inner.reading = TelemetryReading::new();
            inner.is_connected = false;
            inner.error = None;
            inner.retry_count = 0;
            inner.is_loading = false;
        }
        if self.stop_tx.is_some() {
            self.start();
        }
    }

    /// Begin the repeating poll. Idempotent; the first cycle runs immediately.
    pub fn start(&mut self) {
        if let Some(stop) = self.stop_tx.take() {
            let _ = stop.send(true);
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        self.stop_tx = Some(stop_tx);

        let backend = self.backend.clone();
        let registry = self.registry.clone();
        let status = self.status.clone();
        let device = self.device.clone();
        let inner = self.inner.clone();
        let interval = self.interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        poll_once(&backend, &registry, &status, &device, &inner).await;
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });
    }

    /// Cancel the repeating poll.
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop_tx.take() {
            let _ = stop.send(true);
        }
    }

    /// Run one fetch cycle immediately.
    pub async fn refresh(&self) {
        poll_once(
            &self.backend,
            &self.registry,
            &self.status,
            &self.device,
            &self.inner,
        )
        .await;
    }

    /// The current reading; empty when the device is gated off or unfetched.
    pub fn reading(&self) -> TelemetryReading {
        self.inner.read().reading.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.read().is_connected
    }

    pub fn error(&self) -> Option<String> {
        self.inner.read().error.clone()
    }

    /// Consecutive failed fetches. Display only; never drives backoff.
    pub fn retry_count(&self) -> u32 {
        self.inner.read().retry_count
    }

    pub fn is_loading(&self) -> bool {
        self.inner.read().is_loading
    }

    /// Format a raw reading for display with unit-aware rounding.
    pub fn format(&self, value: &Value, unit: &str) -> String {
        format_value(value, unit)
    }
}

impl std::fmt::Debug for DeviceTelemetryPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceTelemetryPoller")
            .field("device", &self.device)
            .field("interval", &self.interval)
            .field("running", &self.stop_tx.is_some())
            .finish()
    }
}

async fn poll_once(
    backend: &Arc<dyn Backend>,
    registry: &DeviceRegistry,
    status: &StatusHandle,
    device: &str,
    inner: &Arc<RwLock<TelemetryInner>>,
) {
    let generation = inner.read().generation;

    let (table, status_key) = match (registry.table_name(device), registry.status_key(device)) {
        (Some(table), Some(key)) => (table.to_string(), key.to_string()),
        _ => {
            warn!(device, "no table mapping for device");
            let mut guard = inner.write();
            if guard.generation == generation {
                guard.is_connected = false;
                guard.is_loading = false;
                guard.error = Some(format!("unknown table mapping for device '{device}'"));
            }
            return;
        }
    };

    // Gate on the latest fleet snapshot; an absent device is not running.
    if !status.is_running(&status_key) {
        let mut guard = inner.write();
        if guard.generation == generation {
            guard.reading = TelemetryReading::new();
            guard.is_connected = false;
            guard.error = None;
            guard.retry_count = 0;
            guard.is_loading = false;
        }
        debug!(device, "device not running, skipping detail fetch");
        return;
    }

    {
        let mut guard = inner.write();
        if guard.generation != generation {
            return;
        }
        guard.is_loading = true;
    }

    let result = backend.device_table(&table).await;

    let mut guard = inner.write();
    if guard.generation != generation {
        debug!(device, "discarding stale telemetry response");
        return;
    }
    guard.is_loading = false;
    match result {
        Ok(reading) => {
            debug!(device, fields = reading.len(), "telemetry updated");
            guard.reading = reading;
            guard.is_connected = true;
            guard.error = None;
            guard.retry_count = 0;
        }
        Err(e) => {
            warn!(device, error = %e, "telemetry fetch failed");
            guard.is_connected = false;
            guard.error = Some(format!("telemetry fetch failed: {e}"));
            guard.retry_count += 1;
        }
    }
}
