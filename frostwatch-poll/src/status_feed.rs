//! Fleet status polling.
//!
//! One repeating fetch against the fleet-status endpoint keeps a normalized
//! [`FleetSnapshot`] fresh for the whole dashboard. The per-device telemetry
//! pollers gate their own fetching on this snapshot through a cheap
//! [`StatusHandle`].

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, warn};

use frostwatch_types::FleetSnapshot;

use crate::backend::Backend;
use crate::events::{EventLog, FeedEvent, Severity};
use crate::policy::FailurePolicy;

/// Cadence of the repeating fleet-status poll.
pub const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(18);

#[derive(Debug, Default)]
struct FeedInner {
    snapshot: FleetSnapshot,
    is_connected: bool,
    last_error: Option<String>,
    events: EventLog,
}

/// Repeating poller for the fleet-status endpoint.
///
/// Each feed is an explicitly constructed, independently lifecycled object:
/// multiple screens can hold their own instances and teardown is
/// deterministic (dropping the feed stops its background task).
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use frostwatch_client::ApiClient;
/// use frostwatch_poll::StatusFeed;
///
/// #[tokio::main]
/// async fn main() {
///     let client = Arc::new(ApiClient::builder().base_url("http://fleet.local:8080").build());
///     let mut feed = StatusFeed::new(client);
///     feed.start();
///
///     // ... later ...
///     let snapshot = feed.snapshot();
///     println!("all running: {}", snapshot.all_running);
/// }
/// ```
pub struct StatusFeed {
    backend: Arc<dyn Backend>,
    interval: Duration,
    on_failure: FailurePolicy,
    inner: Arc<RwLock<FeedInner>>,
    stop_tx: Option<watch::Sender<bool>>,
}

impl StatusFeed {
    /// Create a feed with the default 18s cadence and stale-on-error policy.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            interval: STATUS_POLL_INTERVAL,
            on_failure: FailurePolicy::KeepLast,
            inner: Arc::new(RwLock::new(FeedInner::default())),
            stop_tx: None,
        }
    }

    /// Override the poll cadence. Takes effect on the next `start()`.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Override what happens to the snapshot on a failed poll.
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.on_failure = policy;
        self
    }

    /// Begin the repeating poll.
    ///
    /// Idempotent: calling while already running clears the prior timer
    /// first, so exactly one timer ever drives this feed's state. The first
    /// fetch happens immediately.
    pub fn start(&mut self) {
        if let Some(stop) = self.stop_tx.take() {
            let _ = stop.send(true);
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        self.stop_tx = Some(stop_tx);

        let backend = self.backend.clone();
        let inner = self.inner.clone();
        let on_failure = self.on_failure;
        let interval = self.interval;

        self.inner
            .write()
            .events
            .push(Severity::Info, "status polling started");

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        poll_once(&backend, &inner, on_failure).await;
                    }
                    changed = stop_rx.changed() => {
                        // A dropped sender also ends the task.
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });
    }

    /// Cancel the repeating poll and mark the feed disconnected.
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop_tx.take() {
            let _ = stop.send(true);
        }
        let mut inner = self.inner.write();
        inner.is_connected = false;
        inner.events.push(Severity::Info, "status polling stopped");
    }

    /// Perform one immediate fetch outside the timer cadence.
    ///
    /// Does not reset the repeating timer.
    pub async fn refresh(&self) {
        poll_once(&self.backend, &self.inner, self.on_failure).await;
    }

    /// The most recently committed snapshot.
    pub fn snapshot(&self) -> FleetSnapshot {
        self.inner.read().snapshot.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.read().is_connected
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.read().last_error.clone()
    }

    /// The last few feed events, oldest first.
    pub fn recent_events(&self) -> Vec<FeedEvent> {
        self.inner.read().events.recent()
    }

    /// A cheap read-only handle for consumers that gate on the snapshot.
    pub fn handle(&self) -> StatusHandle {
        StatusHandle {
            inner: self.inner.clone(),
        }
    }
}

impl std::fmt::Debug for StatusFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusFeed")
            .field("interval", &self.interval)
            .field("running", &self.stop_tx.is_some())
            .finish()
    }
}

/// Read-only view of a [`StatusFeed`]'s published state.
///
/// Readers may observe a snapshot up to one feed tick stale relative to the
/// backend; consumers must not assume tick-for-tick consistency.
#[derive(Clone)]
pub struct StatusHandle {
    inner: Arc<RwLock<FeedInner>>,
}

impl StatusHandle {
    pub fn snapshot(&self) -> FleetSnapshot {
        self.inner.read().snapshot.clone()
    }

    /// Whether the named device is reported running in the latest snapshot.
    ///
    /// Devices absent from the snapshot are not running.
    pub fn is_running(&self, device_name: &str) -> bool {
        self.inner.read().snapshot.is_running(device_name)
    }

    pub fn is_connected(&self) -> bool {
        self.inner.read().is_connected
    }
}

impl std::fmt::Debug for StatusHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusHandle").finish()
    }
}

async fn poll_once(
    backend: &Arc<dyn Backend>,
    inner: &Arc<RwLock<FeedInner>>,
    on_failure: FailurePolicy,
) {
    match backend.fleet_status().await {
        Ok(records) => {
            let snapshot = FleetSnapshot::from_raw(records);
            let count = snapshot.len();
            debug!(devices = count, "fleet status updated");

            let mut guard = inner.write();
            guard.snapshot = snapshot;
            guard.is_connected = true;
            guard.last_error = None;
            guard
                .events
                .push(Severity::Info, format!("status updated ({count} devices)"));
        }
        Err(e) => {
            let message = format!("fleet status fetch failed: {e}");
            warn!("{message}");

            let mut guard = inner.write();
            guard.is_connected = false;
            guard.last_error = Some(message.clone());
            if on_failure == FailurePolicy::Clear {
                guard.snapshot = FleetSnapshot::default();
            }
            guard.events.push(Severity::Error, message);
        }
    }
}
