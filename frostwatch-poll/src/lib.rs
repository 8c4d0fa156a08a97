//! Background polling for the fleet monitoring dashboard.
//!
//! Three pollers cover the dashboard's data needs:
//!
//! - [`StatusFeed`] keeps a fleet-wide status snapshot fresh on a fixed
//!   cadence and feeds the aggregate health indicators.
//! - [`DeviceTelemetryPoller`] polls one device's register snapshot, gated
//!   on the fleet feed reporting that device as running.
//! - [`FaultLogPaginator`] reconciles a stable virtual page of fault-log
//!   records against the upstream API's own pagination.
//!
//! All three talk to the backend through the [`Backend`] trait, publish
//! state through cheap cloneable snapshots, and stop deterministically.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use frostwatch_client::ApiClient;
//! use frostwatch_poll::{DeviceTelemetryPoller, StatusFeed};
//! use frostwatch_types::DeviceRegistry;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = Arc::new(ApiClient::builder().base_url("http://fleet.local:8080").build());
//!     let registry = Arc::new(DeviceRegistry::default());
//!
//!     let mut feed = StatusFeed::new(client.clone());
//!     feed.start();
//!
//!     let mut poller = DeviceTelemetryPoller::new(client, registry, feed.handle(), "IDM-01");
//!     poller.start();
//! }
//! ```

mod backend;
mod debounce;
mod events;
mod faults;
mod policy;
mod status_feed;
mod telemetry;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::Backend;
pub use debounce::{Debouncer, SEARCH_DEBOUNCE};
pub use events::{EventLog, FeedEvent, Severity, EVENT_LOG_CAPACITY};
pub use faults::{
    FaultLogPaginator, FaultPageView, FaultQuery, FAULT_REFRESH_INTERVAL, PAGE_SIZE,
};
pub use policy::FailurePolicy;
pub use status_feed::{StatusFeed, StatusHandle, STATUS_POLL_INTERVAL};
pub use telemetry::{DeviceTelemetryPoller, TELEMETRY_POLL_INTERVAL};
