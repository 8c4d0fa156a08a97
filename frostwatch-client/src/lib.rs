//! # frostwatch-client
//!
//! HTTP access to the fleet monitoring backend.
//!
//! The backend exposes three read-only endpoints with a fixed contract:
//!
//! - **Fleet status** - coarse per-device flags for the whole fleet, in one
//!   of three historical body shapes (bare array, `{data}`, or
//!   `{success, data}`), parsed defensively by [`parse_fleet_body`].
//! - **Device table** - one device's current register snapshot, addressed by
//!   backend table name.
//! - **Fault log** - paginated raw fault rows with an optional server-side
//!   search and a legacy table-name override.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use frostwatch_client::{ApiClient, FaultPageRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ApiClient::builder()
//!         .base_url("http://fleet.local:8080")
//!         .build();
//!
//!     let page = client
//!         .fault_page(&FaultPageRequest {
//!             machine_name: "IDM-01".to_string(),
//!             page: 1,
//!             limit: 200,
//!             ..Default::default()
//!         })
//!         .await?;
//!
//!     println!("{} of {} fault rows", page.data.len(), page.total);
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod shape;

pub use client::{ApiClient, ApiClientBuilder, FaultPageBody, FaultPageRequest};
pub use error::ApiError;
pub use shape::parse_fleet_body;

// Re-export the wire-adjacent types for convenience.
pub use frostwatch_types::{RawDeviceRecord, TelemetryReading};
