//! # frostwatch-types
//!
//! Core data model for the frostwatch fleet monitoring layer.
//!
//! This crate defines the types shared by the HTTP client and the pollers:
//! the fleet status snapshot, fault tag records, pagination view models, the
//! injectable device registry, and the display formatting rules for raw
//! register values.
//!
//! ## Design Goals
//!
//! - **Pure data and pure functions**: nothing here performs I/O or owns a
//!   timer; everything is directly unit-testable.
//! - **Replace, never mutate**: snapshots and readings are committed
//!   wholesale by the pollers, so these types are cheap to clone and carry no
//!   interior mutability.
//! - **Centralized coercion**: the many truthy encodings the backend emits
//!   (`true`, `"true"`, `"tr"`, `1`, `"1"`) are normalized in exactly one
//!   place.
//!
//! ## Example
//!
//! ```rust
//! use frostwatch_types::{FleetSnapshot, format_value};
//! use serde_json::json;
//!
//! let snapshot = FleetSnapshot::from_entries(Vec::new());
//! assert!(snapshot.all_running); // vacuously true for an empty fleet
//!
//! assert_eq!(format_value(&json!(23.456), "°C"), "23.5°C");
//! assert_eq!(format_value(&json!(null), "°C"), "--");
//! ```

mod fault;
mod format;
mod registry;
mod status;

pub use fault::*;
pub use format::*;
pub use registry::*;
pub use status::*;

/// A keyed bag of raw register values for one device at one instant.
///
/// There is no fixed schema; field names vary per device model and are owned
/// by the device registry's static tables. Readings are replaced wholesale on
/// every poll, never merged.
pub type TelemetryReading = serde_json::Map<String, serde_json::Value>;
