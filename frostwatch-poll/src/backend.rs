//! Backend abstraction for the pollers.
//!
//! The pollers talk to the fleet backend through this trait rather than a
//! concrete HTTP client, so tests can drive them with canned responses and
//! alternative transports can be plugged in without touching poller logic.

use async_trait::async_trait;

use frostwatch_client::{ApiClient, ApiError, FaultPageBody, FaultPageRequest};
use frostwatch_types::{RawDeviceRecord, TelemetryReading};

/// The three read-only backend operations the pollers need.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Fetch the fleet-status endpoint.
    async fn fleet_status(&self) -> Result<Vec<RawDeviceRecord>, ApiError>;

    /// Fetch one device's register snapshot by backend table name.
    async fn device_table(&self, table: &str) -> Result<TelemetryReading, ApiError>;

    /// Fetch one upstream fault-log page.
    async fn fault_page(&self, req: &FaultPageRequest) -> Result<FaultPageBody, ApiError>;
}

#[async_trait]
impl Backend for ApiClient {
    async fn fleet_status(&self) -> Result<Vec<RawDeviceRecord>, ApiError> {
        ApiClient::fleet_status(self).await
    }

    async fn device_table(&self, table: &str) -> Result<TelemetryReading, ApiError> {
        ApiClient::device_table(self, table).await
    }

    async fn fault_page(&self, req: &FaultPageRequest) -> Result<FaultPageBody, ApiError> {
        ApiClient::fault_page(self, req).await
    }
}
