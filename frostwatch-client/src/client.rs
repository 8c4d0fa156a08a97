//! HTTP access to the three backend endpoints.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use frostwatch_types::{RawDeviceRecord, TelemetryReading};

use crate::shape::parse_fleet_body;
use crate::ApiError;

/// Parameters for one upstream fault-log page fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaultPageRequest {
    /// Device identifier as the backend knows it.
    pub machine_name: String,
    /// 1-based upstream page number.
    pub page: u64,
    /// Requested rows per page. The backend may clamp this to its own
    /// granularity; never assume it was honored.
    pub limit: usize,
    /// Optional search term applied server-side to raw rows.
    pub search: Option<String>,
    /// Legacy table-name override for the one device that needs it.
    pub table_name: Option<String>,
}

/// One upstream fault-log page as the backend reports it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FaultPageBody {
    #[serde(default)]
    pub data: Vec<Value>,
    /// Total record count for the current filter, across all upstream pages.
    #[serde(default)]
    pub total: u64,
    /// Upstream page count for the current filter.
    #[serde(default, rename = "totalPages")]
    pub total_pages: u64,
}

/// Client for the fleet monitoring backend.
///
/// # Example
///
/// ```rust,no_run
/// use frostwatch_client::ApiClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = ApiClient::builder()
///         .base_url("http://fleet.local:8080")
///         .build();
///
///     let records = client.fleet_status().await?;
///     println!("{} devices reporting", records.len());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Fetch the fleet-status endpoint and parse whichever of the accepted
    /// body shapes the backend used.
    pub async fn fleet_status(&self) -> Result<Vec<RawDeviceRecord>, ApiError> {
        let url = format!("{}/api/machine-status", self.base_url);
        let body: Value = self.get_json(&url, &[]).await?;
        parse_fleet_body(body)
    }

    /// Fetch one device's current register snapshot from its backend table.
    ///
    /// A well-formed response carries a `data` object; anything else is an
    /// unrecognized shape.
    pub async fn device_table(&self, table: &str) -> Result<TelemetryReading, ApiError> {
        let url = format!("{}/api/machine-data", self.base_url);
        let body: Value = self.get_json(&url, &[("table", table)]).await?;
        match body {
            Value::Object(mut map) => match map.remove("data") {
                Some(Value::Object(fields)) => Ok(fields),
                _ => Err(ApiError::Shape(
                    "device table response without a 'data' object".to_string(),
                )),
            },
            _ => Err(ApiError::Shape(
                "device table response is not an object".to_string(),
            )),
        }
    }

    /// Fetch one upstream fault-log page.
    pub async fn fault_page(&self, req: &FaultPageRequest) -> Result<FaultPageBody, ApiError> {
        let url = format!("{}/api/fault-log", self.base_url);
        let page = req.page.to_string();
        let limit = req.limit.to_string();
        let mut query: Vec<(&str, &str)> = vec![
            ("machineName", req.machine_name.as_str()),
            ("page", page.as_str()),
            ("limit", limit.as_str()),
        ];
        if let Some(search) = req.search.as_deref() {
            query.push(("search", search));
        }
        if let Some(table) = req.table_name.as_deref() {
            query.push(("tableName", table));
        }

        let body: Value = self.get_json(&url, &query).await?;
        serde_json::from_value(body).map_err(|e| ApiError::Parse(format!("fault page: {e}")))
    }

    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, ApiError> {
        let response = self.client.get(url).query(query).send().await?;

        if !response.status().is_success() {
            return Err(ApiError::Http(format!(
                "API returned status {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }
}

/// Builder for [`ApiClient`].
#[derive(Debug, Default)]
pub struct ApiClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl ApiClientBuilder {
    /// Set the backend base URL (e.g. "http://fleet.local:8080").
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the client.
    pub fn build(self) -> ApiClient {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(10));

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        let base_url = self
            .base_url
            .unwrap_or_else(|| "http://localhost:8080".to_string());

        ApiClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_defaults() {
        let client = ApiClient::builder().build();
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn builder_strips_trailing_slash() {
        let client = ApiClient::builder()
            .base_url("http://fleet.local:9000/")
            .build();
        assert_eq!(client.base_url, "http://fleet.local:9000");
    }

    #[test]
    fn fault_page_body_tolerates_missing_counters() {
        let body: FaultPageBody = serde_json::from_value(json!({ "data": [] })).unwrap();
        assert_eq!(body.total, 0);
        assert_eq!(body.total_pages, 0);
    }

    #[test]
    fn fault_page_body_reads_camel_case_total_pages() {
        let body: FaultPageBody =
            serde_json::from_value(json!({ "data": [], "total": 450, "totalPages": 3 })).unwrap();
        assert_eq!(body.total, 450);
        assert_eq!(body.total_pages, 3);
    }
}
