//! Canned [`Backend`] implementation for poller tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use frostwatch_client::{ApiError, FaultPageBody, FaultPageRequest};
use frostwatch_types::{RawDeviceRecord, TelemetryReading};

use crate::backend::Backend;

/// Scriptable backend: canned responses, injectable failures, call counters,
/// and an optional artificial latency for exercising in-flight races.
pub(crate) struct MockBackend {
    fleet: Mutex<Result<Vec<Value>, String>>,
    fleet_calls: AtomicUsize,
    table_default: Mutex<Option<Value>>,
    tables: Mutex<HashMap<String, Value>>,
    table_error: Mutex<Option<String>>,
    table_delay: Mutex<Option<Duration>>,
    table_calls: AtomicUsize,
    fault_pages: Mutex<Vec<FaultPageBody>>,
    fault_error_at: Mutex<Option<(u64, String)>>,
    fault_requests: Mutex<Vec<FaultPageRequest>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            fleet: Mutex::new(Ok(Vec::new())),
            fleet_calls: AtomicUsize::new(0),
            table_default: Mutex::new(None),
            tables: Mutex::new(HashMap::new()),
            table_error: Mutex::new(None),
            table_delay: Mutex::new(None),
            table_calls: AtomicUsize::new(0),
            fault_pages: Mutex::new(Vec::new()),
            fault_error_at: Mutex::new(None),
            fault_requests: Mutex::new(Vec::new()),
        }
    }
}

impl MockBackend {
    /// Serve these raw rows from the fleet-status endpoint.
    pub fn set_fleet(&self, rows: Vec<Value>) {
        *self.fleet.lock() = Ok(rows);
    }

    /// Fail every fleet-status fetch with this message.
    pub fn fail_fleet(&self, message: &str) {
        *self.fleet.lock() = Err(message.to_string());
    }

    pub fn fleet_calls(&self) -> usize {
        self.fleet_calls.load(Ordering::SeqCst)
    }

    /// Serve this object for any table; clears an injected table failure.
    pub fn set_table(&self, body: Value) {
        *self.table_default.lock() = Some(body);
        *self.table_error.lock() = None;
    }

    /// Serve this object for one specific table.
    pub fn set_table_for(&self, table: &str, body: Value) {
        self.tables.lock().insert(table.to_string(), body);
    }

    /// Fail every device-table fetch with this message.
    pub fn fail_table(&self, message: &str) {
        *self.table_error.lock() = Some(message.to_string());
    }

    /// Delay every device-table response by this much (tokio virtual time).
    pub fn delay_table(&self, delay: Duration) {
        *self.table_delay.lock() = Some(delay);
    }

    pub fn table_calls(&self) -> usize {
        self.table_calls.load(Ordering::SeqCst)
    }

    /// Serve these bodies as upstream fault-log pages 1..=n.
    pub fn set_fault_pages(&self, pages: Vec<FaultPageBody>) {
        *self.fault_pages.lock() = pages;
    }

    /// Fail the fetch of one specific upstream page.
    pub fn fail_fault_at(&self, page: u64, message: &str) {
        *self.fault_error_at.lock() = Some((page, message.to_string()));
    }

    /// Every fault-log request received, in order.
    pub fn fault_requests(&self) -> Vec<FaultPageRequest> {
        self.fault_requests.lock().clone()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn fleet_status(&self) -> Result<Vec<RawDeviceRecord>, ApiError> {
        self.fleet_calls.fetch_add(1, Ordering::SeqCst);
        let rows = match &*self.fleet.lock() {
            Ok(rows) => rows.clone(),
            Err(message) => return Err(ApiError::Http(message.clone())),
        };
        rows.into_iter()
            .map(|row| {
                serde_json::from_value(row).map_err(|e| ApiError::Parse(e.to_string()))
            })
            .collect()
    }

    async fn device_table(&self, table: &str) -> Result<TelemetryReading, ApiError> {
        // Count before the delay so tests can observe an in-flight fetch.
        self.table_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.table_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = self.table_error.lock().clone() {
            return Err(ApiError::Http(message));
        }

        let body = self
            .tables
            .lock()
            .get(table)
            .cloned()
            .or_else(|| self.table_default.lock().clone());
        match body {
            Some(Value::Object(fields)) => Ok(fields),
            Some(_) => Err(ApiError::Shape("canned table body is not an object".to_string())),
            None => Err(ApiError::Shape(format!("no canned body for table '{table}'"))),
        }
    }

    async fn fault_page(&self, req: &FaultPageRequest) -> Result<FaultPageBody, ApiError> {
        self.fault_requests.lock().push(req.clone());

        if let Some((page, message)) = self.fault_error_at.lock().clone() {
            if page == req.page {
                return Err(ApiError::Backend(message));
            }
        }

        self.fault_pages
            .lock()
            .get((req.page.max(1) - 1) as usize)
            .cloned()
            .ok_or_else(|| ApiError::Shape(format!("no canned fault page {}", req.page)))
    }
}
