//! Virtual-page reconciliation over the fault-log endpoint.
//!
//! The UI wants a stable page of [`PAGE_SIZE`] tag-level fault records, but
//! the upstream API paginates raw rows in its own, independent granularity.
//! Reconciliation therefore fetches upstream pages sequentially - each fetch
//! decides whether the next one is still needed - accumulating extracted
//! tags until the requested virtual page can be sliced out.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};

use frostwatch_client::{ApiError, FaultPageRequest};
use frostwatch_types::{extract_tag_data, DeviceRegistry, FaultStats, PaginationInfo, TagData};

use crate::backend::Backend;
use crate::policy::FailurePolicy;

/// Size of the virtual page the UI requests. Part of the UI contract, so a
/// constant rather than a setting.
pub const PAGE_SIZE: usize = 200;

/// Cadence of the background fault-log refresh.
pub const FAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// The `(device, page, search)` triple one reconciliation pass answers for.
///
/// The search term must already be debounced by the caller (see
/// [`crate::Debouncer`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultQuery {
    pub device: String,
    /// 1-based virtual page.
    pub page: u64,
    pub search: Option<String>,
}

impl FaultQuery {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            page: 1,
            search: None,
        }
    }
}

/// One committed reconciliation result.
///
/// `records`, `stats` and `pagination` are always computed from the same
/// pass, so they never disagree with each other mid-render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaultPageView {
    /// Exactly the slice for the (clamped) requested page.
    pub records: Vec<TagData>,
    pub stats: FaultStats,
    pub pagination: PaginationInfo,
    /// Raw rows of upstream page 1, kept for the debugging display.
    pub raw_first_page: Vec<Value>,
}

impl FaultPageView {
    /// The empty single-page state published after a failed pass.
    fn degenerate() -> Self {
        Self {
            records: Vec::new(),
            stats: FaultStats {
                total: 0,
                active_tags: 0,
                fault_tags: 0,
                current_page: 1,
                total_pages: 1,
            },
            pagination: PaginationInfo {
                total: 0,
                total_pages: 1,
                limit: PAGE_SIZE,
                page: 1,
            },
            raw_first_page: Vec::new(),
        }
    }
}

/// Accumulates extracted tags across upstream pages and answers "do we have
/// enough for the requested virtual page yet?" after each fetch.
#[derive(Debug)]
struct PageAccumulator {
    end_index_needed: usize,
    tags: Vec<TagData>,
    first_page_raw: Option<Vec<Value>>,
}

impl PageAccumulator {
    fn new(requested_page: u64) -> Self {
        Self {
            end_index_needed: requested_page as usize * PAGE_SIZE,
            tags: Vec::new(),
            first_page_raw: None,
        }
    }

    /// Absorb one upstream page's raw rows.
    ///
    /// The client-side search filter applies to the extracted tag name; the
    /// upstream filter already ran against raw rows. Both are intentional.
    fn absorb(&mut self, rows: Vec<Value>, search: Option<&str>) {
        let mut tags = extract_tag_data(&rows);
        if let Some(term) = search {
            let needle = term.to_lowercase();
            tags.retain(|t| t.tag.to_lowercase().contains(&needle));
        }
        self.tags.extend(tags);
        if self.first_page_raw.is_none() {
            self.first_page_raw = Some(rows);
        }
    }

    /// Whether the accumulation already covers the requested virtual page.
    fn has_enough(&self) -> bool {
        self.tags.len() >= self.end_index_needed
    }

    /// Slice out the virtual page and derive stats and pagination from the
    /// same `(total, total_pages, safe_page)` triple.
    fn into_view(self, total: u64, requested_page: u64) -> FaultPageView {
        let total_pages = (total.div_ceil(PAGE_SIZE as u64)).max(1);
        let safe_page = requested_page.clamp(1, total_pages);

        let start = (safe_page - 1) as usize * PAGE_SIZE;
        let end = (start + PAGE_SIZE).min(self.tags.len());
        let records = if start < self.tags.len() {
            self.tags[start..end].to_vec()
        } else {
            Vec::new()
        };

        let active_tags = self.tags.iter().filter(|t| t.is_active).count();

        FaultPageView {
            records,
            stats: FaultStats {
                total,
                active_tags,
                fault_tags: self.tags.len(),
                current_page: safe_page,
                total_pages,
            },
            pagination: PaginationInfo {
                total,
                total_pages,
                limit: PAGE_SIZE,
                page: safe_page,
            },
            raw_first_page: self.first_page_raw.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Default)]
struct PaginatorInner {
    view: FaultPageView,
    loading: bool,
    error: Option<String>,
    generation: u64,
}

/// Reconciles a stable virtual page of fault tags against the upstream API.
///
/// Reconciliation runs on a fixed background interval and immediately
/// whenever the device, page, or (debounced) search term changes.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use frostwatch_client::ApiClient;
/// use frostwatch_poll::{FaultLogPaginator, FaultQuery};
/// use frostwatch_types::DeviceRegistry;
///
/// #[tokio::main]
/// async fn main() {
///     let client = Arc::new(ApiClient::builder().build());
///     let registry = Arc::new(DeviceRegistry::default());
///
///     let paginator = FaultLogPaginator::new(client, registry, FaultQuery::new("IDM-01"));
///     paginator.refresh().await;
///     println!("{} records on page", paginator.view().records.len());
/// }
/// ```
pub struct FaultLogPaginator {
    backend: Arc<dyn Backend>,
    registry: Arc<DeviceRegistry>,
    query: FaultQuery,
    interval: Duration,
    on_failure: FailurePolicy,
    inner: Arc<RwLock<PaginatorInner>>,
    stop_tx: Option<watch::Sender<bool>>,
}

impl FaultLogPaginator {
    pub fn new(backend: Arc<dyn Backend>, registry: Arc<DeviceRegistry>, query: FaultQuery) -> Self {
        Self {
            backend,
            registry,
            query,
            interval: FAULT_REFRESH_INTERVAL,
            on_failure: FailurePolicy::Clear,
            inner: Arc::new(RwLock::new(PaginatorInner::default())),
            stop_tx: None,
        }
    }

    /// Override the background refresh cadence. Takes effect on `start()`.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Override what happens to the published view on a failed pass.
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.on_failure = policy;
        self
    }

    pub fn query(&self) -> &FaultQuery {
        &self.query
    }

    /// Switch to another device; resets to page 1 and invalidates any pass
    /// still in flight.
    pub fn set_device(&mut self, device: impl Into<String>) {
        self.query.device = device.into();
        self.query.page = 1;
        self.invalidate_and_restart();
    }

    /// Request another virtual page.
    pub fn set_page(&mut self, page: u64) {
        self.query.page = page.max(1);
        self.invalidate_and_restart();
    }

    /// Apply a new (already debounced) search term; resets to page 1.
    pub fn set_search(&mut self, search: Option<String>) {
        self.query.search = search.filter(|s| !s.is_empty());
        self.query.page = 1;
        self.invalidate_and_restart();
    }

    fn invalidate_and_restart(&mut self) {
        self.inner.write().generation += 1;
        // Restarting the interval also triggers an immediate pass for the
        // new query.
        if self.stop_tx.is_some() {
            self.start();
        }
    }

    /// Begin the background refresh. Idempotent; the first pass runs
    /// immediately.
    pub fn start(&mut self) {
        if let Some(stop) = self.stop_tx.take() {
            let _ = stop.send(true);
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        self.stop_tx = Some(stop_tx);

        let backend = self.backend.clone();
        let registry = self.registry.clone();
        let query = self.query.clone();
        let inner = self.inner.clone();
        let on_failure = self.on_failure;
        let interval = self.interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        reconcile(&backend, &registry, &query, &inner, on_failure).await;
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

    /// Cancel the background refresh.
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop_tx.take() {
            let _ = stop.send(true);
        }
    }

    /// Run one reconciliation pass for the current query immediately.
    pub async fn refresh(&self) {
        reconcile(
            &self.backend,
            &self.registry,
            &self.query,
            &self.inner,
            self.on_failure,
        )
        .await;
    }

    /// The last committed view.
    pub fn view(&self) -> FaultPageView {
        self.inner.read().view.clone()
    }

    pub fn loading(&self) -> bool {
        self.inner.read().loading
    }

    pub fn error(&self) -> Option<String> {
        self.inner.read().error.clone()
    }
}

impl std::fmt::Debug for FaultLogPaginator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaultLogPaginator")
            .field("query", &self.query)
            .field("interval", &self.interval)
            .field("running", &self.stop_tx.is_some())
            .finish()
    }
}

async fn reconcile(
    backend: &Arc<dyn Backend>,
    registry: &DeviceRegistry,
    query: &FaultQuery,
    inner: &Arc<RwLock<PaginatorInner>>,
    on_failure: FailurePolicy,
) {
    let generation = {
        let mut guard = inner.write();
        guard.loading = true;
        guard.generation
    };

    let result = run_pass(backend, registry, query).await;

    let mut guard = inner.write();
    if guard.generation != generation {
        debug!(device = %query.device, "discarding stale fault-log pass");
        return;
    }
    guard.loading = false;
    match result {
        Ok(view) => {
            debug!(
                device = %query.device,
                page = view.stats.current_page,
                records = view.records.len(),
                "fault log reconciled"
            );
            guard.view = view;
            guard.error = None;
        }
        Err(e) => {
            warn!(device = %query.device, error = %e, "fault log pass failed");
            guard.error = Some(format!("fault log fetch failed: {e}"));
            // A partial accumulation would be actively misleading.
            if on_failure == FailurePolicy::Clear {
                guard.view = FaultPageView::degenerate();
            }
        }
    }
}

async fn run_pass(
    backend: &Arc<dyn Backend>,
    registry: &DeviceRegistry,
    query: &FaultQuery,
) -> Result<FaultPageView, ApiError> {
    let requested_page = query.page.max(1);
    let base = FaultPageRequest {
        machine_name: query.device.clone(),
        page: 1,
        limit: PAGE_SIZE,
        search: query.search.clone(),
        table_name: registry
            .fault_table_override(&query.device)
            .map(String::from),
    };

    // Page 1 teaches us the upstream's own page count for the current filter.
    let first = backend.fault_page(&base).await?;
    let total = first.total;
    let upstream_pages = first.total_pages.max(1);

    let mut acc = PageAccumulator::new(requested_page);
    acc.absorb(first.data, query.search.as_deref());

    let mut upstream_page = 2;
    while upstream_page <= upstream_pages && !acc.has_enough() {
        let body = backend
            .fault_page(&FaultPageRequest {
                page: upstream_page,
                ..base.clone()
            })
            .await?;
        acc.absorb(body.data, query.search.as_deref());
        upstream_page += 1;
    }

    Ok(acc.into_view(total, requested_page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBackend;
    use frostwatch_client::FaultPageBody;
    use frostwatch_types::DeviceMapping;
    use serde_json::json;

    fn registry() -> Arc<DeviceRegistry> {
        Arc::new(DeviceRegistry::new(vec![
            DeviceMapping {
                name: "IDM-01".to_string(),
                table: "idm01_data".to_string(),
                status_key: "IDM-01".to_string(),
                fault_table: None,
            },
            DeviceMapping {
                name: "IDM-03".to_string(),
                table: "idm03_data".to_string(),
                status_key: "IDM-03".to_string(),
                fault_table: Some("dryer_legacy_faults".to_string()),
            },
        ]))
    }

    /// `count` raw rows, each contributing exactly one tag.
    fn rows(offset: usize, count: usize, active: bool) -> Vec<Value> {
        (0..count)
            .map(|i| {
                json!({
                    "id": offset + i,
                    "createdAt": "2026-08-01T00:00:00Z",
                    (format!("tag{:04}", offset + i)): if active { json!("tr") } else { json!(0) },
                })
            })
            .collect()
    }

    /// Upstream dataset of 450 rows served 150 per page across 3 pages.
    fn three_page_backend() -> Arc<MockBackend> {
        let backend = Arc::new(MockBackend::default());
        backend.set_fault_pages(vec![
            FaultPageBody {
                data: rows(0, 150, true),
                total: 450,
                total_pages: 3,
            },
            FaultPageBody {
                data: rows(150, 150, false),
                total: 450,
                total_pages: 3,
            },
            FaultPageBody {
                data: rows(300, 150, false),
                total: 450,
                total_pages: 3,
            },
        ]);
        backend
    }

    fn paginator(backend: Arc<MockBackend>, query: FaultQuery) -> FaultLogPaginator {
        FaultLogPaginator::new(backend, registry(), query)
    }

    #[tokio::test]
    async fn virtual_page_two_accumulates_three_upstream_pages() {
        let backend = three_page_backend();
        let mut query = FaultQuery::new("IDM-01");
        query.page = 2;

        let pager = paginator(backend.clone(), query);
        pager.refresh().await;

        // endIndexNeeded = 400; 150+150+150 = 450 >= 400 after page 3.
        assert_eq!(backend.fault_requests().len(), 3);

        let view = pager.view();
        assert_eq!(view.records.len(), 200);
        assert_eq!(view.records[0].tag, "tag0200");
        assert_eq!(view.records[199].tag, "tag0399");
        assert_eq!(view.stats.total, 450);
        assert_eq!(view.stats.total_pages, 3);
        assert_eq!(view.stats.current_page, 2);
        assert_eq!(view.pagination.page, 2);
        assert_eq!(view.pagination.limit, PAGE_SIZE);
    }

    #[tokio::test]
    async fn virtual_page_one_stops_after_enough_upstream_pages() {
        let backend = three_page_backend();
        let pager = paginator(backend.clone(), FaultQuery::new("IDM-01"));
        pager.refresh().await;

        // endIndexNeeded = 200; 150+150 = 300 >= 200, page 3 never fetched.
        assert_eq!(backend.fault_requests().len(), 2);
        assert_eq!(pager.view().records.len(), 200);
    }

    #[tokio::test]
    async fn last_partial_page_is_capped_to_whats_available() {
        let backend = three_page_backend();
        let mut query = FaultQuery::new("IDM-01");
        query.page = 3;

        let pager = paginator(backend.clone(), query);
        pager.refresh().await;

        // 450 total, page 3 holds records 400..450.
        let view = pager.view();
        assert_eq!(view.records.len(), 50);
        assert_eq!(view.records[0].tag, "tag0400");
    }

    #[tokio::test]
    async fn page_beyond_total_clamps_to_last_page() {
        let backend = three_page_backend();
        let mut query = FaultQuery::new("IDM-01");
        query.page = 99;

        let pager = paginator(backend, query);
        pager.refresh().await;

        let view = pager.view();
        assert_eq!(view.stats.current_page, 3);
        assert_eq!(view.pagination.page, 3);
        assert_eq!(view.records.len(), 50);
        assert_eq!(pager.error(), None);
    }

    #[tokio::test]
    async fn refresh_is_idempotent_for_unchanged_inputs() {
        let backend = three_page_backend();
        let mut query = FaultQuery::new("IDM-01");
        query.page = 2;

        let pager = paginator(backend, query);
        pager.refresh().await;
        let first = pager.view();
        pager.refresh().await;
        let second = pager.view();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn stats_and_pagination_derive_from_the_same_pass() {
        let backend = three_page_backend();
        let pager = paginator(backend, FaultQuery::new("IDM-01"));
        pager.refresh().await;

        let view = pager.view();
        assert_eq!(view.stats.total, view.pagination.total);
        assert_eq!(view.stats.total_pages, view.pagination.total_pages);
        assert_eq!(view.stats.current_page, view.pagination.page);
        // Page 1 of the three-page dataset: two upstream pages absorbed,
        // 150 active from page one, 150 inactive from page two.
        assert_eq!(view.stats.fault_tags, 300);
        assert_eq!(view.stats.active_tags, 150);
    }

    #[tokio::test]
    async fn search_filters_client_side_and_is_forwarded_upstream() {
        let backend = three_page_backend();
        let mut query = FaultQuery::new("IDM-01");
        query.search = Some("tag000".to_string());

        let pager = paginator(backend.clone(), query);
        pager.refresh().await;

        let requests = backend.fault_requests();
        assert!(requests
            .iter()
            .all(|r| r.search.as_deref() == Some("tag000")));

        // Client-side filter keeps only tag0000..tag0009; the filter never
        // reaches endIndexNeeded, so all upstream pages are exhausted.
        assert_eq!(requests.len(), 3);
        let view = pager.view();
        assert_eq!(view.records.len(), 10);
        assert!(view.records.iter().all(|t| t.tag.starts_with("tag000")));
    }

    #[tokio::test]
    async fn search_is_case_insensitive_on_tag_names() {
        let backend = Arc::new(MockBackend::default());
        backend.set_fault_pages(vec![FaultPageBody {
            data: vec![json!({"createdAt": "t", "HighPressureAlarm": "tr", "doorOpen": 0})],
            total: 1,
            total_pages: 1,
        }]);

        let mut query = FaultQuery::new("IDM-01");
        query.search = Some("PRESSURE".to_string());

        let pager = paginator(backend, query);
        pager.refresh().await;

        let view = pager.view();
        assert_eq!(view.records.len(), 1);
        assert_eq!(view.records[0].tag, "HighPressureAlarm");
    }

    #[tokio::test]
    async fn failure_clears_to_degenerate_state() {
        let backend = three_page_backend();
        let mut query = FaultQuery::new("IDM-01");
        query.page = 2;

        let pager = paginator(backend.clone(), query);
        pager.refresh().await;
        assert_eq!(pager.view().records.len(), 200);

        // Failing mid-accumulation must not leave a partial page visible.
        backend.fail_fault_at(2, "upstream gone");
        pager.refresh().await;

        let view = pager.view();
        assert!(view.records.is_empty());
        assert!(view.raw_first_page.is_empty());
        assert_eq!(view.stats.total, 0);
        assert_eq!(view.stats.total_pages, 1);
        assert_eq!(view.pagination.total_pages, 1);
        assert!(pager.error().unwrap().contains("upstream gone"));
    }

    #[tokio::test]
    async fn first_page_raw_rows_are_retained_for_debugging() {
        let backend = three_page_backend();
        let mut query = FaultQuery::new("IDM-01");
        query.page = 2;

        let pager = paginator(backend, query);
        pager.refresh().await;

        let view = pager.view();
        assert_eq!(view.raw_first_page.len(), 150);
        assert_eq!(view.raw_first_page[0]["id"], json!(0));
    }

    #[tokio::test]
    async fn legacy_device_sends_table_name_override() {
        let backend = three_page_backend();
        let pager = paginator(backend.clone(), FaultQuery::new("IDM-03"));
        pager.refresh().await;

        let requests = backend.fault_requests();
        assert!(!requests.is_empty());
        assert!(requests
            .iter()
            .all(|r| r.table_name.as_deref() == Some("dryer_legacy_faults")));
    }

    #[tokio::test]
    async fn non_legacy_device_sends_no_override() {
        let backend = three_page_backend();
        let pager = paginator(backend.clone(), FaultQuery::new("IDM-01"));
        pager.refresh().await;

        assert!(backend
            .fault_requests()
            .iter()
            .all(|r| r.table_name.is_none()));
    }

    #[tokio::test]
    async fn empty_upstream_yields_single_empty_page() {
        let backend = Arc::new(MockBackend::default());
        backend.set_fault_pages(vec![FaultPageBody {
            data: Vec::new(),
            total: 0,
            total_pages: 0,
        }]);

        let pager = paginator(backend, FaultQuery::new("IDM-01"));
        pager.refresh().await;

        let view = pager.view();
        assert!(view.records.is_empty());
        assert_eq!(view.stats.total_pages, 1);
        assert_eq!(view.pagination.page, 1);
        assert_eq!(pager.error(), None);
    }

    #[tokio::test]
    async fn set_page_and_set_search_reset_sensibly() {
        let backend = three_page_backend();
        let mut pager = paginator(backend, FaultQuery::new("IDM-01"));

        pager.set_page(0);
        assert_eq!(pager.query().page, 1);

        pager.set_page(2);
        pager.set_search(Some("door".to_string()));
        assert_eq!(pager.query().page, 1);
        assert_eq!(pager.query().search.as_deref(), Some("door"));

        pager.set_search(Some(String::new()));
        assert_eq!(pager.query().search, None);

        pager.set_page(5);
        pager.set_device("IDM-03");
        assert_eq!(pager.query().device, "IDM-03");
        assert_eq!(pager.query().page, 1);
    }
}
