//! Debounce for user-driven search input.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How long search input must be quiet before a reconciliation fires.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);

/// Coalesces a burst of inputs into one winner.
///
/// Each keystroke calls [`settle`](Debouncer::settle); only the call not
/// superseded within the window reports `true`, and the caller then applies
/// the term (typically via [`crate::FaultLogPaginator::set_search`]).
///
/// Clones share the same window, so one `Debouncer` guards one input field.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    latest: Arc<AtomicU64>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::with_delay(SEARCH_DEBOUNCE)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Wait out the quiet window.
    ///
    /// Returns `true` if no newer call arrived while waiting, `false` if
    /// this input was superseded.
    pub async fn settle(&self) -> bool {
        let token = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;
        self.latest.load(Ordering::SeqCst) == token
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new()
    }
}
