//! Failure policy for published poller state.

/// What a poller does with its published state when a fetch fails.
///
/// A stale fleet snapshot is still mostly true, so the status feed keeps its
/// last snapshot visible. A partial fault-log accumulation would be actively
/// misleading, so the paginator clears to an empty single-page view. The
/// distinction is a meaningful design choice, so it is carried as a parameter
/// rather than hardcoded in either poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Keep the last successfully committed state visible alongside the
    /// error (stale-but-available).
    KeepLast,
    /// Replace the published state with an empty one (empty-but-visible).
    Clear,
}
