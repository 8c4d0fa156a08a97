//! Bounded event log for the status feed.

use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

/// How many recent events the feed retains.
pub const EVENT_LOG_CAPACITY: usize = 10;

/// Severity of a feed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// One entry in the feed's recent-events log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEvent {
    pub message: String,
    pub severity: Severity,
    /// Unix timestamp in milliseconds.
    pub timestamp_ms: u64,
}

/// Ring buffer of the last [`EVENT_LOG_CAPACITY`] events, oldest first.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: VecDeque<FeedEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event, evicting the oldest once the capacity is reached.
    pub fn push(&mut self, severity: Severity, message: impl Into<String>) {
        if self.entries.len() == EVENT_LOG_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(FeedEvent {
            message: message.into(),
            severity,
            timestamp_ms: now_ms(),
        });
    }

    /// The retained events, oldest first.
    pub fn recent(&self) -> Vec<FeedEvent> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Current timestamp in milliseconds since the Unix epoch.
pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_recent_preserve_order() {
        let mut log = EventLog::new();
        log.push(Severity::Info, "first");
        log.push(Severity::Error, "second");

        let events = log.recent();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].message, "first");
        assert_eq!(events[1].message, "second");
        assert_eq!(events[1].severity, Severity::Error);
    }

    #[test]
    fn capacity_evicts_oldest() {
        let mut log = EventLog::new();
        for i in 0..EVENT_LOG_CAPACITY + 3 {
            log.push(Severity::Info, format!("event {i}"));
        }

        let events = log.recent();
        assert_eq!(events.len(), EVENT_LOG_CAPACITY);
        assert_eq!(events[0].message, "event 3");
        assert_eq!(events.last().unwrap().message, "event 12");
    }
}
