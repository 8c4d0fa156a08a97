//! Fault tag records extracted from raw fault-log rows.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Row fields that are bookkeeping, not fault tags.
const META_FIELDS: &[&str] = &["id", "machineName", "createdAt", "created_at", "updatedAt"];

/// One fault tag's extracted state from a raw upstream record.
///
/// `is_active` is a pure function of `value`; construct through
/// [`TagData::from_raw`] so the two can never disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagData {
    /// Tag name, e.g. `"highPressureAlarm"`.
    pub tag: String,
    /// Raw value as the backend stored it: boolean, string, number, or null.
    pub value: Value,
    /// Timestamp of the row this tag was extracted from, as reported.
    pub created_at: String,
    /// Whether `value` normalizes to an active fault.
    pub is_active: bool,
}

impl TagData {
    /// Build a tag record, deriving `is_active` from the value.
    pub fn from_raw(tag: impl Into<String>, value: Value, created_at: impl Into<String>) -> Self {
        let is_active = tag_is_active(&value);
        Self {
            tag: tag.into(),
            value,
            created_at: created_at.into(),
            is_active,
        }
    }
}

/// Normalize the backend's many truthy encodings for an active fault tag.
///
/// Controller firmware variously stores `true`, `"true"`, `"tr"`, `1`, and
/// `"1"` for an active tag. This is the single place that equivalence is
/// defined; nothing else may reimplement it.
pub fn tag_is_active(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() == Some(1.0),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "tr" | "1"
        ),
        _ => false,
    }
}

/// Extract one [`TagData`] per recognized tag field from raw fault-log rows.
///
/// Every object field except the bookkeeping columns (`id`, `machineName`,
/// `createdAt`/`created_at`, `updatedAt`) is a tag field. Non-object rows are
/// skipped. Extraction order is row order, then field order within a row.
pub fn extract_tag_data(rows: &[Value]) -> Vec<TagData> {
    let mut tags = Vec::new();
    for row in rows {
        let Some(obj) = row.as_object() else {
            continue;
        };
        let created_at = obj
            .get("createdAt")
            .or_else(|| obj.get("created_at"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        for (field, value) in obj {
            if META_FIELDS.contains(&field.as_str()) {
                continue;
            }
            tags.push(TagData::from_raw(field.clone(), value.clone(), &created_at));
        }
    }
    tags
}

/// Summary statistics for one virtual page of fault records.
///
/// Always recomputed together with [`PaginationInfo`] from the same
/// reconciliation pass so the two can never disagree mid-render.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaultStats {
    /// Upstream-reported total record count for the current filter.
    pub total: u64,
    /// Accumulated extracted tags that are currently active.
    pub active_tags: usize,
    /// Accumulated extracted (and search-filtered) tag records.
    pub fault_tags: usize,
    pub current_page: u64,
    pub total_pages: u64,
}

/// Derived pagination view-model for one virtual page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationInfo {
    pub total: u64,
    pub total_pages: u64,
    pub limit: usize,
    pub page: u64,
}

impl Default for PaginationInfo {
    fn default() -> Self {
        Self {
            total: 0,
            total_pages: 1,
            limit: 0,
            page: 1,
        }
    }
}
