//! Deferred query state: the operation log and the pure derivations
//! (merged filter map, resolved sort, pagination window) that collapse
//! it into a single backend request.

use std::collections::BTreeMap;
use std::ops::{Bound, RangeBounds};

use serde_json::Value;

/// Page size used when a slice leaves the stop bound open.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Merged filter constraints, keyed by recognized field name.
pub type FilterMap = BTreeMap<String, Value>;

/// One recorded chain operation. Append-only: the log fully determines
/// the derived query state, so identical logs always translate to
/// identical requests.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOp {
    /// One `filter(...)` call's key/value constraints, in call order.
    Filter(Vec<(String, Value)>),
    /// One `order_by(...)` call's field list.
    OrderBy(Vec<String>),
}

/// Pagination window pushed to the backend (`from` / `size`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: usize,
    pub size: usize,
}

impl Window {
    /// Derive a window from range bounds: offset is the start (0 when
    /// unbounded), size is `stop - start`, and an open stop falls back
    /// to [`DEFAULT_PAGE_SIZE`].
    pub fn from_range<R: RangeBounds<usize>>(range: R) -> Self {
        let offset = match range.start_bound() {
            Bound::Included(&start) => start,
            Bound::Excluded(&start) => start.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let size = match range.end_bound() {
            Bound::Included(&stop) => stop.saturating_add(1).saturating_sub(offset),
            Bound::Excluded(&stop) => stop.saturating_sub(offset),
            Bound::Unbounded => DEFAULT_PAGE_SIZE,
        };
        Self { offset, size }
    }
}

/// Union of all `Filter` entries in call order. Later calls override
/// earlier ones per key; a trailing `__exact` modifier is stripped
/// before the merge.
pub fn merge_filters(ops: &[QueryOp]) -> FilterMap {
    let mut merged = FilterMap::new();
    for op in ops {
        if let QueryOp::Filter(kwargs) = op {
            for (key, value) in kwargs {
                let key = key.strip_suffix("__exact").unwrap_or(key);
                merged.insert(key.to_string(), value.clone());
            }
        }
    }
    merged
}

/// Resolve the sort spec: the last `OrderBy` entry with any fields wins,
/// and within it only the last field counts. A leading `-` marks
/// descending, a leading `+` (or nothing) ascending. Rendered as
/// `"<field>:<asc|desc>"`; `None` leaves backend default ordering.
pub fn resolve_sort(ops: &[QueryOp]) -> Option<String> {
    for op in ops.iter().rev() {
        if let QueryOp::OrderBy(fields) = op {
            if let Some(field) = fields.last() {
                let direction = if field.starts_with('-') { "desc" } else { "asc" };
                let field = field.trim_start_matches(['-', '+']);
                return Some(format!("{field}:{direction}"));
            }
        }
    }
    None
}
