//! Storage seam for the per-asset telemetry log.
//!
//! The engine behind it is opaque to the pipeline: a table per asset, rows
//! keyed `(partition, row)` with the row key being an RFC-3339 UTC timestamp
//! so lexicographic key order is chronological order. Range queries are
//! cursor-paginated; the cursor is an opaque token with no ordering
//! semantics of its own.

mod jsonfile;
mod memory;

pub use jsonfile::JsonFileStore;
pub use memory::MemoryStore;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::Result;
use crate::normalizer::RawRecord;

/// Partition holding the time-series log of an asset.
pub const FIX_PARTITION: &str = "fix";
/// Partition holding the single most-recent-fix pointer record.
pub const LATEST_PARTITION: &str = "latest";
/// Row key of the pointer record inside [`LATEST_PARTITION`].
pub const LATEST_ROW: &str = "latest";

/// Formats a timestamp as the store row key. Fixed-width UTC RFC-3339 keeps
/// lexicographic and chronological order identical.
pub fn row_key(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Opaque continuation token returned by a paginated query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor(pub(crate) String);

/// Time-key range selector for a query. Bounds are inclusive and combine
/// with AND; both are optional.
#[derive(Debug, Clone, Default)]
pub struct RangePredicate {
    pub partition: String,
    pub since: Option<DateTime<Utc>>,
    pub before: Option<DateTime<Utc>>,
}

impl RangePredicate {
    pub fn fixes(since: Option<DateTime<Utc>>, before: Option<DateTime<Utc>>) -> Self {
        RangePredicate {
            partition: FIX_PARTITION.to_string(),
            since,
            before,
        }
    }

    pub fn latest() -> Self {
        RangePredicate {
            partition: LATEST_PARTITION.to_string(),
            since: None,
            before: None,
        }
    }

    fn matches_row(&self, row: &str) -> bool {
        if let Some(since) = self.since {
            if row < row_key(since).as_str() {
                return false;
            }
        }
        if let Some(before) = self.before {
            if row > row_key(before).as_str() {
                return false;
            }
        }
        true
    }
}

/// One page of a range query.
#[derive(Debug, Clone)]
pub struct Page {
    pub entries: Vec<RawRecord>,
    pub next_cursor: Option<Cursor>,
}

#[async_trait]
pub trait StoreAdapter: Send + Sync {
    /// Creates the per-asset table when it does not already exist.
    async fn create_if_absent(&self, table: &str) -> Result<()>;

    /// Inserts or replaces one record under `(partition, row)`.
    async fn upsert(&self, table: &str, partition: &str, row: &str, record: &RawRecord)
        -> Result<()>;

    /// Returns one key-ordered page of records matching `predicate`,
    /// resuming after `cursor` when given.
    async fn query(
        &self,
        table: &str,
        predicate: &RangePredicate,
        cursor: Option<Cursor>,
    ) -> Result<Page>;

    /// Lists all asset tables.
    async fn list_tables(&self) -> Result<Vec<String>>;
}

/// Shared pagination walk over an ordered `(partition, row)` map, used by
/// both bundled adapters. The cursor encodes the last key served.
fn select_page(
    rows: &BTreeMap<(String, String), RawRecord>,
    predicate: &RangePredicate,
    cursor: Option<Cursor>,
    page_size: usize,
) -> Page {
    let resume_after = cursor.map(|Cursor(token)| {
        let (partition, row) = token.split_once('\n').unwrap_or((token.as_str(), ""));
        (partition.to_string(), row.to_string())
    });

    let mut entries = Vec::new();
    let mut last_key = None;
    let mut more = false;

    for ((partition, row), record) in rows {
        if partition != &predicate.partition || !predicate.matches_row(row) {
            continue;
        }
        if let Some(after) = &resume_after {
            if (partition.as_str(), row.as_str()) <= (after.0.as_str(), after.1.as_str()) {
                continue;
            }
        }
        if entries.len() == page_size {
            more = true;
            break;
        }
        last_key = Some(format!("{}\n{}", partition, row));
        entries.push(record.clone());
    }

    let next_cursor = if more { last_key.map(Cursor) } else { None };
    Page {
        entries,
        next_cursor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ts: &str) -> RawRecord {
        RawRecord {
            asset_id: "a".to_string(),
            timestamp: ts.parse().unwrap(),
            fields: vec![],
        }
    }

    fn rows(timestamps: &[&str]) -> BTreeMap<(String, String), RawRecord> {
        timestamps
            .iter()
            .map(|ts| {
                let r = record(ts);
                ((FIX_PARTITION.to_string(), row_key(r.timestamp)), r)
            })
            .collect()
    }

    #[test]
    fn test_row_key_orders_chronologically() {
        let a = row_key("2026-08-01T09:00:00Z".parse().unwrap());
        let b = row_key("2026-08-01T10:30:00Z".parse().unwrap());
        let c = row_key("2026-08-02T00:00:00Z".parse().unwrap());
        assert!(a < b && b < c);
    }

    #[test]
    fn test_select_page_walks_in_order_across_pages() {
        let rows = rows(&[
            "2026-08-01T09:00:00Z",
            "2026-08-01T10:00:00Z",
            "2026-08-01T11:00:00Z",
        ]);
        let pred = RangePredicate::fixes(None, None);

        let first = select_page(&rows, &pred, None, 2);
        assert_eq!(first.entries.len(), 2);
        let cursor = first.next_cursor.clone().unwrap();

        let second = select_page(&rows, &pred, Some(cursor), 2);
        assert_eq!(second.entries.len(), 1);
        assert!(second.next_cursor.is_none());
        assert!(first.entries[1].timestamp < second.entries[0].timestamp);
    }

    #[test]
    fn test_select_page_applies_inclusive_bounds() {
        let rows = rows(&[
            "2026-08-01T09:00:00Z",
            "2026-08-01T10:00:00Z",
            "2026-08-01T11:00:00Z",
        ]);
        let pred = RangePredicate::fixes(
            Some("2026-08-01T10:00:00Z".parse().unwrap()),
            Some("2026-08-01T11:00:00Z".parse().unwrap()),
        );
        let page = select_page(&rows, &pred, None, 10);
        assert_eq!(page.entries.len(), 2);
    }

    #[test]
    fn test_select_page_filters_by_partition() {
        let mut rows = rows(&["2026-08-01T09:00:00Z"]);
        let latest = record("2026-08-01T09:00:00Z");
        rows.insert(
            (LATEST_PARTITION.to_string(), LATEST_ROW.to_string()),
            latest,
        );

        let page = select_page(&rows, &RangePredicate::latest(), None, 10);
        assert_eq!(page.entries.len(), 1);
        assert!(page.next_cursor.is_none());
    }
}
