//! In-memory store adapter, used in tests and offline replay.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::normalizer::RawRecord;

use super::{Cursor, Page, RangePredicate, StoreAdapter, select_page};

type Table = BTreeMap<(String, String), RawRecord>;

pub struct MemoryStore {
    tables: Mutex<BTreeMap<String, Table>>,
    page_size: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_page_size(1_000)
    }

    /// Small page sizes force multi-page drains, which the pagination tests
    /// rely on.
    pub fn with_page_size(page_size: usize) -> Self {
        MemoryStore {
            tables: Mutex::new(BTreeMap::new()),
            page_size: page_size.max(1),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Table>>> {
        self.tables
            .lock()
            .map_err(|_| Error::Store("memory store mutex poisoned".to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreAdapter for MemoryStore {
    async fn create_if_absent(&self, table: &str) -> Result<()> {
        self.lock()?.entry(table.to_string()).or_default();
        Ok(())
    }

    async fn upsert(
        &self,
        table: &str,
        partition: &str,
        row: &str,
        record: &RawRecord,
    ) -> Result<()> {
        let mut tables = self.lock()?;
        let table = tables
            .get_mut(table)
            .ok_or_else(|| Error::Store(format!("no such table: {}", table)))?;
        table.insert((partition.to_string(), row.to_string()), record.clone());
        Ok(())
    }

    async fn query(
        &self,
        table: &str,
        predicate: &RangePredicate,
        cursor: Option<Cursor>,
    ) -> Result<Page> {
        let tables = self.lock()?;
        let rows = tables
            .get(table)
            .ok_or_else(|| Error::Store(format!("no such table: {}", table)))?;
        Ok(select_page(rows, predicate, cursor, self.page_size))
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FIX_PARTITION, row_key};

    fn record(ts: &str) -> RawRecord {
        RawRecord {
            asset_id: "boat-1".to_string(),
            timestamp: ts.parse().unwrap(),
            fields: vec!["N".to_string()],
        }
    }

    #[tokio::test]
    async fn test_query_missing_table_is_store_error() {
        let store = MemoryStore::new();
        let err = store
            .query("nope", &RangePredicate::fixes(None, None), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Store(_)));
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_key() {
        let store = MemoryStore::new();
        store.create_if_absent("boat-1").await.unwrap();

        let r = record("2026-08-01T09:00:00Z");
        let key = row_key(r.timestamp);
        store.upsert("boat-1", FIX_PARTITION, &key, &r).await.unwrap();
        store.upsert("boat-1", FIX_PARTITION, &key, &r).await.unwrap();

        let page = store
            .query("boat-1", &RangePredicate::fixes(None, None), None)
            .await
            .unwrap();
        assert_eq!(page.entries.len(), 1);
    }

    #[tokio::test]
    async fn test_create_if_absent_is_idempotent() {
        let store = MemoryStore::new();
        store.create_if_absent("boat-1").await.unwrap();
        store.create_if_absent("boat-1").await.unwrap();
        assert_eq!(store.list_tables().await.unwrap(), vec!["boat-1"]);
    }
}
