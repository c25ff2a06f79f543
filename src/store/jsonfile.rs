//! File-backed store adapter: one JSON document per asset table under a
//! data directory. Backs the CLI; not meant for concurrent writers.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::normalizer::RawRecord;

use super::{Cursor, Page, RangePredicate, StoreAdapter, select_page};

#[derive(Serialize, Deserialize)]
struct TableEntry {
    partition: String,
    row: String,
    record: RawRecord,
}

pub struct JsonFileStore {
    dir: PathBuf,
    page_size: usize,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(JsonFileStore {
            dir,
            page_size: 1_000,
        })
    }

    fn table_path(&self, table: &str) -> Result<PathBuf> {
        // Table names become file names; keep them to a safe charset.
        let valid = !table.is_empty()
            && table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(Error::Store(format!("invalid table name: {:?}", table)));
        }
        Ok(self.dir.join(format!("{}.json", table)))
    }

    fn load(&self, path: &Path) -> Result<BTreeMap<(String, String), RawRecord>> {
        if !path.exists() {
            return Err(Error::Store(format!("no such table: {}", path.display())));
        }
        let content = fs::read_to_string(path)?;
        let entries: Vec<TableEntry> = serde_json::from_str(&content)?;
        Ok(entries
            .into_iter()
            .map(|e| ((e.partition, e.row), e.record))
            .collect())
    }

    fn save(&self, path: &Path, rows: &BTreeMap<(String, String), RawRecord>) -> Result<()> {
        let entries: Vec<TableEntry> = rows
            .iter()
            .map(|((partition, row), record)| TableEntry {
                partition: partition.clone(),
                row: row.clone(),
                record: record.clone(),
            })
            .collect();
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&entries)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[async_trait]
impl StoreAdapter for JsonFileStore {
    async fn create_if_absent(&self, table: &str) -> Result<()> {
        let path = self.table_path(table)?;
        if !path.exists() {
            debug!(table, "creating asset table");
            self.save(&path, &BTreeMap::new())?;
        }
        Ok(())
    }

    async fn upsert(
        &self,
        table: &str,
        partition: &str,
        row: &str,
        record: &RawRecord,
    ) -> Result<()> {
        let path = self.table_path(table)?;
        let mut rows = self.load(&path)?;
        rows.insert((partition.to_string(), row.to_string()), record.clone());
        self.save(&path, &rows)
    }

    async fn query(
        &self,
        table: &str,
        predicate: &RangePredicate,
        cursor: Option<Cursor>,
    ) -> Result<Page> {
        let path = self.table_path(table)?;
        let rows = self.load(&path)?;
        Ok(select_page(&rows, predicate, cursor, self.page_size))
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let mut tables = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                tables.push(stem.to_string());
            }
        }
        tables.sort();
        Ok(tables)
    }
}
