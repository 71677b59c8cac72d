//! In-memory record store.
//!
//! All data lives in RAM and is lost when the process exits unless it is
//! written out with [`save_to_jsonl`](super::save_to_jsonl).
//!
//! # Semantics
//!
//! Each primitive is all-or-nothing: `set_null`, `delete_many` and
//! `delete_one` check every listed id before mutating anything, so a call
//! that fails with `Error::NotFound` leaves the store unchanged.
//!
//! # Thread Safety
//!
//! The tables are wrapped in `Arc<Mutex<_>>`. Clones of an [`InMemoryStore`]
//! share the same data, which lets tests keep a handle for inspection while
//! the engine owns another.

use super::jsonl::StoredRecord;
use crate::client::RecordClient;
use crate::domain::{Record, RecordId, TableName};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

type Rows = HashMap<RecordId, Map<String, Value>>;

/// Table data guarded by the store's mutex.
#[derive(Debug, Default)]
struct InMemoryStoreInner {
    tables: HashMap<TableName, Rows>,
}

impl InMemoryStoreInner {
    /// Fails with `NotFound` on the first id missing from `table`.
    fn ensure_all_exist(&self, table: &TableName, ids: &[RecordId]) -> Result<()> {
        let rows = self.tables.get(table);
        for id in ids {
            if !rows.is_some_and(|rows| rows.contains_key(id)) {
                return Err(Error::not_found(table, id));
            }
        }
        Ok(())
    }
}

/// Shared, thread-safe in-memory record store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<InMemoryStoreInner>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record. Returns the previous record with the same id.
    pub async fn insert(&self, table: impl Into<TableName>, record: Record) -> Option<Record> {
        let mut inner = self.inner.lock().await;
        let previous = inner
            .tables
            .entry(table.into())
            .or_default()
            .insert(record.id.clone(), record.fields);
        previous.map(|fields| Record {
            id: record.id,
            fields,
        })
    }

    /// Get a record by table and id.
    pub async fn get(&self, table: &str, id: &str) -> Option<Record> {
        let inner = self.inner.lock().await;
        inner
            .tables
            .get(table)
            .and_then(|rows| rows.get_key_value(id))
            .map(|(id, fields)| Record {
                id: id.clone(),
                fields: fields.clone(),
            })
    }

    /// Every record in `table`, sorted by id.
    pub async fn all(&self, table: &str) -> Vec<Record> {
        let inner = self.inner.lock().await;
        let mut records: Vec<Record> = inner
            .tables
            .get(table)
            .into_iter()
            .flatten()
            .map(|(id, fields)| Record {
                id: id.clone(),
                fields: fields.clone(),
            })
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    /// Number of records in `table`.
    pub async fn count(&self, table: &str) -> usize {
        let inner = self.inner.lock().await;
        inner.tables.get(table).map_or(0, HashMap::len)
    }

    /// Total number of records across all tables.
    pub async fn len(&self) -> usize {
        let inner = self.inner.lock().await;
        inner.tables.values().map(HashMap::len).sum()
    }

    /// Returns `true` if the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Every record, sorted by table then id.
    pub async fn export_all(&self) -> Vec<StoredRecord> {
        let inner = self.inner.lock().await;
        let mut records: Vec<StoredRecord> = inner
            .tables
            .iter()
            .flat_map(|(table, rows)| {
                rows.iter().map(|(id, fields)| StoredRecord {
                    table: table.clone(),
                    id: id.clone(),
                    fields: fields.clone(),
                })
            })
            .collect();
        records.sort_by(|a, b| (&a.table, &a.id).cmp(&(&b.table, &b.id)));
        records
    }

    /// Replace this store's contents with `other`'s, leaving `other` empty.
    ///
    /// Every clone of `self` observes the new contents.
    pub async fn replace_with(&self, other: &InMemoryStore) {
        let data = std::mem::take(&mut *other.inner.lock().await);
        *self.inner.lock().await = data;
    }
}

#[async_trait]
impl RecordClient for InMemoryStore {
    async fn find_by_field(
        &self,
        table: &TableName,
        field: &str,
        value: &RecordId,
    ) -> Result<Vec<Record>> {
        let inner = self.inner.lock().await;
        let Some(rows) = inner.tables.get(table) else {
            return Ok(Vec::new());
        };

        let mut matches: Vec<Record> = rows
            .iter()
            .map(|(id, fields)| Record {
                id: id.clone(),
                fields: fields.clone(),
            })
            .filter(|record| record.references(field, value))
            .collect();
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matches)
    }

    async fn set_null(&self, table: &TableName, ids: &[RecordId], field: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.ensure_all_exist(table, ids)?;

        if let Some(rows) = inner.tables.get_mut(table) {
            for id in ids {
                if let Some(fields) = rows.get_mut(id) {
                    fields.insert(field.to_string(), Value::Null);
                }
            }
        }
        Ok(())
    }

    async fn delete_many(&self, table: &TableName, ids: &[RecordId]) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.ensure_all_exist(table, ids)?;

        if let Some(rows) = inner.tables.get_mut(table) {
            for id in ids {
                rows.remove(id);
            }
        }
        Ok(())
    }

    async fn delete_one(&self, table: &TableName, id: &RecordId) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner
            .tables
            .get_mut(table)
            .and_then(|rows| rows.remove(id))
            .map(|_| ())
            .ok_or_else(|| Error::not_found(table, id))
    }
}
