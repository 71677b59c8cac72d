//! JSONL persistence for the in-memory store.

use super::in_memory::InMemoryStore;
use crate::client::RecordClient;
use crate::domain::{Record, RecordId, RecordRef, TableName};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};

/// One line of a records file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Table the record belongs to
    pub table: TableName,

    /// Record identifier
    pub id: RecordId,

    /// Field values
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl StoredRecord {
    /// Split into the table name and the record.
    pub fn into_parts(self) -> (TableName, Record) {
        (
            self.table,
            Record {
                id: self.id,
                fields: self.fields,
            },
        )
    }
}

/// Non-fatal problems found while loading a records file.
///
/// The offending line is skipped; everything else is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// Line that is not a valid record object
    MalformedJson { line_number: usize, error: String },

    /// A `(table, id)` pair seen earlier in the file; the first one wins
    DuplicateRecord { line_number: usize, record: RecordRef },
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadWarning::MalformedJson { line_number, error } => {
                write!(f, "line {line_number}: malformed record: {error}")
            }
            LoadWarning::DuplicateRecord {
                line_number,
                record,
            } => write!(f, "line {line_number}: duplicate record {record}"),
        }
    }
}

/// Load a store from a JSONL file.
///
/// A missing file yields an empty store. Blank lines are ignored; malformed
/// lines and duplicate records are skipped and reported as warnings.
///
/// # Errors
///
/// Returns `Error::Io` if the file exists but cannot be read.
pub async fn load_from_jsonl(path: &Path) -> Result<(InMemoryStore, Vec<LoadWarning>)> {
    let store = InMemoryStore::new();
    let mut warnings = Vec::new();

    if !path.exists() {
        return Ok((store, warnings));
    }

    let file = File::open(path).await?;
    let mut lines = BufReader::new(file).lines();
    let mut seen = HashSet::new();
    let mut line_number = 0;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let stored: StoredRecord = match serde_json::from_str(trimmed) {
            Ok(stored) => stored,
            Err(e) => {
                warnings.push(LoadWarning::MalformedJson {
                    line_number,
                    error: e.to_string(),
                });
                continue;
            }
        };

        let key = RecordRef {
            table: stored.table.clone(),
            id: stored.id.clone(),
        };
        if !seen.insert(key.clone()) {
            warnings.push(LoadWarning::DuplicateRecord {
                line_number,
                record: key,
            });
            continue;
        }

        let (table, record) = stored.into_parts();
        store.insert(table, record).await;
    }

    Ok((store, warnings))
}

/// Save a store to a JSONL file with atomic writes.
///
/// Records are written to a `.tmp` sibling first and then renamed over the
/// target, so an interrupted save leaves the previous file intact. Output is
/// ordered by table then id, keeping diffs between saves minimal.
pub async fn save_to_jsonl(store: &InMemoryStore, path: &Path) -> Result<()> {
    let temp_path = path.with_extension("tmp");

    let file = File::create(&temp_path).await?;
    let mut writer = BufWriter::new(file);

    for record in store.export_all().await {
        let json = serde_json::to_string(&record)?;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }

    writer.flush().await?;
    tokio::fs::rename(&temp_path, path).await?;

    Ok(())
}

/// An in-memory store tied to the JSONL file it was loaded from.
///
/// Record operations run against memory; [`save`](Self::save) writes them
/// out and [`reload`](Self::reload) throws unsaved changes away.
#[derive(Debug, Clone)]
pub struct JsonlBackedStore {
    store: InMemoryStore,
    path: PathBuf,
}

impl JsonlBackedStore {
    /// Load `path` (or start empty if it does not exist yet).
    ///
    /// Load warnings are logged, not returned; the store is usable either way.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let (store, warnings) = load_from_jsonl(&path).await?;
        for warning in &warnings {
            tracing::warn!(path = %path.display(), %warning, "JSONL load warning");
        }
        Ok(Self { store, path })
    }

    /// The underlying in-memory store.
    pub fn store(&self) -> &InMemoryStore {
        &self.store
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist the current contents to the backing file.
    pub async fn save(&self) -> Result<()> {
        save_to_jsonl(&self.store, &self.path).await
    }

    /// Restore the contents from the backing file, discarding unsaved changes.
    pub async fn reload(&self) -> Result<()> {
        let (fresh, warnings) = load_from_jsonl(&self.path).await?;
        for warning in &warnings {
            tracing::warn!(path = %self.path.display(), %warning, "JSONL reload warning");
        }
        self.store.replace_with(&fresh).await;
        Ok(())
    }
}

#[async_trait]
impl RecordClient for JsonlBackedStore {
    async fn find_by_field(
        &self,
        table: &TableName,
        field: &str,
        value: &RecordId,
    ) -> Result<Vec<Record>> {
        self.store.find_by_field(table, field, value).await
    }

    async fn set_null(&self, table: &TableName, ids: &[RecordId], field: &str) -> Result<()> {
        self.store.set_null(table, ids, field).await
    }

    async fn delete_many(&self, table: &TableName, ids: &[RecordId]) -> Result<()> {
        self.store.delete_many(table, ids).await
    }

    async fn delete_one(&self, table: &TableName, id: &RecordId) -> Result<()> {
        self.store.delete_one(table, id).await
    }
}
