//! Test utilities for code built on [`RecordClient`].
//!
//! Enabled in this crate's own tests and, for downstream crates, through the
//! `test-util` feature:
//!
//! ```toml
//! [dev-dependencies]
//! payrun-cascade = { version = "...", features = ["test-util"] }
//! ```
//!
//! Both wrappers delegate to an inner client, so they are usually stacked on
//! top of an [`InMemoryStore`](crate::store::InMemoryStore):
//!
//! ```rust,ignore
//! use payrun_cascade::store::InMemoryStore;
//! use payrun_cascade::testing::{FaultyClient, Operation, RecordingClient};
//! use std::sync::Arc;
//!
//! let store = InMemoryStore::new();
//! let faulty = Arc::new(FaultyClient::new(Arc::new(store.clone())));
//! faulty.fail(Operation::DeleteOne, "positions").await;
//! let recording = Arc::new(RecordingClient::new(faulty.clone()));
//! ```

use crate::client::RecordClient;
use crate::domain::{Record, RecordId, TableName};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

/// The four [`RecordClient`] primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Operation {
    FindByField,
    SetNull,
    DeleteMany,
    DeleteOne,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::FindByField => "find_by_field",
            Operation::SetNull => "set_null",
            Operation::DeleteMany => "delete_many",
            Operation::DeleteOne => "delete_one",
        };
        f.write_str(name)
    }
}

/// One call observed by a [`RecordingClient`], with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Call {
    FindByField {
        table: TableName,
        field: String,
        value: RecordId,
    },
    SetNull {
        table: TableName,
        ids: Vec<RecordId>,
        field: String,
    },
    DeleteMany {
        table: TableName,
        ids: Vec<RecordId>,
    },
    DeleteOne {
        table: TableName,
        id: RecordId,
    },
}

impl Call {
    /// The primitive this call used.
    pub fn operation(&self) -> Operation {
        match self {
            Call::FindByField { .. } => Operation::FindByField,
            Call::SetNull { .. } => Operation::SetNull,
            Call::DeleteMany { .. } => Operation::DeleteMany,
            Call::DeleteOne { .. } => Operation::DeleteOne,
        }
    }

    /// Returns `true` if this is `delete_one(table, id)`.
    pub fn is_delete_one(&self, table: &str, id: &str) -> bool {
        matches!(
            self,
            Call::DeleteOne { table: t, id: i } if t.as_str() == table && i.as_str() == id
        )
    }
}

/// Records every call in order before delegating to the inner client.
///
/// Calls are logged whether or not the inner client succeeds.
pub struct RecordingClient {
    inner: Arc<dyn RecordClient>,
    calls: Mutex<Vec<Call>>,
}

impl RecordingClient {
    /// Wrap `inner` with an empty call log.
    pub fn new(inner: Arc<dyn RecordClient>) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call observed so far, oldest first.
    pub async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    /// Calls that used `operation`, oldest first.
    pub async fn calls_of(&self, operation: Operation) -> Vec<Call> {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|call| call.operation() == operation)
            .cloned()
            .collect()
    }

    /// Index of the `delete_one(table, id)` call, if it happened.
    pub async fn delete_one_position(&self, table: &str, id: &str) -> Option<usize> {
        self.calls
            .lock()
            .await
            .iter()
            .position(|call| call.is_delete_one(table, id))
    }

    /// Forget everything recorded so far.
    pub async fn reset(&self) {
        self.calls.lock().await.clear();
    }

    async fn record(&self, call: Call) {
        self.calls.lock().await.push(call);
    }
}

#[async_trait]
impl RecordClient for RecordingClient {
    async fn find_by_field(
        &self,
        table: &TableName,
        field: &str,
        value: &RecordId,
    ) -> Result<Vec<Record>> {
        self.record(Call::FindByField {
            table: table.clone(),
            field: field.to_string(),
            value: value.clone(),
        })
        .await;
        self.inner.find_by_field(table, field, value).await
    }

    async fn set_null(&self, table: &TableName, ids: &[RecordId], field: &str) -> Result<()> {
        self.record(Call::SetNull {
            table: table.clone(),
            ids: ids.to_vec(),
            field: field.to_string(),
        })
        .await;
        self.inner.set_null(table, ids, field).await
    }

    async fn delete_many(&self, table: &TableName, ids: &[RecordId]) -> Result<()> {
        self.record(Call::DeleteMany {
            table: table.clone(),
            ids: ids.to_vec(),
        })
        .await;
        self.inner.delete_many(table, ids).await
    }

    async fn delete_one(&self, table: &TableName, id: &RecordId) -> Result<()> {
        self.record(Call::DeleteOne {
            table: table.clone(),
            id: id.clone(),
        })
        .await;
        self.inner.delete_one(table, id).await
    }
}

/// Fails chosen primitives on chosen tables with `Error::Store`.
///
/// Calls that are not configured to fail go straight to the inner client.
/// Faults can be added and removed while an engine holds the client, which is
/// how retry scenarios are exercised.
pub struct FaultyClient {
    inner: Arc<dyn RecordClient>,
    faults: Mutex<HashSet<(Operation, TableName)>>,
}

impl FaultyClient {
    /// Wrap `inner` with no faults configured.
    pub fn new(inner: Arc<dyn RecordClient>) -> Self {
        Self {
            inner,
            faults: Mutex::new(HashSet::new()),
        }
    }

    /// Make `operation` fail on `table` until healed.
    pub async fn fail(&self, operation: Operation, table: impl Into<TableName>) {
        self.faults.lock().await.insert((operation, table.into()));
    }

    /// Stop failing `operation` on `table`.
    pub async fn heal(&self, operation: Operation, table: impl Into<TableName>) {
        self.faults.lock().await.remove(&(operation, table.into()));
    }

    /// Remove every configured fault.
    pub async fn clear(&self) {
        self.faults.lock().await.clear();
    }

    async fn check(&self, operation: Operation, table: &TableName) -> Result<()> {
        if self.faults.lock().await.contains(&(operation, table.clone())) {
            return Err(Error::Store(format!(
                "injected {operation} failure on {table}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordClient for FaultyClient {
    async fn find_by_field(
        &self,
        table: &TableName,
        field: &str,
        value: &RecordId,
    ) -> Result<Vec<Record>> {
        self.check(Operation::FindByField, table).await?;
        self.inner.find_by_field(table, field, value).await
    }

    async fn set_null(&self, table: &TableName, ids: &[RecordId], field: &str) -> Result<()> {
        self.check(Operation::SetNull, table).await?;
        self.inner.set_null(table, ids, field).await
    }

    async fn delete_many(&self, table: &TableName, ids: &[RecordId]) -> Result<()> {
        self.check(Operation::DeleteMany, table).await?;
        self.inner.delete_many(table, ids).await
    }

    async fn delete_one(&self, table: &TableName, id: &RecordId) -> Result<()> {
        self.check(Operation::DeleteOne, table).await?;
        self.inner.delete_one(table, id).await
    }
}
