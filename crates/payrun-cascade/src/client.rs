//! The record client consumed by the cascade engine.
//!
//! The data store is reached only through four primitives. There is no
//! transaction spanning several calls and no store-side cascade; the engine
//! builds referential integrity on top of these operations alone.

use crate::domain::{Record, RecordId, TableName};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Primitive record operations, parameterized by table name.
///
/// Implementations must be `Send + Sync`; the engine holds them as
/// `Arc<dyn RecordClient>` and every method takes `&self`, so stateful
/// backends rely on interior mutability (the in-memory store uses
/// `Arc<Mutex<_>>`).
///
/// # Consistency
///
/// Callers assume only that a write issued earlier in the same call chain is
/// visible to a later read. Nothing else (atomicity across calls, isolation
/// from concurrent writers) is assumed.
#[async_trait]
pub trait RecordClient: Send + Sync {
    /// Fetch every record in `table` whose `field` equals `value`.
    ///
    /// No page limit: the complete matching set is returned. Unknown tables
    /// yield an empty list.
    async fn find_by_field(
        &self,
        table: &TableName,
        field: &str,
        value: &RecordId,
    ) -> Result<Vec<Record>>;

    /// Set `field` to null on every listed record.
    ///
    /// # Errors
    ///
    /// - `Error::NotFound` if any listed record does not exist
    async fn set_null(&self, table: &TableName, ids: &[RecordId], field: &str) -> Result<()>;

    /// Remove every listed record.
    ///
    /// # Errors
    ///
    /// - `Error::NotFound` if any listed record is already absent. Callers
    ///   issuing redundant deletes must tolerate this.
    async fn delete_many(&self, table: &TableName, ids: &[RecordId]) -> Result<()>;

    /// Remove one record.
    ///
    /// # Errors
    ///
    /// - `Error::NotFound` if the record does not exist
    async fn delete_one(&self, table: &TableName, id: &RecordId) -> Result<()>;
}

#[async_trait]
impl<C: RecordClient + ?Sized> RecordClient for Arc<C> {
    async fn find_by_field(
        &self,
        table: &TableName,
        field: &str,
        value: &RecordId,
    ) -> Result<Vec<Record>> {
        (**self).find_by_field(table, field, value).await
    }

    async fn set_null(&self, table: &TableName, ids: &[RecordId], field: &str) -> Result<()> {
        (**self).set_null(table, ids, field).await
    }

    async fn delete_many(&self, table: &TableName, ids: &[RecordId]) -> Result<()> {
        (**self).delete_many(table, ids).await
    }

    async fn delete_one(&self, table: &TableName, id: &RecordId) -> Result<()> {
        (**self).delete_one(table, id).await
    }
}
