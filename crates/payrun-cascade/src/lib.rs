//! Payrun cascade - cascading deletion over a record-oriented data store.
//!
//! The data store behind payrun has no foreign key cascades of its own. It is
//! reached through four primitive operations (see [`client::RecordClient`]),
//! so removing a record safely means walking a hand-declared
//! [`graph::DependencyGraph`] and deleting or detaching every dependent row
//! before the record itself. That walk is performed by
//! [`engine::CascadeEngine`].
//!
//! # Example
//!
//! ```no_run
//! use payrun_cascade::domain::{Record, RecordId, TableName};
//! use payrun_cascade::engine::CascadeEngine;
//! use payrun_cascade::graph::{CascadePolicy, DependencyGraph};
//! use payrun_cascade::store::InMemoryStore;
//! use std::sync::Arc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let graph = DependencyGraph::builder()
//!         .edge("positions", "schedule_assignments", "position_id", CascadePolicy::Delete)
//!         .build()?;
//!
//!     let store = InMemoryStore::new();
//!     store.insert(TableName::new("positions"), Record::new("pos-1")).await;
//!
//!     let engine = CascadeEngine::new(Arc::new(graph), Arc::new(store));
//!     let result = engine
//!         .cascade_delete(&TableName::new("positions"), &RecordId::new("pos-1"))
//!         .await?;
//!     println!("deleted {} records", result.deleted_count);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

pub mod client;
pub mod domain;
pub mod engine;
pub mod error;
pub mod graph;
pub mod store;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use client::RecordClient;
pub use engine::{CascadeEngine, CascadeOutcome, CascadeResult, DepthPolicy, EngineConfig};
pub use error::{Error, Result};
pub use graph::{CascadePolicy, DependencyEdge, DependencyGraph};
