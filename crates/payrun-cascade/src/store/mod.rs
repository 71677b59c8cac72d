//! Record store backends.
//!
//! - **In-memory**: [`InMemoryStore`], an ephemeral table map behind
//!   `Arc<Mutex<_>>` that implements [`RecordClient`](crate::client::RecordClient)
//! - **JSONL**: [`load_from_jsonl`] / [`save_to_jsonl`] persist an in-memory
//!   store as JSON Lines, and [`JsonlBackedStore`] ties a store to its file
//!
//! # File Format
//!
//! One record per line, ordered by table then id:
//!
//! ```text
//! {"table":"positions","id":"pos-1","fields":{"title":"Cashier"}}
//! {"table":"salary_schemes","id":"ss-1","fields":{"position_id":"pos-1"}}
//! ```

mod in_memory;
mod jsonl;

pub use in_memory::InMemoryStore;
pub use jsonl::{JsonlBackedStore, LoadWarning, StoredRecord, load_from_jsonl, save_to_jsonl};
