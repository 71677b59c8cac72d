//! Aggregate result of a cascade invocation.

use crate::domain::{RecordRef, TableName};
use serde::Serialize;

/// An edge that was skipped because one of its steps failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEdge {
    /// Record whose edge was being processed
    pub parent: RecordRef,

    /// Child table of the edge
    pub table: TableName,

    /// Foreign key field of the edge
    pub field: String,

    /// Why the edge (or one child under it) was skipped
    pub reason: String,
}

/// Whether a cascade removed everything it was asked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeOutcome {
    /// Every edge processed, no branch truncated
    Complete,

    /// Root deleted, but some edges were skipped or branches truncated
    Partial,
}

/// Counts and tables touched by one cascade, merged bottom-up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CascadeResult {
    /// Records removed, including the root
    pub deleted_count: usize,

    /// Distinct tables touched, in first-touch order (children before the root)
    pub deleted_tables: Vec<TableName>,

    /// Rows detached by `set_null` edges; these still exist
    pub nullified_count: usize,

    /// Edges skipped because of a failure
    pub skipped_edges: Vec<SkippedEdge>,

    /// Records where the depth guard stopped the walk; left in place
    pub truncated: Vec<RecordRef>,
}

impl CascadeResult {
    /// Classify the result.
    pub fn outcome(&self) -> CascadeOutcome {
        if self.skipped_edges.is_empty() && self.truncated.is_empty() {
            CascadeOutcome::Complete
        } else {
            CascadeOutcome::Partial
        }
    }

    /// Returns `true` for [`CascadeOutcome::Complete`].
    pub fn is_complete(&self) -> bool {
        self.outcome() == CascadeOutcome::Complete
    }

    /// Record `table` as touched unless it already is.
    pub(crate) fn touch(&mut self, table: &TableName) {
        if !self.deleted_tables.contains(table) {
            self.deleted_tables.push(table.clone());
        }
    }

    /// Fold a child's result into this one.
    pub(crate) fn merge(&mut self, other: CascadeResult) {
        self.deleted_count += other.deleted_count;
        self.nullified_count += other.nullified_count;
        for table in &other.deleted_tables {
            self.touch(table);
        }
        self.skipped_edges.extend(other.skipped_edges);
        self.truncated.extend(other.truncated);
    }
}
