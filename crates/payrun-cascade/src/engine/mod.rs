//! Cascading deletion engine.
//!
//! Given a root record, the engine removes or detaches every record that
//! references it, following the [`DependencyGraph`] depth-first so that
//! children are fully resolved before their parent is deleted. This stands in
//! for store-level `ON DELETE CASCADE` / `ON DELETE SET NULL`.
//!
//! # Algorithm
//!
//! For a record `(table, id)` at recursion depth `depth`:
//!
//! 1. **Visited set**: a `table:id` key already processed in this
//!    invocation is skipped. This is what makes cyclic graphs terminate, and
//!    it comes first so that closing a cycle never trips the depth guard.
//! 2. **Depth guard**: past `max_depth` the store is not touched. The
//!    [`DepthPolicy`] decides between truncating the branch (reported in
//!    [`CascadeResult::truncated`]) and failing the whole cascade. A record
//!    truncated on one path and deleted on a shorter one is not reported.
//! 3. **Edges**, in declared order: fetch children where `field == id`, then
//!    either clear the field (`set_null`) or recurse into each child and
//!    issue a redundant bulk delete of the removed batch (`delete`).
//! 4. **Root**: delete the record itself. Failure here is the only fatal
//!    step and surfaces as [`Error::DeleteFailed`].
//!
//! # Failure Policy
//!
//! | Failure | Handling |
//! |---------|----------|
//! | filtered read or bulk update on one edge | logged, edge recorded in `skipped_edges`, next edge runs |
//! | a child's own delete | logged, recorded in `skipped_edges`, remaining siblings run |
//! | redundant bulk delete after recursion | swallowed, logged at debug |
//! | depth guard under [`DepthPolicy::Truncate`] | branch left in place, recorded in `truncated` |
//! | depth guard under [`DepthPolicy::Fail`] | [`Error::DepthExceeded`], no ancestor is deleted |
//! | root delete | [`Error::DeleteFailed`], nothing is rolled back |
//!
//! # Concurrency
//!
//! One invocation is strictly sequential: every store call is awaited before
//! the next is issued and siblings never run concurrently. The visited set
//! belongs to a single invocation, so two concurrent cascades over
//! overlapping data are not coordinated; callers that can overlap must
//! serialize them.

mod result;

#[cfg(test)]
mod tests;

pub use result::{CascadeOutcome, CascadeResult, SkippedEdge};

use crate::client::RecordClient;
use crate::domain::{RecordId, RecordRef, TableName};
use crate::error::{Error, Result};
use crate::graph::{CascadePolicy, DependencyEdge, DependencyGraph};
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default bound on recursion depth. The root is at depth 0.
pub const MAX_DEPTH: usize = 10;

/// What to do when a record lies deeper than the configured maximum depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthPolicy {
    /// Leave the branch in place and keep deleting its ancestors.
    ///
    /// Rows below the bound may end up pointing at deleted ancestors; every
    /// such branch is listed in [`CascadeResult::truncated`].
    #[default]
    Truncate,

    /// Abort the whole cascade before any ancestor is deleted.
    Fail,
}

/// Tunables for a [`CascadeEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Deepest level processed; records at `max_depth + 1` trip the guard
    pub max_depth: usize,

    /// Behaviour when the guard trips
    pub depth_policy: DepthPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
            depth_policy: DepthPolicy::default(),
        }
    }
}

/// What happened to a single visited record.
enum Visit {
    Deleted(CascadeResult),
    /// Dependents were processed but the record's own delete failed.
    Failed(CascadeResult, Error),
    AlreadyVisited,
    Truncated(RecordRef),
}

/// Cascading deletion over a [`RecordClient`].
///
/// The graph is injected at construction and never changes. One engine can
/// serve any number of invocations; each gets its own visited set.
pub struct CascadeEngine {
    graph: Arc<DependencyGraph>,
    client: Arc<dyn RecordClient>,
    config: EngineConfig,
}

impl fmt::Debug for CascadeEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CascadeEngine")
            .field("tables", &self.graph.len())
            .field("edges", &self.graph.edge_count())
            .field("config", &self.config)
            .field("client", &"<dyn RecordClient>")
            .finish()
    }
}

impl CascadeEngine {
    /// Create an engine with the default [`EngineConfig`].
    pub fn new(graph: Arc<DependencyGraph>, client: Arc<dyn RecordClient>) -> Self {
        Self {
            graph,
            client,
            config: EngineConfig::default(),
        }
    }

    /// Replace the engine configuration.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// The active configuration.
    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// The dependency graph this engine walks.
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Returns `true` if the graph declares an entry for `table`.
    ///
    /// A table declared without dependents still counts as configured.
    pub fn has_cascade_config(&self, table: &str) -> bool {
        self.graph.has_entry(table)
    }

    /// Immediate dependent tables of `table`, for diagnostics.
    pub fn get_dependent_tables(&self, table: &str) -> BTreeSet<TableName> {
        self.graph.child_tables(table)
    }

    /// Delete `(table, id)` and everything that depends on it.
    ///
    /// # Errors
    ///
    /// - `Error::DeleteFailed` if the root record itself could not be deleted
    ///   (including when it does not exist). Dependents handled before the
    ///   failure stay deleted or detached; re-running is safe.
    /// - `Error::DepthExceeded` under [`DepthPolicy::Fail`]
    pub async fn cascade_delete(&self, table: &TableName, id: &RecordId) -> Result<CascadeResult> {
        info!(%table, %id, "Starting cascade delete");

        let mut visited = HashSet::new();
        let mut result = match self.visit(table, id, 0, &mut visited).await {
            Ok(Visit::Deleted(result)) => result,
            Ok(Visit::Failed(partial, err)) => {
                warn!(
                    %table,
                    %id,
                    deleted = partial.deleted_count,
                    nullified = partial.nullified_count,
                    error = %err,
                    "Root delete failed after dependents were processed"
                );
                return Err(err);
            }
            Ok(Visit::AlreadyVisited) => CascadeResult::default(),
            Ok(Visit::Truncated(record)) => CascadeResult {
                truncated: vec![record],
                ..Default::default()
            },
            Err(err) => {
                warn!(%table, %id, error = %err, "Cascade delete failed");
                return Err(err);
            }
        };

        let mut seen = HashSet::new();
        result
            .truncated
            .retain(|record| !visited.contains(record) && seen.insert(record.clone()));

        info!(
            %table,
            %id,
            deleted = result.deleted_count,
            nullified = result.nullified_count,
            skipped_edges = result.skipped_edges.len(),
            truncated = result.truncated.len(),
            outcome = ?result.outcome(),
            "Cascade delete finished"
        );
        Ok(result)
    }

    fn visit<'a>(
        &'a self,
        table: &'a TableName,
        id: &'a RecordId,
        depth: usize,
        visited: &'a mut HashSet<RecordRef>,
    ) -> BoxFuture<'a, Result<Visit>> {
        async move {
            let key = RecordRef {
                table: table.clone(),
                id: id.clone(),
            };
            if visited.contains(&key) {
                debug!(%table, %id, "Already visited in this cascade");
                return Ok(Visit::AlreadyVisited);
            }

            // Only records that pass the guard are marked, so a shorter path
            // can still reach a record truncated on a deeper one.
            if depth > self.config.max_depth {
                return self.depth_exceeded(table, id, depth);
            }
            visited.insert(key);

            let mut result = CascadeResult::default();

            for edge in self.graph.edges_for(table.as_str()) {
                if let Err(err) = self
                    .process_edge(table, id, edge, depth, visited, &mut result)
                    .await
                {
                    if matches!(err, Error::DepthExceeded { .. }) {
                        return Err(err);
                    }
                    warn!(
                        parent = %table,
                        parent_id = %id,
                        child = %edge.table,
                        field = %edge.field,
                        error = %err,
                        "Skipping edge after failure"
                    );
                    result.skipped_edges.push(skipped_edge(table, id, edge, &err));
                }
            }

            if let Err(source) = self.client.delete_one(table, id).await {
                let err = Error::DeleteFailed {
                    table: table.clone(),
                    id: id.clone(),
                    source: Box::new(source),
                };
                return Ok(Visit::Failed(result, err));
            }

            result.deleted_count += 1;
            result.touch(table);
            Ok(Visit::Deleted(result))
        }
        .boxed()
    }

    async fn process_edge(
        &self,
        table: &TableName,
        id: &RecordId,
        edge: &DependencyEdge,
        depth: usize,
        visited: &mut HashSet<RecordRef>,
        result: &mut CascadeResult,
    ) -> Result<()> {
        let children = self
            .client
            .find_by_field(&edge.table, &edge.field, id)
            .await?;
        if children.is_empty() {
            return Ok(());
        }

        debug!(
            parent = %table,
            parent_id = %id,
            child = %edge.table,
            field = %edge.field,
            policy = %edge.policy,
            matched = children.len(),
            "Processing edge"
        );

        let ids: Vec<RecordId> = children.into_iter().map(|record| record.id).collect();

        match edge.policy {
            CascadePolicy::SetNull => {
                self.client.set_null(&edge.table, &ids, &edge.field).await?;
                result.nullified_count += ids.len();
                result.touch(&edge.table);
            }
            CascadePolicy::Delete => {
                let mut removed = Vec::with_capacity(ids.len());

                for child_id in &ids {
                    match self.visit(&edge.table, child_id, depth + 1, visited).await? {
                        Visit::Deleted(child) => {
                            result.merge(child);
                            removed.push(child_id.clone());
                        }
                        Visit::AlreadyVisited => {}
                        Visit::Truncated(record) => result.truncated.push(record),
                        Visit::Failed(child, err) => {
                            result.merge(child);
                            warn!(
                                parent = %table,
                                parent_id = %id,
                                child = %edge.table,
                                child_id = %child_id,
                                error = %err,
                                "Dependent could not be deleted"
                            );
                            result.skipped_edges.push(skipped_edge(table, id, edge, &err));
                        }
                    }
                }

                // Children delete themselves above, so this normally fails
                // with NotFound.
                if !removed.is_empty()
                    && let Err(err) = self.client.delete_many(&edge.table, &removed).await
                {
                    debug!(
                        child = %edge.table,
                        count = removed.len(),
                        error = %err,
                        "Redundant bulk delete failed"
                    );
                }
            }
        }

        Ok(())
    }

    fn depth_exceeded(&self, table: &TableName, id: &RecordId, depth: usize) -> Result<Visit> {
        match self.config.depth_policy {
            DepthPolicy::Truncate => {
                warn!(
                    %table,
                    %id,
                    depth,
                    max_depth = self.config.max_depth,
                    "Depth guard reached, branch left in place"
                );
                Ok(Visit::Truncated(RecordRef {
                    table: table.clone(),
                    id: id.clone(),
                }))
            }
            DepthPolicy::Fail => Err(Error::DepthExceeded {
                table: table.clone(),
                id: id.clone(),
                depth,
                max_depth: self.config.max_depth,
            }),
        }
    }
}

fn skipped_edge(
    table: &TableName,
    id: &RecordId,
    edge: &DependencyEdge,
    err: &Error,
) -> SkippedEdge {
    SkippedEdge {
        parent: RecordRef {
            table: table.clone(),
            id: id.clone(),
        },
        table: edge.table.clone(),
        field: edge.field.clone(),
        reason: err.to_string(),
    }
}
