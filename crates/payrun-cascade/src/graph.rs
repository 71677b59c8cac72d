//! Declarative dependency graph.
//!
//! The graph maps a parent table to the ordered list of edges that reference
//! it. Each edge names the child table, the child's foreign key field and the
//! [`CascadePolicy`] to apply when a parent row is removed.
//!
//! Graphs are built once (through [`DependencyGraph::builder`] or from YAML)
//! and are immutable afterwards. They are shared behind `Arc` by every engine
//! that uses them.
//!
//! # Edge Direction Convention
//!
//! Edges are keyed by the **referenced** table: an entry
//! `positions -> (schedule_assignments, position_id, delete)` means rows of
//! `schedule_assignments` point at `positions` through `position_id`, and
//! must be deleted when the position goes away.
//!
//! # YAML Form
//!
//! ```yaml
//! positions:
//!   - { table: schedule_assignments, field: position_id, policy: delete }
//!   - { table: salary_schemes, field: position_id, policy: set_null }
//! attendance_records: []
//! ```
//!
//! Declaration order is preserved, both for tables and for the edges under
//! each table.

use crate::domain::TableName;
use crate::error::{Error, Result};
use petgraph::algo;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::path::Path;

/// What happens to dependent rows when the referenced row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadePolicy {
    /// Cascade-delete the dependent rows
    Delete,

    /// Clear the referencing field and keep the rows
    SetNull,
}

impl fmt::Display for CascadePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CascadePolicy::Delete => write!(f, "delete"),
            CascadePolicy::SetNull => write!(f, "set_null"),
        }
    }
}

/// A reference from `table.field` back to the parent the edge is declared under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// Child table holding the foreign key
    pub table: TableName,

    /// Foreign key field on the child table
    pub field: String,

    /// Policy applied to matching child rows
    pub policy: CascadePolicy,
}

impl DependencyEdge {
    /// Create a new edge
    pub fn new(
        table: impl Into<TableName>,
        field: impl Into<String>,
        policy: CascadePolicy,
    ) -> Self {
        Self {
            table: table.into(),
            field: field.into(),
            policy,
        }
    }
}

impl fmt::Display for DependencyEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} ({})", self.table, self.field, self.policy)
    }
}

/// Immutable mapping from parent table to its ordered dependency edges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    entries: Vec<(TableName, Vec<DependencyEdge>)>,
    index: HashMap<TableName, usize>,
}

impl DependencyGraph {
    /// Start declaring a graph.
    pub fn builder() -> DependencyGraphBuilder {
        DependencyGraphBuilder::default()
    }

    /// Edges declared for `table`, in processing order.
    ///
    /// Returns an empty slice both for unknown tables and for tables declared
    /// without dependents; use [`has_entry`](Self::has_entry) to tell them apart.
    pub fn edges_for(&self, table: &str) -> &[DependencyEdge] {
        self.index
            .get(table)
            .map(|&idx| self.entries[idx].1.as_slice())
            .unwrap_or(&[])
    }

    /// Returns `true` if `table` has a declared entry, even an empty one.
    pub fn has_entry(&self, table: &str) -> bool {
        self.index.contains_key(table)
    }

    /// Distinct immediate child tables of `table`. Not transitive.
    pub fn child_tables(&self, table: &str) -> BTreeSet<TableName> {
        self.edges_for(table)
            .iter()
            .map(|edge| edge.table.clone())
            .collect()
    }

    /// Declared parent tables in declaration order.
    pub fn tables(&self) -> impl Iterator<Item = &TableName> {
        self.entries.iter().map(|(table, _)| table)
    }

    /// Declared entries with their edges, in declaration order.
    pub fn entries(&self) -> impl Iterator<Item = (&TableName, &[DependencyEdge])> {
        self.entries
            .iter()
            .map(|(table, edges)| (table, edges.as_slice()))
    }

    /// Number of declared parent tables.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no table is declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of edges across all tables.
    pub fn edge_count(&self) -> usize {
        self.entries.iter().map(|(_, edges)| edges.len()).sum()
    }

    /// Groups of tables that reference each other, directly or transitively.
    ///
    /// Each group is a strongly connected component of the table graph with
    /// more than one table, or a single table with an edge to itself. Cycles
    /// are legal; the engine's visited set keeps them from recursing forever.
    /// Groups and the names inside them are sorted.
    pub fn cyclic_groups(&self) -> Vec<Vec<TableName>> {
        let mut graph: DiGraph<&TableName, ()> = DiGraph::new();
        let mut nodes: HashMap<&TableName, NodeIndex> = HashMap::new();

        for (parent, edges) in &self.entries {
            let from = *nodes
                .entry(parent)
                .or_insert_with(|| graph.add_node(parent));
            for edge in edges {
                let to = *nodes
                    .entry(&edge.table)
                    .or_insert_with(|| graph.add_node(&edge.table));
                graph.update_edge(from, to, ());
            }
        }

        let mut groups: Vec<Vec<TableName>> = algo::tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
            .map(|scc| {
                let mut names: Vec<TableName> =
                    scc.iter().map(|node| (*graph[*node]).clone()).collect();
                names.sort();
                names
            })
            .collect();
        groups.sort();
        groups
    }

    /// Parse a graph from its YAML form.
    ///
    /// # Errors
    ///
    /// - `Error::Yaml` if the document is not valid YAML or an edge is malformed
    /// - `Error::Graph` if the top level is not a mapping or validation fails
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let document: Value = serde_yaml::from_str(yaml)?;
        let mut builder = Self::builder();

        let map = match document {
            Value::Null => Mapping::new(),
            Value::Mapping(map) => map,
            _ => {
                return Err(Error::Graph(
                    "expected a mapping of table names to edge lists".to_string(),
                ));
            }
        };

        for (key, edges) in map {
            let parent = match key {
                Value::String(parent) => parent,
                other => {
                    return Err(Error::Graph(format!(
                        "table names must be strings, found {other:?}"
                    )));
                }
            };
            builder = builder.table(parent.as_str());
            if edges.is_null() {
                continue;
            }
            let edges: Vec<DependencyEdge> = serde_yaml::from_value(edges)?;
            for edge in edges {
                builder = builder.edge(parent.as_str(), edge.table, edge.field, edge.policy);
            }
        }

        builder.build()
    }

    /// Load a graph from a YAML file.
    pub async fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_yaml_str(&content)
    }

    /// Serialize the graph to its YAML form, preserving declaration order.
    pub fn to_yaml_string(&self) -> Result<String> {
        let mut map = Mapping::new();
        for (parent, edges) in &self.entries {
            map.insert(
                Value::String(parent.to_string()),
                serde_yaml::to_value(edges)?,
            );
        }
        Ok(serde_yaml::to_string(&map)?)
    }
}

/// Builder for [`DependencyGraph`].
///
/// Tables are recorded in the order they are first mentioned as a parent.
#[derive(Debug, Default)]
pub struct DependencyGraphBuilder {
    entries: Vec<(TableName, Vec<DependencyEdge>)>,
}

impl DependencyGraphBuilder {
    /// Declare an entry for `parent` without adding edges.
    ///
    /// Leaf tables are declared this way so that they report a cascade
    /// configuration even though nothing references them.
    pub fn table(mut self, parent: impl Into<TableName>) -> Self {
        self.entry(parent.into());
        self
    }

    /// Append an edge under `parent`.
    pub fn edge(
        mut self,
        parent: impl Into<TableName>,
        child: impl Into<TableName>,
        field: impl Into<String>,
        policy: CascadePolicy,
    ) -> Self {
        self.entry(parent.into())
            .push(DependencyEdge::new(child, field, policy));
        self
    }

    fn entry(&mut self, parent: TableName) -> &mut Vec<DependencyEdge> {
        let idx = match self.entries.iter().position(|(table, _)| *table == parent) {
            Some(idx) => idx,
            None => {
                self.entries.push((parent, Vec::new()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx].1
    }

    /// Validate and freeze the graph.
    ///
    /// # Errors
    ///
    /// Returns `Error::Graph` if a table or field name is empty, or if the
    /// same `(child, field)` edge is declared twice under one parent.
    pub fn build(self) -> Result<DependencyGraph> {
        let mut index = HashMap::with_capacity(self.entries.len());

        for (idx, (parent, edges)) in self.entries.iter().enumerate() {
            if parent.as_str().trim().is_empty() {
                return Err(Error::Graph("table name cannot be empty".to_string()));
            }

            let mut seen = HashSet::new();
            for edge in edges {
                if edge.table.as_str().trim().is_empty() {
                    return Err(Error::Graph(format!(
                        "edge under '{parent}' has an empty child table"
                    )));
                }
                if edge.field.trim().is_empty() {
                    return Err(Error::Graph(format!(
                        "edge {parent} -> {} has an empty field name",
                        edge.table
                    )));
                }
                if !seen.insert((&edge.table, edge.field.as_str())) {
                    return Err(Error::Graph(format!(
                        "duplicate edge {parent} -> {}.{}",
                        edge.table, edge.field
                    )));
                }
            }

            index.insert(parent.clone(), idx);
        }

        Ok(DependencyGraph {
            entries: self.entries,
            index,
        })
    }
}
