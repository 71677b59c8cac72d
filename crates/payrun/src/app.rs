//! Application context for CLI command execution.
//!
//! This module provides the `App` struct that owns the record store, the
//! dependency graph and the cascade engine wired over them.
//!
//! # Example
//!
//! ```no_run
//! use payrun::app::App;
//! use std::path::Path;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let app = App::from_directory(Path::new(".")).await?;
//!     println!("{} tables configured", app.engine().graph().len());
//!     Ok(())
//! }
//! ```

use crate::commands::init::{CONFIG_FILE_NAME, PAYRUN_DIR_NAME, PayrunConfig, find_payrun_root};
use crate::error::{ConfigError, Result};
use crate::schema::payroll_graph;
use payrun_cascade::CascadeEngine;
use payrun_cascade::graph::DependencyGraph;
use payrun_cascade::store::JsonlBackedStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Application context for CLI operations.
///
/// The store is loaded from the configured JSONL file on creation. Cascades
/// run against memory; nothing reaches the file until [`save`](Self::save).
pub struct App {
    /// File-backed record store, shared with the engine
    store: Arc<JsonlBackedStore>,

    /// Engine over `store` and the configured dependency graph
    engine: CascadeEngine,

    /// Path to the payrun directory (.payrun)
    payrun_dir: PathBuf,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("payrun_dir", &self.payrun_dir)
            .field("data_file", &self.store.path())
            .field("engine", &self.engine)
            .finish()
    }
}

impl App {
    /// Create an App instance from the given working directory.
    ///
    /// Searches up the directory tree for `.payrun/`, loads its
    /// configuration, opens the record file and builds the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No payrun repository is found in the directory tree
    /// - Configuration cannot be loaded or is invalid
    /// - The record file or a configured graph file cannot be read
    pub async fn from_directory(working_dir: &Path) -> Result<Self> {
        let root_dir = find_payrun_root(working_dir).ok_or(ConfigError::NotInitialized)?;

        let payrun_dir = root_dir.join(PAYRUN_DIR_NAME);
        let config = PayrunConfig::load(&payrun_dir.join(CONFIG_FILE_NAME)).await?;
        let engine_config = config.cascade.to_engine_config()?;

        let graph = match &config.cascade.graph_file {
            Some(graph_file) => {
                let path = root_dir.join(graph_file);
                tracing::debug!(path = %path.display(), "Loading dependency graph");
                DependencyGraph::from_yaml_file(&path).await?
            }
            None => payroll_graph()?,
        };
        for group in graph.cyclic_groups() {
            let tables: Vec<&str> = group.iter().map(|t| t.as_str()).collect();
            tracing::debug!(tables = ?tables, "Cyclic table group");
        }

        let data_file = root_dir.join(&config.storage.data_file);
        let store = Arc::new(JsonlBackedStore::open(data_file).await?);
        let engine = CascadeEngine::new(Arc::new(graph), store.clone()).with_config(engine_config);

        Ok(Self {
            store,
            engine,
            payrun_dir,
        })
    }

    /// The cascade engine.
    pub fn engine(&self) -> &CascadeEngine {
        &self.engine
    }

    /// The file-backed record store.
    pub fn store(&self) -> &JsonlBackedStore {
        &self.store
    }

    /// Get the path to the payrun directory.
    pub fn payrun_dir(&self) -> &Path {
        &self.payrun_dir
    }

    /// Save store state to the record file.
    ///
    /// This should be called after any mutating operations.
    pub async fn save(&self) -> Result<()> {
        Ok(self.store.save().await?)
    }
}
