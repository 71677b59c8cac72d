//! Implementation of the `init` command and the configuration it writes.
//!
//! This module handles initialization of a new payrun repository, creating
//! the `.payrun/` directory with a configuration file and an empty record
//! file, and locating that directory again from any subdirectory.

use crate::error::{ConfigError, Result};
use payrun_cascade::engine::{DepthPolicy, EngineConfig, MAX_DEPTH};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Name of the payrun directory
pub const PAYRUN_DIR_NAME: &str = ".payrun";

/// Name of the configuration file
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Name of the records data file
pub const RECORDS_FILE_NAME: &str = "records.jsonl";

/// Maximum directory depth to traverse when searching for payrun root
pub const MAX_TRAVERSAL_DEPTH: usize = 256;

/// Configuration file structure for payrun
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub struct PayrunConfig {
    /// Storage configuration
    pub storage: StorageConfig,

    /// Cascade engine configuration
    #[serde(default)]
    pub cascade: CascadeConfig,
}

/// Storage configuration section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct StorageConfig {
    /// Path to the records file, relative to the repository root
    pub data_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_file: format!("{PAYRUN_DIR_NAME}/{RECORDS_FILE_NAME}"),
        }
    }
}

/// Cascade configuration section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct CascadeConfig {
    /// Deepest recursion level the engine will process
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// What to do with branches deeper than `max_depth`
    #[serde(default)]
    pub depth_policy: DepthPolicy,

    /// Optional YAML dependency graph replacing the built-in schema,
    /// relative to the repository root
    #[serde(default)]
    pub graph_file: Option<String>,
}

fn default_max_depth() -> usize {
    MAX_DEPTH
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
            depth_policy: DepthPolicy::default(),
            graph_file: None,
        }
    }
}

impl CascadeConfig {
    /// Convert to the engine's configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidMaxDepth` if `max_depth` is 0.
    pub fn to_engine_config(&self) -> Result<EngineConfig> {
        if self.max_depth == 0 {
            return Err(ConfigError::InvalidMaxDepth.into());
        }
        Ok(EngineConfig {
            max_depth: self.max_depth,
            depth_policy: self.depth_policy,
        })
    }
}

impl PayrunConfig {
    /// Load configuration from a file
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        let config: Self =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.cascade.to_engine_config()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Parse(format!("YAML error: {e}")))?;
        fs::write(path, content).await?;
        Ok(())
    }
}

/// Result of the init command
#[derive(Debug)]
pub struct InitResult {
    /// Path to the created payrun directory
    pub payrun_dir: PathBuf,
    /// Path to the created config file
    pub config_file: PathBuf,
    /// Path to the created records file
    pub records_file: PathBuf,
}

/// Initialize a new payrun repository in the given directory.
///
/// # Errors
///
/// Returns an error if:
/// - The `.payrun/` directory already exists
/// - File system operations fail
pub async fn init(base_dir: &Path) -> Result<InitResult> {
    let payrun_dir = base_dir.join(PAYRUN_DIR_NAME);

    if payrun_dir.exists() {
        return Err(ConfigError::AlreadyInitialized(payrun_dir).into());
    }

    fs::create_dir_all(&payrun_dir).await?;

    let config_file = payrun_dir.join(CONFIG_FILE_NAME);
    PayrunConfig::default().save(&config_file).await?;

    let records_file = payrun_dir.join(RECORDS_FILE_NAME);
    fs::write(&records_file, "").await?;

    tracing::debug!(path = %payrun_dir.display(), "Initialized payrun repository");

    Ok(InitResult {
        payrun_dir,
        config_file,
        records_file,
    })
}

/// Find the payrun root directory by searching up the directory tree.
///
/// Returns the directory containing `.payrun/`, or `None` if none is found
/// before the filesystem root or the traversal limit.
pub fn find_payrun_root(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    let mut depth = 0;

    loop {
        if current.join(PAYRUN_DIR_NAME).is_dir() {
            return Some(current);
        }

        depth += 1;
        if depth > MAX_TRAVERSAL_DEPTH || !current.pop() {
            return None;
        }
    }
}
