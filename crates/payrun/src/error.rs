//! Error types for payrun CLI operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The error type for payrun operations.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Cascade engine or record store error.
    #[error(transparent)]
    Cascade(#[from] payrun_cascade::Error),
}

/// Problems locating, reading or validating the `.payrun/` configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No `.payrun/` directory in the working directory or any parent.
    #[error("Not a payrun repository (or any parent directory). Run 'payrun init' first.")]
    NotInitialized,

    /// `init` found an existing `.payrun/` directory.
    #[error("Payrun is already initialized in this directory. Found existing '{}'", .0.display())]
    AlreadyInitialized(PathBuf),

    /// The config file could not be parsed or serialized.
    #[error("Invalid configuration: {0}")]
    Parse(String),

    /// `cascade.max-depth` must be at least 1.
    #[error("cascade.max-depth must be at least 1")]
    InvalidMaxDepth,
}

/// A specialized Result type for payrun operations.
pub type Result<T> = std::result::Result<T, Error>;
