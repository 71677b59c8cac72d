//! Argument structs for each subcommand.

use super::validators::{validate_record_id, validate_table_name};
use clap::Parser;

/// Arguments for the `init` command
#[derive(Parser, Debug, Clone)]
pub struct InitArgs {
    /// Suppress output messages
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the `delete` command
#[derive(Parser, Debug, Clone)]
pub struct DeleteArgs {
    /// Table holding the record (e.g. positions)
    #[arg(value_parser = validate_table_name)]
    pub table: String,

    /// Identifier of the record to delete
    #[arg(value_parser = validate_record_id)]
    pub id: String,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for the `deps` command
#[derive(Parser, Debug, Clone)]
pub struct DepsArgs {
    /// Table whose dependents to show
    #[arg(value_parser = validate_table_name)]
    pub table: String,
}

/// Arguments for the `graph` command
#[derive(Parser, Debug, Clone)]
pub struct GraphArgs {
    /// Print the graph in its YAML form (usable as `cascade.graph-file`).
    /// Takes precedence over `--json`.
    #[arg(long)]
    pub yaml: bool,
}
