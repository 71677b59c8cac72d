//! CLI argument parsing and command dispatch.
//!
//! This module provides the command-line interface for payrun using clap's
//! derive API.
//!
//! # Commands
//!
//! - `init`: Initialize a new payrun repository
//! - `delete`: Cascade-delete a record and everything that depends on it
//! - `deps`: Show the tables that reference a table
//! - `graph`: Show the whole dependency graph
//!
//! # Global Flags
//!
//! - `--json`: Output in JSON format (applies to all commands)
//!
//! # Example
//!
//! ```bash
//! payrun init
//! payrun deps positions
//! payrun delete positions 6f1c2a9e-4b7d-4e0a-9c1e-2d3f4a5b6c7d --force
//! payrun --json graph
//! ```

mod args;
mod execute;
mod validators;

use anyhow::Result;
use clap::{Parser, Subcommand};

pub use args::{DeleteArgs, DepsArgs, GraphArgs, InitArgs};
pub use execute::{confirm, execute_delete, execute_deps, execute_graph, execute_init};
pub use validators::{validate_record_id, validate_table_name};

/// Payrun - HR/payroll record administration
///
/// Records live in `.payrun/records.jsonl`. Deleting a record also deletes or
/// detaches every record that references it, following the dependency graph.
#[derive(Parser, Debug)]
#[command(name = "payrun")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format for programmatic use
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Initialize a new payrun repository
    ///
    /// Creates the `.payrun/` directory with configuration and an empty
    /// record file.
    Init(InitArgs),

    /// Delete a record and everything that depends on it
    ///
    /// Dependent records are deleted or detached according to the dependency
    /// graph before the record itself is removed. Use `--force` to skip
    /// confirmation.
    Delete(DeleteArgs),

    /// Show the tables that reference a table
    Deps(DepsArgs),

    /// Show the dependency graph and any cyclic table groups
    Graph(GraphArgs),
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }

    /// Parse CLI arguments from an iterator (for testing)
    pub fn try_parse_from<I, T>(iter: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }

    /// Execute the CLI command
    pub async fn execute(&self) -> Result<()> {
        use crate::app::App;
        use crate::output::OutputMode;

        let output_mode = if self.json {
            OutputMode::Json
        } else {
            OutputMode::Text
        };

        match &self.command {
            Some(Commands::Init(args)) => execute::execute_init(args).await,
            Some(Commands::Delete(args)) => {
                let app = App::from_directory(&std::env::current_dir()?).await?;
                let mut stdin = std::io::BufReader::new(std::io::stdin());
                execute::execute_delete(&app, args, output_mode, &mut stdin).await
            }
            Some(Commands::Deps(args)) => {
                let app = App::from_directory(&std::env::current_dir()?).await?;
                execute::execute_deps(&app, args, output_mode).await
            }
            Some(Commands::Graph(args)) => {
                let app = App::from_directory(&std::env::current_dir()?).await?;
                execute::execute_graph(&app, args, output_mode).await
            }
            None => {
                println!("Payrun record administration");
                println!("Use --help for more information");
                Ok(())
            }
        }
    }
}
