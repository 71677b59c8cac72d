//! Command execution logic.
//!
//! This module contains the implementation of all CLI commands.

use anyhow::Result;
use std::io::{self, BufRead, Write};

use super::args::{DeleteArgs, DepsArgs, GraphArgs, InitArgs};
use crate::app::App;
use crate::output::{self, OutputConfig, OutputMode};
use payrun_cascade::CascadeOutcome;
use payrun_cascade::domain::{RecordId, RecordRef, TableName};

/// Execute the init command
pub async fn execute_init(args: &InitArgs) -> Result<()> {
    use crate::commands::init;

    let current_dir = std::env::current_dir()?;

    if !args.quiet {
        println!("Initializing payrun repository...");
    }

    let result = init::init(&current_dir).await?;

    if !args.quiet {
        let config = OutputConfig::from_env();
        println!(
            "{}",
            output::success(
                &format!("Initialized payrun in {}", result.payrun_dir.display()),
                config
            )
        );
        println!("  Config:  {}", result.config_file.display());
        println!("  Records: {}", result.records_file.display());
    }

    Ok(())
}

/// Ask a yes/no question on stderr, reading the answer from `input`.
///
/// Anything other than `y` or `yes` (case-insensitive) is a no.
pub fn confirm<R: BufRead>(prompt: &str, input: &mut R) -> io::Result<bool> {
    eprint!("{prompt} [y/N]: ");
    io::stderr().flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

/// Execute the delete command
///
/// Runs the cascade and saves the store, including when the root delete
/// fails: dependents already handled stay handled, and a re-run finishes
/// the job.
pub async fn execute_delete<R: BufRead>(
    app: &App,
    args: &DeleteArgs,
    output_mode: OutputMode,
    input: &mut R,
) -> Result<()> {
    let table = TableName::new(&args.table);
    let id = RecordId::new(&args.id);
    let root = RecordRef::new(table.clone(), id.clone());

    if app.store().store().get(table.as_str(), id.as_str()).await.is_none() {
        return Err(payrun_cascade::Error::not_found(&table, &id).into());
    }

    if !app.engine().has_cascade_config(table.as_str()) {
        tracing::warn!(%table, "No cascade configuration; only the record itself will be deleted");
        if output_mode == OutputMode::Text {
            eprintln!(
                "{}",
                output::warning(
                    &format!(
                        "Warning: table '{table}' has no cascade configuration; \
                         dependents will not be handled"
                    ),
                    OutputConfig::from_env()
                )
            );
        }
    }

    if !args.force {
        let dependents = app.engine().get_dependent_tables(table.as_str());
        let prompt = if dependents.is_empty() {
            format!("Delete {root}?")
        } else {
            let names: Vec<&str> = dependents.iter().map(TableName::as_str).collect();
            format!("Delete {root} and its dependents in {}?", names.join(", "))
        };
        if !confirm(&prompt, input)? {
            println!("Deletion cancelled.");
            return Ok(());
        }
    }

    let outcome = app.engine().cascade_delete(&table, &id).await;
    app.save().await?;
    let result = outcome?;

    match output_mode {
        OutputMode::Json => {
            let status = match result.outcome() {
                CascadeOutcome::Complete => "success",
                CascadeOutcome::Partial => "partial",
            };
            output::print_json(&serde_json::json!({
                "deleted": root.to_string(),
                "status": status,
                "result": result,
            }))?;
        }
        OutputMode::Text => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            output::write_cascade_result(
                &mut handle,
                &root.to_string(),
                &result,
                OutputConfig::from_env(),
            )?;
        }
    }

    Ok(())
}

/// Execute the deps command
pub async fn execute_deps(app: &App, args: &DepsArgs, output_mode: OutputMode) -> Result<()> {
    let engine = app.engine();
    let configured = engine.has_cascade_config(&args.table);
    let edges = engine.graph().edges_for(&args.table);
    let dependents = engine.get_dependent_tables(&args.table);

    match output_mode {
        OutputMode::Json => {
            output::print_json(&serde_json::json!({
                "table": args.table,
                "configured": configured,
                "dependent_tables": dependents,
                "edges": edges,
            }))?;
        }
        OutputMode::Text => {
            let config = OutputConfig::from_env();
            if !configured {
                println!(
                    "{}",
                    output::warning(
                        &format!("No cascade configuration for '{}'", args.table),
                        config
                    )
                );
            } else if edges.is_empty() {
                println!("Nothing depends on {}", output::info(&args.table, config));
            } else {
                println!("{} is referenced by:", output::info(&args.table, config));
                for edge in edges {
                    println!("  {}", output::format_edge(edge, config));
                }
            }
        }
    }

    Ok(())
}

/// Execute the graph command
pub async fn execute_graph(app: &App, args: &GraphArgs, output_mode: OutputMode) -> Result<()> {
    let graph = app.engine().graph();
    let cyclic_groups = graph.cyclic_groups();

    if args.yaml {
        print!("{}", graph.to_yaml_string()?);
        return Ok(());
    }

    match output_mode {
        OutputMode::Json => {
            let tables: Vec<serde_json::Value> = graph
                .entries()
                .map(|(table, edges)| serde_json::json!({ "table": table, "edges": edges }))
                .collect();
            output::print_json(&serde_json::json!({
                "tables": tables,
                "edge_count": graph.edge_count(),
                "cyclic_groups": cyclic_groups,
            }))?;
        }
        OutputMode::Text => {
            let config = OutputConfig::from_env();
            for (table, edges) in graph.entries() {
                if edges.is_empty() {
                    println!("{} (leaf)", output::info(table.as_str(), config));
                    continue;
                }
                println!("{}", output::info(table.as_str(), config));
                for edge in edges {
                    println!("  {}", output::format_edge(edge, config));
                }
            }

            println!();
            println!("{} tables, {} edges", graph.len(), graph.edge_count());
            for group in &cyclic_groups {
                let names: Vec<&str> = group.iter().map(TableName::as_str).collect();
                println!(
                    "{} {}",
                    output::warning("Cycle:", config),
                    names.join(" <-> ")
                );
            }
        }
    }

    Ok(())
}
