//! Output formatting for CLI commands.
//!
//! Every command prints either human-readable text or, with `--json`, a
//! single pretty-printed JSON document for programmatic use.
//!
//! Semantic Color Theme:
//!   - Success: green  (completed cascades, created files)
//!   - Warning: yellow (skipped edges, truncated branches, set_null edges)
//!   - Error:   red    (delete edges)
//!   - Info:    cyan   (table names and record references)
//!   - Muted:   dimmed (field names)

use colored::Colorize;
use payrun_cascade::engine::{CascadeOutcome, CascadeResult};
use payrun_cascade::graph::{CascadePolicy, DependencyEdge};
use serde::Serialize;
use std::env;
use std::io::{self, Write};

/// Output format mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable text format
    Text,
    /// JSON format for programmatic use
    Json,
}

/// Configuration for text output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    /// Whether to use colors in output.
    pub use_colors: bool,
}

impl OutputConfig {
    /// Create an OutputConfig by reading from environment variables.
    ///
    /// Reads:
    /// - `NO_COLOR`: Standard env var to disable colors (any value disables colors)
    /// - `PAYRUN_COLOR`: Set to "0" or "false" to disable colors (default: true)
    pub fn from_env() -> Self {
        let use_colors = env::var("NO_COLOR").is_err()
            && env::var("PAYRUN_COLOR")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true);
        Self { use_colors }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { use_colors: true }
    }
}

// ============================================================================
// Color Helpers
// ============================================================================

/// Apply semantic "success" color (green) to text.
pub fn success(text: &str, config: OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.green().to_string()
}

/// Apply semantic "warning" color (yellow) to text.
pub fn warning(text: &str, config: OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.yellow().to_string()
}

/// Apply semantic "info" color (cyan) to text.
pub fn info(text: &str, config: OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.cyan().to_string()
}

fn dimmed(text: &str, config: OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.dimmed().to_string()
}

fn colorize_policy(policy: CascadePolicy, config: OutputConfig) -> String {
    let text = policy.to_string();
    if !config.use_colors {
        return text;
    }
    match policy {
        CascadePolicy::Delete => text.red().to_string(),
        CascadePolicy::SetNull => text.yellow().to_string(),
    }
}

// ============================================================================
// Printing
// ============================================================================

/// Print a JSON-formatted result for any serializable value
pub fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(handle, "{json}")
}

/// Format one edge as `child.field (policy)`.
pub fn format_edge(edge: &DependencyEdge, config: OutputConfig) -> String {
    format!(
        "{}.{} ({})",
        info(edge.table.as_str(), config),
        dimmed(&edge.field, config),
        colorize_policy(edge.policy, config)
    )
}

/// Write the text summary of a finished cascade.
pub fn write_cascade_result<W: Write>(
    w: &mut W,
    root: &str,
    result: &CascadeResult,
    config: OutputConfig,
) -> io::Result<()> {
    let headline = format!("Deleted {root}");
    match result.outcome() {
        CascadeOutcome::Complete => writeln!(w, "{}", success(&headline, config))?,
        CascadeOutcome::Partial => {
            writeln!(w, "{} {}", warning(&headline, config), warning("(partial)", config))?;
        }
    }

    writeln!(w, "  Records deleted:  {}", result.deleted_count)?;
    writeln!(w, "  Records detached: {}", result.nullified_count)?;

    let tables: Vec<String> = result
        .deleted_tables
        .iter()
        .map(|table| info(table.as_str(), config))
        .collect();
    writeln!(w, "  Tables touched:   {}", tables.join(", "))?;

    if !result.skipped_edges.is_empty() {
        writeln!(w)?;
        writeln!(w, "{}", warning("Skipped edges:", config))?;
        for skipped in &result.skipped_edges {
            writeln!(
                w,
                "  {} -> {}.{}: {}",
                info(&skipped.parent.to_string(), config),
                skipped.table,
                skipped.field,
                skipped.reason
            )?;
        }
    }

    if !result.truncated.is_empty() {
        writeln!(w)?;
        writeln!(
            w,
            "{}",
            warning("Depth limit reached; left in place:", config)
        )?;
        for record in &result.truncated {
            writeln!(w, "  {}", info(&record.to_string(), config))?;
        }
    }

    Ok(())
}
