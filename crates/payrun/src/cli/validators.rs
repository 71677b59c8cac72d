//! CLI input validation functions.
//!
//! These validators are used by clap's `value_parser` attribute to validate
//! user input at parse time, providing immediate feedback for invalid values.

/// Validate a table name.
///
/// Any non-empty name without whitespace is accepted, matching what a
/// dependency graph file may declare (`schedule_assignments`, `leave-types`).
pub fn validate_table_name(s: &str) -> Result<String, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("Table name cannot be empty".to_string());
    }

    if s.chars().any(char::is_whitespace) {
        return Err(format!("Invalid table name: '{s}'. Table names cannot contain whitespace"));
    }

    Ok(s.to_string())
}

/// Validate a record identifier.
///
/// Identifiers are opaque, so only emptiness and embedded whitespace are
/// rejected.
pub fn validate_record_id(s: &str) -> Result<String, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("Record ID cannot be empty".to_string());
    }

    if s.chars().any(char::is_whitespace) {
        return Err(format!("Record ID cannot contain whitespace: '{s}'"));
    }

    Ok(s.to_string())
}
