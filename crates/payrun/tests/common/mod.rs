//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::process::{Command, Output};

/// Run the payrun binary in the specified directory with colors disabled
pub fn run_payrun_in_dir(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_payrun"))
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute payrun binary")
}

/// Initialize a payrun repository in `dir`, panicking on failure
pub fn init_repo(dir: &Path) {
    let output = run_payrun_in_dir(dir, &["init", "--quiet"]);
    assert!(
        output.status.success(),
        "Failed to initialize payrun: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Path of the records file inside an initialized repository
pub fn records_path(dir: &Path) -> std::path::PathBuf {
    dir.join(".payrun").join("records.jsonl")
}

/// Overwrite the records file with one JSON object per line
pub fn write_records(dir: &Path, records: &[serde_json::Value]) {
    let body: String = records.iter().map(|record| format!("{record}\n")).collect();
    std::fs::write(records_path(dir), body).expect("Failed to write records file");
}

/// Read every record line back as JSON
pub fn read_records(dir: &Path) -> Vec<serde_json::Value> {
    std::fs::read_to_string(records_path(dir))
        .expect("Failed to read records file")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("Saved line should be valid JSON"))
        .collect()
}

/// Find a record by table and id in a list read with [`read_records`]
pub fn find_record<'a>(
    records: &'a [serde_json::Value],
    table: &str,
    id: &str,
) -> Option<&'a serde_json::Value> {
    records
        .iter()
        .find(|record| record["table"] == table && record["id"] == id)
}

/// A position with two schedule assignments, a salary scheme and an employee
pub fn position_scenario() -> Vec<serde_json::Value> {
    use serde_json::json;
    vec![
        json!({"table": "positions", "id": "pos-1", "fields": {"title": "Cashier"}}),
        json!({"table": "positions", "id": "pos-2", "fields": {"title": "Manager"}}),
        json!({"table": "schedule_assignments", "id": "sa-1", "fields": {"position_id": "pos-1"}}),
        json!({"table": "schedule_assignments", "id": "sa-2", "fields": {"position_id": "pos-1"}}),
        json!({"table": "schedule_assignments", "id": "sa-3", "fields": {"position_id": "pos-2"}}),
        json!({"table": "salary_schemes", "id": "ss-1", "fields": {"position_id": "pos-1"}}),
        json!({
            "table": "employees",
            "id": "emp-1",
            "fields": {"position_id": "pos-1", "name": "Ada"}
        }),
    ]
}
