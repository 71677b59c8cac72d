//! The built-in HR/payroll dependency schema.
//!
//! Each entry lists, for a parent table, the child tables holding a
//! reference to it and what happens to those rows when the parent goes away.
//! Edges are processed in the order they are declared here.

use payrun_cascade::Result;
use payrun_cascade::graph::{CascadePolicy, DependencyGraph};

use CascadePolicy::{Delete, SetNull};

/// Tables that nothing references. Declared so they count as configured.
const LEAF_TABLES: [&str; 5] = [
    "attendance_records",
    "leave_requests",
    "payroll_line_items",
    "salary_adjustments",
    "schedule_change_requests",
];

/// Build the payroll dependency graph.
///
/// # Errors
///
/// Only fails if the declaration below is itself invalid.
pub fn payroll_graph() -> Result<DependencyGraph> {
    let builder = DependencyGraph::builder()
        // ========== Organisation ==========
        .edge("departments", "positions", "department_id", Delete)
        .edge("departments", "employees", "department_id", SetNull)
        .edge("positions", "schedule_assignments", "position_id", Delete)
        .edge("positions", "salary_schemes", "position_id", SetNull)
        .edge("positions", "employees", "position_id", SetNull)
        // ========== People ==========
        .edge("employees", "attendance_records", "employee_id", Delete)
        .edge("employees", "leave_requests", "employee_id", Delete)
        .edge("employees", "payroll_entries", "employee_id", Delete)
        .edge("employees", "salary_adjustments", "employee_id", Delete)
        .edge("employees", "schedule_assignments", "employee_id", Delete)
        .edge("employees", "schedule_change_requests", "requester_id", Delete)
        .edge("employees", "schedule_change_requests", "substitute_id", SetNull)
        .edge("employees", "employees", "manager_id", SetNull)
        // ========== Scheduling ==========
        .edge("work_schedules", "schedule_assignments", "schedule_id", Delete)
        .edge(
            "work_schedules",
            "schedule_change_requests",
            "requested_schedule_id",
            SetNull,
        )
        .edge(
            "schedule_assignments",
            "schedule_change_requests",
            "assignment_id",
            Delete,
        )
        .edge("schedule_assignments", "attendance_records", "assignment_id", SetNull)
        // ========== Compensation ==========
        .edge("salary_schemes", "employees", "salary_scheme_id", SetNull)
        .edge("payroll_periods", "payroll_entries", "period_id", Delete)
        .edge("payroll_entries", "payroll_line_items", "entry_id", Delete)
        .edge("leave_types", "leave_requests", "leave_type_id", Delete);

    LEAF_TABLES
        .iter()
        .fold(builder, |builder, table| builder.table(*table))
        .build()
}
