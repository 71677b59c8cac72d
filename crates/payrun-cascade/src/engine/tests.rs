use super::*;

use crate::domain::Record;
use crate::store::InMemoryStore;
use crate::testing::{Call, FaultyClient, Operation, RecordingClient};
use rstest::rstest;

// ========== Fixtures ==========

fn t(name: &str) -> TableName {
    TableName::new(name)
}

fn id(value: &str) -> RecordId {
    RecordId::new(value)
}

/// A slice of the HR schema rooted at positions.
fn positions_graph() -> DependencyGraph {
    DependencyGraph::builder()
        .edge("positions", "schedule_assignments", "position_id", CascadePolicy::Delete)
        .edge("positions", "salary_schemes", "position_id", CascadePolicy::SetNull)
        .edge("positions", "employees", "position_id", CascadePolicy::SetNull)
        .edge(
            "schedule_assignments",
            "schedule_change_requests",
            "assignment_id",
            CascadePolicy::Delete,
        )
        .edge(
            "schedule_assignments",
            "attendance_records",
            "assignment_id",
            CascadePolicy::SetNull,
        )
        .build()
        .unwrap()
}

async fn seed_positions(store: &InMemoryStore) {
    store.insert("positions", Record::new("pos-1")).await;
    store.insert("positions", Record::new("pos-2")).await;
    store
        .insert("schedule_assignments", Record::new("sa-1").with_field("position_id", "pos-1"))
        .await;
    store
        .insert("schedule_assignments", Record::new("sa-2").with_field("position_id", "pos-1"))
        .await;
    store
        .insert("schedule_assignments", Record::new("sa-3").with_field("position_id", "pos-2"))
        .await;
    store
        .insert("salary_schemes", Record::new("ss-1").with_field("position_id", "pos-1"))
        .await;
    store
        .insert("employees", Record::new("emp-1").with_field("position_id", "pos-1"))
        .await;
    store
        .insert(
            "schedule_change_requests",
            Record::new("scr-1").with_field("assignment_id", "sa-1"),
        )
        .await;
    store
        .insert("attendance_records", Record::new("att-1").with_field("assignment_id", "sa-2"))
        .await;
}

/// Self-referencing chain `n0 <- n1 <- ... <- n{len-1}` via `parent_id`.
async fn chain(len: usize) -> (DependencyGraph, InMemoryStore) {
    let graph = DependencyGraph::builder()
        .edge("nodes", "nodes", "parent_id", CascadePolicy::Delete)
        .build()
        .unwrap();
    let store = InMemoryStore::new();
    store.insert("nodes", Record::new("n0")).await;
    for i in 1..len {
        store
            .insert(
                "nodes",
                Record::new(format!("n{i}")).with_field("parent_id", format!("n{}", i - 1)),
            )
            .await;
    }
    (graph, store)
}

fn engine(graph: DependencyGraph, client: Arc<dyn RecordClient>) -> CascadeEngine {
    CascadeEngine::new(Arc::new(graph), client)
}

// ========== Happy Path ==========

#[tokio::test]
async fn test_cascade_deletes_dependents_and_detaches_nullable_refs() {
    let store = InMemoryStore::new();
    seed_positions(&store).await;
    let engine = engine(positions_graph(), Arc::new(store.clone()));

    let result = engine.cascade_delete(&t("positions"), &id("pos-1")).await.unwrap();

    assert_eq!(result.deleted_count, 4);
    assert_eq!(result.nullified_count, 3);
    assert_eq!(result.outcome(), CascadeOutcome::Complete);
    assert_eq!(
        result.deleted_tables,
        vec![
            t("schedule_change_requests"),
            t("schedule_assignments"),
            t("attendance_records"),
            t("salary_schemes"),
            t("employees"),
            t("positions"),
        ]
    );

    assert!(store.get("positions", "pos-1").await.is_none());
    assert!(store.get("schedule_assignments", "sa-1").await.is_none());
    assert!(store.get("schedule_assignments", "sa-2").await.is_none());
    assert!(store.get("schedule_change_requests", "scr-1").await.is_none());

    // Unrelated rows survive.
    assert!(store.get("positions", "pos-2").await.is_some());
    assert!(store.get("schedule_assignments", "sa-3").await.is_some());
}

#[tokio::test]
async fn test_set_null_keeps_rows_with_cleared_field() {
    let store = InMemoryStore::new();
    seed_positions(&store).await;
    let engine = engine(positions_graph(), Arc::new(store.clone()));

    engine.cascade_delete(&t("positions"), &id("pos-1")).await.unwrap();

    let scheme = store.get("salary_schemes", "ss-1").await.unwrap();
    assert!(scheme.is_null("position_id"));
    let employee = store.get("employees", "emp-1").await.unwrap();
    assert!(employee.is_null("position_id"));
    let attendance = store.get("attendance_records", "att-1").await.unwrap();
    assert!(attendance.is_null("assignment_id"));
}

#[tokio::test]
async fn test_children_deleted_before_parents() {
    let store = InMemoryStore::new();
    seed_positions(&store).await;
    let recording = Arc::new(RecordingClient::new(Arc::new(store.clone())));
    let engine = engine(positions_graph(), recording.clone());

    engine.cascade_delete(&t("positions"), &id("pos-1")).await.unwrap();

    let root = recording.delete_one_position("positions", "pos-1").await.unwrap();
    let sa1 = recording.delete_one_position("schedule_assignments", "sa-1").await.unwrap();
    let sa2 = recording.delete_one_position("schedule_assignments", "sa-2").await.unwrap();
    let scr1 = recording
        .delete_one_position("schedule_change_requests", "scr-1")
        .await
        .unwrap();

    assert!(scr1 < sa1);
    assert!(sa1 < root);
    assert!(sa2 < root);

    let calls = recording.calls().await;
    assert_eq!(calls.last(), Some(&Call::DeleteOne {
        table: t("positions"),
        id: id("pos-1"),
    }));
}

#[tokio::test]
async fn test_redundant_bulk_delete_is_issued_and_tolerated() {
    let store = InMemoryStore::new();
    seed_positions(&store).await;
    let recording = Arc::new(RecordingClient::new(Arc::new(store.clone())));
    let engine = engine(positions_graph(), recording.clone());

    let result = engine.cascade_delete(&t("positions"), &id("pos-1")).await.unwrap();

    assert!(result.skipped_edges.is_empty());
    assert!(recording.calls_of(Operation::DeleteMany).await.contains(&Call::DeleteMany {
        table: t("schedule_assignments"),
        ids: vec![id("sa-1"), id("sa-2")],
    }));
}

#[tokio::test]
async fn test_edges_processed_in_declared_order() {
    let store = InMemoryStore::new();
    seed_positions(&store).await;
    let recording = Arc::new(RecordingClient::new(Arc::new(store.clone())));
    let engine = engine(positions_graph(), recording.clone());

    engine.cascade_delete(&t("positions"), &id("pos-1")).await.unwrap();

    let root_finds: Vec<TableName> = recording
        .calls_of(Operation::FindByField)
        .await
        .into_iter()
        .filter_map(|call| match call {
            Call::FindByField { table, value, .. } if value.as_str() == "pos-1" => Some(table),
            _ => None,
        })
        .collect();
    assert_eq!(
        root_finds,
        vec![t("schedule_assignments"), t("salary_schemes"), t("employees")]
    );
}

#[tokio::test]
async fn test_two_edges_into_same_child_table_are_both_honored() {
    let graph = DependencyGraph::builder()
        .edge("employees", "schedule_change_requests", "requester_id", CascadePolicy::Delete)
        .edge("employees", "schedule_change_requests", "substitute_id", CascadePolicy::SetNull)
        .build()
        .unwrap();
    let store = InMemoryStore::new();
    store.insert("employees", Record::new("emp-1")).await;
    store
        .insert(
            "schedule_change_requests",
            Record::new("scr-a").with_field("requester_id", "emp-1"),
        )
        .await;
    store
        .insert(
            "schedule_change_requests",
            Record::new("scr-b")
                .with_field("requester_id", "emp-2")
                .with_field("substitute_id", "emp-1"),
        )
        .await;
    store
        .insert(
            "schedule_change_requests",
            Record::new("scr-c")
                .with_field("requester_id", "emp-1")
                .with_field("substitute_id", "emp-1"),
        )
        .await;
    let engine = engine(graph, Arc::new(store.clone()));

    let result = engine.cascade_delete(&t("employees"), &id("emp-1")).await.unwrap();

    assert_eq!(result.deleted_count, 3);
    assert_eq!(result.nullified_count, 1);
    assert!(store.get("schedule_change_requests", "scr-a").await.is_none());
    assert!(store.get("schedule_change_requests", "scr-c").await.is_none());
    let survivor = store.get("schedule_change_requests", "scr-b").await.unwrap();
    assert!(survivor.is_null("substitute_id"));
    assert!(!survivor.is_null("requester_id"));
}

#[tokio::test]
async fn test_table_without_entry_deletes_only_the_record() {
    let store = InMemoryStore::new();
    store.insert("departments", Record::new("dep-1")).await;
    store
        .insert("positions", Record::new("pos-1").with_field("department_id", "dep-1"))
        .await;
    let engine = engine(positions_graph(), Arc::new(store.clone()));

    assert!(!engine.has_cascade_config("departments"));
    let result = engine.cascade_delete(&t("departments"), &id("dep-1")).await.unwrap();

    assert_eq!(result.deleted_count, 1);
    assert_eq!(result.deleted_tables, vec![t("departments")]);
    assert!(store.get("positions", "pos-1").await.is_some());
}

#[tokio::test]
async fn test_missing_root_is_delete_failed() {
    let engine = engine(positions_graph(), Arc::new(InMemoryStore::new()));

    let err = engine
        .cascade_delete(&t("positions"), &id("ghost"))
        .await
        .unwrap_err();

    match err {
        Error::DeleteFailed { table, id, source } => {
            assert_eq!(table.as_str(), "positions");
            assert_eq!(id.as_str(), "ghost");
            assert!(matches!(*source, Error::NotFound { .. }));
        }
        other => panic!("expected DeleteFailed, got {other:?}"),
    }
}

// ========== Cycles ==========

#[tokio::test]
async fn test_mutual_delete_cycle_terminates_and_visits_once() {
    let graph = DependencyGraph::builder()
        .edge("a", "b", "a_id", CascadePolicy::Delete)
        .edge("b", "a", "b_id", CascadePolicy::Delete)
        .build()
        .unwrap();
    let store = InMemoryStore::new();
    store.insert("a", Record::new("a1").with_field("b_id", "b1")).await;
    store.insert("b", Record::new("b1").with_field("a_id", "a1")).await;
    let recording = Arc::new(RecordingClient::new(Arc::new(store.clone())));
    let engine = engine(graph, recording.clone());

    let result = engine.cascade_delete(&t("a"), &id("a1")).await.unwrap();

    assert_eq!(result.deleted_count, 2);
    assert!(result.is_complete());
    assert!(store.is_empty().await);

    // One filtered read per visited record.
    assert_eq!(recording.calls_of(Operation::FindByField).await.len(), 2);
    let a1 = recording.delete_one_position("a", "a1").await.unwrap();
    let b1 = recording.delete_one_position("b", "b1").await.unwrap();
    assert!(b1 < a1);
}

#[tokio::test]
async fn test_self_reference_with_set_null_detaches_reports() {
    let graph = DependencyGraph::builder()
        .edge("employees", "employees", "manager_id", CascadePolicy::SetNull)
        .build()
        .unwrap();
    let store = InMemoryStore::new();
    store.insert("employees", Record::new("boss").with_field("manager_id", "report")).await;
    store.insert("employees", Record::new("report").with_field("manager_id", "boss")).await;
    let engine = engine(graph, Arc::new(store.clone()));

    let result = engine.cascade_delete(&t("employees"), &id("boss")).await.unwrap();

    assert_eq!(result.deleted_count, 1);
    assert_eq!(result.nullified_count, 1);
    assert!(store.get("employees", "report").await.unwrap().is_null("manager_id"));
}

// ========== Depth Guard ==========

#[tokio::test]
async fn test_depth_guard_truncates_deep_branch() {
    let (graph, store) = chain(15).await;
    let engine = engine(graph, Arc::new(store.clone()));

    let result = engine.cascade_delete(&t("nodes"), &id("n0")).await.unwrap();

    // n0..=n10 sit at depth 0..=10; n11 is the first record past the bound.
    assert_eq!(result.deleted_count, MAX_DEPTH + 1);
    assert_eq!(result.truncated, vec![RecordRef::new("nodes", "n11")]);
    assert_eq!(result.outcome(), CascadeOutcome::Partial);
    assert_eq!(store.count("nodes").await, 4);
    assert!(store.get("nodes", "n11").await.is_some());
    assert!(store.get("nodes", "n10").await.is_none());
}

#[tokio::test]
async fn test_depth_guard_fail_policy_deletes_nothing() {
    let (graph, store) = chain(15).await;
    let engine = engine(graph, Arc::new(store.clone())).with_config(EngineConfig {
        depth_policy: DepthPolicy::Fail,
        ..EngineConfig::default()
    });

    let err = engine.cascade_delete(&t("nodes"), &id("n0")).await.unwrap_err();

    assert!(matches!(
        err,
        Error::DepthExceeded { depth: 11, max_depth: 10, ref id, .. } if id.as_str() == "n11"
    ));
    assert_eq!(store.count("nodes").await, 15);
}

#[tokio::test]
async fn test_custom_max_depth() {
    let (graph, store) = chain(5).await;
    let engine = engine(graph, Arc::new(store.clone())).with_config(EngineConfig {
        max_depth: 2,
        ..EngineConfig::default()
    });

    let result = engine.cascade_delete(&t("nodes"), &id("n0")).await.unwrap();

    assert_eq!(result.deleted_count, 3);
    assert_eq!(result.truncated, vec![RecordRef::new("nodes", "n3")]);
}

/// Three `nodes` referencing each other in a ring: n0 <- n1 <- n2 <- n0.
async fn ring() -> (DependencyGraph, InMemoryStore) {
    let graph = DependencyGraph::builder()
        .edge("nodes", "nodes", "parent_id", CascadePolicy::Delete)
        .build()
        .unwrap();
    let store = InMemoryStore::new();
    store.insert("nodes", Record::new("n0").with_field("parent_id", "n2")).await;
    store.insert("nodes", Record::new("n1").with_field("parent_id", "n0")).await;
    store.insert("nodes", Record::new("n2").with_field("parent_id", "n1")).await;
    (graph, store)
}

#[rstest]
#[case::truncate(DepthPolicy::Truncate)]
#[case::fail(DepthPolicy::Fail)]
#[tokio::test]
async fn test_cycle_closing_past_max_depth_is_not_too_deep(#[case] depth_policy: DepthPolicy) {
    let (graph, store) = ring().await;
    let engine = engine(graph, Arc::new(store.clone())).with_config(EngineConfig {
        max_depth: 2,
        depth_policy,
    });

    // n2 at depth 2 leads back to n0 at depth 3, which is already being deleted.
    let result = engine.cascade_delete(&t("nodes"), &id("n0")).await.unwrap();

    assert_eq!(result.deleted_count, 3);
    assert!(result.truncated.is_empty());
    assert_eq!(result.outcome(), CascadeOutcome::Complete);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_record_truncated_on_deep_path_but_deleted_on_short_path() {
    let graph = DependencyGraph::builder()
        .edge("nodes", "nodes", "parent_id", CascadePolicy::Delete)
        .edge("nodes", "nodes", "owner_id", CascadePolicy::Delete)
        .build()
        .unwrap();
    let store = InMemoryStore::new();
    store.insert("nodes", Record::new("root")).await;
    store.insert("nodes", Record::new("a").with_field("parent_id", "root")).await;
    store.insert("nodes", Record::new("b").with_field("parent_id", "a")).await;
    store
        .insert(
            "nodes",
            Record::new("x")
                .with_field("parent_id", "b")
                .with_field("owner_id", "root"),
        )
        .await;
    let engine = engine(graph, Arc::new(store.clone())).with_config(EngineConfig {
        max_depth: 2,
        ..EngineConfig::default()
    });

    // x is first reached at depth 3 through a and b, then at depth 1 via owner_id.
    let result = engine.cascade_delete(&t("nodes"), &id("root")).await.unwrap();

    assert_eq!(result.deleted_count, 4);
    assert!(result.truncated.is_empty());
    assert!(result.is_complete());
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_truncated_record_reported_once() {
    let graph = DependencyGraph::builder()
        .edge("nodes", "nodes", "parent_id", CascadePolicy::Delete)
        .edge("nodes", "nodes", "owner_id", CascadePolicy::Delete)
        .build()
        .unwrap();
    let store = InMemoryStore::new();
    store.insert("nodes", Record::new("root")).await;
    store.insert("nodes", Record::new("a").with_field("parent_id", "root")).await;
    store
        .insert(
            "nodes",
            Record::new("deep")
                .with_field("parent_id", "a")
                .with_field("owner_id", "a"),
        )
        .await;
    let engine = engine(graph, Arc::new(store.clone())).with_config(EngineConfig {
        max_depth: 1,
        ..EngineConfig::default()
    });

    let result = engine.cascade_delete(&t("nodes"), &id("root")).await.unwrap();

    assert_eq!(result.deleted_count, 2);
    assert_eq!(result.truncated, vec![RecordRef::new("nodes", "deep")]);
    assert!(store.get("nodes", "deep").await.is_some());
}

// ========== Failures ==========

#[tokio::test]
async fn test_failed_read_skips_edge_and_continues() {
    let store = InMemoryStore::new();
    seed_positions(&store).await;
    let faulty = Arc::new(FaultyClient::new(Arc::new(store.clone())));
    faulty.fail(Operation::FindByField, "salary_schemes").await;
    let engine = engine(positions_graph(), faulty);

    let result = engine.cascade_delete(&t("positions"), &id("pos-1")).await.unwrap();

    assert_eq!(result.outcome(), CascadeOutcome::Partial);
    assert_eq!(result.skipped_edges.len(), 1);
    let skipped = &result.skipped_edges[0];
    assert_eq!(skipped.parent, RecordRef::new("positions", "pos-1"));
    assert_eq!(skipped.table, t("salary_schemes"));
    assert_eq!(skipped.field, "position_id");
    assert!(skipped.reason.contains("injected find_by_field failure"));

    // Later edges and the root still ran.
    assert!(store.get("positions", "pos-1").await.is_none());
    assert!(store.get("employees", "emp-1").await.unwrap().is_null("position_id"));
    // The skipped edge left its rows untouched.
    assert!(!store.get("salary_schemes", "ss-1").await.unwrap().is_null("position_id"));
}

#[tokio::test]
async fn test_failed_set_null_skips_edge() {
    let store = InMemoryStore::new();
    seed_positions(&store).await;
    let faulty = Arc::new(FaultyClient::new(Arc::new(store.clone())));
    faulty.fail(Operation::SetNull, "employees").await;
    let engine = engine(positions_graph(), faulty);

    let result = engine.cascade_delete(&t("positions"), &id("pos-1")).await.unwrap();

    assert_eq!(result.skipped_edges.len(), 1);
    assert_eq!(result.skipped_edges[0].table, t("employees"));
    assert_eq!(result.nullified_count, 2);
    assert!(store.get("positions", "pos-1").await.is_none());
}

#[tokio::test]
async fn test_failed_child_delete_is_skipped_and_siblings_continue() {
    let store = InMemoryStore::new();
    seed_positions(&store).await;
    let faulty = Arc::new(FaultyClient::new(Arc::new(store.clone())));
    faulty.fail(Operation::DeleteOne, "schedule_assignments").await;
    let recording = Arc::new(RecordingClient::new(faulty));
    let engine = engine(positions_graph(), recording.clone());

    let result = engine.cascade_delete(&t("positions"), &id("pos-1")).await.unwrap();

    // Both assignments failed; their own dependents were still handled.
    assert_eq!(result.skipped_edges.len(), 2);
    assert_eq!(result.deleted_count, 2);
    assert_eq!(result.nullified_count, 3);
    assert!(store.get("schedule_assignments", "sa-1").await.is_some());
    assert!(store.get("schedule_assignments", "sa-2").await.is_some());
    assert!(store.get("schedule_change_requests", "scr-1").await.is_none());
    assert!(store.get("positions", "pos-1").await.is_none());

    // Nothing was removed under the edge, so no bulk delete was attempted.
    assert!(
        recording
            .calls_of(Operation::DeleteMany)
            .await
            .iter()
            .all(|call| !matches!(
                call,
                Call::DeleteMany { table, .. } if table.as_str() == "schedule_assignments"
            ))
    );
}

#[tokio::test]
async fn test_failed_bulk_delete_is_swallowed() {
    let store = InMemoryStore::new();
    seed_positions(&store).await;
    let faulty = Arc::new(FaultyClient::new(Arc::new(store.clone())));
    faulty.fail(Operation::DeleteMany, "schedule_assignments").await;
    let engine = engine(positions_graph(), faulty);

    let result = engine.cascade_delete(&t("positions"), &id("pos-1")).await.unwrap();

    assert!(result.is_complete());
    assert_eq!(result.deleted_count, 4);
}

#[tokio::test]
async fn test_rerun_after_root_failure_only_retries_root() {
    let store = InMemoryStore::new();
    seed_positions(&store).await;
    let faulty = Arc::new(FaultyClient::new(Arc::new(store.clone())));
    faulty.fail(Operation::DeleteOne, "positions").await;
    let recording = Arc::new(RecordingClient::new(faulty.clone()));
    let engine = engine(positions_graph(), recording.clone());

    let err = engine.cascade_delete(&t("positions"), &id("pos-1")).await.unwrap_err();
    assert!(matches!(err, Error::DeleteFailed { ref table, .. } if table.as_str() == "positions"));

    // Dependents handled before the failure stay handled.
    assert!(store.get("positions", "pos-1").await.is_some());
    assert!(store.get("schedule_assignments", "sa-1").await.is_none());
    assert!(store.get("salary_schemes", "ss-1").await.unwrap().is_null("position_id"));

    faulty.heal(Operation::DeleteOne, "positions").await;
    recording.reset().await;

    let result = engine.cascade_delete(&t("positions"), &id("pos-1")).await.unwrap();

    assert_eq!(result.deleted_count, 1);
    assert_eq!(result.nullified_count, 0);
    assert!(recording.calls_of(Operation::SetNull).await.is_empty());
    assert!(recording.calls_of(Operation::DeleteMany).await.is_empty());
    assert_eq!(recording.calls_of(Operation::DeleteOne).await.len(), 1);
    assert!(store.get("positions", "pos-1").await.is_none());
}

// ========== Diagnostics ==========

#[test]
fn test_dependent_tables_and_config_lookup() {
    let engine = engine(positions_graph(), Arc::new(InMemoryStore::new()));

    assert!(engine.has_cascade_config("positions"));
    assert!(engine.has_cascade_config("schedule_assignments"));
    assert!(!engine.has_cascade_config("payroll_periods"));

    let deps: Vec<String> = engine
        .get_dependent_tables("positions")
        .into_iter()
        .map(|t| t.0)
        .collect();
    assert_eq!(deps, vec!["employees", "salary_schemes", "schedule_assignments"]);
    assert!(engine.get_dependent_tables("payroll_periods").is_empty());
}

#[test]
fn test_default_config() {
    let config = EngineConfig::default();
    assert_eq!(config.max_depth, 10);
    assert_eq!(config.depth_policy, DepthPolicy::Truncate);
}
