//! Store and Query Integration Tests
//!
//! Record round-trips, the filter pipeline, and aggregation through
//! the facade's buffered store.

use crate::*;
use ledgerdb::Record;

fn seeded_ledger() -> Ledger {
    let ledger = in_memory_ledger();
    ledger
        .store
        .put("agent:1", json!({"role": "planner", "score": 9, "tags": ["lead"]}))
        .unwrap();
    ledger
        .store
        .put("agent:2", json!({"role": "worker", "score": 4.5, "tags": ["lead", "beta"]}))
        .unwrap();
    ledger
        .store
        .put("agent:3", json!({"role": "worker", "score": 7}))
        .unwrap();
    ledger
}

fn keys_of(records: &[Record]) -> Vec<&str> {
    records.iter().map(|r| r.key.as_str()).collect()
}

// =============================================================================
// ROUND-TRIPS
// =============================================================================

#[test]
fn test_put_get_returns_the_value_verbatim() {
    let ledger = in_memory_ledger();

    let value = json!({"nested": {"a": [1, 2, 3]}, "b": null});
    ledger.store.put("doc", value.clone()).unwrap();
    assert_eq!(ledger.store.get("doc").unwrap(), value);
}

#[test]
fn test_non_object_values_round_trip_too() {
    let ledger = in_memory_ledger();

    for (key, value) in [
        ("scalar", json!(42)),
        ("text", json!("plain")),
        ("list", json!([1, "two", false])),
        ("nothing", json!(null)),
    ] {
        ledger.store.put(key, value.clone()).unwrap();
        assert_eq!(ledger.store.get(key).unwrap(), value, "failed for {key}");
    }
}

#[test]
fn test_get_missing_key_is_not_found() {
    let ledger = in_memory_ledger();
    let err = ledger.store.get("missing").unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_overwrite_keeps_identity_and_insertion_time() {
    let ledger = in_memory_ledger();

    ledger.store.put("doc", json!({"v": 1})).unwrap();
    let before = ledger.store.query(&Filter::new()).unwrap();

    ledger.store.put("doc", json!({"v": 2})).unwrap();
    let after = ledger.store.query(&Filter::new()).unwrap();

    assert_eq!(after[0].id, before[0].id);
    assert_eq!(after[0].inserted_at, before[0].inserted_at);
    assert_eq!(after[0].data, json!({"v": 2}));
    assert!(after[0].updated_at >= before[0].updated_at);
}

#[test]
fn test_delete_then_exists_and_list() {
    let ledger = seeded_ledger();

    ledger.store.delete("agent:2").unwrap();
    assert!(!ledger.store.exists("agent:2"));
    assert!(ledger.store.exists("agent:1"));

    let mut keys = ledger.store.list().unwrap();
    keys.sort();
    assert_eq!(keys, vec!["agent:1", "agent:3"]);

    // Deleting again is a no-op.
    ledger.store.delete("agent:2").unwrap();
}

// =============================================================================
// FILTERING
// =============================================================================

#[test]
fn test_eq_and_neq_conditions() {
    let ledger = seeded_ledger();

    let workers = ledger
        .store
        .query(
            &Filter::new()
                .where_("role", Operator::Eq, json!("worker"))
                .order_by("score", Direction::Asc),
        )
        .unwrap();
    assert_eq!(keys_of(&workers), vec!["agent:2", "agent:3"]);

    let not_workers = ledger
        .store
        .query(&Filter::new().where_("role", Operator::Neq, json!("worker")))
        .unwrap();
    assert_eq!(keys_of(&not_workers), vec!["agent:1"]);
}

#[test]
fn test_numeric_comparisons_unify_int_and_float() {
    let ledger = seeded_ledger();

    let mid = ledger
        .store
        .query(
            &Filter::new()
                .where_("score", Operator::Gt, json!(4.5))
                .where_("score", Operator::Lte, json!(7))
                .order_by("score", Direction::Asc),
        )
        .unwrap();
    assert_eq!(keys_of(&mid), vec!["agent:3"]);
}

#[test]
fn test_in_and_contains_operators() {
    let ledger = seeded_ledger();

    let picked = ledger
        .store
        .query(&Filter::new().where_("role", Operator::In, json!(["planner", "critic"])))
        .unwrap();
    assert_eq!(keys_of(&picked), vec!["agent:1"]);

    let mut tagged = ledger
        .store
        .query(&Filter::new().where_("tags", Operator::Contains, json!("beta")))
        .unwrap();
    tagged.sort_by(|a, b| a.key.cmp(&b.key));
    assert_eq!(keys_of(&tagged), vec!["agent:2"]);
}

#[test]
fn test_cross_type_comparison_never_matches() {
    let ledger = seeded_ledger();

    // "role" holds strings; a numeric bound is undefined, so no match.
    let none = ledger
        .store
        .query(&Filter::new().where_("role", Operator::Gt, json!(3)))
        .unwrap();
    assert!(none.is_empty());
}

#[test]
fn test_condition_on_absent_field_never_matches() {
    let ledger = seeded_ledger();

    let none = ledger
        .store
        .query(&Filter::new().where_("nonexistent", Operator::Eq, json!("x")))
        .unwrap();
    assert!(none.is_empty());
}

#[test]
fn test_time_window_bounds_are_inclusive() {
    let ledger = seeded_ledger();
    let records = ledger.store.query(&Filter::new()).unwrap();
    let newest = records.iter().map(|r| r.inserted_at).max().unwrap();

    let within = ledger
        .store
        .count(&Filter::new().until(newest))
        .unwrap();
    assert_eq!(within, 3);

    let future = newest + chrono::Duration::seconds(60);
    let after = ledger.store.count(&Filter::new().since(future)).unwrap();
    assert_eq!(after, 0);
}

// =============================================================================
// ORDERING AND PAGINATION
// =============================================================================

#[test]
fn test_pipeline_filters_sorts_then_paginates() {
    let ledger = in_memory_ledger();
    for i in 0..10 {
        ledger
            .store
            .put(&format!("item:{i}"), json!({"rank": i, "kind": "item"}))
            .unwrap();
    }

    let page = ledger
        .store
        .query(
            &Filter::new()
                .where_("kind", Operator::Eq, json!("item"))
                .order_by("rank", Direction::Desc)
                .offset(2)
                .limit(3),
        )
        .unwrap();
    let ranks: Vec<i64> = page
        .iter()
        .map(|r| r.field("rank").and_then(JsonValue::as_i64).unwrap())
        .collect();
    assert_eq!(ranks, vec![7, 6, 5]);
}

#[test]
fn test_records_missing_the_sort_field_come_last() {
    let ledger = seeded_ledger();
    ledger.store.put("agent:4", json!({"role": "worker"})).unwrap();

    let sorted = ledger
        .store
        .query(&Filter::new().order_by("score", Direction::Desc))
        .unwrap();
    assert_eq!(keys_of(&sorted), vec!["agent:1", "agent:3", "agent:2", "agent:4"]);
}

// =============================================================================
// COUNT AND AGGREGATION
// =============================================================================

#[test]
fn test_count_honors_conditions_but_not_pagination() {
    let ledger = seeded_ledger();

    let filter = Filter::new()
        .where_("role", Operator::Eq, json!("worker"))
        .limit(1);
    assert_eq!(ledger.store.count(&filter).unwrap(), 2);
}

#[test]
fn test_aggregates_over_filtered_records() {
    let ledger = seeded_ledger();
    let workers = Filter::new().where_("role", Operator::Eq, json!("worker"));

    let sum = ledger
        .store
        .aggregate(&workers, "score", AggregateOp::Sum)
        .unwrap();
    assert_eq!(sum, Some(11.5));

    let avg = ledger
        .store
        .aggregate(&workers, "score", AggregateOp::Avg)
        .unwrap();
    assert_eq!(avg, Some(5.75));

    let min = ledger
        .store
        .aggregate(&Filter::new(), "score", AggregateOp::Min)
        .unwrap();
    assert_eq!(min, Some(4.5));

    let max = ledger
        .store
        .aggregate(&Filter::new(), "score", AggregateOp::Max)
        .unwrap();
    assert_eq!(max, Some(9.0));
}

#[test]
fn test_aggregate_with_no_numeric_values_is_none() {
    let ledger = in_memory_ledger();
    ledger.store.put("doc", json!({"name": "text only"})).unwrap();

    let sum = ledger
        .store
        .aggregate(&Filter::new(), "score", AggregateOp::Sum)
        .unwrap();
    assert_eq!(sum, None);
}
