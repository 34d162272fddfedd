#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::record;
use layerorm_core::layerorm_core_types::schema::EVENT_ROW_REJECTED;
use layerorm_core::logging_facility::test_capture::init_test_capture;
use layerorm_core::{OrmError, Row, Table, Value};

// ===== EMPTY TABLE TESTS =====

#[test]
fn test_empty_table_state() {
    let table = Table::new();

    assert_eq!(table.count(), 0);
    assert!(table.is_empty());
    assert!(table.eof());
    assert!(table.record().is_empty());
    assert!(table.field_by_name("id").is_empty_text());
    assert_eq!(table.as_json(), serde_json::json!([]));
}

#[test]
fn test_set_key_field_on_empty_table_fails() {
    let mut table = Table::new();
    assert!(matches!(
        table.set_key_field("id"),
        Err(OrmError::EmptyTable { .. })
    ));
}

// ===== SUBSET RULE TESTS =====

#[test]
fn test_subset_rule_rejects_unknown_fields_with_diagnostic() {
    let capture = init_test_capture();
    let model = "subset_rule_table_unique";
    let mut table = Table::new().for_model(model);

    table
        .new_record([("a", 1), ("b", 2), ("c", 3)])
        .unwrap();
    table.new_record([("a", 4), ("b", 5)]).unwrap();
    let err = table.new_record([("a", 6), ("x", 7)]).unwrap_err();

    assert_eq!(
        err,
        OrmError::RowNotInSchema {
            fields: vec!["x".to_string()],
            rejected: 1,
        }
    );
    assert_eq!(table.count(), 2);
    assert_eq!(table.fields().unwrap(), &["a", "b", "c"]);

    let rejected = capture.count_events(|e| {
        e.event.as_deref() == Some(EVENT_ROW_REJECTED) && e.field("model") == Some(model)
    });
    assert_eq!(rejected, 1);
}

#[test]
fn test_batch_append_is_not_atomic() {
    let mut table = Table::new();
    let rows = vec![
        Row::from_map([("id", 1), ("name", 1)]),
        Row::from_map([("id", 2), ("bogus", 2)]),
        Row::new(),
        Row::from_map([("id", 3)]),
    ];

    let err = table.append_rows(rows).unwrap_err();

    assert!(matches!(err, OrmError::RowNotInSchema { rejected: 1, .. }));
    assert_eq!(table.count(), 2);
    assert_eq!(table.record().get_by_name("id"), &Value::Integer(3));
}

#[test]
fn test_from_records_drops_rows_outside_schema() {
    let table = Table::from_records(vec![
        record([("id", Value::Integer(1)), ("name", Value::from("a"))]),
        record([("id", Value::Integer(2)), ("other", Value::from("b"))]),
    ]);
    assert_eq!(table.count(), 1);
}

// ===== KEY INDEX TESTS =====

fn people() -> Table {
    let mut table = Table::new();
    for (id, name) in [(1, "ada"), (2, "grace"), (3, "linus")] {
        table
            .new_record([("id", Value::Integer(id)), ("name", Value::from(name))])
            .unwrap();
    }
    table
}

#[test]
fn test_key_index_lookup_and_replacement() {
    let mut table = people();

    table.set_key_field("id").unwrap();
    let row = table.record_by_key("2", None).unwrap().unwrap();
    assert_eq!(row.get_by_name("name"), &Value::from("grace"));
    assert!(table.record_by_key("9", None).unwrap().is_none());

    table.set_key_field("name").unwrap();
    assert_eq!(table.key_field(), Some("name"));
    assert!(table.record_by_key("2", None).unwrap().is_none());
    let row = table.record_by_key("linus", None).unwrap().unwrap();
    assert_eq!(row.get_by_name("id"), &Value::Integer(3));
    assert_eq!(table.keys().unwrap(), vec!["ada", "grace", "linus"]);
}

#[test]
fn test_record_by_key_uses_explicit_default_field() {
    let mut table = people();
    let row = table.record_by_key("ada", Some("name")).unwrap().unwrap();
    assert_eq!(row.get_by_name("id"), &Value::Integer(1));
    assert_eq!(table.key_field(), Some("name"));
}

#[test]
fn test_aggregate_result_rejects_foreign_key_field() {
    let mut table = Table::new();
    table.new_record([("count", 42)]).unwrap();

    assert_eq!(
        table.set_key_field("id"),
        Err(OrmError::AggregateKeyField {
            field: "id".to_string()
        })
    );
    assert_eq!(table.key_field(), None);

    table.set_key_field("count").unwrap();
    assert!(table.record_by_key("42", None).unwrap().is_some());
}

#[test]
fn test_record_by_field_linear_scan() {
    let table = people();
    let row = table
        .record_by_field("name", &Value::from("linus"))
        .unwrap();
    assert_eq!(row.get_by_name("id"), &Value::Integer(3));
    assert!(table.record_by_field("name", &Value::from("nobody")).is_none());
}

// ===== CURSOR TESTS =====

#[test]
fn test_cursor_iteration_and_delete() {
    let mut table = people();
    table.first();
    table.next();
    table.delete(None).unwrap();

    let names: Vec<String> = table
        .iter()
        .map(|r| r.get_by_name("name").to_text())
        .collect();
    assert_eq!(names, vec!["ada", "linus"]);
    assert_eq!(table.field_by_name("name"), &Value::from("linus"));

    assert_eq!(
        table.delete(Some(7)),
        Err(OrmError::IndexOutOfBounds { index: 7, len: 2 })
    );
}

#[test]
fn test_as_json_exports_rows() {
    let table = people();
    let json = table.as_json();
    assert_eq!(json.as_array().unwrap().len(), 3);
    assert_eq!(json[0], serde_json::json!({"id": 1, "name": "ada"}));
}

#[test]
fn test_is_classic_follows_row_display_values() {
    let mut table = Table::new();
    table.new_record([("status", 1)]).unwrap();
    assert!(!table.is_classic());

    let mut row = Row::from_map([("status", 2)]);
    row.set_classic_by_name("status", "Active");
    table.append_row(row).unwrap();

    assert!(table.is_classic());
    assert_eq!(table.record().get_classic_by_name("status"), &Value::from("Active"));

    table.delete(None).unwrap();
    assert!(!table.is_classic());
}
