#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::Account;
use layerorm_core::{Row, Value};
use proptest::prelude::*;
use std::collections::HashMap;

const FIELDS: [&str; 4] = ["a", "b", "c", "d"];

fn arb_write() -> impl Strategy<Value = (usize, i64)> {
    (0..FIELDS.len(), any::<i64>())
}

proptest! {
    #[test]
    fn prop_last_write_wins_and_positions_are_stable(writes in prop::collection::vec(arb_write(), 1..40)) {
        let mut row = Row::new();
        let mut expected: HashMap<&str, i64> = HashMap::new();
        let mut first_seen: Vec<&str> = Vec::new();

        for (field, value) in writes {
            let name = FIELDS[field];
            let index = row.set_by_name(name, value);
            if !first_seen.contains(&name) {
                first_seen.push(name);
            }
            prop_assert_eq!(index, first_seen.iter().position(|f| *f == name).unwrap());
            expected.insert(name, value);
        }

        prop_assert_eq!(row.field_names().collect::<Vec<_>>(), first_seen.clone());
        for (position, name) in first_seen.iter().enumerate() {
            prop_assert_eq!(row.index_of(name), Some(position));
            prop_assert_eq!(row.get(position), &Value::Integer(expected[name]));
            prop_assert_eq!(row.get_by_name(name), &Value::Integer(expected[name]));
        }
    }
}

// ===== FIELD HANDLE TESTS =====

#[test]
fn test_field_handle_coercions() {
    let mut row = Row::from_map([
        ("ratio", Value::Float(3.9)),
        ("flag", Value::from("true")),
        ("zero", Value::Integer(0)),
    ]);

    assert_eq!(row.field("ratio").as_integer(None), 3);
    assert!(row.field("flag").as_boolean(None));
    assert!(!row.field("zero").as_boolean(None));
}

#[test]
fn test_field_handle_unknown_name_reads_zero_values() {
    let mut row = Row::new();
    let mut handle = row.field("missing");

    assert!(!handle.is_valid());
    assert_eq!(handle.as_string(None), "");
    assert_eq!(handle.as_integer(None), 0);
    assert_eq!(handle.as_float(None), 0.0);
    assert!(!handle.as_boolean(None));
    assert_eq!(handle.as_generic(None), Value::Null);
    assert!(row.is_empty());
}

#[test]
fn test_field_handle_write_appends_field() {
    let mut row = Row::from_map([("id", 1)]);

    let written = row.field("name").as_string(Some("ada"));

    assert_eq!(written, "ada");
    assert_eq!(row.len(), 2);
    assert_eq!(row.index_of("name"), Some(1));
    assert_eq!(row.get_by_name("name"), &Value::from("ada"));
}

#[test]
fn test_field_handle_classic_is_independent_of_raw() {
    let mut row = Row::from_map([("status", 2)]);

    row.field("status").as_classic(Some(Value::from("Shipped")));

    assert_eq!(row.get_by_name("status"), &Value::Integer(2));
    assert_eq!(row.get_classic_by_name("status"), &Value::from("Shipped"));
    assert!(row.has_classic());
}

// ===== EXPORT TESTS =====

#[test]
fn test_string_and_generic_maps_keep_order() {
    let row = Row::from_map([("b", Value::Integer(2)), ("a", Value::Bool(true))]);

    let strings = row.as_string_map();
    assert_eq!(strings.keys().collect::<Vec<_>>(), vec!["b", "a"]);
    assert_eq!(strings["a"], "true");

    let generic = row.as_generic_map();
    assert_eq!(generic["b"], Value::Integer(2));
}

// ===== STRUCT BINDING TESTS =====

#[test]
fn test_bind_into_struct_with_coercion() {
    let row = Row::from_map([
        ("UserName", Value::from("grace")),
        ("age", Value::from("36")),
        ("score", Value::Integer(7)),
        ("is-active", Value::Integer(1)),
        ("joined", Value::from("2024-03-01 10:00:00")),
        ("payload", Value::Json(serde_json::json!({"k": 1}))),
    ]);
    let mut account = Account::default();

    let report = row.as_struct(&mut account, false);

    assert_eq!(account.user_name, "grace");
    assert_eq!(account.age, 36);
    assert_eq!(account.score, 7.0);
    assert!(account.joined.is_some());
    assert_eq!(account.payload, Value::Json(serde_json::json!({"k": 1})));
    // "is-active" normalizes to "isactive", which is not a member
    assert_eq!(report.unmatched, vec!["is-active"]);
    assert!(!account.active);
    assert!(report.is_clean());
}

#[test]
fn test_bind_reports_mismatch_and_keeps_going() {
    let row = Row::from_map([
        ("age", Value::from("not a number")),
        ("joined", Value::from("yesterday")),
        ("user_name", Value::from("linus")),
    ]);
    let mut account = Account::default();

    let report = row.as_struct(&mut account, false);

    assert_eq!(report.mismatched, vec!["age", "joined"]);
    assert_eq!(report.bound, vec!["user_name"]);
    assert_eq!(account.user_name, "linus");
    assert_eq!(account.age, 0);
    assert!(account.joined.is_none());
}
