#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{user_registry, ChainA, UserBase, UserEu};
use layerorm_core::layerorm_core_types::schema::{EVENT_END, EVENT_END_ERROR};
use layerorm_core::logging_facility::test_capture::init_test_capture;
use layerorm_core::{
    CoreConfig, ExError, ExErrorKind, FieldDescriptor, FieldKind, LayerType, OrmError, Registry,
    Row, Value,
};

// ===== MERGE TESTS =====

#[test]
fn test_two_regions_merge_into_union() {
    let registry = user_registry();
    let snapshot = registry.schema("user").unwrap().snapshot();

    let fields: Vec<&str> = snapshot.fields.keys().map(String::as_str).collect();
    assert_eq!(fields, vec!["id", "name", "extra"]);
    assert_eq!(snapshot.primary_keys, vec!["id", "tenant"]);
    assert_eq!(snapshot.table, "users");

    // Last registration wins on defaults, the rest are kept
    assert_eq!(snapshot.defaults["state"], Value::from("active"));
    assert_eq!(snapshot.defaults["locale"], Value::from("de"));
}

#[test]
fn test_every_field_is_owned_by_the_model() {
    let registry = user_registry();
    let snapshot = registry.schema("user").unwrap().snapshot();
    assert!(snapshot.fields.values().all(|f| f.model == "user" && f.valid));
}

#[test]
fn test_named_region_replaces_default_region_entry() {
    let registry = user_registry();
    let snapshot = registry.schema("user").unwrap().snapshot();

    assert!(!snapshot.regions.contains_key("default"));
    assert_eq!(snapshot.regions["eu"], LayerType::of::<UserEu>());
    assert_eq!(
        snapshot.layer_order,
        vec![LayerType::of::<UserBase>(), LayerType::of::<UserEu>()]
    );
}

#[test]
fn test_reregistering_same_type_is_idempotent() {
    let registry = Registry::default();
    registry.register_layer::<UserBase>("").unwrap();
    registry.register_layer::<UserBase>("").unwrap();

    let snapshot = registry.schema("user").unwrap().snapshot();
    assert_eq!(snapshot.fields.len(), 2);
    assert_eq!(snapshot.primary_keys, vec!["id"]);
    assert_eq!(snapshot.layer_order.len(), 1);
}

#[test]
fn test_configured_default_region() {
    let config = CoreConfig {
        default_region: "main".to_string(),
        ..CoreConfig::default()
    };
    let registry = Registry::new(config);
    registry.register_layer::<UserBase>("").unwrap();

    let snapshot = registry.schema("user").unwrap().snapshot();
    assert!(snapshot.regions.contains_key("main"));
    assert_eq!(registry.get_model("user", None).unwrap().region(), "main");
}

// ===== GET MODEL TESTS =====

#[test]
fn test_get_model_falls_back_to_registered_region() {
    let registry = user_registry();

    let layer = registry.get_model("user", None).unwrap();
    assert_eq!(layer.region(), "eu");
    assert_eq!(layer.table(), "users");

    let layer = registry.get_model("user", Some("apac")).unwrap();
    assert_eq!(layer.region(), "eu");
}

#[test]
fn test_get_model_returns_fresh_instances() {
    let registry = user_registry();

    let mut first = registry.get_model("user", Some("eu")).unwrap();
    first.attach_row(Row::from_map([("id", 1)]));
    let second = registry.get_model("user", Some("eu")).unwrap();

    assert!(second.row().is_empty());
}

#[test]
fn test_super_layer_is_previous_registration() {
    let registry = user_registry();
    let layer = registry.get_model("user", Some("eu")).unwrap();

    assert_eq!(layer.layer_schema().fields.len(), 1);
    let parent = layer.super_layer().unwrap();
    assert_eq!(parent.layer_schema().fields.len(), 2);
    assert_eq!(parent.name(), "user");
    assert!(parent.super_layer().is_none());
}

#[test]
fn test_unknown_model_is_hard_error() {
    let registry = user_registry();
    let err = registry.get_model("ghost", Some("eu")).err().unwrap();

    assert_eq!(
        err,
        OrmError::ModelNotFound {
            model: "ghost".to_string(),
            region: "eu".to_string(),
        }
    );
    assert!(ExError::from(err).kind().is_hard());
}

#[test]
fn test_schema_proxies_through_layer() {
    let registry = user_registry();
    let layer = registry.get_model("user", None).unwrap();

    assert_eq!(layer.get_default("state"), Some(Value::from("active")));
    layer.set_default("state", Value::from("archived"));
    layer.add_field(FieldDescriptor::new("nickname", FieldKind::Text));

    let snapshot = registry.schema("user").unwrap().snapshot();
    assert_eq!(snapshot.defaults["state"], Value::from("archived"));
    assert_eq!(snapshot.fields["nickname"].model, "user");
}

// ===== METHOD TABLE TESTS =====

#[test]
fn test_later_registration_overwrites_method() {
    let registry = user_registry();

    let greet = registry.get_method("user", "greet").unwrap();
    assert_eq!(greet.type_name, LayerType::of::<UserEu>().type_name);

    let layer = registry.get_model("user", None).unwrap();
    assert_eq!(
        registry.call_method(layer.as_ref(), "greet", &[]).unwrap(),
        Value::from("hello from eu")
    );
    assert_eq!(
        registry
            .call_method(layer.as_ref(), "describe", &[Value::from("!")])
            .unwrap(),
        Value::from("user@eu!")
    );
}

#[test]
fn test_missing_method_is_hard_error() {
    let registry = user_registry();

    let err = registry.get_method("user", "fly").unwrap_err();
    assert_eq!(
        err,
        OrmError::MethodNotFound {
            model: "user".to_string(),
            method: "fly".to_string(),
        }
    );
    assert!(matches!(
        registry.get_method("ghost", "greet"),
        Err(OrmError::MethodNotFound { .. })
    ));
}

// ===== LIFECYCLE TESTS =====

#[test]
fn test_models_remove_and_clear() {
    let registry = user_registry();
    registry.register_layer::<ChainA>("").unwrap();
    assert_eq!(registry.models(), vec!["a", "user"]);

    assert!(registry.remove("a"));
    assert_eq!(registry.models(), vec!["user"]);

    registry.clear();
    assert!(registry.models().is_empty());
    assert!(registry.get_model("user", None).is_err());
}

// ===== BOUNDARY LOGGING TESTS =====

#[test]
fn test_registry_operations_log_boundaries() {
    let capture = init_test_capture();
    let registry = user_registry();

    registry.get_model("user", None).unwrap();
    let _ = registry.get_method("logging_boundary_model", "none");

    assert!(capture.count_events(|e| {
        e.op.as_deref() == Some("get_model")
            && e.event.as_deref() == Some(EVENT_END)
            && e.field("model") == Some("user")
    }) >= 1);

    let errors = capture.count_events(|e| {
        e.op.as_deref() == Some("get_method")
            && e.event.as_deref() == Some(EVENT_END_ERROR)
            && e.field("err_code") == Some(ExErrorKind::MethodNotFound.code())
    });
    assert!(errors >= 1);
}
