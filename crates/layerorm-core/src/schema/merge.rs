//! Folding a layer's declaration into a model's canonical snapshot
//!
//! Precedence is fixed and never errors:
//! - indexes and primary keys: union, first declaration of a name kept
//! - special columns and table name: first non-empty value kept
//! - defaults: newest registration wins
//! - fields, relations, common fields: union, newest wins on collision
//! - methods: newest registration wins, recorded with the providing type

use super::{LayerSchema, MethodEntry, SchemaSnapshot, SpecialColumns};
use crate::layer::LayerType;

/// Counters for one merge, reported in debug logs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub fields_added: usize,
    pub fields_replaced: usize,
    pub methods: usize,
}

pub fn merge_layer(
    target: &mut SchemaSnapshot,
    layer: &LayerSchema,
    layer_type: LayerType,
) -> MergeStats {
    let mut stats = MergeStats::default();

    if target.table.is_empty() {
        target.table = layer.table_name().to_string();
    }

    for index in &layer.indexes {
        if !target.indexes.iter().any(|i| i.name == index.name) {
            target.indexes.push(index.clone());
        }
    }

    for pk in &layer.primary_keys {
        if !target.primary_keys.contains(pk) {
            target.primary_keys.push(pk.clone());
        }
    }

    merge_special(&mut target.special, &layer.special);

    for (field, value) in &layer.defaults {
        target.defaults.insert(field.clone(), value.clone());
    }

    for field in &layer.fields {
        match target.fields.insert(field.name.clone(), field.clone()) {
            Some(_) => stats.fields_replaced += 1,
            None => stats.fields_added += 1,
        }
    }

    for (model, join_field) in &layer.relations {
        target.relations.insert(model.clone(), join_field.clone());
    }

    for field in &layer.common_fields {
        target.common_fields.insert(field.name.clone(), field.clone());
    }

    for (name, func) in &layer.methods {
        target.methods.insert(
            name.clone(),
            MethodEntry {
                type_name: layer_type.type_name,
                func: func.clone(),
            },
        );
        stats.methods += 1;
    }

    if !target
        .layer_order
        .iter()
        .any(|t| t.type_name == layer_type.type_name)
    {
        target.layer_order.push(layer_type);
    }

    stats
}

fn merge_special(target: &mut SpecialColumns, incoming: &SpecialColumns) {
    fn keep_first(slot: &mut Option<String>, incoming: &Option<String>) {
        let empty = slot.as_deref().map_or(true, str::is_empty);
        if empty {
            if let Some(value) = incoming.as_ref().filter(|v| !v.is_empty()) {
                *slot = Some(value.clone());
            }
        }
    }

    keep_first(&mut target.created, &incoming.created);
    keep_first(&mut target.updated, &incoming.updated);
    keep_first(&mut target.deleted, &incoming.deleted);
    keep_first(&mut target.version, &incoming.version);
    keep_first(&mut target.auto_increment, &incoming.auto_increment);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::tests::NullLayer;
    use crate::schema::{FieldKind, IndexDef};
    use crate::value::Value;

    fn merged(layers: &[LayerSchema]) -> SchemaSnapshot {
        let mut snapshot = SchemaSnapshot::empty("user");
        for layer in layers {
            merge_layer(&mut snapshot, layer, LayerType::of::<NullLayer>());
        }
        snapshot
    }

    #[test]
    fn test_newest_field_wins() {
        let snapshot = merged(&[
            LayerSchema::new("user").field("age", FieldKind::Text),
            LayerSchema::new("user").field("age", FieldKind::Integer),
        ]);
        assert_eq!(snapshot.fields["age"].kind, FieldKind::Integer);
    }

    #[test]
    fn test_keys_and_indexes_union_without_duplicates() {
        let snapshot = merged(&[
            LayerSchema::new("user")
                .primary_key("id")
                .index(IndexDef::new("by_email", ["email"], true)),
            LayerSchema::new("user")
                .primary_key("id")
                .primary_key("tenant")
                .index(IndexDef::new("by_email", ["email", "tenant"], false)),
        ]);
        assert_eq!(snapshot.primary_keys, vec!["id", "tenant"]);
        assert_eq!(snapshot.indexes.len(), 1);
        assert!(snapshot.indexes[0].unique);
    }

    #[test]
    fn test_special_columns_keep_first_defaults_keep_last() {
        let snapshot = merged(&[
            LayerSchema::new("user")
                .created("created_at")
                .default_value("state", "draft"),
            LayerSchema::new("user")
                .created("inserted_at")
                .updated("updated_at")
                .default_value("state", "active"),
        ]);
        assert_eq!(snapshot.special.created.as_deref(), Some("created_at"));
        assert_eq!(snapshot.special.updated.as_deref(), Some("updated_at"));
        assert_eq!(snapshot.defaults["state"], Value::from("active"));
    }

    #[test]
    fn test_first_table_name_kept() {
        let snapshot = merged(&[
            LayerSchema::new("user").table("users"),
            LayerSchema::new("user").table("accounts"),
        ]);
        assert_eq!(snapshot.table, "users");
    }
}
