//! Relation resolution and relation fetch dispatch
//!
//! [`relations_reload`] expands a model's relation map into related-field
//! entries. Related models are resolved first (post-order) so their own
//! related fields are already in place when they are folded in. The graph is
//! not assumed acyclic: a model already on the current resolution path is
//! not descended into again.

use indexmap::IndexMap;
use std::collections::HashSet;

use layerorm_core_types::schema::EVENT_RELATION_CYCLE;

use crate::errors::{OrmError, Result};
use crate::layer::ModelLayer;
use crate::registry::Registry;
use crate::schema::{RelatedField, RelationKind};
use crate::table::Table;

struct Pass<'r> {
    registry: &'r Registry,
    path: Vec<String>,
    done: HashSet<String>,
}

impl Pass<'_> {
    fn resolve(&mut self, model: &str) -> Result<usize> {
        let Some(schema) = self.registry.schema(model) else {
            return Err(OrmError::ModelNotFound {
                model: model.to_string(),
                region: String::new(),
            });
        };

        self.path.push(model.to_string());
        let snapshot = schema.snapshot();
        let mut related: IndexMap<String, RelatedField> = IndexMap::new();
        let mut deeper: Vec<RelatedField> = Vec::new();

        for (related_model, join_field) in &snapshot.relations {
            let Some(related_schema) = self.registry.schema(related_model) else {
                tracing::warn!(
                    model,
                    related = %related_model,
                    "related model not registered, skipped"
                );
                continue;
            };

            if self.path.iter().any(|m| m == related_model) {
                tracing::debug!(
                    event = EVENT_RELATION_CYCLE,
                    model,
                    related = %related_model,
                    path = ?self.path,
                    "relation cycle, not descending"
                );
            } else if !self.done.contains(related_model.as_str()) {
                self.resolve(related_model)?;
            }

            let source = related_schema.snapshot();
            for (name, field) in &source.fields {
                related
                    .entry(name.clone())
                    .or_insert_with(|| RelatedField {
                        field: name.clone(),
                        through_model: related_model.clone(),
                        through_field: join_field.clone(),
                        source: field.clone(),
                        origin_table: source.table.clone(),
                    });
            }
            for (name, inherited) in &source.related_fields {
                deeper.push(RelatedField {
                    field: name.clone(),
                    through_model: related_model.clone(),
                    through_field: join_field.clone(),
                    source: inherited.source.clone(),
                    origin_table: inherited.origin_table.clone(),
                });
            }
        }

        // Nearer hops win; `SchemaSnapshot::field` still prefers native fields
        for field in deeper {
            related.entry(field.field.clone()).or_insert(field);
        }

        let count = related.len();
        tracing::debug!(model, related_fields = count, "relations resolved");
        schema.update(|s| s.related_fields = related);

        self.path.pop();
        self.done.insert(model.to_string());
        Ok(count)
    }
}

/// Rebuild the related-field map of `model` and of every model it reaches
///
/// Returns the number of related fields now recorded on `model`. Related
/// models that are not registered are logged and skipped.
///
/// # Errors
///
/// `ModelNotFound` when `model` itself is not registered.
pub fn relations_reload(registry: &Registry, model: &str) -> Result<usize> {
    Pass {
        registry,
        path: Vec::new(),
        done: HashSet::new(),
    }
    .resolve(model)
}

/// Fetch the rows a relation field of `layer` points at
///
/// # Errors
///
/// `NotARelation` when `field` is unknown or scalar; `UnsupportedRelationKind`
/// when its kind has no fetch handler; otherwise whatever the fetcher returns.
pub fn get_relate(layer: &dyn ModelLayer, field: &str) -> Result<Table> {
    let descriptor = layer.field(field);
    let Some(kind) = descriptor.relation_kind() else {
        return Err(OrmError::NotARelation {
            model: layer.name().to_string(),
            field: field.to_string(),
        });
    };

    match kind {
        RelationKind::OneToOne => layer.one_to_one(&descriptor),
        RelationKind::OneToMany => layer.one_to_many(&descriptor),
        RelationKind::ManyToOne => layer.many_to_one(&descriptor),
        RelationKind::ManyToMany => layer.many_to_many(&descriptor),
        RelationKind::Other(name) => Err(OrmError::UnsupportedRelationKind {
            model: layer.name().to_string(),
            field: field.to_string(),
            kind: name.clone(),
        }),
    }
}
