//! Per-layer schema declarations
//!
//! Each layer states its contribution to a model as a [`LayerSchema`]: the
//! fields, relations, keys, defaults and methods it adds. The registry folds
//! these deltas into the model's canonical [`Schema`](super::Schema).

use indexmap::IndexMap;
use std::sync::Arc;

use super::{
    FieldDescriptor, FieldKind, IndexDef, MethodFn, RelationKind, RelationSpec, SpecialColumns,
};
use crate::errors::Result;
use crate::layer::ModelLayer;
use crate::value::Value;

#[derive(Clone, Default)]
pub struct LayerSchema {
    pub name: String,
    pub table: Option<String>,
    pub fields: Vec<FieldDescriptor>,
    /// Related model → local join field
    pub relations: Vec<(String, String)>,
    pub common_fields: Vec<FieldDescriptor>,
    pub indexes: Vec<IndexDef>,
    pub primary_keys: Vec<String>,
    pub special: SpecialColumns,
    pub defaults: IndexMap<String, Value>,
    pub methods: Vec<(String, MethodFn)>,
}

impl std::fmt::Debug for LayerSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerSchema")
            .field("name", &self.name)
            .field("table", &self.table)
            .field("fields", &self.fields)
            .field("relations", &self.relations)
            .field("primary_keys", &self.primary_keys)
            .field(
                "methods",
                &self.methods.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl LayerSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Table name, defaulting to the model name
    pub fn table_name(&self) -> &str {
        self.table.as_deref().unwrap_or(&self.name)
    }

    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        let field = self.own(FieldDescriptor::new(name, kind));
        self.fields.push(field);
        self
    }

    /// Declare a relation field
    ///
    /// To-one relations also record the related model in the relation map so
    /// its fields propagate here as related fields.
    pub fn relation(
        mut self,
        name: impl Into<String>,
        kind: RelationKind,
        spec: RelationSpec,
    ) -> Self {
        if matches!(kind, RelationKind::OneToOne | RelationKind::ManyToOne) {
            self.relations
                .push((spec.model.clone(), spec.local_field.clone()));
        }
        let field = self.own(FieldDescriptor::relation(name, kind, spec));
        self.fields.push(field);
        self
    }

    /// Inherit every field of `model` through the local `join_field`
    pub fn inherits(mut self, model: impl Into<String>, join_field: impl Into<String>) -> Self {
        self.relations.push((model.into(), join_field.into()));
        self
    }

    /// A field shared by convention across models (e.g. audit columns)
    pub fn common_field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        let field = self.own(FieldDescriptor::new(name, kind));
        self.common_fields.push(field);
        self
    }

    pub fn index(mut self, index: IndexDef) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_keys.push(field.into());
        self
    }

    pub fn created(mut self, field: impl Into<String>) -> Self {
        self.special.created = Some(field.into());
        self
    }

    pub fn updated(mut self, field: impl Into<String>) -> Self {
        self.special.updated = Some(field.into());
        self
    }

    pub fn deleted(mut self, field: impl Into<String>) -> Self {
        self.special.deleted = Some(field.into());
        self
    }

    pub fn version(mut self, field: impl Into<String>) -> Self {
        self.special.version = Some(field.into());
        self
    }

    pub fn auto_increment(mut self, field: impl Into<String>) -> Self {
        self.special.auto_increment = Some(field.into());
        self
    }

    pub fn default_value(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(field.into(), value.into());
        self
    }

    /// Export a behavior method under `name`
    pub fn method<F>(mut self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&dyn ModelLayer, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        let func: MethodFn = Arc::new(func);
        self.methods.push((name.into(), func));
        self
    }

    fn own(&self, mut field: FieldDescriptor) -> FieldDescriptor {
        field.model = self.name.clone();
        field.valid = true;
        field
    }
}
