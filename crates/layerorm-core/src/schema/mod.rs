//! Canonical per-model metadata
//!
//! A [`Schema`] is the merged view of every layer registered for one model
//! name. Its content lives in an immutable [`SchemaSnapshot`] published behind
//! a lock: writers clone the current snapshot, apply a whole merge to the
//! clone, and swap it in. Readers grab the `Arc` and never observe a
//! half-merged schema.

pub mod layer_schema;
pub mod merge;

use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};

use crate::errors::Result;
use crate::layer::{LayerType, ModelLayer};
use crate::value::{Value, ValueKind};

pub use layer_schema::LayerSchema;

/// Relation cardinality
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RelationKind {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
    /// A kind declared by name that no fetch handler understands
    Other(String),
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationKind::OneToOne => f.write_str("one2one"),
            RelationKind::OneToMany => f.write_str("one2many"),
            RelationKind::ManyToOne => f.write_str("many2one"),
            RelationKind::ManyToMany => f.write_str("many2many"),
            RelationKind::Other(name) => f.write_str(name),
        }
    }
}

impl FromStr for RelationKind {
    type Err = std::convert::Infallible;

    /// Unknown names are kept as `Other` so they fail at dispatch, not at declaration
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        Ok(match normalized.as_str() {
            "one2one" | "onetoone" => RelationKind::OneToOne,
            "one2many" | "onetomany" => RelationKind::OneToMany,
            "many2one" | "manytoone" => RelationKind::ManyToOne,
            "many2many" | "manytomany" => RelationKind::ManyToMany,
            _ => RelationKind::Other(s.to_string()),
        })
    }
}

/// Semantic type of a field
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Text,
    Integer,
    Float,
    Boolean,
    Timestamp,
    Json,
    Relation(RelationKind),
}

impl FieldKind {
    pub fn is_relation(&self) -> bool {
        matches!(self, FieldKind::Relation(_))
    }

    /// Value kind a scalar field stores; `None` for relations
    pub fn value_kind(&self) -> Option<ValueKind> {
        match self {
            FieldKind::Text => Some(ValueKind::Text),
            FieldKind::Integer => Some(ValueKind::Integer),
            FieldKind::Float => Some(ValueKind::Float),
            FieldKind::Boolean => Some(ValueKind::Bool),
            FieldKind::Timestamp => Some(ValueKind::Timestamp),
            FieldKind::Json => Some(ValueKind::Json),
            FieldKind::Relation(_) => None,
        }
    }
}

/// Join table used by many-to-many relations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiddleSpec {
    pub model: String,
    /// Middle column holding this model's key
    pub local_field: String,
    /// Middle column holding the related model's key
    pub related_field: String,
}

/// Where a relation field points
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationSpec {
    pub model: String,
    /// Field on this model whose value drives the lookup
    pub local_field: String,
    /// Field on the related model matched against it
    pub related_field: String,
    pub middle: Option<MiddleSpec>,
}

impl RelationSpec {
    pub fn new(
        model: impl Into<String>,
        local_field: impl Into<String>,
        related_field: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            local_field: local_field.into(),
            related_field: related_field.into(),
            middle: None,
        }
    }

    pub fn through(
        mut self,
        model: impl Into<String>,
        local_field: impl Into<String>,
        related_field: impl Into<String>,
    ) -> Self {
        self.middle = Some(MiddleSpec {
            model: model.into(),
            local_field: local_field.into(),
            related_field: related_field.into(),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    /// Model that declared the field
    pub model: String,
    pub relation: Option<RelationSpec>,
    /// `true` once the field exists in a schema
    pub valid: bool,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            model: String::new(),
            relation: None,
            valid: false,
        }
    }

    pub fn relation(name: impl Into<String>, kind: RelationKind, spec: RelationSpec) -> Self {
        Self {
            relation: Some(spec),
            ..Self::new(name, FieldKind::Relation(kind))
        }
    }

    /// Descriptor for a name the schema does not know
    pub fn unset(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub fn is_relation(&self) -> bool {
        self.kind.is_relation()
    }

    pub fn relation_kind(&self) -> Option<&RelationKind> {
        match &self.kind {
            FieldKind::Relation(kind) => Some(kind),
            _ => None,
        }
    }
}

/// A field reachable through a relation or inheritance chain
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedField {
    pub field: String,
    /// Directly related model the field was reached through
    pub through_model: String,
    /// Local join field leading to `through_model`
    pub through_field: String,
    pub source: FieldDescriptor,
    /// Table of the model where the field is natively defined
    pub origin_table: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDef {
    pub name: String,
    pub fields: Vec<String>,
    pub unique: bool,
}

impl IndexDef {
    pub fn new<I, S>(name: impl Into<String>, fields: I, unique: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
            unique,
        }
    }
}

/// Columns with engine-managed semantics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecialColumns {
    pub created: Option<String>,
    pub updated: Option<String>,
    pub deleted: Option<String>,
    pub version: Option<String>,
    pub auto_increment: Option<String>,
}

/// Behavior method exported by a layer
pub type MethodFn = Arc<dyn Fn(&dyn ModelLayer, &[Value]) -> Result<Value> + Send + Sync>;

#[derive(Clone)]
pub struct MethodEntry {
    /// Layer type that provided the method
    pub type_name: &'static str,
    pub func: MethodFn,
}

impl MethodEntry {
    /// Invoke the method on `layer`
    ///
    /// # Errors
    ///
    /// Whatever the method itself returns.
    pub fn call(&self, layer: &dyn ModelLayer, args: &[Value]) -> Result<Value> {
        (self.func)(layer, args)
    }
}

impl fmt::Debug for MethodEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodEntry")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Immutable merged metadata for one model
#[derive(Debug, Clone, Default)]
pub struct SchemaSnapshot {
    pub name: String,
    pub table: String,
    pub fields: IndexMap<String, FieldDescriptor>,
    /// Related model name → local join field
    pub relations: IndexMap<String, String>,
    pub related_fields: IndexMap<String, RelatedField>,
    pub common_fields: IndexMap<String, FieldDescriptor>,
    pub indexes: Vec<IndexDef>,
    pub primary_keys: Vec<String>,
    pub special: SpecialColumns,
    pub defaults: IndexMap<String, Value>,
    pub methods: IndexMap<String, MethodEntry>,
    /// Region → implementing layer type; ordered for deterministic fallback
    pub regions: BTreeMap<String, LayerType>,
    /// Every layer type ever registered for the model, oldest first
    pub layer_order: Vec<LayerType>,
}

impl SchemaSnapshot {
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Native, common, then related lookup
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields
            .get(name)
            .or_else(|| self.common_fields.get(name))
            .or_else(|| self.related_fields.get(name).map(|r| &r.source))
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }
}

/// Shared handle to a model's canonical metadata
#[derive(Debug)]
pub struct Schema {
    name: String,
    state: RwLock<Arc<SchemaSnapshot>>,
}

impl Schema {
    pub fn new(snapshot: SchemaSnapshot) -> Self {
        Self {
            name: snapshot.name.clone(),
            state: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current published snapshot
    pub fn snapshot(&self) -> Arc<SchemaSnapshot> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Apply `edit` to a private copy and publish it as one unit
    pub fn update<R>(&self, edit: impl FnOnce(&mut SchemaSnapshot) -> R) -> R {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = SchemaSnapshot::clone(&guard);
        let result = edit(&mut next);
        *guard = Arc::new(next);
        result
    }

    pub fn field(&self, name: &str) -> Option<FieldDescriptor> {
        self.snapshot().field(name).cloned()
    }

    /// Register a field, tagging it with this model and marking it valid
    pub fn add_field(&self, mut field: FieldDescriptor) {
        field.model = self.name.clone();
        field.valid = true;
        self.update(|s| {
            s.fields.insert(field.name.clone(), field);
        });
    }

    pub fn get_default(&self, field: &str) -> Option<Value> {
        self.snapshot().defaults.get(field).cloned()
    }

    pub fn set_default(&self, field: impl Into<String>, value: impl Into<Value>) {
        let (field, value) = (field.into(), value.into());
        self.update(|s| {
            s.defaults.insert(field, value);
        });
    }

    pub fn primary_keys(&self) -> Vec<String> {
        self.snapshot().primary_keys.clone()
    }
}
