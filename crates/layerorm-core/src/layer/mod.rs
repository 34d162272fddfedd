//! Model layers
//!
//! A layer is one concrete implementation of a model. It declares its schema
//! contribution through [`ModelLayer::layer_schema`] and carries per-instance
//! state in a [`LayerContext`] that the registry wires on every lookup.
//! Layers are instantiated fresh per lookup and never shared between callers.
//!
//! CRUD and relation fetches have default implementations that describe the
//! work as [`QueryRequest`](crate::session::QueryRequest)s for the attached
//! [`Session`]. Concrete layers override them when they need to.

mod ops;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::{OrmError, Result};
use crate::row::Row;
use crate::schema::{FieldDescriptor, LayerSchema, Schema};
use crate::session::{Filter, Session};
use crate::table::Table;
use crate::value::Value;

/// A registrable layer type: its name and a constructor for fresh instances
#[derive(Clone, Copy)]
pub struct LayerType {
    pub type_name: &'static str,
    factory: fn() -> Box<dyn ModelLayer>,
}

fn make<T: ModelLayer + Default + 'static>() -> Box<dyn ModelLayer> {
    Box::new(T::default())
}

impl LayerType {
    pub fn of<T: ModelLayer + Default + 'static>() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            factory: make::<T>,
        }
    }

    /// A fresh, unwired instance
    pub fn instantiate(&self) -> Box<dyn ModelLayer> {
        (self.factory)()
    }

    pub fn layer_schema(&self) -> LayerSchema {
        self.instantiate().layer_schema()
    }
}

impl PartialEq for LayerType {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name
    }
}

impl Eq for LayerType {}

impl fmt::Debug for LayerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LayerType").field(&self.type_name).finish()
    }
}

/// Per-instance state of a layer
#[derive(Clone, Default)]
pub struct LayerContext {
    pub name: String,
    pub table: String,
    pub region: String,
    pub schema: Option<Arc<Schema>>,
    pub session: Option<Arc<dyn Session>>,
    /// Context row; relation fetchers read join values from it
    pub row: Row,
    /// Instance of the layer registered before this one for the same model
    pub super_layer: Option<Arc<dyn ModelLayer>>,
    pub sequence: Option<String>,
    pub default_key_field: Option<String>,
    /// Related model → table, for every model a relation field points at
    pub related_tables: HashMap<String, String>,
}

impl fmt::Debug for LayerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerContext")
            .field("name", &self.name)
            .field("table", &self.table)
            .field("region", &self.region)
            .field("row", &self.row)
            .field("has_session", &self.session.is_some())
            .field("has_super", &self.super_layer.is_some())
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

impl LayerContext {
    /// Table name a related model's rows are fetched from
    pub fn related_table(&self, model: &str) -> String {
        self.related_tables
            .get(model)
            .cloned()
            .unwrap_or_else(|| model.to_string())
    }
}

pub trait ModelLayer: Send + Sync {
    /// This layer's contribution to the model schema
    fn layer_schema(&self) -> LayerSchema;

    fn context(&self) -> &LayerContext;

    fn context_mut(&mut self) -> &mut LayerContext;

    // ===== Identity =====

    fn name(&self) -> &str {
        &self.context().name
    }

    fn table(&self) -> &str {
        &self.context().table
    }

    fn region(&self) -> &str {
        &self.context().region
    }

    fn schema(&self) -> Option<&Arc<Schema>> {
        self.context().schema.as_ref()
    }

    /// Descriptor for `name`, or an unset descriptor when the schema lacks it
    fn field(&self, name: &str) -> FieldDescriptor {
        self.schema()
            .and_then(|s| s.field(name))
            .unwrap_or_else(|| FieldDescriptor::unset(name))
    }

    fn get_default(&self, field: &str) -> Option<Value> {
        self.schema().and_then(|s| s.get_default(field))
    }

    fn set_default(&self, field: &str, value: Value) {
        match self.schema() {
            Some(schema) => schema.set_default(field, value),
            None => tracing::warn!(model = self.name(), field, "set_default without schema"),
        }
    }

    /// Register a field on the bound schema, owned by this model
    fn add_field(&self, field: FieldDescriptor) {
        match self.schema() {
            Some(schema) => schema.add_field(field),
            None => tracing::warn!(
                model = self.name(),
                field = %field.name,
                "add_field without schema"
            ),
        }
    }

    /// The previously registered implementation of this model, if any
    fn super_layer(&self) -> Option<&dyn ModelLayer> {
        self.context().super_layer.as_deref()
    }

    // ===== Collaborators =====

    fn attach_session(&mut self, session: Arc<dyn Session>) {
        self.context_mut().session = Some(session);
    }

    /// The attached session
    ///
    /// # Errors
    ///
    /// `SessionMissing` when none is attached.
    fn session(&self) -> Result<&dyn Session> {
        self.context()
            .session
            .as_deref()
            .ok_or_else(|| OrmError::SessionMissing {
                model: self.name().to_string(),
            })
    }

    fn attach_row(&mut self, row: Row) {
        self.context_mut().row = row;
    }

    fn row(&self) -> &Row {
        &self.context().row
    }

    // ===== CRUD =====

    /// Insert one record, applying schema defaults and timestamp columns
    ///
    /// # Errors
    ///
    /// `EmptyRow`, `SessionMissing`, or the session's own failure.
    fn create(&self, values: Row) -> Result<Table> {
        ops::create(self, values)
    }

    /// Select records matching every filter; soft-deleted records are hidden
    ///
    /// # Errors
    ///
    /// `SessionMissing` or the session's own failure.
    fn read(&self, filters: &[Filter]) -> Result<Table> {
        ops::read(self, filters)
    }

    /// Update matching records, returning the affected count
    ///
    /// # Errors
    ///
    /// `SessionMissing` or the session's own failure.
    fn update(&self, values: Row, filters: &[Filter]) -> Result<u64> {
        ops::update(self, values, filters)
    }

    /// Delete matching records; soft delete when the schema has a deleted column
    ///
    /// # Errors
    ///
    /// `SessionMissing` or the session's own failure.
    fn delete(&self, filters: &[Filter]) -> Result<u64> {
        ops::delete(self, filters)
    }

    /// Insert, or update the record sharing the primary key values
    ///
    /// # Errors
    ///
    /// Same as [`ModelLayer::create`] and [`ModelLayer::update`].
    fn upload(&self, values: Row) -> Result<Table> {
        ops::upload(self, values)
    }

    // ===== Relations =====

    /// # Errors
    ///
    /// `NotARelation` when `field` carries no relation spec, or the session's failure.
    fn one_to_one(&self, field: &FieldDescriptor) -> Result<Table> {
        ops::fetch_direct(self, field, Some(1))
    }

    /// # Errors
    ///
    /// `NotARelation` when `field` carries no relation spec, or the session's failure.
    fn one_to_many(&self, field: &FieldDescriptor) -> Result<Table> {
        ops::fetch_direct(self, field, None)
    }

    /// # Errors
    ///
    /// `NotARelation` when `field` carries no relation spec, or the session's failure.
    fn many_to_one(&self, field: &FieldDescriptor) -> Result<Table> {
        ops::fetch_direct(self, field, Some(1))
    }

    /// # Errors
    ///
    /// `NotARelation` when `field` carries no relation spec,
    /// `UnsupportedRelationKind` when it names no middle model, or the
    /// session's failure.
    fn many_to_many(&self, field: &FieldDescriptor) -> Result<Table> {
        ops::fetch_through_middle(self, field)
    }

    /// Take over a prototype's whole context
    ///
    /// Used when a lazily created instance is activated. The sequence name
    /// is derived as `<model>_id_seq`.
    fn become_template(&mut self, template: &LayerContext) {
        let context = self.context_mut();
        *context = template.clone();
        context.sequence = Some(format!("{}_id_seq", context.name));
    }
}
