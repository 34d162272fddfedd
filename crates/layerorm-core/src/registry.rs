//! Model registry
//!
//! Owns every model's [`Schema`] and resolves model names to fresh layer
//! instances. Registration folds each layer's declaration into the model's
//! schema; lookup instantiates the implementing type for a region and wires
//! its context.
//!
//! # Logging
//!
//! Public operations here own boundary logging:
//! - `log_op_start!` at entry
//! - `log_op_end!` on success
//! - `log_op_error!` on failure
//!
//! Lower layers (schema, relation, table, row) use only `tracing::debug!()`
//! and `tracing::warn!()` for internal details.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use crate::config::CoreConfig;
use crate::errors::{OrmError, Result};
use crate::layer::{LayerContext, LayerType, ModelLayer};
use crate::relation;
use crate::row::Row;
use crate::schema::merge::merge_layer;
use crate::schema::{MethodEntry, Schema, SchemaSnapshot};
use crate::value::Value;
use crate::{log_op_end, log_op_error, log_op_start};

#[derive(Debug, Default)]
pub struct Registry {
    config: CoreConfig,
    schemas: RwLock<HashMap<String, Arc<Schema>>>,
}

impl Registry {
    pub fn new(config: CoreConfig) -> Self {
        Self {
            config,
            schemas: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    fn resolve_region<'a>(&'a self, region: Option<&'a str>) -> &'a str {
        region
            .filter(|r| !r.is_empty())
            .unwrap_or(self.config.default_region.as_str())
    }

    // ===== Registration =====

    /// Register `layer_type` under `region`
    ///
    /// The first registration for a model name creates its schema; later
    /// ones merge into it. An empty region means the default region.
    /// Registering under any other region drops the model's default-region
    /// entry.
    ///
    /// # Errors
    ///
    /// `InvalidLayer` when the layer declares an empty model name.
    pub fn register(&self, region: &str, layer_type: LayerType) -> Result<()> {
        let region = self.resolve_region(Some(region));
        log_op_start!("register", region = region, layer = layer_type.type_name);
        let start = Instant::now();

        let model = self.register_impl(region, layer_type).map_err(|e| {
            log_op_error!(
                "register",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            e
        })?;

        log_op_end!(
            "register",
            duration_ms = start.elapsed().as_millis() as u64,
            model = model.as_str()
        );
        Ok(())
    }

    /// Register `T` under `region`
    ///
    /// # Errors
    ///
    /// Same as [`Registry::register`].
    pub fn register_layer<T: ModelLayer + Default + 'static>(&self, region: &str) -> Result<()> {
        self.register(region, LayerType::of::<T>())
    }

    fn register_impl(&self, region: &str, layer_type: LayerType) -> Result<String> {
        let declaration = layer_type.layer_schema();
        if declaration.name.is_empty() {
            return Err(OrmError::InvalidLayer {
                layer: layer_type.type_name.to_string(),
                message: "empty model name".to_string(),
            });
        }

        let schema = self
            .schemas
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(declaration.name.clone())
            .or_insert_with(|| Arc::new(Schema::new(SchemaSnapshot::empty(&declaration.name))))
            .clone();

        let default_region = self.config.default_region.as_str();
        let stats = schema.update(|snapshot| {
            let stats = merge_layer(snapshot, &declaration, layer_type);
            snapshot.regions.insert(region.to_string(), layer_type);
            if region != default_region && snapshot.regions.remove(default_region).is_some() {
                tracing::debug!(
                    model = %declaration.name,
                    region = default_region,
                    "default region entry replaced by named region"
                );
            }
            stats
        });

        tracing::debug!(
            model = %declaration.name,
            layer = layer_type.type_name,
            fields_added = stats.fields_added,
            fields_replaced = stats.fields_replaced,
            methods = stats.methods,
            "layer merged"
        );
        Ok(declaration.name)
    }

    // ===== Lookup =====

    /// A fresh layer instance for `name` in `region` (default region when `None`)
    ///
    /// Falls back to the lexicographically first registered region when the
    /// requested one has no implementation. Relation resolution runs before
    /// the instance is returned.
    ///
    /// # Errors
    ///
    /// `ModelNotFound` when the name or every region fails to resolve.
    pub fn get_model(&self, name: &str, region: Option<&str>) -> Result<Box<dyn ModelLayer>> {
        let region = self.resolve_region(region);
        log_op_start!("get_model", model = name, region = region);
        let start = Instant::now();

        let layer = self.get_model_impl(name, region).map_err(|e| {
            log_op_error!(
                "get_model",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            e
        })?;

        log_op_end!(
            "get_model",
            duration_ms = start.elapsed().as_millis() as u64,
            model = name,
            region = layer.region()
        );
        Ok(layer)
    }

    fn get_model_impl(&self, name: &str, region: &str) -> Result<Box<dyn ModelLayer>> {
        let not_found = || OrmError::ModelNotFound {
            model: name.to_string(),
            region: region.to_string(),
        };

        let schema = self.schema(name).ok_or_else(not_found)?;
        let snapshot = schema.snapshot();
        let (resolved, layer_type) = snapshot
            .regions
            .get_key_value(region)
            .or_else(|| snapshot.regions.iter().next())
            .ok_or_else(not_found)?;

        if resolved != region {
            tracing::debug!(
                model = name,
                requested = region,
                resolved = %resolved,
                "region fallback"
            );
        }

        let layer = self.wire(&schema, &snapshot, resolved, *layer_type);
        relation::relations_reload(self, name)?;
        Ok(layer)
    }

    /// Instantiate `layer_type` and wire its context, super chain included
    fn wire(
        &self,
        schema: &Arc<Schema>,
        snapshot: &SchemaSnapshot,
        region: &str,
        layer_type: LayerType,
    ) -> Box<dyn ModelLayer> {
        let super_layer = snapshot
            .layer_order
            .iter()
            .position(|t| *t == layer_type)
            .and_then(|i| i.checked_sub(1))
            .map(|prev| {
                let parent = self.wire(schema, snapshot, region, snapshot.layer_order[prev]);
                Arc::<dyn ModelLayer>::from(parent)
            });

        let mut layer = layer_type.instantiate();
        *layer.context_mut() = LayerContext {
            name: snapshot.name.clone(),
            table: snapshot.table.clone(),
            region: region.to_string(),
            schema: Some(schema.clone()),
            session: None,
            row: Row::new(),
            super_layer,
            sequence: None,
            default_key_field: self.config.default_key_field.clone(),
            related_tables: self.related_tables(snapshot),
        };
        layer
    }

    fn related_tables(&self, snapshot: &SchemaSnapshot) -> HashMap<String, String> {
        let mut tables = HashMap::new();
        let specs = snapshot
            .fields
            .values()
            .chain(snapshot.common_fields.values())
            .filter_map(|f| f.relation.as_ref());

        for spec in specs {
            let middle = spec.middle.as_ref().map(|m| m.model.as_str());
            for model in std::iter::once(spec.model.as_str()).chain(middle) {
                if let Some(related) = self.schema(model) {
                    tables.insert(model.to_string(), related.snapshot().table.clone());
                }
            }
        }
        tables
    }

    /// Method `method` recorded for `model`
    ///
    /// # Errors
    ///
    /// `MethodNotFound` when the model or the method is unknown.
    pub fn get_method(&self, model: &str, method: &str) -> Result<MethodEntry> {
        log_op_start!("get_method", model = model, method = method);
        let start = Instant::now();

        let entry = self
            .schema(model)
            .and_then(|s| s.snapshot().methods.get(method).cloned())
            .ok_or_else(|| OrmError::MethodNotFound {
                model: model.to_string(),
                method: method.to_string(),
            })
            .map_err(|e| {
                log_op_error!(
                    "get_method",
                    e.clone(),
                    duration_ms = start.elapsed().as_millis() as u64
                );
                e
            })?;

        log_op_end!(
            "get_method",
            duration_ms = start.elapsed().as_millis() as u64,
            layer = entry.type_name
        );
        Ok(entry)
    }

    /// Look up `method` on the layer's model and invoke it on `layer`
    ///
    /// # Errors
    ///
    /// `MethodNotFound`, or whatever the method returns.
    pub fn call_method(
        &self,
        layer: &dyn ModelLayer,
        method: &str,
        args: &[Value],
    ) -> Result<Value> {
        self.get_method(layer.name(), method)?.call(layer, args)
    }

    pub fn schema(&self, name: &str) -> Option<Arc<Schema>> {
        self.schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Registered model names, sorted
    pub fn models(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Rebuild related fields for `model` and everything it reaches
    ///
    /// # Errors
    ///
    /// `ModelNotFound` when `model` is not registered.
    pub fn relations_reload(&self, model: &str) -> Result<usize> {
        log_op_start!("relations_reload", model = model);
        let start = Instant::now();

        let count = relation::relations_reload(self, model).map_err(|e| {
            log_op_error!(
                "relations_reload",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            e
        })?;

        log_op_end!(
            "relations_reload",
            duration_ms = start.elapsed().as_millis() as u64,
            related_fields = count
        );
        Ok(count)
    }

    /// Drop a model's schema; `false` when it was not registered
    pub fn remove(&self, name: &str) -> bool {
        self.schemas
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some()
    }

    pub fn clear(&self) {
        self.schemas
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
