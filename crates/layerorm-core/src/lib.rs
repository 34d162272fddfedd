//! layerorm core - object/relation metadata engine
//!
//! This crate provides the runtime metadata layer of the data-access library,
//! including:
//! - Model layers that independently implement the same model and are merged
//!   into one canonical schema per model name
//! - Relation and inheritance resolution across a possibly cyclic model graph
//! - Dynamically typed rows and tables with dual raw/display views, cursors
//!   and key indexes
//! - Type-coerced field access and struct binding
//!
//! SQL construction and execution stay behind the [`session::Session`] trait.

pub mod config;
pub mod errors;
pub mod layer;
pub mod logging_facility;
pub mod registry;
pub mod relation;
pub mod row;
pub mod schema;
pub mod session;
pub mod table;
pub mod value;

pub use layerorm_core_types;

// Re-export commonly used types
pub use config::CoreConfig;
pub use errors::{ExError, ExErrorKind, OrmError, Result};
pub use layer::{LayerContext, LayerType, ModelLayer};
pub use registry::Registry;
pub use relation::get_relate;
pub use row::{Bindable, BindTable, Cell, FieldHandle, RawRecord, Row};
pub use schema::{
    FieldDescriptor, FieldKind, IndexDef, LayerSchema, RelationKind, RelationSpec, Schema,
};
pub use session::{Filter, MemorySession, QueryOp, QueryRequest, Session};
pub use table::Table;
pub use value::{Value, ValueKind};
