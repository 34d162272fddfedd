//! Session seam
//!
//! The engine never builds SQL. Model layers describe what they need as a
//! [`QueryRequest`] and hand it to whatever [`Session`] is attached. Statement
//! construction, dialects, pooling and transactions live behind this trait.

pub mod memory;

use std::fmt;

use crate::errors::Result;
use crate::row::RawRecord;
use crate::value::Value;

pub use memory::MemorySession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOp {
    Select,
    Insert,
    Update,
    Delete,
}

impl fmt::Display for QueryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryOp::Select => f.write_str("select"),
            QueryOp::Insert => f.write_str("insert"),
            QueryOp::Update => f.write_str("update"),
            QueryOp::Delete => f.write_str("delete"),
        }
    }
}

/// Row predicate; a request's filters are AND-ed
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    In(String, Vec<Value>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    pub fn is_in<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Filter::In(field.into(), values.into_iter().map(Into::into).collect())
    }

    pub fn field(&self) -> &str {
        match self {
            Filter::Eq(field, _) | Filter::In(field, _) => field,
        }
    }
}

/// A data operation against one model's table
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub op: QueryOp,
    pub model: String,
    pub table: String,
    pub filters: Vec<Filter>,
    /// Column values for inserts and updates
    pub values: RawRecord,
    pub limit: Option<usize>,
}

impl QueryRequest {
    pub fn new(op: QueryOp, model: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            op,
            model: model.into(),
            table: table.into(),
            filters: Vec::new(),
            values: RawRecord::new(),
            limit: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters.extend(filters);
        self
    }

    pub fn values(mut self, values: RawRecord) -> Self {
        self.values = values;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Data access collaborator
pub trait Session: Send + Sync {
    /// Run a select and return the matching records
    ///
    /// # Errors
    ///
    /// Implementation-defined; conventionally `OrmError::Session`.
    fn fetch(&self, request: &QueryRequest) -> Result<Vec<RawRecord>>;

    /// Run an insert, update or delete and return the affected row count
    ///
    /// # Errors
    ///
    /// Implementation-defined; conventionally `OrmError::Session`.
    fn execute(&self, request: &QueryRequest) -> Result<u64>;
}
