//! Rows: named, ordered field values with an optional display view
//!
//! Each field owns a single [`Cell`] holding its raw value and an optional
//! "classic" (display) value, so the two views can never drift apart in
//! length. Insertion order fixes positional order.

pub mod bind;
pub mod field;

use indexmap::IndexMap;
use std::collections::HashMap;

use crate::value::Value;

pub use bind::{BindReport, BindTable, Bindable};
pub use field::FieldHandle;

/// A raw record as produced by the session collaborator
pub type RawRecord = IndexMap<String, Value>;

static EMPTY: Value = Value::Text(String::new());

/// Raw value plus optional display representation for one field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    pub raw: Value,
    pub classic: Option<Value>,
}

impl Cell {
    pub fn new(raw: Value) -> Self {
        Self { raw, classic: None }
    }

    /// Display value, falling back to the raw value
    pub fn classic_or_raw(&self) -> &Value {
        self.classic.as_ref().unwrap_or(&self.raw)
    }
}

/// One record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: IndexMap<String, Cell>,
}

impl Row {
    /// Create an empty Row
    pub fn new() -> Self {
        Self {
            cells: IndexMap::new(),
        }
    }

    /// Build a Row from field → value pairs, keeping their order
    pub fn from_map<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut row = Self::new();
        for (name, value) in fields {
            row.set_by_name(name, value.into());
        }
        row
    }

    pub fn from_record(record: RawRecord) -> Self {
        Self {
            cells: record
                .into_iter()
                .map(|(name, raw)| (name, Cell::new(raw)))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cells.contains_key(name)
    }

    /// Field names in positional order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    /// Positional index of a field
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.cells.get_index_of(name)
    }

    pub fn cell(&self, name: &str) -> Option<&Cell> {
        self.cells.get(name)
    }

    /// Iterate over (name, raw value) pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.cells.iter().map(|(k, c)| (k.as_str(), &c.raw))
    }

    /// Raw value at `index`, or the empty-string sentinel when out of range
    pub fn get(&self, index: usize) -> &Value {
        self.cells
            .get_index(index)
            .map(|(_, c)| &c.raw)
            .unwrap_or(&EMPTY)
    }

    /// Overwrite the raw value at `index`; `false` when out of range
    pub fn set(&mut self, index: usize, value: impl Into<Value>) -> bool {
        match self.cells.get_index_mut(index) {
            Some((_, cell)) => {
                cell.raw = value.into();
                true
            }
            None => {
                tracing::debug!(index, len = self.cells.len(), "row set out of range");
                false
            }
        }
    }

    /// Raw value of `name`, or the empty-string sentinel for unknown names
    pub fn get_by_name(&self, name: &str) -> &Value {
        self.cells.get(name).map(|c| &c.raw).unwrap_or(&EMPTY)
    }

    /// Set the raw value of `name`, appending the field when new
    ///
    /// Returns the field's positional index.
    pub fn set_by_name(&mut self, name: impl Into<String>, value: impl Into<Value>) -> usize {
        let value = value.into();
        let entry = self.cells.entry(name.into());
        let index = entry.index();
        entry.or_default().raw = value;
        index
    }

    /// Display value at `index` (raw fallback), or the sentinel when out of range
    pub fn get_classic(&self, index: usize) -> &Value {
        self.cells
            .get_index(index)
            .map(|(_, c)| c.classic_or_raw())
            .unwrap_or(&EMPTY)
    }

    /// Display value of `name` (raw fallback), or the sentinel for unknown names
    pub fn get_classic_by_name(&self, name: &str) -> &Value {
        self.cells
            .get(name)
            .map(Cell::classic_or_raw)
            .unwrap_or(&EMPTY)
    }

    /// Set the display value of `name`, appending the field (raw `Null`) when new
    pub fn set_classic_by_name(
        &mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> usize {
        let value = value.into();
        let entry = self.cells.entry(name.into());
        let index = entry.index();
        entry.or_default().classic = Some(value);
        index
    }

    /// Whether any field carries a display value
    pub fn has_classic(&self) -> bool {
        self.cells.values().any(|c| c.classic.is_some())
    }

    /// Remove a field, keeping the order of the rest
    pub fn remove(&mut self, name: &str) -> Option<Cell> {
        self.cells.shift_remove(name)
    }

    /// Typed accessor bound to one field of this Row
    pub fn field(&mut self, name: &str) -> FieldHandle<'_> {
        FieldHandle::new(name, self)
    }

    /// Field → textual raw value
    pub fn as_string_map(&self) -> IndexMap<String, String> {
        self.cells
            .iter()
            .map(|(k, c)| (k.clone(), c.raw.to_text()))
            .collect()
    }

    /// Field → raw value
    pub fn as_generic_map(&self) -> RawRecord {
        self.cells
            .iter()
            .map(|(k, c)| (k.clone(), c.raw.clone()))
            .collect()
    }

    /// Flat JSON object of raw values; relations are not expanded
    pub fn as_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .cells
            .iter()
            .map(|(k, c)| (k.clone(), c.raw.to_json()))
            .collect();
        serde_json::Value::Object(map)
    }

    /// Copy this Row's textual values into `map`, overwriting shared keys
    pub fn merge_into_string_map(&self, map: &mut HashMap<String, String>) {
        map.extend(self.cells.iter().map(|(k, c)| (k.clone(), c.raw.to_text())));
    }

    /// Bind this Row into `target` through its declared accessor table
    ///
    /// `classic` selects the display view. Binding never aborts: unknown
    /// members, nulls and uncoercible values are skipped and reported.
    pub fn as_struct<T: Bindable>(&self, target: &mut T, classic: bool) -> BindReport {
        bind::bind_row(self, target, classic)
    }
}

impl From<RawRecord> for Row {
    fn from(record: RawRecord) -> Self {
        Row::from_record(record)
    }
}
