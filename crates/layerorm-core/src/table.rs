//! Tables: ordered rows with a cursor and an optional key index
//!
//! The first non-empty row appended fixes the canonical field set; later rows
//! must use a subset of it. Appends are not atomic: valid rows in a batch are
//! kept even when a later row is rejected.
//!
//! The cursor lives behind its own mutex so `first`/`next`/`record` work
//! through `&Table` and never block other tables.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock, PoisonError};

use layerorm_core_types::schema::EVENT_ROW_REJECTED;

use crate::errors::{OrmError, Result};
use crate::log_diagnostic;
use crate::row::{RawRecord, Row};
use crate::value::Value;

fn empty_row() -> &'static Row {
    static EMPTY: OnceLock<Row> = OnceLock::new();
    EMPTY.get_or_init(Row::new)
}

#[derive(Debug, Default)]
pub struct Table {
    rows: Vec<Row>,
    position: Mutex<usize>,
    fields: Option<Vec<String>>,
    key_field: Option<String>,
    key_index: Option<HashMap<String, usize>>,
    default_key_field: Option<String>,
    model: Option<String>,
}

impl Clone for Table {
    fn clone(&self) -> Self {
        Self {
            rows: self.rows.clone(),
            position: Mutex::new(self.position()),
            fields: self.fields.clone(),
            key_field: self.key_field.clone(),
            key_index: self.key_index.clone(),
            default_key_field: self.default_key_field.clone(),
            model: self.model.clone(),
        }
    }
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag the table with the model it was queried for (used in diagnostics)
    pub fn for_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Fallback key field used by `record_by_key` when none was set
    pub fn with_default_key_field(mut self, field: Option<String>) -> Self {
        self.default_key_field = field;
        self
    }

    /// Fix the canonical field set up front instead of adopting the first row's
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Build a table from session records; rows outside the schema are logged and dropped
    pub fn from_records(records: Vec<RawRecord>) -> Self {
        let mut table = Self::new();
        table.append_records(records);
        table
    }

    pub(crate) fn append_records(&mut self, records: Vec<RawRecord>) {
        let rows = records.into_iter().map(Row::from_record).collect();
        // Rejections are already logged per row
        let _ = self.append_rows(rows);
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether any row carries display values next to its raw ones
    pub fn is_classic(&self) -> bool {
        self.rows.iter().any(Row::has_classic)
    }

    /// Canonical field set, once established
    pub fn fields(&self) -> Option<&[String]> {
        self.fields.as_deref()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn get(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }

    // ===== Cursor =====

    pub fn position(&self) -> usize {
        *self.position.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_position(&self, position: usize) {
        *self.position.lock().unwrap_or_else(PoisonError::into_inner) = position;
    }

    pub fn first(&self) {
        self.set_position(0);
    }

    pub fn next(&self) {
        let mut position = self.position.lock().unwrap_or_else(PoisonError::into_inner);
        if *position < self.rows.len() {
            *position += 1;
        }
    }

    pub fn eof(&self) -> bool {
        self.position() >= self.rows.len()
    }

    /// Row at the cursor, or an empty Row when there is none
    pub fn record(&self) -> &Row {
        self.rows.get(self.position()).unwrap_or_else(|| empty_row())
    }

    /// Raw value of `name` on the current record
    pub fn field_by_name(&self, name: &str) -> &Value {
        self.record().get_by_name(name)
    }

    // ===== Mutation =====

    /// Append one row
    ///
    /// # Errors
    ///
    /// `EmptyRow` for a row with no fields, `RowNotInSchema` when the row
    /// uses fields outside the canonical set.
    pub fn append_row(&mut self, row: Row) -> Result<()> {
        self.append_rows(vec![row]).map(|_| ())
    }

    /// Append rows, keeping every valid one
    ///
    /// Returns the number of rows appended. Invalid rows are logged and
    /// skipped; valid rows before and after them are still appended.
    ///
    /// # Errors
    ///
    /// `RowNotInSchema` (listing the unknown fields of the rejected rows) or
    /// `EmptyRow` when at least one row was rejected.
    pub fn append_rows(&mut self, rows: Vec<Row>) -> Result<usize> {
        let mut appended = 0;
        let mut rejected = 0;
        let mut empty_rejected = false;
        let mut unknown: Vec<String> = Vec::new();

        for row in rows {
            if row.is_empty() {
                log_diagnostic!(
                    EVENT_ROW_REJECTED,
                    model = self.model.as_deref().unwrap_or_default(),
                    "empty row rejected"
                );
                empty_rejected = true;
                continue;
            }

            if self.fields.is_none() && self.rows.is_empty() {
                self.fields = Some(row.field_names().map(str::to_string).collect());
            } else if let Some(canonical) = &self.fields {
                let extra: Vec<String> = row
                    .field_names()
                    .filter(|f| !canonical.iter().any(|c| c.as_str() == *f))
                    .map(str::to_string)
                    .collect();
                if !extra.is_empty() {
                    log_diagnostic!(
                        EVENT_ROW_REJECTED,
                        model = self.model.as_deref().unwrap_or_default(),
                        fields = ?extra,
                        "row field not part of table schema"
                    );
                    rejected += 1;
                    for f in extra {
                        if !unknown.contains(&f) {
                            unknown.push(f);
                        }
                    }
                    continue;
                }
            }

            self.rows.push(row);
            self.set_position(self.rows.len() - 1);
            self.key_index = None;
            appended += 1;
        }

        if rejected > 0 {
            return Err(OrmError::RowNotInSchema {
                fields: unknown,
                rejected,
            });
        }
        if empty_rejected {
            return Err(OrmError::EmptyRow);
        }
        Ok(appended)
    }

    /// Build a row from a field → value map and append it
    ///
    /// # Errors
    ///
    /// Same as [`Table::append_row`].
    pub fn new_record<I, K, V>(&mut self, fields: I) -> Result<&Row>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.append_row(Row::from_map(fields))?;
        Ok(&self.rows[self.rows.len() - 1])
    }

    /// Remove the row at `index`, or at the cursor when `None`
    ///
    /// Deleting from an empty table is a no-op.
    ///
    /// # Errors
    ///
    /// `IndexOutOfBounds` when the index is past the end.
    pub fn delete(&mut self, index: Option<usize>) -> Result<()> {
        if self.rows.is_empty() {
            return Ok(());
        }
        let index = index.unwrap_or_else(|| self.position());
        if index >= self.rows.len() {
            return Err(OrmError::IndexOutOfBounds {
                index,
                len: self.rows.len(),
            });
        }
        self.rows.remove(index);
        self.key_index = None;
        let position = self.position().min(self.rows.len());
        self.set_position(position);
        Ok(())
    }

    // ===== Lookup =====

    /// Linear scan for the first row whose `name` equals `value`
    pub fn record_by_field(&self, name: &str, value: &Value) -> Option<&Row> {
        self.rows
            .iter()
            .find(|row| row.cell(name).is_some_and(|c| &c.raw == value))
    }

    pub fn key_field(&self) -> Option<&str> {
        self.key_field.as_deref()
    }

    /// Index rows by the textual value of `name`, replacing any previous index
    ///
    /// # Errors
    ///
    /// `EmptyTable` when there are no rows; `AggregateKeyField` when the
    /// result is a single-column aggregate that lacks `name`. Neither error
    /// touches the existing index.
    pub fn set_key_field(&mut self, name: &str) -> Result<()> {
        let Some(first) = self.rows.first() else {
            return Err(OrmError::EmptyTable {
                op: "set_key_field".to_string(),
            });
        };
        if first.len() == 1 && !first.contains(name) {
            return Err(OrmError::AggregateKeyField {
                field: name.to_string(),
            });
        }

        self.key_index = Some(self.build_index(name));
        self.key_field = Some(name.to_string());
        Ok(())
    }

    fn build_index(&self, name: &str) -> HashMap<String, usize> {
        let mut index = HashMap::with_capacity(self.rows.len());
        for (i, row) in self.rows.iter().enumerate() {
            match row.cell(name) {
                Some(cell) => {
                    index.insert(cell.raw.to_text(), i);
                }
                None => tracing::debug!(field = name, row = i, "row lacks key field"),
            }
        }
        index
    }

    fn ensure_key_field(&mut self, default_field: Option<&str>) -> Result<()> {
        if self.key_field.is_some() {
            return Ok(());
        }
        let fallback = default_field
            .map(str::to_string)
            .or_else(|| self.default_key_field.clone());
        match fallback {
            Some(field) => self.set_key_field(&field),
            None => {
                tracing::warn!(
                    model = self.model.as_deref().unwrap_or_default(),
                    "record_by_key without a key field"
                );
                Err(OrmError::KeyFieldUnset)
            }
        }
    }

    fn ensure_index(&mut self) {
        if self.key_index.is_none() {
            if let Some(field) = self.key_field.clone() {
                self.key_index = Some(self.build_index(&field));
            }
        }
    }

    /// Look up a row by key
    ///
    /// Without a key field, `default_field` and then the table's configured
    /// default key field are tried.
    ///
    /// # Errors
    ///
    /// `KeyFieldUnset` when no key field resolves, or the errors of
    /// [`Table::set_key_field`] for the fallback field.
    pub fn record_by_key(
        &mut self,
        key: &str,
        default_field: Option<&str>,
    ) -> Result<Option<&Row>> {
        self.ensure_key_field(default_field)?;
        self.ensure_index();
        let position = self.key_index.as_ref().and_then(|idx| idx.get(key).copied());
        Ok(position.and_then(|i| self.rows.get(i)))
    }

    /// All indexed keys, sorted
    ///
    /// # Errors
    ///
    /// Same as [`Table::record_by_key`] when no key field resolves.
    pub fn keys(&mut self) -> Result<Vec<String>> {
        self.ensure_key_field(None)?;
        self.ensure_index();
        let mut keys: Vec<String> = self
            .key_index
            .as_ref()
            .map(|idx| idx.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        Ok(keys)
    }

    // ===== Export =====

    /// JSON array of flat row objects
    pub fn as_json(&self) -> serde_json::Value {
        serde_json::Value::Array(self.rows.iter().map(Row::as_json).collect())
    }
}
