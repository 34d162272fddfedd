//! Default CRUD and relation fetch behavior shared by every layer

use chrono::Utc;
use indexmap::IndexSet;
use std::sync::Arc;

use super::ModelLayer;
use crate::errors::{OrmError, Result};
use crate::row::{RawRecord, Row};
use crate::schema::{FieldDescriptor, RelationSpec, SchemaSnapshot};
use crate::session::{Filter, QueryOp, QueryRequest};
use crate::table::Table;
use crate::value::Value;

fn snapshot_of<L: ModelLayer + ?Sized>(layer: &L) -> Arc<SchemaSnapshot> {
    match layer.schema() {
        Some(schema) => schema.snapshot(),
        None => Arc::new(SchemaSnapshot::empty(layer.name())),
    }
}

fn request<L: ModelLayer + ?Sized>(layer: &L, op: QueryOp) -> QueryRequest {
    QueryRequest::new(op, layer.name(), layer.table())
}

fn result_table<L: ModelLayer + ?Sized>(layer: &L, model: &str) -> Table {
    Table::new()
        .for_model(model)
        .with_default_key_field(layer.context().default_key_field.clone())
}

/// Fix `table`'s columns to the declared ones plus every column any record carries
///
/// Records from one fetch may differ in columns. With nothing to fix the
/// table keeps adopting its first row's fields.
fn with_result_columns<'a>(
    table: Table,
    declared: impl IntoIterator<Item = &'a String>,
    records: &[RawRecord],
) -> Table {
    let mut columns: IndexSet<String> = declared.into_iter().cloned().collect();
    for record in records {
        columns.extend(record.keys().cloned());
    }
    if columns.is_empty() {
        table
    } else {
        table.with_fields(columns)
    }
}

fn fill_if_unset(row: &mut Row, column: &str, value: &Value) {
    if !row.contains(column) || row.get_by_name(column).is_null() {
        row.set_by_name(column, value.clone());
    }
}

pub(super) fn create<L: ModelLayer + ?Sized>(layer: &L, values: Row) -> Result<Table> {
    let snapshot = snapshot_of(layer);
    let mut row = values;

    for (field, default) in &snapshot.defaults {
        if !row.contains(field) {
            row.set_by_name(field.clone(), default.clone());
        }
    }

    let now = Value::Timestamp(Utc::now());
    for column in [&snapshot.special.created, &snapshot.special.updated]
        .into_iter()
        .flatten()
    {
        fill_if_unset(&mut row, column, &now);
    }

    if row.is_empty() {
        return Err(OrmError::EmptyRow);
    }

    let session = layer.session()?;
    session.execute(&request(layer, QueryOp::Insert).values(row.as_generic_map()))?;

    let mut table = result_table(layer, layer.name());
    table.append_row(row)?;
    Ok(table)
}

fn visible(snapshot: &SchemaSnapshot, filters: &[Filter]) -> Vec<Filter> {
    let mut filters = filters.to_vec();
    if let Some(deleted) = &snapshot.special.deleted {
        if !filters.iter().any(|f| f.field() == deleted.as_str()) {
            filters.push(Filter::eq(deleted.clone(), Value::Null));
        }
    }
    filters
}

pub(super) fn read<L: ModelLayer + ?Sized>(layer: &L, filters: &[Filter]) -> Result<Table> {
    let snapshot = snapshot_of(layer);
    let session = layer.session()?;
    let records =
        session.fetch(&request(layer, QueryOp::Select).filters(visible(&snapshot, filters)))?;

    let mut table = with_result_columns(
        result_table(layer, layer.name()),
        snapshot.fields.keys(),
        &records,
    );
    table.append_records(records);
    Ok(table)
}

pub(super) fn update<L: ModelLayer + ?Sized>(
    layer: &L,
    values: Row,
    filters: &[Filter],
) -> Result<u64> {
    let snapshot = snapshot_of(layer);
    let mut row = values;
    if let Some(updated) = &snapshot.special.updated {
        fill_if_unset(&mut row, updated, &Value::Timestamp(Utc::now()));
    }
    if row.is_empty() {
        tracing::debug!(model = layer.name(), "update without values skipped");
        return Ok(0);
    }

    let session = layer.session()?;
    session.execute(
        &request(layer, QueryOp::Update)
            .filters(visible(&snapshot, filters))
            .values(row.as_generic_map()),
    )
}

pub(super) fn delete<L: ModelLayer + ?Sized>(layer: &L, filters: &[Filter]) -> Result<u64> {
    let snapshot = snapshot_of(layer);
    let session = layer.session()?;

    match &snapshot.special.deleted {
        Some(deleted) => {
            let mut values = RawRecord::new();
            values.insert(deleted.clone(), Value::Timestamp(Utc::now()));
            session.execute(
                &request(layer, QueryOp::Update)
                    .filters(visible(&snapshot, filters))
                    .values(values),
            )
        }
        None => session.execute(&request(layer, QueryOp::Delete).filters(filters.to_vec())),
    }
}

pub(super) fn upload<L: ModelLayer + ?Sized>(layer: &L, values: Row) -> Result<Table> {
    let snapshot = snapshot_of(layer);

    let key_filters: Option<Vec<Filter>> = if snapshot.primary_keys.is_empty() {
        None
    } else {
        snapshot
            .primary_keys
            .iter()
            .map(|pk| {
                let value = values.cell(pk).map(|c| &c.raw)?;
                (!value.is_null()).then(|| Filter::eq(pk.clone(), value.clone()))
            })
            .collect()
    };

    let Some(key_filters) = key_filters else {
        return layer.create(values);
    };

    let existing = layer.session()?.fetch(
        &request(layer, QueryOp::Select)
            .filters(visible(&snapshot, &key_filters))
            .limit(1),
    )?;

    if existing.is_empty() {
        layer.create(values)
    } else {
        layer.update(values, &key_filters)?;
        layer.read(&key_filters)
    }
}

fn relation_spec<'f, L: ModelLayer + ?Sized>(
    layer: &L,
    field: &'f FieldDescriptor,
) -> Result<&'f RelationSpec> {
    field.relation.as_ref().ok_or_else(|| OrmError::NotARelation {
        model: layer.name().to_string(),
        field: field.name.clone(),
    })
}

/// Join value from the context row; `None` when the row cannot drive a lookup
fn join_value<L: ModelLayer + ?Sized>(layer: &L, field: &str) -> Option<Value> {
    let row = layer.row();
    if !row.contains(field) || row.get_by_name(field).is_null() {
        tracing::debug!(
            model = layer.name(),
            field,
            "context row lacks relation join value"
        );
        return None;
    }
    Some(row.get_by_name(field).clone())
}

pub(super) fn fetch_direct<L: ModelLayer + ?Sized>(
    layer: &L,
    field: &FieldDescriptor,
    limit: Option<usize>,
) -> Result<Table> {
    let spec = relation_spec(layer, field)?;
    let mut table = result_table(layer, &spec.model);
    let Some(value) = join_value(layer, &spec.local_field) else {
        return Ok(table);
    };

    let mut query = QueryRequest::new(
        QueryOp::Select,
        spec.model.clone(),
        layer.context().related_table(&spec.model),
    )
    .filter(Filter::eq(spec.related_field.clone(), value));
    query.limit = limit;

    let records = layer.session()?.fetch(&query)?;
    table = with_result_columns(table, [], &records);
    table.append_records(records);
    Ok(table)
}

pub(super) fn fetch_through_middle<L: ModelLayer + ?Sized>(
    layer: &L,
    field: &FieldDescriptor,
) -> Result<Table> {
    let spec = relation_spec(layer, field)?;
    let Some(middle) = &spec.middle else {
        return Err(OrmError::UnsupportedRelationKind {
            model: layer.name().to_string(),
            field: field.name.clone(),
            kind: "many2many without middle model".to_string(),
        });
    };

    let mut table = result_table(layer, &spec.model);
    let Some(value) = join_value(layer, &spec.local_field) else {
        return Ok(table);
    };

    let session = layer.session()?;
    let links = session.fetch(
        &QueryRequest::new(
            QueryOp::Select,
            middle.model.clone(),
            layer.context().related_table(&middle.model),
        )
        .filter(Filter::eq(middle.local_field.clone(), value)),
    )?;

    let keys: Vec<Value> = links
        .iter()
        .filter_map(|link| link.get(&middle.related_field).cloned())
        .filter(|v| !v.is_null())
        .collect();
    if keys.is_empty() {
        return Ok(table);
    }

    let records = session.fetch(
        &QueryRequest::new(
            QueryOp::Select,
            spec.model.clone(),
            layer.context().related_table(&spec.model),
        )
        .filter(Filter::In(spec.related_field.clone(), keys)),
    )?;
    table = with_result_columns(table, [], &records);
    table.append_records(records);
    Ok(table)
}
