use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::{Filter, QueryOp, QueryRequest, Session};
use crate::errors::{OrmError, Result};
use crate::row::RawRecord;
use crate::value::Value;

/// In-memory session keyed by table name
///
/// Supports the request shapes model layers emit: inserts, updates and
/// deletes with `Eq`/`In` filters, and selects with an optional limit.
/// Values compare equal when they are identical or when both are non-null
/// and render the same text, so `Integer(7)` matches `Text("7")`.
#[derive(Debug, Default)]
pub struct MemorySession {
    tables: RwLock<HashMap<String, Vec<RawRecord>>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload records into `table`
    pub fn seed(&self, table: impl Into<String>, records: Vec<RawRecord>) {
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(table.into())
            .or_default()
            .extend(records);
    }

    /// Snapshot of everything stored in `table`
    pub fn records(&self, table: &str) -> Vec<RawRecord> {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(table)
            .cloned()
            .unwrap_or_default()
    }
}

fn values_match(stored: &Value, wanted: &Value) -> bool {
    if stored == wanted {
        return true;
    }
    !stored.is_null() && !wanted.is_null() && stored.to_text() == wanted.to_text()
}

fn matches(record: &RawRecord, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| {
        let stored = record.get(filter.field()).unwrap_or(&Value::Null);
        match filter {
            Filter::Eq(_, wanted) => values_match(stored, wanted),
            Filter::In(_, wanted) => wanted.iter().any(|w| values_match(stored, w)),
        }
    })
}

impl Session for MemorySession {
    fn fetch(&self, request: &QueryRequest) -> Result<Vec<RawRecord>> {
        if request.op != QueryOp::Select {
            return Err(OrmError::Session {
                message: format!("fetch called with {} request", request.op),
            });
        }

        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        let Some(records) = tables.get(&request.table) else {
            return Ok(Vec::new());
        };

        let limit = request.limit.unwrap_or(usize::MAX);
        Ok(records
            .iter()
            .filter(|r| matches(r, &request.filters))
            .take(limit)
            .cloned()
            .collect())
    }

    fn execute(&self, request: &QueryRequest) -> Result<u64> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let records = tables.entry(request.table.clone()).or_default();

        match request.op {
            QueryOp::Insert => {
                if request.values.is_empty() {
                    return Err(OrmError::Session {
                        message: format!("insert into {} without values", request.table),
                    });
                }
                records.push(request.values.clone());
                Ok(1)
            }
            QueryOp::Update => {
                let mut affected = 0;
                for record in records
                    .iter_mut()
                    .filter(|r| matches(r, &request.filters))
                {
                    for (field, value) in &request.values {
                        record.insert(field.clone(), value.clone());
                    }
                    affected += 1;
                }
                Ok(affected)
            }
            QueryOp::Delete => {
                let before = records.len();
                records.retain(|r| !matches(r, &request.filters));
                Ok((before - records.len()) as u64)
            }
            QueryOp::Select => Err(OrmError::Session {
                message: "execute called with select request".to_string(),
            }),
        }
    }
}
