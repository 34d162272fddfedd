//! Field handles: typed, dual-mode accessors over one field of one Row
//!
//! Every accessor takes an `Option`. `Some(v)` writes through to the Row,
//! marks the handle valid and returns what was written; `None` reads and
//! coerces the current value. A handle for a name the Row does not have never
//! faults: reads return the type's zero value, writes append the field.

use chrono::{DateTime, Utc};
use layerorm_core_types::schema::EVENT_COERCION_SKIPPED;

use super::Row;
use crate::log_diagnostic;
use crate::value::{Value, ValueKind};

pub struct FieldHandle<'a> {
    name: String,
    row: &'a mut Row,
    valid: bool,
}

impl<'a> FieldHandle<'a> {
    pub(crate) fn new(name: &str, row: &'a mut Row) -> Self {
        let valid = row.contains(name);
        Self {
            name: name.to_string(),
            row,
            valid,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the field exists on the Row (or has been written through this handle)
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    fn write(&mut self, value: Value) {
        self.row.set_by_name(self.name.clone(), value);
        self.valid = true;
    }

    fn read(&self) -> Option<&Value> {
        if !self.valid {
            return None;
        }
        self.row.cell(&self.name).map(|c| &c.raw)
    }

    fn read_as<T>(&self, kind: ValueKind, convert: impl Fn(&Value) -> Option<T>) -> Option<T> {
        let value = self.read()?;
        if value.is_null() {
            return None;
        }
        let converted = convert(value);
        if converted.is_none() {
            log_diagnostic!(
                EVENT_COERCION_SKIPPED,
                field = %self.name,
                from = %value.kind(),
                to = %kind,
                "field handle read fell back to zero value"
            );
        }
        converted
    }

    pub fn as_string(&mut self, value: Option<&str>) -> String {
        match value {
            Some(v) => {
                self.write(Value::from(v));
                v.to_string()
            }
            None => self.read().map(Value::to_text).unwrap_or_default(),
        }
    }

    pub fn as_integer(&mut self, value: Option<i64>) -> i64 {
        match value {
            Some(v) => {
                self.write(Value::Integer(v));
                v
            }
            None => self
                .read_as(ValueKind::Integer, Value::to_integer)
                .unwrap_or_default(),
        }
    }

    pub fn as_boolean(&mut self, value: Option<bool>) -> bool {
        match value {
            Some(v) => {
                self.write(Value::Bool(v));
                v
            }
            None => self
                .read_as(ValueKind::Bool, Value::to_boolean)
                .unwrap_or_default(),
        }
    }

    pub fn as_float(&mut self, value: Option<f64>) -> f64 {
        match value {
            Some(v) => {
                self.write(Value::Float(v));
                v
            }
            None => self
                .read_as(ValueKind::Float, Value::to_float)
                .unwrap_or_default(),
        }
    }

    /// Zero value is the Unix epoch
    pub fn as_timestamp(&mut self, value: Option<DateTime<Utc>>) -> DateTime<Utc> {
        match value {
            Some(v) => {
                self.write(Value::Timestamp(v));
                v
            }
            None => self
                .read_as(ValueKind::Timestamp, Value::to_timestamp)
                .unwrap_or_default(),
        }
    }

    /// Untyped access; zero value is `Null`
    pub fn as_generic(&mut self, value: Option<Value>) -> Value {
        match value {
            Some(v) => {
                self.write(v.clone());
                v
            }
            None => self.read().cloned().unwrap_or_default(),
        }
    }

    /// Display value access; reads fall back to the raw value
    pub fn as_classic(&mut self, value: Option<Value>) -> Value {
        match value {
            Some(v) => {
                self.row.set_classic_by_name(self.name.clone(), v.clone());
                self.valid = true;
                v
            }
            None if self.valid => self.row.get_classic_by_name(&self.name).clone(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_coerces() {
        let mut row = Row::from_map([
            ("score", Value::Float(3.9)),
            ("active", Value::from("true")),
            ("flag", Value::Integer(0)),
        ]);
        assert_eq!(row.field("score").as_integer(None), 3);
        assert!(row.field("active").as_boolean(None));
        assert!(!row.field("flag").as_boolean(None));
    }

    #[test]
    fn test_unknown_field_reads_zero_and_writes_append() {
        let mut row = Row::new();
        {
            let mut handle = row.field("ghost");
            assert!(!handle.is_valid());
            assert_eq!(handle.as_integer(None), 0);
            assert_eq!(handle.as_string(None), "");
            assert_eq!(handle.as_generic(None), Value::Null);
            assert_eq!(handle.as_integer(Some(42)), 42);
            assert!(handle.is_valid());
        }
        assert_eq!(row.get_by_name("ghost"), &Value::Integer(42));
    }

    #[test]
    fn test_uncoercible_read_yields_zero() {
        let mut row = Row::from_map([("name", "alice")]);
        assert_eq!(row.field("name").as_integer(None), 0);
        assert_eq!(row.field("name").as_float(None), 0.0);
        assert_eq!(row.field("name").as_timestamp(None), DateTime::<Utc>::default());
    }

    #[test]
    fn test_classic_write_leaves_raw() {
        let mut row = Row::from_map([("state", 2)]);
        row.field("state").as_classic(Some(Value::from("Shipped")));
        assert_eq!(row.field("state").as_integer(None), 2);
        assert_eq!(
            row.field("state").as_classic(None),
            Value::Text("Shipped".into())
        );
    }
}
