//! Struct binding through declared accessor tables
//!
//! A type opts in by implementing [`Bindable`] and listing its members with
//! typed setters. Row field names match members case- and
//! separator-insensitively (`user_name`, `UserName` and `user-name` are the
//! same member). The member's declared kind drives coercion.

use chrono::{DateTime, Utc};
use layerorm_core_types::schema::EVENT_COERCION_SKIPPED;

use super::Row;
use crate::log_diagnostic;
use crate::value::{Value, ValueKind};

/// Typed setter for one member of `T`
pub enum Setter<T> {
    Text(fn(&mut T, String)),
    Integer(fn(&mut T, i64)),
    Float(fn(&mut T, f64)),
    Boolean(fn(&mut T, bool)),
    Timestamp(fn(&mut T, DateTime<Utc>)),
    Generic(fn(&mut T, Value)),
}

impl<T> Setter<T> {
    pub fn kind(&self) -> ValueKind {
        match self {
            Setter::Text(_) => ValueKind::Text,
            Setter::Integer(_) => ValueKind::Integer,
            Setter::Float(_) => ValueKind::Float,
            Setter::Boolean(_) => ValueKind::Bool,
            Setter::Timestamp(_) => ValueKind::Timestamp,
            Setter::Generic(_) => ValueKind::Null,
        }
    }

    /// Coerce `value` and apply it; `false` when no coercion rule applies
    fn apply(&self, target: &mut T, value: &Value) -> bool {
        match self {
            Setter::Text(set) => {
                set(target, value.to_text());
                true
            }
            Setter::Integer(set) => value.to_integer().map(|v| set(target, v)).is_some(),
            Setter::Float(set) => value.to_float().map(|v| set(target, v)).is_some(),
            Setter::Boolean(set) => value.to_boolean().map(|v| set(target, v)).is_some(),
            Setter::Timestamp(set) => value.to_timestamp().map(|v| set(target, v)).is_some(),
            Setter::Generic(set) => {
                set(target, value.clone());
                true
            }
        }
    }
}

struct Member<T> {
    key: String,
    name: &'static str,
    setter: Setter<T>,
}

/// Accessor table declared once per bindable type
pub struct BindTable<T> {
    members: Vec<Member<T>>,
}

impl<T> Default for BindTable<T> {
    fn default() -> Self {
        Self {
            members: Vec::new(),
        }
    }
}

impl<T> BindTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a member with an explicit setter
    pub fn member(mut self, name: &'static str, setter: Setter<T>) -> Self {
        self.members.push(Member {
            key: normalize(name),
            name,
            setter,
        });
        self
    }

    pub fn text(self, name: &'static str, set: fn(&mut T, String)) -> Self {
        self.member(name, Setter::Text(set))
    }

    pub fn integer(self, name: &'static str, set: fn(&mut T, i64)) -> Self {
        self.member(name, Setter::Integer(set))
    }

    pub fn float(self, name: &'static str, set: fn(&mut T, f64)) -> Self {
        self.member(name, Setter::Float(set))
    }

    pub fn boolean(self, name: &'static str, set: fn(&mut T, bool)) -> Self {
        self.member(name, Setter::Boolean(set))
    }

    pub fn timestamp(self, name: &'static str, set: fn(&mut T, DateTime<Utc>)) -> Self {
        self.member(name, Setter::Timestamp(set))
    }

    pub fn generic(self, name: &'static str, set: fn(&mut T, Value)) -> Self {
        self.member(name, Setter::Generic(set))
    }

    /// Declared member names, in declaration order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.members.iter().map(|m| m.name)
    }

    fn find(&self, field: &str) -> Option<&Member<T>> {
        let key = normalize(field);
        self.members.iter().find(|m| m.key == key)
    }
}

/// A type that rows can be bound into
pub trait Bindable: Sized {
    fn bind_table() -> BindTable<Self>;
}

/// Outcome of one binding pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindReport {
    /// Members written
    pub bound: Vec<String>,
    /// Row fields with no matching member
    pub unmatched: Vec<String>,
    /// Row fields skipped because the source was null
    pub nulls: Vec<String>,
    /// Row fields skipped because no coercion rule applied
    pub mismatched: Vec<String>,
}

impl BindReport {
    pub fn is_clean(&self) -> bool {
        self.mismatched.is_empty()
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

pub(crate) fn bind_row<T: Bindable>(row: &Row, target: &mut T, classic: bool) -> BindReport {
    let table = T::bind_table();
    let mut report = BindReport::default();

    for (field, cell) in row.cells.iter() {
        let Some(member) = table.find(field) else {
            report.unmatched.push(field.clone());
            continue;
        };

        let value = if classic {
            cell.classic_or_raw()
        } else {
            &cell.raw
        };

        if value.is_null() {
            report.nulls.push(field.clone());
            continue;
        }

        if member.setter.apply(target, value) {
            report.bound.push(member.name.to_string());
        } else {
            log_diagnostic!(
                EVENT_COERCION_SKIPPED,
                field = %field,
                member = member.name,
                from = %value.kind(),
                to = %member.setter.kind(),
                "struct binding skipped field"
            );
            report.mismatched.push(field.clone());
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Account {
        user_name: String,
        age: i64,
        active: bool,
    }

    impl Bindable for Account {
        fn bind_table() -> BindTable<Self> {
            BindTable::<Self>::new()
                .text("user_name", |a, v| a.user_name = v)
                .integer("age", |a, v| a.age = v)
                .boolean("active", |a, v| a.active = v)
        }
    }

    #[test]
    fn test_normalize_ignores_case_and_separators() {
        assert_eq!(normalize("User_Name"), "username");
        assert_eq!(normalize("user-name"), "username");
    }

    #[test]
    fn test_bind_matches_format_insensitively() {
        let row = Row::from_map([
            ("UserName", Value::from("bob")),
            ("AGE", Value::Float(41.7)),
            ("active", Value::from("TRUE")),
        ]);
        let mut account = Account::default();
        let report = row.as_struct(&mut account, false);

        assert_eq!(account.user_name, "bob");
        assert_eq!(account.age, 41);
        assert!(account.active);
        assert_eq!(report.bound.len(), 3);
        assert!(report.is_clean());
    }

    #[test]
    fn test_bind_skips_null_and_mismatch_but_continues() {
        let row = Row::from_map([
            ("user_name", Value::Null),
            ("age", Value::from("old")),
            ("active", Value::Integer(1)),
            ("unknown", Value::Integer(1)),
        ]);
        let mut account = Account {
            user_name: "keep".to_string(),
            ..Default::default()
        };
        let report = row.as_struct(&mut account, false);

        assert_eq!(account.user_name, "keep");
        assert_eq!(account.age, 0);
        assert!(account.active);
        assert_eq!(report.nulls, vec!["user_name"]);
        assert_eq!(report.mismatched, vec!["age"]);
        assert_eq!(report.unmatched, vec!["unknown"]);
    }

    #[test]
    fn test_bind_classic_view() {
        let mut row = Row::from_map([("user_name", "raw")]);
        row.set_classic_by_name("user_name", "Display");
        let mut account = Account::default();
        row.as_struct(&mut account, true);
        assert_eq!(account.user_name, "Display");
    }
}
