//! Runtime values the matcher algebra runs against.
//!
//! The matcher destructures tree-shaped values (tuples, lists) and
//! object-shaped values ([`Record`]s). A record's type must be described by
//! a [`TypeSpec`]: an explicit field list declared up front, so matching
//! never needs runtime reflection over constructor signatures. A type may
//! instead supply a custom deconstruction hook.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::diagnostics::match_failure;
use crate::MantraError;

// ============================================================================
// VALUES
// ============================================================================

/// A runtime value in the matched program.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Number(f64),
    String(String),
    Tuple(Vec<Value>),
    List(Vec<Value>),
    Record(Record),
}

/// An object-shaped value: an instance of a named type with named fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub type_name: String,
    pub fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new(type_name: &str, fields: Vec<(&str, Value)>) -> Self {
        Record {
            type_name: type_name.to_string(),
            fields: fields
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        }
    }

    /// Field lookup by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }
}

impl Value {
    /// Returns the type name of the value as a string.
    pub fn type_name(&self) -> &str {
        match self {
            Value::None => "None",
            Value::Bool(_) => "Bool",
            Value::Number(_) => "Number",
            Value::String(_) => "String",
            Value::Tuple(_) => "Tuple",
            Value::List(_) => "List",
            Value::Record(r) => &r.type_name,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "none"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Tuple(items) => fmt_seq(f, "(", items, ")"),
            Value::List(items) => fmt_seq(f, "[", items, "]"),
            Value::Record(r) => {
                write!(f, "{}(", r.type_name)?;
                for (i, (name, value)) in r.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", name, value)?;
                }
                write!(f, ")")
            }
        }
    }
}

fn fmt_seq(f: &mut fmt::Formatter<'_>, open: &str, items: &[Value], close: &str) -> fmt::Result {
    write!(f, "{}", open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, "{}", close)
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Value::Record(r)
    }
}

// ============================================================================
// TYPE DESCRIPTIONS
// ============================================================================

/// Custom deconstruction hook: given a record and the keyword names the
/// pattern asks for, produce the positional values and the requested
/// keyword values.
pub type UnapplyFn =
    fn(&Record, &[String]) -> Result<(Vec<Value>, Vec<(String, Value)>), MantraError>;

/// Declared shape of a structurally-matchable type: its name and the
/// ordered field list its positional patterns destructure.
#[derive(Debug, Clone)]
pub struct TypeSpec {
    pub name: String,
    pub fields: Vec<String>,
    custom: Option<UnapplyFn>,
}

impl TypeSpec {
    pub fn new(name: &str, fields: &[&str]) -> Self {
        TypeSpec {
            name: name.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            custom: None,
        }
    }

    /// Declares a custom deconstruction hook used instead of the default
    /// field-list destructuring.
    pub fn with_unapply(mut self, unapply: UnapplyFn) -> Self {
        self.custom = Some(unapply);
        self
    }

    pub fn has_custom_unapply(&self) -> bool {
        self.custom.is_some()
    }

    /// Deconstructs `record` into positional values (one per declared
    /// field, up to `positional` many) and the requested keyword values.
    /// A missing field or attribute is a match failure, not a crash.
    pub fn unapply(
        &self,
        record: &Record,
        positional: usize,
        kw_keys: &[String],
    ) -> Result<(Vec<Value>, Vec<(String, Value)>), MantraError> {
        if let Some(custom) = self.custom {
            return custom(record, kw_keys);
        }
        self.default_unapply(record, positional, kw_keys)
    }

    fn default_unapply(
        &self,
        record: &Record,
        positional: usize,
        kw_keys: &[String],
    ) -> Result<(Vec<Value>, Vec<(String, Value)>), MantraError> {
        if positional > self.fields.len() {
            return Err(match_failure(format!(
                "type {} declares {} positional fields, pattern asks for {}",
                self.name,
                self.fields.len(),
                positional
            )));
        }
        let mut pos_values = Vec::with_capacity(positional);
        for field in self.fields.iter().take(positional) {
            let Some(value) = record.get(field) else {
                return Err(match_failure(format!(
                    "value {} has no field '{}'",
                    Value::Record(record.clone()),
                    field
                )));
            };
            pos_values.push(value.clone());
        }
        let mut kw_values = Vec::with_capacity(kw_keys.len());
        for key in kw_keys {
            let Some(value) = record.get(key) else {
                return Err(match_failure(format!(
                    "keyword match failed: no attribute '{}' on {}",
                    key,
                    Value::Record(record.clone())
                )));
            };
            kw_values.push((key.clone(), value.clone()));
        }
        Ok((pos_values, kw_values))
    }
}

/// Registry of structurally-matchable types, consulted when patterns are
/// compiled. Fills the role of the host language's constructor-signature
/// lookup.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    specs: HashMap<String, TypeSpec>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a type spec, replacing any previous spec of the same name.
    pub fn register(&mut self, spec: TypeSpec) {
        self.specs.insert(spec.name.clone(), spec);
    }

    pub fn get(&self, name: &str) -> Option<&TypeSpec> {
        self.specs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.specs.contains_key(name)
    }
}

#[cfg(test)]
mod value_tests {
    use super::*;

    #[test]
    fn record_field_lookup() {
        let point = Record::new("Point", vec![("x", 1.0.into()), ("y", 2.0.into())]);
        assert_eq!(point.get("x"), Some(&Value::Number(1.0)));
        assert_eq!(point.get("z"), None);
    }

    #[test]
    fn display_is_compact() {
        let v = Value::Tuple(vec![1.0.into(), "hi".into(), Value::None]);
        assert_eq!(v.to_string(), "(1, \"hi\", none)");
        let r = Value::Record(Record::new("Point", vec![("x", 1.0.into())]));
        assert_eq!(r.to_string(), "Point(x=1)");
    }

    #[test]
    fn default_unapply_reports_missing_fields() {
        let spec = TypeSpec::new("Point", &["x", "y"]);
        let broken = Record::new("Point", vec![("x", 1.0.into())]);
        let err = spec.unapply(&broken, 2, &[]).unwrap_err();
        assert!(err.is_match_failure());
        let err = spec
            .unapply(&broken, 1, &["missing".to_string()])
            .unwrap_err();
        assert!(err.is_match_failure());
    }

    #[test]
    fn custom_unapply_overrides_field_list() {
        fn swap(record: &Record, _kw: &[String]) -> Result<(Vec<Value>, Vec<(String, Value)>), MantraError> {
            let x = record.get("x").cloned().unwrap_or_default();
            let y = record.get("y").cloned().unwrap_or_default();
            Ok((vec![y, x], vec![]))
        }
        let spec = TypeSpec::new("Point", &["x", "y"]).with_unapply(swap);
        assert!(spec.has_custom_unapply());
        let point = Record::new("Point", vec![("x", 1.0.into()), ("y", 2.0.into())]);
        let (pos, _) = spec.unapply(&point, 2, &[]).unwrap();
        assert_eq!(pos, vec![Value::Number(2.0), Value::Number(1.0)]);
    }
}
