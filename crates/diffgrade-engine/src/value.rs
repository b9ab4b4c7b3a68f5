//! Dynamic runtime values exchanged with implementation handles.
//!
//! Reference and candidate implementations are opaque to the engine; their
//! receivers, arguments, and return values travel as `Value`s. Records model
//! receiver objects with public fields, which is what the field-copying proxy
//! in the executor operates on.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    Double(f64),
    Char(char),
    Str(String),
    List(Vec<Value>),
    Record {
        type_name: String,
        fields: BTreeMap<String, Value>,
    },
}

impl Value {
    pub fn record(type_name: impl Into<String>) -> Self {
        Value::Record {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn record_with(
        type_name: impl Into<String>,
        fields: impl IntoIterator<Item = (&'static str, Value)>,
    ) -> Self {
        Value::Record {
            type_name: type_name.into(),
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }

    /// Read a public field of a record value.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Record { fields, .. } => fields.get(name),
            _ => None,
        }
    }

    /// Overwrite a public field of a record value. No-op on non-records.
    pub fn set_field(&mut self, name: &str, value: Value) {
        if let Value::Record { fields, .. } = self {
            fields.insert(name.to_string(), value);
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Double(_) => "double",
            Value::Char(_) => "char",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Record { .. } => "record",
        }
    }
}

// Equality must be total and deterministic so step comparison and run digests
// are reproducible; doubles therefore compare by bit pattern.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (
                Value::Record {
                    type_name: an,
                    fields: af,
                },
                Value::Record {
                    type_name: bn,
                    fields: bf,
                },
            ) => an == bn && af == bf,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => f.write_str("()"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Char(v) => write!(f, "{v:?}"),
            Value::Str(v) => write!(f, "{v:?}"),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Record { type_name, fields } => {
                write!(f, "{type_name} {{ ")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                f.write_str(" }")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_equality_is_bitwise() {
        assert_eq!(Value::Double(f64::NAN), Value::Double(f64::NAN));
        assert_ne!(Value::Double(0.0), Value::Double(-0.0));
        assert_eq!(Value::Double(1.5), Value::Double(1.5));
    }

    #[test]
    fn record_field_access() {
        let mut v = Value::record_with("Counter", [("count", Value::Int(3))]);
        assert_eq!(v.field("count"), Some(&Value::Int(3)));
        assert_eq!(v.field("missing"), None);
        v.set_field("count", Value::Int(4));
        assert_eq!(v.field("count"), Some(&Value::Int(4)));
    }

    #[test]
    fn set_field_on_non_record_is_noop() {
        let mut v = Value::Int(1);
        v.set_field("x", Value::Int(2));
        assert_eq!(v, Value::Int(1));
    }

    #[test]
    fn serde_roundtrip() {
        let v = Value::List(vec![
            Value::Int(-1),
            Value::Str("edge".to_string()),
            Value::record_with("P", [("x", Value::Bool(true))]),
        ]);
        let json = serde_json::to_string(&v).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }

    #[test]
    fn display_is_readable() {
        let v = Value::record_with("P", [("x", Value::Int(1))]);
        assert_eq!(v.to_string(), "P { x: 1 }");
        assert_eq!(Value::List(vec![Value::Int(1), Value::Int(2)]).to_string(), "[1, 2]");
    }
}
