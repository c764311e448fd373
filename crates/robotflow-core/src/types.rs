//! Value and port typing for block programs.
//!
//! The type system is deliberately small: data ports carry one of four
//! [`ValueType`]s, execution ports carry no value at all. Runtime values are
//! represented by [`Value`], which is shared by parameters, variables, the
//! simulator and the code generator.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Value types
// ---------------------------------------------------------------------------

/// The type of a value carried by a data port, a variable or a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Bool,
    Int,
    Float,
    String,
}

impl ValueType {
    /// Parses a type name as written in documents and in the editor.
    ///
    /// `bool` and `boolean` are aliases, as are `int`/`integer`,
    /// `float`/`double` and `string`/`str`. Matching is case-insensitive.
    pub fn parse(name: &str) -> Option<ValueType> {
        match name.trim().to_ascii_lowercase().as_str() {
            "bool" | "boolean" => Some(ValueType::Bool),
            "int" | "integer" => Some(ValueType::Int),
            "float" | "double" => Some(ValueType::Float),
            "string" | "str" => Some(ValueType::String),
            _ => None,
        }
    }

    /// Canonical lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::String => "string",
        }
    }

    /// The zero value of this type.
    pub fn default_value(&self) -> Value {
        match self {
            ValueType::Bool => Value::Bool(false),
            ValueType::Int => Value::Int(0),
            ValueType::Float => Value::Float(0.0),
            ValueType::String => Value::Str(String::new()),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Whether a port accepts or produces a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => f.write_str("input"),
            Direction::Output => f.write_str("output"),
        }
    }
}

/// What a port carries: control flow, or a typed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortKind {
    Execution,
    Data(ValueType),
}

impl PortKind {
    pub fn is_execution(&self) -> bool {
        matches!(self, PortKind::Execution)
    }

    /// The value type of a data port, `None` for execution ports.
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            PortKind::Execution => None,
            PortKind::Data(ty) => Some(*ty),
        }
    }
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortKind::Execution => f.write_str("execution"),
            PortKind::Data(ty) => write!(f, "data({ty})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Declared type of a block parameter.
///
/// `Expression` parameters hold source text for the restricted expression
/// language; they are stored as strings but parsed before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Int,
    Float,
    Bool,
    String,
    Expression,
}

impl ParamType {
    /// Whether values of this parameter are subject to a numeric range check.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ParamType::Int | ParamType::Float)
    }
}

// ---------------------------------------------------------------------------
// Runtime values
// ---------------------------------------------------------------------------

/// A runtime value.
///
/// Serialized untagged so documents hold plain JSON scalars: `true`, `50`,
/// `1.5`, `"count"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    /// The type of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::Str(_) => ValueType::String,
        }
    }

    /// Truthiness: zero, empty and `false` are falsy.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
        }
    }

    /// Numeric view. Booleans count as 0/1; strings are not numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Str(_) => None,
        }
    }

    /// Integer view. Floats must be integral; numeric strings are parsed.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(*f as i64),
            Value::Float(_) => None,
            Value::Str(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Converts this value to `ty`, returning `None` when no lossless or
    /// conventional conversion exists.
    ///
    /// Numeric strings convert to numbers, integers widen to floats, and
    /// integral floats narrow to integers.
    pub fn coerce(&self, ty: ValueType) -> Option<Value> {
        match (ty, self) {
            (ValueType::Bool, Value::Bool(b)) => Some(Value::Bool(*b)),
            (ValueType::Bool, Value::Int(i)) => Some(Value::Bool(*i != 0)),
            (ValueType::Bool, Value::Str(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            (ValueType::Bool, Value::Float(_)) => None,
            (ValueType::Int, v) => v.as_i64().map(Value::Int),
            (ValueType::Float, Value::Str(s)) => s.trim().parse().ok().map(Value::Float),
            (ValueType::Float, v) => v.as_f64().map(Value::Float),
            (ValueType::String, Value::Str(s)) => Some(Value::Str(s.clone())),
            (ValueType::String, v) => Some(Value::Str(v.to_string())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{x:.1}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_aliases() {
        assert_eq!(ValueType::parse("bool"), Some(ValueType::Bool));
        assert_eq!(ValueType::parse("boolean"), Some(ValueType::Bool));
        assert_eq!(ValueType::parse("Boolean"), Some(ValueType::Bool));
        assert_eq!(ValueType::parse("integer"), Some(ValueType::Int));
        assert_eq!(ValueType::parse("double"), Some(ValueType::Float));
        assert_eq!(ValueType::parse("str"), Some(ValueType::String));
        assert_eq!(ValueType::parse("execution"), None);
    }

    #[test]
    fn untagged_values_deserialize_to_narrowest_variant() {
        let v: Vec<Value> = serde_json::from_str(r#"[true, 50, 1.5, 1.0, "count"]"#).unwrap();
        assert_eq!(
            v,
            vec![
                Value::Bool(true),
                Value::Int(50),
                Value::Float(1.5),
                Value::Float(1.0),
                Value::Str("count".into()),
            ]
        );
    }

    #[test]
    fn port_kind_serde_roundtrip() {
        for kind in [PortKind::Execution, PortKind::Data(ValueType::Float)] {
            let json = serde_json::to_string(&kind).unwrap();
            let back: PortKind = serde_json::from_str(&json).unwrap();
            assert_eq!(kind, back);
        }
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Int(0).truthy());
        assert!(Value::Int(-1).truthy());
        assert!(!Value::Float(0.0).truthy());
        assert!(!Value::Str(String::new()).truthy());
        assert!(Value::Str("x".into()).truthy());
    }

    #[test]
    fn coercions() {
        assert_eq!(Value::Str("12".into()).coerce(ValueType::Int), Some(Value::Int(12)));
        assert_eq!(Value::Float(3.0).coerce(ValueType::Int), Some(Value::Int(3)));
        assert_eq!(Value::Float(3.5).coerce(ValueType::Int), None);
        assert_eq!(Value::Int(2).coerce(ValueType::Float), Some(Value::Float(2.0)));
        assert_eq!(Value::Str("abc".into()).coerce(ValueType::Float), None);
        assert_eq!(Value::Str("TRUE".into()).coerce(ValueType::Bool), Some(Value::Bool(true)));
        assert_eq!(Value::Int(5).coerce(ValueType::String), Some(Value::Str("5".into())));
    }

    #[test]
    fn display_keeps_float_marker() {
        assert_eq!(Value::Float(1.0).to_string(), "1.0");
        assert_eq!(Value::Float(0.25).to_string(), "0.25");
        assert_eq!(Value::Int(50).to_string(), "50");
    }
}
