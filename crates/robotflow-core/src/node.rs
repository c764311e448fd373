//! Blocks, ports and parameters.
//!
//! A [`Block`] owns an ordered list of input and output [`PortId`]s; the ports
//! themselves live in the graph's flat port table. Ports can also be owned by
//! a variable ([`PortOwner::Variable`]); such virtual ports let a variable
//! feed a data input or capture a data output.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::id::{BlockId, PortId};
use crate::ops::{BlockOp, PortRole};
use crate::types::{Direction, ParamType, PortKind, Value, ValueType};

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// A named, typed block parameter with an optional numeric range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ParamType,
    pub value: Value,
    /// Catalog default, substituted when `value` is malformed or out of range.
    pub default: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

/// Why a parameter's stored value could not be used as-is.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamIssue {
    /// The value does not convert to the declared type.
    Malformed { value: Value },
    /// The value is numeric but outside `[min, max]`.
    OutOfRange {
        value: f64,
        min: Option<f64>,
        max: Option<f64>,
    },
}

impl fmt::Display for ParamIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamIssue::Malformed { value } => write!(f, "malformed value '{value}'"),
            ParamIssue::OutOfRange { value, min, max } => {
                let lo = min.map(|m| m.to_string()).unwrap_or_else(|| "-inf".into());
                let hi = max.map(|m| m.to_string()).unwrap_or_else(|| "inf".into());
                write!(f, "value {value} outside [{lo}, {hi}]")
            }
        }
    }
}

impl Param {
    pub fn int(name: &str, default: i64, min: i64, max: i64) -> Self {
        Param {
            name: name.to_string(),
            ty: ParamType::Int,
            value: Value::Int(default),
            default: Value::Int(default),
            min: Some(min as f64),
            max: Some(max as f64),
        }
    }

    /// An integer parameter with no range restriction.
    pub fn int_any(name: &str, default: i64) -> Self {
        Param {
            min: None,
            max: None,
            ..Param::int(name, default, 0, 0)
        }
    }

    pub fn float(name: &str, default: f64, min: f64, max: f64) -> Self {
        Param {
            name: name.to_string(),
            ty: ParamType::Float,
            value: Value::Float(default),
            default: Value::Float(default),
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn string(name: &str, default: &str) -> Self {
        Param {
            name: name.to_string(),
            ty: ParamType::String,
            value: Value::from(default),
            default: Value::from(default),
            min: None,
            max: None,
        }
    }

    pub fn expression(name: &str, default: &str) -> Self {
        Param {
            name: name.to_string(),
            ty: ParamType::Expression,
            ..Param::string(name, default)
        }
    }

    /// Returns a copy of this parameter holding `value`.
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = value.into();
        self
    }

    /// The stored value converted to the declared type and range-checked.
    ///
    /// Callers that must keep going on a bad value fall back to
    /// [`Param::default`] and report the returned issue.
    pub fn checked_value(&self) -> Result<Value, ParamIssue> {
        let malformed = || ParamIssue::Malformed {
            value: self.value.clone(),
        };
        let value = match self.ty {
            ParamType::Int => self
                .value
                .coerce(ValueType::Int)
                .ok_or_else(malformed)?,
            ParamType::Float => self
                .value
                .coerce(ValueType::Float)
                .ok_or_else(malformed)?,
            ParamType::Bool => self
                .value
                .coerce(ValueType::Bool)
                .ok_or_else(malformed)?,
            ParamType::String | ParamType::Expression => match &self.value {
                Value::Str(s) => Value::Str(s.clone()),
                other => Value::Str(other.to_string()),
            },
        };

        if self.ty.is_numeric() {
            let n = value.as_f64().ok_or_else(malformed)?;
            if !n.is_finite()
                || self.min.is_some_and(|lo| n < lo)
                || self.max.is_some_and(|hi| n > hi)
            {
                return Err(ParamIssue::OutOfRange {
                    value: n,
                    min: self.min,
                    max: self.max,
                });
            }
        }
        Ok(value)
    }

    /// The checked value, or the default when the check fails.
    pub fn value_or_default(&self) -> Value {
        self.checked_value().unwrap_or_else(|_| self.default.clone())
    }
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Who owns a port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortOwner {
    Block(BlockId),
    /// Virtual port standing in for a named variable.
    Variable(String),
}

impl PortOwner {
    pub fn block(&self) -> Option<BlockId> {
        match self {
            PortOwner::Block(id) => Some(*id),
            PortOwner::Variable(_) => None,
        }
    }

    pub fn variable(&self) -> Option<&str> {
        match self {
            PortOwner::Block(_) => None,
            PortOwner::Variable(name) => Some(name),
        }
    }
}

/// A connection endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub id: PortId,
    pub role: PortRole,
    pub direction: Direction,
    pub kind: PortKind,
    pub owner: PortOwner,
}

impl Port {
    pub fn is_virtual(&self) -> bool {
        matches!(self.owner, PortOwner::Variable(_))
    }
}

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

/// A functional block placed on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    /// Display name shown in diagnostics.
    pub name: String,
    pub op: BlockOp,
    pub params: Vec<Param>,
    pub inputs: SmallVec<[PortId; 3]>,
    pub outputs: SmallVec<[PortId; 2]>,
}

impl Block {
    /// Looks up a parameter by name.
    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn param_mut(&mut self, name: &str) -> Option<&mut Param> {
        self.params.iter_mut().find(|p| p.name == name)
    }

    /// All ports, inputs first.
    pub fn ports(&self) -> impl Iterator<Item = PortId> + '_ {
        self.inputs.iter().chain(self.outputs.iter()).copied()
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' ({})", self.id, self.name, self.op)
    }
}
