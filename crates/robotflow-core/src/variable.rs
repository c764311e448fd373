//! Program variables.

use serde::{Deserialize, Serialize};

use crate::types::{Value, ValueType};

/// How a variable may be used by blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    /// Writes are refused (warning in generated code, fault in simulation).
    ReadOnly,
    #[default]
    ReadWrite,
    /// Scratch value; not reported in the final variable table of a run.
    Temporary,
}

impl Access {
    pub fn is_writable(&self) -> bool {
        !matches!(self, Access::ReadOnly)
    }
}

/// A declared program variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ValueType,
    pub value: Value,
    #[serde(default)]
    pub access: Access,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub unit: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl Variable {
    /// A read-write variable holding `value`.
    pub fn new(name: &str, ty: ValueType, value: Value) -> Self {
        Variable {
            name: name.to_string(),
            ty,
            value,
            access: Access::ReadWrite,
            unit: String::new(),
            description: String::new(),
        }
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = unit.to_string();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}
