//! Storage-layer types: program identity and the persisted document form.
//!
//! [`ProgramId`] is defined here (not in robotflow-core) because program
//! identity is a storage concern -- programs only gain an ID when persisted.
//!
//! A [`ProgramDocument`] is the serialized form of a graph. Blocks list their
//! port ids in catalog layout order; the port table itself is rebuilt from
//! the catalog on load. Connections name their endpoints by block and port,
//! or by variable name for variable bindings and captures.

use std::fmt;

use serde::{Deserialize, Serialize};

use robotflow_core::edge::EdgeKind;
use robotflow_core::id::{BlockId, ConnectionId, PortId};
use robotflow_core::node::Param;
use robotflow_core::variable::Variable;

/// Current document format version.
pub const FORMAT_VERSION: u32 = 1;

/// Unique identifier for a stored program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProgramId(pub i64);

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProgramId({})", self.0)
    }
}

/// Summary of a stored program (for listing).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramSummary {
    pub id: ProgramId,
    pub name: String,
    pub block_count: usize,
}

/// A whole program as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub name: String,
    pub blocks: Vec<BlockRecord>,
    #[serde(default)]
    pub connections: Vec<ConnectionRecord>,
    #[serde(default)]
    pub variables: Vec<Variable>,
}

fn default_version() -> u32 {
    FORMAT_VERSION
}

/// One block: identity, kind string, parameters and port ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub id: BlockId,
    pub name: String,
    /// Namespaced kind, e.g. `motor.forward`.
    pub kind: String,
    #[serde(default)]
    pub params: Vec<Param>,
    pub inputs: Vec<PortId>,
    pub outputs: Vec<PortId>,
}

/// One connection between two endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub id: ConnectionId,
    pub from: EndpointRecord,
    pub to: EndpointRecord,
    pub kind: EdgeKind,
}

/// A connection endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointRecord {
    /// A port owned by a block.
    Port { block: BlockId, port: PortId },
    /// A variable's virtual port.
    Variable(String),
}
