//! Core error types for robotflow-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering graph
//! editing, connection validation and whole-graph structural checks.

use thiserror::Error;

use crate::edge::EdgeKind;
use crate::id::{BlockId, ConnectionId, PortId};
use crate::types::{Direction, PortKind};

/// Errors produced by graph-editing operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("block not found: BlockId({id})", id = id.0)]
    BlockNotFound { id: BlockId },

    #[error("port not found: PortId({id})", id = id.0)]
    PortNotFound { id: PortId },

    #[error("connection not found: ConnectionId({id})", id = id.0)]
    ConnectionNotFound { id: ConnectionId },

    #[error("variable not found: '{name}'")]
    VariableNotFound { name: String },

    #[error("duplicate variable name: '{name}'")]
    DuplicateVariable { name: String },

    #[error("block {block} has no parameter '{name}'")]
    ParamNotFound { block: BlockId, name: String },

    /// Variable bindings need a data port facing the right way.
    #[error("port {port} cannot bind a variable: expected a data {expected} port")]
    NotBindable { port: PortId, expected: Direction },

    #[error(transparent)]
    Connect(#[from] ConnectError),
}

/// An illegal connection, or a connection-level inconsistency found while
/// validating a whole graph. No mutation happens when one is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConnectError {
    #[error("port not found: PortId({id})", id = id.0)]
    PortNotFound { id: PortId },

    /// Output to output, or input to input.
    #[error("cannot connect two {direction} ports ({from} -> {to})")]
    SameDirection {
        from: PortId,
        to: PortId,
        direction: Direction,
    },

    #[error("connection must run from an output to an input ({from} -> {to})")]
    Reversed { from: PortId, to: PortId },

    #[error("type mismatch: {from_kind} port {from} cannot feed {to_kind} port {to}")]
    TypeMismatch {
        from: PortId,
        to: PortId,
        from_kind: PortKind,
        to_kind: PortKind,
    },

    #[error("connection {connection} references missing port {port}")]
    DanglingPort {
        connection: ConnectionId,
        port: PortId,
    },

    #[error("port {port} is owned by missing block {block}")]
    MissingOwner { port: PortId, block: BlockId },

    #[error("block {block} lists port {port} it does not own")]
    ForeignPort { block: BlockId, port: PortId },

    #[error("input port {port} has {count} inbound connections")]
    MultipleInbound { port: PortId, count: usize },

    #[error("connection {connection} is tagged {stored} but its endpoints make it {actual}")]
    KindTagMismatch {
        connection: ConnectionId,
        stored: EdgeKind,
        actual: EdgeKind,
    },
}

/// A malformed graph. Fatal: consumers produce no output at all.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StructuralError {
    #[error("graph has no blocks")]
    EmptyGraph,

    #[error("malformed graph: {count} problem(s), first: {first}", count = errors.len(), first = first_message(errors))]
    Malformed { errors: Vec<ConnectError> },
}

fn first_message(errors: &[ConnectError]) -> String {
    errors
        .first()
        .map(|e| e.to_string())
        .unwrap_or_else(|| "none".to_string())
}
