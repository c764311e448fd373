//! Connections between ports.
//!
//! A [`Connection`] always runs from an output port to an input port. Its
//! [`EdgeKind`] is derived from the endpoint kinds when the connection is made
//! and stored alongside it so persisted documents can be cross-checked.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::{ConnectionId, PortId};

/// Control flow or data flow.
///
/// Execution edges order blocks; data edges pass a value without implying
/// any ordering. The two are traversed independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Execution,
    Data,
}

impl EdgeKind {
    pub fn is_execution(&self) -> bool {
        matches!(self, EdgeKind::Execution)
    }

    pub fn is_data(&self) -> bool {
        matches!(self, EdgeKind::Data)
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Execution => f.write_str("execution"),
            EdgeKind::Data => f.write_str("data"),
        }
    }
}

/// A directed link from an output port to an input port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub from: PortId,
    pub to: PortId,
    pub kind: EdgeKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_kind_predicates() {
        assert!(EdgeKind::Execution.is_execution());
        assert!(!EdgeKind::Execution.is_data());
        assert!(EdgeKind::Data.is_data());
    }

    #[test]
    fn connection_serde_roundtrip() {
        let conn = Connection {
            id: ConnectionId(4),
            from: PortId(1),
            to: PortId(9),
            kind: EdgeKind::Data,
        };
        let json = serde_json::to_string(&conn).unwrap();
        assert_eq!(json, r#"{"id":4,"from":1,"to":9,"kind":"data"}"#);
        let back: Connection = serde_json::from_str(&json).unwrap();
        assert_eq!(back, conn);
    }
}
