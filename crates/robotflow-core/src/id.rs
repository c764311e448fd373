//! Stable handle newtypes for graph entities.
//!
//! All handles are distinct newtype wrappers over `u32`, so a `BlockId` cannot
//! be passed where a `PortId` is expected. Handles are never reused within one
//! graph; connections refer to ports by handle, never by block index.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable block identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockId(pub u32);

/// Stable port identifier. Covers both block-owned and variable virtual ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PortId(pub u32);

/// Stable connection identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub u32);

// Display implementations -- just print the inner value.

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prints_inner_value() {
        assert_eq!(BlockId(7).to_string(), "7");
        assert_eq!(PortId(0).to_string(), "0");
        assert_eq!(ConnectionId(42).to_string(), "42");
    }

    #[test]
    fn ids_serialize_as_bare_integers() {
        assert_eq!(serde_json::to_string(&BlockId(3)).unwrap(), "3");
        let back: PortId = serde_json::from_str("12").unwrap();
        assert_eq!(back, PortId(12));
    }

    #[test]
    fn ids_order_by_value() {
        let mut ids = vec![BlockId(5), BlockId(1), BlockId(3)];
        ids.sort();
        assert_eq!(ids, vec![BlockId(1), BlockId(3), BlockId(5)]);
    }
}
