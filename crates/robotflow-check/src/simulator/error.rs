//! Recoverable simulation failures.
//!
//! Neither type halts a run. A [`SimulationFault`] is confined to one block:
//! the block behaves as if it produced a default result and execution moves
//! on. A [`GuardTrip`] stops one path (or one loop) while sibling paths
//! continue. Every variant names the block it happened at.

use robotflow_core::expr::ExprError;
use robotflow_core::id::BlockId;
use robotflow_core::types::ValueType;

/// A per-block runtime fault.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationFault {
    #[error("block {block} '{name}': expression '{source_text}' failed: {error}")]
    Expression {
        block: BlockId,
        name: String,
        source_text: String,
        error: ExprError,
    },

    #[error("block {block} '{name}': variable '{variable}' is not defined")]
    MissingVariable {
        block: BlockId,
        name: String,
        variable: String,
    },

    #[error("block {block} '{name}': variable '{variable}' expects {expected}, got {found}")]
    TypeMismatch {
        block: BlockId,
        name: String,
        variable: String,
        expected: ValueType,
        found: ValueType,
    },

    #[error("block {block} '{name}': variable '{variable}' is read-only")]
    ReadOnlyWrite {
        block: BlockId,
        name: String,
        variable: String,
    },

    #[error("block {block} '{name}': missing parameter '{param}'")]
    MissingParam {
        block: BlockId,
        name: String,
        param: String,
    },

    #[error("block {block} '{name}': parameter '{param}' {issue}, using default")]
    BadParam {
        block: BlockId,
        name: String,
        param: String,
        issue: String,
    },

    #[error("block {block} '{name}': input '{input}' has no value yet")]
    MissingInput {
        block: BlockId,
        name: String,
        input: String,
    },

    #[error("block {block} '{name}': unknown block kind '{kind}'")]
    UnknownKind {
        block: BlockId,
        name: String,
        kind: String,
    },
}

impl SimulationFault {
    pub fn block(&self) -> BlockId {
        match self {
            SimulationFault::Expression { block, .. }
            | SimulationFault::MissingVariable { block, .. }
            | SimulationFault::TypeMismatch { block, .. }
            | SimulationFault::ReadOnlyWrite { block, .. }
            | SimulationFault::MissingParam { block, .. }
            | SimulationFault::BadParam { block, .. }
            | SimulationFault::MissingInput { block, .. }
            | SimulationFault::UnknownKind { block, .. } => *block,
        }
    }
}

/// A traversal ceiling was reached.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GuardTrip {
    /// The block already appears `limit` times on the current path.
    #[error("block {block} '{name}': probable infinite loop, visited {limit} times on this path")]
    Repetition {
        block: BlockId,
        name: String,
        limit: usize,
    },

    #[error("block {block} '{name}': path depth limit ({limit}) exceeded")]
    Depth {
        block: BlockId,
        name: String,
        limit: usize,
    },

    /// A `while`/`forever` loop ran `limit` iterations; it continues at `done`.
    #[error("block {block} '{name}': loop stopped after {limit} iterations")]
    LoopIterations {
        block: BlockId,
        name: String,
        limit: usize,
    },

    /// The whole run exceeded its step budget and was stopped.
    #[error("block {block} '{name}': step budget ({limit}) exhausted")]
    StepBudget {
        block: BlockId,
        name: String,
        limit: usize,
    },
}

impl GuardTrip {
    pub fn block(&self) -> BlockId {
        match self {
            GuardTrip::Repetition { block, .. }
            | GuardTrip::Depth { block, .. }
            | GuardTrip::LoopIterations { block, .. }
            | GuardTrip::StepBudget { block, .. } => *block,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_localize_the_block() {
        let fault = SimulationFault::ReadOnlyWrite {
            block: BlockId(2),
            name: "set".into(),
            variable: "limit".into(),
        };
        assert_eq!(fault.to_string(), "block 2 'set': variable 'limit' is read-only");
        assert_eq!(fault.block(), BlockId(2));

        let trip = GuardTrip::Repetition {
            block: BlockId(0),
            name: "a".into(),
            limit: 3,
        };
        assert_eq!(
            trip.to_string(),
            "block 0 'a': probable infinite loop, visited 3 times on this path"
        );
    }
}
