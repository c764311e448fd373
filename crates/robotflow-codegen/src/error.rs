//! Codegen error types.
//!
//! [`CodegenError`] rejects a whole graph before any text is produced.
//! [`GenerationFault`] is local to one block or one section: the generator
//! records it, writes a diagnostic in its place, and keeps going.

use robotflow_core::error::StructuralError;
use robotflow_core::expr::ParseError;
use robotflow_core::id::BlockId;

/// Errors that stop generation outright.
#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    /// The graph failed structural validation; nothing is generated.
    #[error("structural error: {0}")]
    Structural(#[from] StructuralError),

    /// Writing the generated program failed.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A recoverable problem found while emitting one block or section.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenerationFault {
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

    #[error("block {block} '{name}': malformed condition '{source_text}': {error}")]
    Condition {
        block: BlockId,
        name: String,
        source_text: String,
        error: ParseError,
    },

    #[error("block {block} '{name}': malformed expression '{source_text}': {error}")]
    Expression {
        block: BlockId,
        name: String,
        source_text: String,
        error: ParseError,
    },

    #[error("block {block} '{name}': '{original}' is not a valid identifier, using '{rewritten}'")]
    Identifier {
        block: BlockId,
        name: String,
        original: String,
        rewritten: String,
    },

    #[error("block {block} '{name}': variable '{variable}' is read-only")]
    ReadOnly {
        block: BlockId,
        name: String,
        variable: String,
    },

    #[error("block {block} '{name}': input '{input}' has no source that generated code can read")]
    MissingSource {
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

    #[error("block {block} '{name}': nesting limit ({limit}) reached")]
    DepthExceeded {
        block: BlockId,
        name: String,
        limit: usize,
    },

    /// A whole output section could not be rendered.
    #[error("section '{section}' failed: {reason}")]
    Section { section: String, reason: String },
}

impl GenerationFault {
    /// The block the fault belongs to, if any.
    pub fn block(&self) -> Option<BlockId> {
        match self {
            GenerationFault::MissingParam { block, .. }
            | GenerationFault::BadParam { block, .. }
            | GenerationFault::Condition { block, .. }
            | GenerationFault::Expression { block, .. }
            | GenerationFault::Identifier { block, .. }
            | GenerationFault::ReadOnly { block, .. }
            | GenerationFault::MissingSource { block, .. }
            | GenerationFault::UnknownKind { block, .. }
            | GenerationFault::DepthExceeded { block, .. } => Some(*block),
            GenerationFault::Section { .. } => None,
        }
    }
}
