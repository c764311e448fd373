//! The [`GraphStore`] trait defining the storage contract for program graphs.
//!
//! Backends store whole programs: a save decomposes the graph into a
//! [`crate::types::ProgramDocument`] and a load recomposes it, so every
//! backend hands back graphs that passed validation.

use robotflow_core::graph::ProgramGraph;

use crate::error::StorageError;
use crate::types::{ProgramId, ProgramSummary};

/// The storage contract for program graphs.
///
/// The trait is synchronous; the editor and the CLI are single-threaded.
pub trait GraphStore {
    /// Creates a new empty program with the given name.
    fn create_program(&mut self, name: &str) -> Result<ProgramId, StorageError>;

    /// Loads and rebuilds a stored program.
    fn load_program(&self, id: ProgramId) -> Result<ProgramGraph, StorageError>;

    /// Overwrites a stored program with `graph`.
    fn save_program(&mut self, id: ProgramId, graph: &ProgramGraph) -> Result<(), StorageError>;

    /// Deletes a program.
    fn delete_program(&mut self, id: ProgramId) -> Result<(), StorageError>;

    /// Lists all stored programs in creation order.
    fn list_programs(&self) -> Result<Vec<ProgramSummary>, StorageError>;
}
