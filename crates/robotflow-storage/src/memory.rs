//! In-memory implementation of [`GraphStore`].
//!
//! [`InMemoryStore`] keeps each program as a [`ProgramDocument`], the same
//! form a file holds, so loading exercises the full recompose path.

use indexmap::IndexMap;

use robotflow_core::graph::ProgramGraph;

use crate::convert::{decompose, recompose};
use crate::error::StorageError;
use crate::traits::GraphStore;
use crate::types::{ProgramDocument, ProgramId, ProgramSummary};

/// A [`GraphStore`] holding documents in a map.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    programs: IndexMap<ProgramId, ProgramDocument>,
    next_id: i64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore::default()
    }

    /// The stored document for a program, as it would be written to disk.
    pub fn document(&self, id: ProgramId) -> Result<&ProgramDocument, StorageError> {
        self.programs
            .get(&id)
            .ok_or(StorageError::ProgramNotFound(id.0))
    }
}

impl GraphStore for InMemoryStore {
    fn create_program(&mut self, name: &str) -> Result<ProgramId, StorageError> {
        self.next_id += 1;
        let id = ProgramId(self.next_id);
        let mut doc = decompose(&ProgramGraph::new());
        doc.name = name.to_string();
        self.programs.insert(id, doc);
        tracing::debug!(%id, name, "created program");
        Ok(id)
    }

    fn load_program(&self, id: ProgramId) -> Result<ProgramGraph, StorageError> {
        recompose(self.document(id)?)
    }

    fn save_program(&mut self, id: ProgramId, graph: &ProgramGraph) -> Result<(), StorageError> {
        let stored = self
            .programs
            .get_mut(&id)
            .ok_or(StorageError::ProgramNotFound(id.0))?;
        let mut doc = decompose(graph);
        doc.name = std::mem::take(&mut stored.name);
        *stored = doc;
        Ok(())
    }

    fn delete_program(&mut self, id: ProgramId) -> Result<(), StorageError> {
        self.programs
            .shift_remove(&id)
            .map(|_| ())
            .ok_or(StorageError::ProgramNotFound(id.0))
    }

    fn list_programs(&self) -> Result<Vec<ProgramSummary>, StorageError> {
        Ok(self
            .programs
            .iter()
            .map(|(id, doc)| ProgramSummary {
                id: *id,
                name: doc.name.clone(),
                block_count: doc.blocks.len(),
            })
            .collect())
    }
}
