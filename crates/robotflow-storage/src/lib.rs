//! Persistence for robotflow program graphs.
//!
//! Graphs are stored as [`ProgramDocument`]s: blocks with their kind strings,
//! parameters and port ids, connections named by endpoint, and the variable
//! table. Loading always rebuilds and validates the graph.
//!
//! # Modules
//!
//! - [`error`]: StorageError enum with all failure modes
//! - [`types`]: ProgramId, ProgramSummary and the document records
//! - [`convert`]: ProgramGraph decompose/recompose functions
//! - [`file`]: reading and writing program files
//! - [`traits`]: GraphStore trait definition
//! - [`memory`]: InMemoryStore implementation

pub mod convert;
pub mod error;
pub mod file;
pub mod memory;
pub mod traits;
pub mod types;

pub use convert::{decompose, recompose};
pub use error::StorageError;
pub use file::{load_document_file, load_graph_file, save_document_file, save_graph_file};
pub use memory::InMemoryStore;
pub use traits::GraphStore;
pub use types::{ProgramDocument, ProgramId, ProgramSummary, FORMAT_VERSION};
