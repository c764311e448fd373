//! Program files on disk.
//!
//! A program file is a pretty-printed JSON [`ProgramDocument`]. Saves go
//! through a temporary sibling file that is renamed into place.

use std::io::Write;
use std::path::Path;

use robotflow_core::graph::ProgramGraph;

use crate::convert::{decompose, recompose};
use crate::error::StorageError;
use crate::types::ProgramDocument;

/// Extensions the editor writes. Others load fine but are logged.
pub const PROGRAM_EXTENSIONS: &[&str] = &["robot", "json"];

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn check_extension(path: &Path) {
    let known = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| PROGRAM_EXTENSIONS.contains(&e));
    if !known {
        tracing::warn!(path = %path.display(), "unexpected program file extension");
    }
}

pub fn load_document_file(path: &Path) -> Result<ProgramDocument, StorageError> {
    check_extension(path);
    let text = std::fs::read_to_string(path).map_err(io_error(path))?;
    let doc: ProgramDocument = serde_json::from_str(&text)?;
    tracing::debug!(
        path = %path.display(),
        blocks = doc.blocks.len(),
        connections = doc.connections.len(),
        "loaded program document"
    );
    Ok(doc)
}

pub fn save_document_file(path: &Path, doc: &ProgramDocument) -> Result<(), StorageError> {
    check_extension(path);
    let mut text = serde_json::to_string_pretty(doc)?;
    text.push('\n');

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(io_error(path))?;
    file.write_all(text.as_bytes()).map_err(io_error(path))?;
    file.persist(path).map_err(|e| io_error(path)(e.error))?;
    Ok(())
}

/// Loads a program file and rebuilds its graph.
pub fn load_graph_file(path: &Path) -> Result<ProgramGraph, StorageError> {
    recompose(&load_document_file(path)?)
}

/// Saves a graph under `name`.
pub fn save_graph_file(path: &Path, name: &str, graph: &ProgramGraph) -> Result<(), StorageError> {
    let mut doc = decompose(graph);
    doc.name = name.to_string();
    save_document_file(path, &doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use robotflow_core::ops::{BlockOp, SensorOp};

    #[test]
    fn file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rover.robot");
        let mut g = ProgramGraph::new();
        g.add_block("eye", BlockOp::Sensor(SensorOp::Light));

        save_graph_file(&path, "rover", &g).unwrap();
        let doc = load_document_file(&path).unwrap();
        assert_eq!(doc.name, "rover");
        assert_eq!(doc.blocks[0].kind, "sensor.light");

        let loaded = load_graph_file(&path).unwrap();
        assert_eq!(decompose(&loaded).blocks, decompose(&g).blocks);
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.robot");
        let err = load_graph_file(&path).unwrap_err();
        assert!(matches!(&err, StorageError::Io { path: p, .. } if p == &path));
    }

    #[test]
    fn garbage_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            load_document_file(&path),
            Err(StorageError::Serialization(_))
        ));
    }

    #[test]
    fn minimal_document_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.robot");
        std::fs::write(
            &path,
            r#"{"blocks":[{"id":0,"name":"halt","kind":"motor.stop","inputs":[0],"outputs":[1]}]}"#,
        )
        .unwrap();
        let doc = load_document_file(&path).unwrap();
        assert_eq!(doc.version, crate::types::FORMAT_VERSION);
        assert!(doc.connections.is_empty());
        assert_eq!(load_graph_file(&path).unwrap().block_count(), 1);
    }
}
