//! Top-level generation pipeline:
//! validation -> sections -> main body -> metadata.
//!
//! [`generate_program`] is the main entry point. It rejects structurally
//! malformed graphs before producing any text. Past that point nothing is
//! fatal: a section that fails is replaced by a diagnostic comment and a
//! block that fails by a stub.
//!
//! [`generate`] is the infallible convenience form returning only the
//! source text, or an empty string for a malformed graph.

use std::io::Write;
use std::path::Path;

use robotflow_core::connect::validate_graph;
use robotflow_core::error::StructuralError;
use robotflow_core::expr::python_comment;
use robotflow_core::graph::ProgramGraph;

use crate::codegen::emit_main;
use crate::error::{CodegenError, GenerationFault};
use crate::{sections, GenerateOptions, GeneratedProgram};

/// Generates Python source with default options.
///
/// Never fails: a malformed graph yields an empty string.
pub fn generate(graph: &ProgramGraph) -> String {
    match generate_program(graph, &GenerateOptions::default()) {
        Ok(program) => program.source,
        Err(_) => String::new(),
    }
}

/// Generates a Python program from a block graph.
///
/// Steps:
/// 1. Validate the graph (malformed graphs are rejected; an empty graph is
///    allowed and yields a `main` that does nothing)
/// 2. Render header, imports and declarations
/// 3. Walk the execution order to build `main`
/// 4. Append the closing call and the metadata line
pub fn generate_program(graph: &ProgramGraph, options: &GenerateOptions) -> Result<GeneratedProgram, CodegenError> {
    let errors = validate_graph(graph);
    if !errors.is_empty() {
        let error = StructuralError::Malformed { errors };
        tracing::error!(%error, "refusing to generate code for malformed graph");
        return Err(error.into());
    }

    let mut lines: Vec<String> = Vec::new();
    let mut faults = Vec::new();

    lines.extend(sections::header(graph));
    lines.push(String::new());
    lines.extend(sections::imports());
    lines.push(String::new());
    match sections::declarations(graph) {
        Ok(section) => lines.extend(section),
        Err(fault) => {
            tracing::warn!(%fault, "section replaced by diagnostic");
            lines.push(python_comment(&format!("error: {fault}")));
            faults.push(fault);
        }
    }
    lines.push(String::new());
    lines.push(String::new());

    let main = emit_main(graph, options);
    lines.push("def main():".to_string());
    if !main.globals.is_empty() {
        lines.push(format!("{}global {}", options.indent, main.globals.join(", ")));
    }
    lines.extend(main.lines);
    faults.extend(main.faults);
    lines.push(String::new());
    lines.push(String::new());

    lines.extend(sections::closing(&options.indent));

    let generated_at = options
        .generated_at
        .clone()
        .unwrap_or_else(sections::timestamp_now);
    let line_count = lines.len();
    lines.push(sections::metadata(graph, line_count, &generated_at));

    let mut source = lines.join("\n");
    source.push('\n');

    tracing::debug!(
        lines = line_count,
        warnings = main.warnings.len(),
        faults = faults.len(),
        "generated program"
    );

    Ok(GeneratedProgram {
        source,
        line_count,
        block_count: graph.block_count(),
        connection_count: graph.connection_count(),
        variable_count: graph.variable_count(),
        generated_at,
        warnings: main.warnings,
        faults,
    })
}

/// Generates a program and writes it to `path`.
///
/// The file is written to a temporary sibling first and renamed into place,
/// so a failed write never leaves a truncated program behind.
pub fn generate_to_file(
    graph: &ProgramGraph,
    options: &GenerateOptions,
    path: &Path,
) -> Result<GeneratedProgram, CodegenError> {
    let program = generate_program(graph, options)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(program.source.as_bytes())?;
    file.persist(path).map_err(|e| e.error)?;

    Ok(program)
}

/// Faults that replaced a whole section rather than one block.
pub fn section_faults(program: &GeneratedProgram) -> impl Iterator<Item = &GenerationFault> {
    program.faults.iter().filter(|f| f.block().is_none())
}
