//! Python code generation for robotflow programs.
//!
//! This crate turns a block program graph into a standalone Python script
//! that prints the same console lines the simulator logs.
//!
//! # Modules
//!
//! - [`compiler`] -- Top-level pipeline: validation, sections, output
//! - [`codegen`] -- Per-block emission and the control-flow walk
//! - [`sections`] -- Header, imports, declarations, closing call, metadata
//! - [`error`] -- Fatal errors and recoverable generation faults

pub mod codegen;
pub mod compiler;
pub mod error;
pub mod sections;

pub use compiler::{generate, generate_program, generate_to_file};
pub use error::{CodegenError, GenerationFault};

use serde::{Deserialize, Serialize};

/// Options controlling generated output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateOptions {
    /// One indentation level.
    pub indent: String,

    /// Iterations a `while`/`forever` loop may run before its guard breaks.
    pub max_loop_iterations: usize,

    /// Blocks on one emission path before nesting is cut off with a stub.
    pub max_depth: usize,

    /// Value assigned by every sensor block.
    pub sensor_reading: f64,

    /// Timestamp written to the metadata line.
    /// `None` means the current UTC time.
    pub generated_at: Option<String>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        GenerateOptions {
            indent: "    ".to_string(),
            max_loop_iterations: 1000,
            max_depth: 256,
            sensor_reading: 0.0,
            generated_at: None,
        }
    }
}

/// Result of a successful generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedProgram {
    /// Complete Python source, metadata line included.
    pub source: String,

    /// Lines above the metadata line.
    pub line_count: usize,

    pub block_count: usize,
    pub connection_count: usize,
    pub variable_count: usize,

    /// Timestamp written to the metadata line.
    pub generated_at: String,

    /// Problems recovered inline (defaults substituted, warnings emitted).
    pub warnings: Vec<GenerationFault>,

    /// Blocks or sections replaced by a diagnostic stub.
    pub faults: Vec<GenerationFault>,
}

impl GeneratedProgram {
    /// The source without its trailing metadata line.
    pub fn body(&self) -> &str {
        match self.source.trim_end_matches('\n').rfind('\n') {
            Some(pos) => &self.source[..=pos],
            None => "",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_generate_options() {
        let opts = GenerateOptions::default();
        assert_eq!(opts.indent, "    ");
        assert_eq!(opts.max_loop_iterations, 1000);
        assert_eq!(opts.max_depth, 256);
        assert_eq!(opts.sensor_reading, 0.0);
        assert!(opts.generated_at.is_none());
    }

    #[test]
    fn generate_options_partial_json() {
        let opts: GenerateOptions = serde_json::from_str(r#"{"indent": "\t"}"#).unwrap();
        assert_eq!(opts.indent, "\t");
        assert_eq!(opts.max_loop_iterations, 1000);
    }
}
