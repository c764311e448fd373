//! Fixed sections of a generated program.
//!
//! Each section renders on its own. A section that fails is replaced by a
//! diagnostic comment by the pipeline in [`crate::compiler`]; the sections
//! after it still render.

use std::time::{SystemTime, UNIX_EPOCH};

use robotflow_core::expr::{python_comment, python_literal};
use robotflow_core::graph::ProgramGraph;
use robotflow_core::ident::sanitize_identifier;
use robotflow_core::variable::Access;

use crate::error::GenerationFault;

/// Shebang and a one-line summary of the source graph.
pub fn header(graph: &ProgramGraph) -> Vec<String> {
    vec![
        "#!/usr/bin/env python3".to_string(),
        "# Robot program generated by robotflow.".to_string(),
        format!(
            "# Blocks: {}, connections: {}, variables: {}",
            graph.block_count(),
            graph.connection_count(),
            graph.variable_count()
        ),
    ]
}

pub fn imports() -> Vec<String> {
    vec!["import time".to_string()]
}

/// One module-level assignment per declared variable.
///
/// Fails when a declared value cannot be represented as its declared type.
pub fn declarations(graph: &ProgramGraph) -> Result<Vec<String>, GenerationFault> {
    if graph.variable_count() == 0 {
        return Ok(vec!["# No declared variables.".to_string()]);
    }

    let mut lines = vec!["# Variables".to_string()];
    for var in graph.variables() {
        let value = var.value.coerce(var.ty).ok_or_else(|| GenerationFault::Section {
            section: "declarations".to_string(),
            reason: format!(
                "variable '{}' holds {} but is declared {}",
                var.name,
                var.value.value_type(),
                var.ty
            ),
        })?;

        let ident = sanitize_identifier(&var.name);
        if ident != var.name {
            lines.push(python_comment(&format!(
                "warning: variable '{}' renamed to '{ident}'",
                var.name
            )));
        }

        let mut notes = Vec::new();
        match var.access {
            Access::ReadOnly => notes.push("read-only".to_string()),
            Access::Temporary => notes.push("temporary".to_string()),
            Access::ReadWrite => {}
        }
        if !var.unit.is_empty() {
            notes.push(var.unit.clone());
        }
        if !var.description.is_empty() {
            notes.push(var.description.clone());
        }

        let mut line = format!("{ident} = {}", python_literal(&value));
        if !notes.is_empty() {
            line.push_str("  ");
            line.push_str(&python_comment(&notes.join(", ")));
        }
        lines.push(line);
    }
    Ok(lines)
}

/// Entry-point guard calling `main`.
pub fn closing(indent: &str) -> Vec<String> {
    vec![
        "if __name__ == '__main__':".to_string(),
        format!("{indent}main()"),
    ]
}

/// The trailing metadata comment. `lines` counts the lines above it.
pub fn metadata(graph: &ProgramGraph, lines: usize, generated_at: &str) -> String {
    python_comment(&format!(
        "robotflow: blocks={} connections={} variables={} lines={lines} generated_at={generated_at}",
        graph.block_count(),
        graph.connection_count(),
        graph.variable_count()
    ))
}

/// The current UTC time, as written to the metadata line.
pub fn timestamp_now() -> String {
    iso_timestamp(SystemTime::now())
}

/// Formats `at` as `YYYY-MM-DDTHH:MM:SSZ`. Times before the epoch clamp to it.
pub fn iso_timestamp(at: SystemTime) -> String {
    let secs = at.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
    let (year, month, day) = calendar_date(secs / SECS_PER_DAY);
    let time_of_day = secs % SECS_PER_DAY;
    format!(
        "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}Z",
        time_of_day / 3600,
        time_of_day % 3600 / 60,
        time_of_day % 60
    )
}

const SECS_PER_DAY: u64 = 86_400;

fn is_leap(year: u64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Gregorian (year, month, day) for a count of days since 1970-01-01.
fn calendar_date(mut days: u64) -> (u64, u64, u64) {
    let mut year = 1970;
    loop {
        let length = if is_leap(year) { 366 } else { 365 };
        if days < length {
            break;
        }
        days -= length;
        year += 1;
    }

    let february = if is_leap(year) { 29 } else { 28 };
    let months = [31, february, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    let mut month = 1;
    for length in months {
        if days < length {
            break;
        }
        days -= length;
        month += 1;
    }
    (year, month, days + 1)
}
