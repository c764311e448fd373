//! Robot program tools.
//!
//! Provides the `robotflow` binary with subcommands over a saved program
//! file: `check` validates it and reports the execution order, `generate`
//! writes the Python program, `simulate` runs it and prints the log.
//!
//! Exit codes: 0 = success, 1 = invalid program or aborted run, 3 = I/O error.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use indexmap::IndexMap;

use robotflow_check::simulator::{execute_with_config, RunStatus, SimulatorConfig};
use robotflow_check::order::resolve;
use robotflow_codegen::{generate_program, generate_to_file, CodegenError, GenerateOptions};
use robotflow_core::graph::ProgramGraph;
use robotflow_core::types::Value;
use robotflow_storage::{load_graph_file, StorageError};

const EXIT_OK: i32 = 0;
const EXIT_INVALID: i32 = 1;
const EXIT_IO: i32 = 3;

/// Robot block program tools.
#[derive(Parser)]
#[command(name = "robotflow", about = "Check, generate and simulate robot block programs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Validate a program and print its execution order.
    Check {
        /// Program file (.robot or .json).
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Generate a Python program.
    Generate {
        /// Program file (.robot or .json).
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (default: stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Iteration limit written into while/forever guards.
        #[arg(long, default_value_t = GenerateOptions::default().max_loop_iterations)]
        max_loop_iterations: usize,
    },

    /// Simulate a program and print its log.
    Simulate {
        /// Program file (.robot or .json).
        #[arg(short, long)]
        input: PathBuf,

        /// Initial variable value, `name=value`. Repeatable.
        #[arg(long = "var", value_parser = parse_var)]
        vars: Vec<(String, Value)>,

        /// Visits of one block allowed on a single path.
        #[arg(long, default_value_t = SimulatorConfig::default().max_repetitions)]
        max_repetitions: usize,

        /// Longest path before it is cut.
        #[arg(long, default_value_t = SimulatorConfig::default().max_depth)]
        max_depth: usize,

        /// Iterations allowed for one while/forever loop.
        #[arg(long, default_value_t = SimulatorConfig::default().max_loop_iterations)]
        max_loop_iterations: usize,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Check { input } => run_check(&input),
        Commands::Generate {
            input,
            output,
            max_loop_iterations,
        } => {
            let options = GenerateOptions {
                max_loop_iterations,
                ..GenerateOptions::default()
            };
            run_generate(&input, output.as_deref(), &options)
        }
        Commands::Simulate {
            input,
            vars,
            max_repetitions,
            max_depth,
            max_loop_iterations,
        } => {
            let config = SimulatorConfig {
                max_repetitions,
                max_depth,
                max_loop_iterations,
                ..SimulatorConfig::default()
            };
            run_simulate(&input, vars.into_iter().collect(), config)
        }
    };
    process::exit(exit_code);
}

/// Parses `name=value`. The value is read as a JSON scalar (`true`, `3`,
/// `2.5`, `"text"`); anything else is taken as a bare string.
fn parse_var(raw: &str) -> Result<(String, Value), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing variable name in '{raw}'"));
    }
    let value = serde_json::from_str::<Value>(value.trim())
        .unwrap_or_else(|_| Value::Str(value.to_string()));
    Ok((name.to_string(), value))
}

fn storage_exit_code(error: &StorageError) -> i32 {
    match error {
        StorageError::Io { .. } => EXIT_IO,
        _ => EXIT_INVALID,
    }
}

fn load(input: &Path) -> Result<ProgramGraph, i32> {
    load_graph_file(input).map_err(|e| {
        eprintln!("Error: failed to load '{}': {}", input.display(), e);
        storage_exit_code(&e)
    })
}

/// Execute the check subcommand.
fn run_check(input: &Path) -> i32 {
    let graph = match load(input) {
        Ok(g) => g,
        Err(code) => return code,
    };

    let order = resolve(&graph);
    println!(
        "{}: {} block(s), {} connection(s), {} variable(s)",
        input.display(),
        graph.block_count(),
        graph.connection_count(),
        graph.variable_count()
    );
    for &index in order.entries() {
        if let Some(block) = graph.block_at(index) {
            println!("entry: block {} '{}' ({})", block.id, block.name, block.op);
        }
    }
    for cycle in order.cycles() {
        let ids: Vec<String> = cycle.blocks.iter().map(|b| b.to_string()).collect();
        println!("cycle: {}", ids.join(" -> "));
    }
    EXIT_OK
}

/// Execute the generate subcommand.
fn run_generate(input: &Path, output: Option<&Path>, options: &GenerateOptions) -> i32 {
    let graph = match load(input) {
        Ok(g) => g,
        Err(code) => return code,
    };

    let result = match output {
        Some(path) => generate_to_file(&graph, options, path),
        None => generate_program(&graph, options),
    };
    match result {
        Ok(program) => {
            if output.is_none() {
                print!("{}", program.source);
            }
            for warning in &program.warnings {
                eprintln!("warning: {warning}");
            }
            for fault in &program.faults {
                eprintln!("error: {fault}");
            }
            tracing::info!(
                lines = program.line_count,
                warnings = program.warnings.len(),
                faults = program.faults.len(),
                "generated program"
            );
            EXIT_OK
        }
        Err(CodegenError::IoError(e)) => {
            eprintln!("I/O error: {e}");
            EXIT_IO
        }
        Err(e) => {
            eprintln!("Generation error: {e}");
            EXIT_INVALID
        }
    }
}

/// Execute the simulate subcommand.
fn run_simulate(input: &Path, initial: IndexMap<String, Value>, config: SimulatorConfig) -> i32 {
    let graph = match load(input) {
        Ok(g) => g,
        Err(code) => return code,
    };

    let report = execute_with_config(&graph, &initial, config);
    for entry in &report.log {
        println!("{entry}");
    }
    for (name, value) in &report.variables {
        println!("{name} = {value}");
    }
    match &report.status {
        RunStatus::Completed => {
            tracing::info!(
                steps = report.steps,
                faults = report.faults.len(),
                guard_trips = report.guard_trips.len(),
                "simulation completed"
            );
            EXIT_OK
        }
        RunStatus::Aborted { reason } => {
            eprintln!("Simulation aborted: {reason}");
            EXIT_INVALID
        }
    }
}
