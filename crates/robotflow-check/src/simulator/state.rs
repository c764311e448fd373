//! Simulator state and traversal loop.
//!
//! The [`Simulator`] walks the resolver's execution adjacency with an explicit
//! work stack. Each stack entry carries its active path as a persistent chain
//! of block indices, so repetition and depth ceilings are checked per path:
//! a guard trip ends one path while sibling paths carry on.
//!
//! Loops are driven by `Iterate` tasks. An iteration pushes the next
//! iteration first and the body after it, so the body runs to completion
//! (or to the loop's `end` port) before the next iteration starts.

use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use robotflow_core::connect::ensure_well_formed;
use robotflow_core::expr::{self, ArithOp};
use robotflow_core::graph::ProgramGraph;
use robotflow_core::id::PortId;
use robotflow_core::node::Block;
use robotflow_core::ops::{BlockOp, LoopKind, PortRole};
use robotflow_core::types::Value;
use robotflow_core::variable::Access;
use robotflow_core::Connection;

use crate::order::{resolve, ExecTarget, ExecutionOrder};

use super::error::{GuardTrip, SimulationFault};
use super::eval;
use super::trace::{LogEntry, LogKind};

/// Ceilings and inputs for a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Visits of one block allowed on a single path. Default: 3.
    pub max_repetitions: usize,
    /// Maximum path length. Default: 256.
    pub max_depth: usize,
    /// Iterations a `while`/`forever` loop may run. Default: 1000.
    pub max_loop_iterations: usize,
    /// Total tasks processed before the run is stopped. Default: 100_000.
    pub max_steps: usize,
    /// Value every sensor reports. Default: 0.0.
    pub sensor_reading: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        SimulatorConfig {
            max_repetitions: 3,
            max_depth: 256,
            max_loop_iterations: 1000,
            max_steps: 100_000,
            sensor_reading: 0.0,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    Completed,
    Aborted { reason: String },
}

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationReport {
    pub log: Vec<LogEntry>,
    /// Final variable values, temporaries excluded, in first-binding order.
    pub variables: IndexMap<String, Value>,
    pub status: RunStatus,
    pub faults: Vec<SimulationFault>,
    pub guard_trips: Vec<GuardTrip>,
    /// Work-stack tasks processed.
    pub steps: usize,
}

impl SimulationReport {
    fn aborted(reason: String) -> Self {
        SimulationReport {
            log: Vec::new(),
            variables: IndexMap::new(),
            status: RunStatus::Aborted { reason },
            faults: Vec::new(),
            guard_trips: Vec::new(),
            steps: 0,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// Log messages only, in order.
    pub fn messages(&self) -> Vec<&str> {
        self.log.iter().map(|e| e.message.as_str()).collect()
    }
}

/// A link in a persistent path of block indices.
#[derive(Debug)]
struct Path {
    index: usize,
    depth: usize,
    parent: Option<Rc<Path>>,
}

impl Path {
    fn occurrences(path: Option<&Rc<Path>>, index: usize) -> usize {
        let mut count = 0;
        let mut cursor = path;
        while let Some(link) = cursor {
            if link.index == index {
                count += 1;
            }
            cursor = link.parent.as_ref();
        }
        count
    }
}

#[derive(Debug)]
enum Task {
    /// Run the block at `target`, reached along `path`.
    Enter {
        target: ExecTarget,
        path: Option<Rc<Path>>,
    },
    /// Start iteration `iteration` of the loop at `index`. `path` ends at the
    /// loop block.
    Iterate {
        index: usize,
        iteration: usize,
        count: usize,
        path: Rc<Path>,
    },
}

/// Interprets a block program.
pub struct Simulator<'g> {
    graph: &'g ProgramGraph,
    config: SimulatorConfig,
    order: ExecutionOrder,
    variables: IndexMap<String, Value>,
    /// Values produced on data output ports.
    outputs: HashMap<PortId, Value>,
    stack: Vec<Task>,
    log: Vec<LogEntry>,
    faults: Vec<SimulationFault>,
    guard_trips: Vec<GuardTrip>,
    steps: usize,
}

impl<'g> Simulator<'g> {
    /// Prepares a run: resolves execution order and seeds variables from the
    /// graph's declarations overlaid with `initial`.
    pub fn new(graph: &'g ProgramGraph, config: SimulatorConfig, initial: &IndexMap<String, Value>) -> Self {
        let mut variables: IndexMap<String, Value> = graph
            .variables()
            .map(|v| (v.name.clone(), v.value.clone()))
            .collect();
        for (name, value) in initial {
            let value = match graph.variable(name) {
                Some(decl) => value.coerce(decl.ty).unwrap_or_else(|| value.clone()),
                None => value.clone(),
            };
            variables.insert(name.clone(), value);
        }

        Simulator {
            graph,
            config,
            order: resolve(graph),
            variables,
            outputs: HashMap::new(),
            stack: Vec::new(),
            log: Vec::new(),
            faults: Vec::new(),
            guard_trips: Vec::new(),
            steps: 0,
        }
    }

    /// Runs to completion and returns the report.
    pub fn run(mut self) -> SimulationReport {
        let graph = self.graph;
        if let Err(e) = ensure_well_formed(graph) {
            tracing::error!(error = %e, "refusing to simulate malformed graph");
            return SimulationReport::aborted(e.to_string());
        }

        for &index in self.order.entries().iter().rev() {
            let Some(block) = graph.block_at(index) else {
                continue;
            };
            let port = if block.op.is_loop() {
                PortRole::Start
            } else {
                PortRole::In
            };
            self.stack.push(Task::Enter {
                target: ExecTarget {
                    index,
                    block: block.id,
                    port,
                },
                path: None,
            });
        }

        while let Some(task) = self.stack.pop() {
            self.steps += 1;
            if self.steps > self.config.max_steps {
                let index = match &task {
                    Task::Enter { target, .. } => target.index,
                    Task::Iterate { index, .. } => *index,
                };
                if let Some(block) = graph.block_at(index) {
                    self.trip(GuardTrip::StepBudget {
                        block: block.id,
                        name: block.name.clone(),
                        limit: self.config.max_steps,
                    });
                }
                self.stack.clear();
                break;
            }

            match task {
                Task::Enter { target, path } => self.enter(target, path),
                Task::Iterate {
                    index,
                    iteration,
                    count,
                    path,
                } => self.iterate(index, iteration, count, path),
            }
        }

        let variables = self
            .variables
            .into_iter()
            .filter(|(name, _)| graph.variable(name).map(|v| v.access) != Some(Access::Temporary))
            .collect();

        SimulationReport {
            log: self.log,
            variables,
            status: RunStatus::Completed,
            faults: self.faults,
            guard_trips: self.guard_trips,
            steps: self.steps,
        }
    }

    // -----------------------------------------------------------------------
    // Traversal
    // -----------------------------------------------------------------------

    fn enter(&mut self, target: ExecTarget, path: Option<Rc<Path>>) {
        if target.is_loop_back() {
            return;
        }
        let graph = self.graph;
        let Some(block) = graph.block_at(target.index) else {
            return;
        };

        if Path::occurrences(path.as_ref(), target.index) >= self.config.max_repetitions {
            self.trip(GuardTrip::Repetition {
                block: block.id,
                name: block.name.clone(),
                limit: self.config.max_repetitions,
            });
            return;
        }
        let depth = path.as_ref().map_or(0, |p| p.depth) + 1;
        if depth > self.config.max_depth {
            self.trip(GuardTrip::Depth {
                block: block.id,
                name: block.name.clone(),
                limit: self.config.max_depth,
            });
            return;
        }

        let here = Rc::new(Path {
            index: target.index,
            depth,
            parent: path,
        });
        self.run_block(block, target.index, here);
    }

    fn run_block(&mut self, block: &'g Block, index: usize, here: Rc<Path>) {
        let graph = self.graph;
        let mut faults = Vec::new();
        match &block.op {
            BlockOp::Motor(op) => {
                let message = eval::motor_message(block, *op, &mut faults);
                self.record_faults(block, faults);
                self.action(block, message);
                self.follow(index, PortRole::Out, &here);
            }
            BlockOp::Sensor(sensor) => {
                let sensor_id = eval::param_value(block, "sensor_id", &mut faults);
                let variable = eval::param_text(block, "variable", &mut faults);
                self.record_faults(block, faults);

                let reading = Value::Float(self.config.sensor_reading);
                if let Some(port) = graph.port_of(block.id, PortRole::Reading) {
                    self.outputs.insert(port.id, reading.clone());
                }
                let sensor_id = sensor_id.map(|v| v.to_string()).unwrap_or_else(|| "?".into());
                let mut message = format!(
                    "{} sensor {sensor_id}: {reading} {}",
                    sensor.default_variable(),
                    sensor.unit()
                );
                if let Some(name) = variable {
                    message.push_str(&format!(" -> {name}"));
                    self.write_variable(block, &name, reading.clone());
                }
                for sink in graph.captured_variables(block.id) {
                    self.write_variable(block, sink, reading.clone());
                }
                self.action(block, message);
                self.follow(index, PortRole::Out, &here);
            }
            BlockOp::Conditional => {
                let outcome = self.condition(block);
                self.action(block, format!("if -> {}", if outcome { "true" } else { "false" }));
                let branch = if outcome { PortRole::True } else { PortRole::False };
                self.follow(index, branch, &here);
            }
            BlockOp::Loop(kind) => {
                let count = match kind {
                    LoopKind::Repeat => {
                        let count = eval::param_value(block, "count", &mut faults)
                            .map(|v| eval::repeat_count(&v))
                            .unwrap_or(1);
                        self.record_faults(block, faults);
                        self.action(block, format!("repeat {count} times"));
                        count
                    }
                    LoopKind::While => {
                        self.action(block, "while loop".to_string());
                        self.config.max_loop_iterations
                    }
                    LoopKind::Forever => {
                        self.action(block, "forever loop".to_string());
                        self.config.max_loop_iterations
                    }
                };
                self.stack.push(Task::Iterate {
                    index,
                    iteration: 0,
                    count,
                    path: here,
                });
            }
            BlockOp::Assign => {
                self.assign(block);
                self.follow(index, PortRole::Out, &here);
            }
            BlockOp::Increment => {
                self.step_variable(block, ArithOp::Add);
                self.follow(index, PortRole::Out, &here);
            }
            BlockOp::Decrement => {
                self.step_variable(block, ArithOp::Sub);
                self.follow(index, PortRole::Out, &here);
            }
            BlockOp::Unknown { kind } => {
                self.fault(
                    block,
                    SimulationFault::UnknownKind {
                        block: block.id,
                        name: block.name.clone(),
                        kind: kind.clone(),
                    },
                );
                self.follow(index, PortRole::Out, &here);
            }
        }
    }

    fn iterate(&mut self, index: usize, iteration: usize, count: usize, path: Rc<Path>) {
        let graph = self.graph;
        let Some(block) = graph.block_at(index) else {
            return;
        };
        let BlockOp::Loop(kind) = &block.op else {
            return;
        };

        let proceed = match kind {
            LoopKind::Repeat => iteration < count,
            LoopKind::While | LoopKind::Forever => {
                let holds = *kind == LoopKind::Forever || self.condition(block);
                if holds && iteration >= self.config.max_loop_iterations {
                    self.trip(GuardTrip::LoopIterations {
                        block: block.id,
                        name: block.name.clone(),
                        limit: self.config.max_loop_iterations,
                    });
                    false
                } else {
                    holds
                }
            }
        };

        if proceed {
            self.stack.push(Task::Iterate {
                index,
                iteration: iteration + 1,
                count,
                path: Rc::clone(&path),
            });
            self.follow(index, PortRole::Body, &path);
        } else {
            self.follow(index, PortRole::Done, &path);
        }
    }

    /// Schedules every successor through `role`, first target on top.
    fn follow(&mut self, index: usize, role: PortRole, path: &Rc<Path>) {
        for target in self.order.successors(index, role).iter().rev() {
            self.stack.push(Task::Enter {
                target: *target,
                path: Some(Rc::clone(path)),
            });
        }
    }

    // -----------------------------------------------------------------------
    // Values and variables
    // -----------------------------------------------------------------------

    /// Truth of a conditional or while block: the connected `condition`
    /// input if any, else the `condition` expression. Failures read as false.
    fn condition(&mut self, block: &Block) -> bool {
        let mut faults = Vec::new();
        let value = match self.connected_input(block, PortRole::Condition) {
            Some(conn) => self.read_input(block, &conn, "condition"),
            None => eval::eval_param(block, "condition", &self.variables, &mut faults),
        };
        self.record_faults(block, faults);
        value.is_some_and(|v| v.truthy())
    }

    fn connected_input(&self, block: &Block, role: PortRole) -> Option<Connection> {
        let port = self.graph.port_of(block.id, role)?;
        self.graph.inbound(port.id).cloned()
    }

    /// The value arriving over a data connection.
    fn read_input(&mut self, block: &Block, conn: &Connection, input: &str) -> Option<Value> {
        let graph = self.graph;
        let source = graph.port(conn.from)?;
        if let Some(variable) = source.owner.variable() {
            let value = self.variables.get(variable).cloned();
            if value.is_none() {
                self.fault(
                    block,
                    SimulationFault::MissingVariable {
                        block: block.id,
                        name: block.name.clone(),
                        variable: variable.to_string(),
                    },
                );
            }
            return value;
        }
        let value = self.outputs.get(&conn.from).cloned();
        if value.is_none() {
            self.fault(
                block,
                SimulationFault::MissingInput {
                    block: block.id,
                    name: block.name.clone(),
                    input: input.to_string(),
                },
            );
        }
        value
    }

    fn assign(&mut self, block: &Block) {
        let mut faults = Vec::new();
        let name = eval::param_text(block, "variable", &mut faults);
        let value = match self.connected_input(block, PortRole::Value) {
            Some(conn) => self.read_input(block, &conn, "value"),
            None => eval::eval_param(block, "value", &self.variables, &mut faults),
        };
        self.record_faults(block, faults);

        let (Some(name), Some(value)) = (name, value) else {
            self.action(block, "assign skipped".to_string());
            return;
        };
        if self.write_variable(block, &name, value.clone()) {
            self.action(block, format!("{name} = {value}"));
        }
    }

    fn step_variable(&mut self, block: &Block, op: ArithOp) {
        let mut faults = Vec::new();
        let name = eval::param_text(block, "variable", &mut faults);
        let amount = eval::param_value(block, "amount", &mut faults);
        self.record_faults(block, faults);
        let (Some(name), Some(amount)) = (name, amount) else {
            return;
        };

        let current = match self.variables.get(&name) {
            Some(v) => v.clone(),
            None => {
                self.action(block, format!("{name} initialised to 0"));
                self.variables.insert(name.clone(), Value::Int(0));
                Value::Int(0)
            }
        };
        match expr::arith(op, &current, &amount) {
            Ok(next) => {
                if self.write_variable(block, &name, next.clone()) {
                    self.action(block, format!("{name} = {next}"));
                }
            }
            Err(error) => {
                let symbol = if op == ArithOp::Add { "+" } else { "-" };
                self.fault(
                    block,
                    SimulationFault::Expression {
                        block: block.id,
                        name: block.name.clone(),
                        source_text: format!("{name} {symbol} {amount}"),
                        error: error.into(),
                    },
                );
            }
        }
    }

    /// Writes a variable, honouring its declared access and type. Returns
    /// `false` (prior value kept) when the write is refused.
    fn write_variable(&mut self, block: &Block, name: &str, value: Value) -> bool {
        let graph = self.graph;
        let value = match graph.variable(name) {
            Some(decl) if !decl.access.is_writable() => {
                self.fault(
                    block,
                    SimulationFault::ReadOnlyWrite {
                        block: block.id,
                        name: block.name.clone(),
                        variable: name.to_string(),
                    },
                );
                return false;
            }
            Some(decl) => match value.coerce(decl.ty) {
                Some(v) => v,
                None => {
                    self.fault(
                        block,
                        SimulationFault::TypeMismatch {
                            block: block.id,
                            name: block.name.clone(),
                            variable: name.to_string(),
                            expected: decl.ty,
                            found: value.value_type(),
                        },
                    );
                    return false;
                }
            },
            None => value,
        };
        self.variables.insert(name.to_string(), value);
        true
    }

    // -----------------------------------------------------------------------
    // Recording
    // -----------------------------------------------------------------------

    fn action(&mut self, block: &Block, message: String) {
        tracing::trace!(block = %block.id, %message, "simulate");
        self.log.push(LogEntry {
            kind: LogKind::Action,
            block: block.id,
            block_name: block.name.clone(),
            message,
        });
    }

    fn record_faults(&mut self, block: &Block, faults: Vec<SimulationFault>) {
        for fault in faults {
            self.fault(block, fault);
        }
    }

    fn fault(&mut self, block: &Block, fault: SimulationFault) {
        tracing::warn!(%fault, "recovered block fault");
        self.log.push(LogEntry {
            kind: LogKind::Fault,
            block: block.id,
            block_name: block.name.clone(),
            message: fault.to_string(),
        });
        self.faults.push(fault);
    }

    fn trip(&mut self, trip: GuardTrip) {
        tracing::warn!(%trip, "guard tripped");
        let block_name = self
            .graph
            .block(trip.block())
            .map(|b| b.name.clone())
            .unwrap_or_default();
        self.log.push(LogEntry {
            kind: LogKind::Guard,
            block: trip.block(),
            block_name,
            message: trip.to_string(),
        });
        self.guard_trips.push(trip);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use robotflow_core::ops::MotorOp;

    #[test]
    fn config_default_values() {
        let config = SimulatorConfig::default();
        assert_eq!(config.max_repetitions, 3);
        assert_eq!(config.max_depth, 256);
        assert_eq!(config.max_loop_iterations, 1000);
        assert_eq!(config.sensor_reading, 0.0);
    }

    #[test]
    fn config_deserializes_partially() {
        let config: SimulatorConfig = serde_json::from_str(r#"{"max_repetitions": 5}"#).unwrap();
        assert_eq!(config.max_repetitions, 5);
        assert_eq!(config.max_depth, 256);
    }

    #[test]
    fn path_counts_occurrences() {
        let root = Rc::new(Path {
            index: 1,
            depth: 1,
            parent: None,
        });
        let mid = Rc::new(Path {
            index: 2,
            depth: 2,
            parent: Some(root),
        });
        let tip = Rc::new(Path {
            index: 1,
            depth: 3,
            parent: Some(mid),
        });
        assert_eq!(Path::occurrences(Some(&tip), 1), 2);
        assert_eq!(Path::occurrences(Some(&tip), 2), 1);
        assert_eq!(Path::occurrences(None, 1), 0);
    }

    #[test]
    fn step_budget_stops_the_run() {
        let mut g = ProgramGraph::new();
        let lp = g.add_block("loop", BlockOp::Loop(LoopKind::Repeat));
        g.set_param(lp, "count", Value::Int(1_000_000)).unwrap();
        let body = g.add_block("go", BlockOp::Motor(MotorOp::Stop));
        let out = g.port_of(lp, PortRole::Body).unwrap().id;
        let inp = g.port_of(body, PortRole::In).unwrap().id;
        g.add_connection(out, inp).unwrap();

        let config = SimulatorConfig {
            max_steps: 50,
            ..SimulatorConfig::default()
        };
        let report = Simulator::new(&g, config, &IndexMap::new()).run();
        assert_eq!(report.status, RunStatus::Completed);
        assert!(matches!(report.guard_trips.last(), Some(GuardTrip::StepBudget { .. })));
        assert_eq!(report.steps, 51);
        assert!(!report.log.is_empty());
    }

    #[test]
    fn long_repeat_completes_with_default_budget() {
        let mut g = ProgramGraph::new();
        let lp = g.add_block("loop", BlockOp::Loop(LoopKind::Repeat));
        g.set_param(lp, "count", Value::Int(60_000)).unwrap();
        let body = g.add_block("halt", BlockOp::Motor(MotorOp::Stop));
        let out = g.port_of(lp, PortRole::Body).unwrap().id;
        let inp = g.port_of(body, PortRole::In).unwrap().id;
        g.add_connection(out, inp).unwrap();

        let report = Simulator::new(&g, SimulatorConfig::default(), &IndexMap::new()).run();
        assert_eq!(report.status, RunStatus::Completed);
        assert!(report.is_completed());
    }
}
