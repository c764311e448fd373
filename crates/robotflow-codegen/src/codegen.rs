//! Per-block Python emission over the resolved execution order.
//!
//! [`emit_main`] walks the graph from its entry blocks with an explicit task
//! stack. Emitting a block yields more tasks: literal lines, paired
//! `Indent`/`Dedent` steps around nested bodies, and the successor blocks of
//! each execution output. The indentation level is changed only by those
//! paired steps, so every path leaves it balanced.
//!
//! A block that cannot be emitted is replaced by a `pass` stub carrying the
//! fault, and the walk continues through its `out` port. Every emitted block
//! produces at least one statement, so no Python suite is ever empty.

use std::rc::Rc;

use robotflow_check::order::{resolve, ExecTarget, ExecutionOrder};
use robotflow_check::simulator::eval::repeat_count;
use robotflow_check::simulator::GuardTrip;
use robotflow_core::expr::{self, python_comment, python_literal, python_string};
use robotflow_core::graph::ProgramGraph;
use robotflow_core::ident::sanitize_identifier;
use robotflow_core::node::Block;
use robotflow_core::ops::{BlockOp, LoopKind, MotorOp, PortRole, SensorOp};
use robotflow_core::types::Value;

use crate::error::GenerationFault;
use crate::GenerateOptions;

/// Output of [`emit_main`].
#[derive(Debug, Clone, Default)]
pub struct MainBody {
    /// Body lines, already indented one level inside `main`.
    pub lines: Vec<String>,
    /// Names `main` assigns, in first-assignment order.
    pub globals: Vec<String>,
    pub warnings: Vec<GenerationFault>,
    pub faults: Vec<GenerationFault>,
}

/// A link in the chain of blocks on the current emission path.
#[derive(Debug)]
struct Path {
    index: usize,
    depth: usize,
    parent: Option<Rc<Path>>,
}

impl Path {
    fn contains(path: Option<&Rc<Path>>, index: usize) -> bool {
        let mut cursor = path;
        while let Some(link) = cursor {
            if link.index == index {
                return true;
            }
            cursor = link.parent.as_ref();
        }
        false
    }
}

#[derive(Debug)]
enum Task {
    Line(String),
    Indent,
    Dedent,
    Block {
        target: ExecTarget,
        path: Option<Rc<Path>>,
    },
}

/// Emits the statements of `main` for every entry block in order.
pub fn emit_main(graph: &ProgramGraph, options: &GenerateOptions) -> MainBody {
    let mut emitter = Emitter {
        graph,
        options,
        order: resolve(graph),
        stack: Vec::new(),
        indent: 1,
        body: MainBody::default(),
    };
    emitter.run();
    emitter.body
}

struct Emitter<'g> {
    graph: &'g ProgramGraph,
    options: &'g GenerateOptions,
    order: ExecutionOrder,
    stack: Vec<Task>,
    indent: usize,
    body: MainBody,
}

/// Lines and warnings for one block, committed only if the whole block
/// emits cleanly.
#[derive(Default)]
struct Emission {
    tasks: Vec<Task>,
    warnings: Vec<GenerationFault>,
    globals: Vec<String>,
}

impl Emission {
    fn line(&mut self, line: impl Into<String>) {
        self.tasks.push(Task::Line(line.into()));
    }

    fn warn(&mut self, fault: GenerationFault) {
        self.tasks.push(Task::Line(python_comment(&format!("warning: {fault}"))));
        self.warnings.push(fault);
    }

    fn assigns(&mut self, name: &str) {
        if !self.globals.iter().any(|g| g == name) {
            self.globals.push(name.to_string());
        }
    }
}

impl<'g> Emitter<'g> {
    fn run(&mut self) {
        let graph = self.graph;
        for &index in self.order.entries().iter().rev() {
            let Some(block) = graph.block_at(index) else {
                continue;
            };
            let port = if block.op.is_loop() {
                PortRole::Start
            } else {
                PortRole::In
            };
            self.stack.push(Task::Block {
                target: ExecTarget {
                    index,
                    block: block.id,
                    port,
                },
                path: None,
            });
        }

        while let Some(task) = self.stack.pop() {
            match task {
                Task::Line(line) => self.push_line(&line),
                Task::Indent => self.indent += 1,
                Task::Dedent => self.indent = self.indent.saturating_sub(1),
                Task::Block { target, path } => self.enter(target, path),
            }
        }

        if self.body.lines.is_empty() {
            self.push_line("pass");
        }
    }

    fn push_line(&mut self, line: &str) {
        let prefix = self.options.indent.repeat(self.indent);
        self.body.lines.push(format!("{prefix}{line}"));
    }

    fn enter(&mut self, target: ExecTarget, path: Option<Rc<Path>>) {
        if target.is_loop_back() {
            return;
        }
        let graph = self.graph;
        let Some(block) = graph.block_at(target.index) else {
            return;
        };

        if Path::contains(path.as_ref(), target.index) {
            tracing::debug!(block = %block.id, "cycle on emission path");
            let note = format!(
                "cycle: block {} '{}' already runs on this path",
                block.id, block.name
            );
            self.push_line(&format!("pass  {}", python_comment(&note)));
            return;
        }
        let depth = path.as_ref().map_or(0, |p| p.depth) + 1;
        if depth > self.options.max_depth {
            self.stub(GenerationFault::DepthExceeded {
                block: block.id,
                name: block.name.clone(),
                limit: self.options.max_depth,
            });
            return;
        }

        let here = Rc::new(Path {
            index: target.index,
            depth,
            parent: path,
        });

        let tasks = match self.emit_block(block, target.index, &here) {
            Ok(emission) => {
                self.body.warnings.extend(emission.warnings);
                for name in emission.globals {
                    if !self.body.globals.contains(&name) {
                        self.body.globals.push(name);
                    }
                }
                emission.tasks
            }
            Err(fault) => {
                self.stub(fault);
                self.follow(target.index, PortRole::Out, &here)
            }
        };
        self.stack.extend(tasks.into_iter().rev());
    }

    fn stub(&mut self, fault: GenerationFault) {
        tracing::warn!(%fault, "block replaced by stub");
        self.push_line(&format!("pass  {}", python_comment(&format!("error: {fault}"))));
        self.body.faults.push(fault);
    }

    /// Successor tasks through `role`, loop-back edges dropped.
    fn follow(&self, index: usize, role: PortRole, path: &Rc<Path>) -> Vec<Task> {
        self.order
            .successors(index, role)
            .iter()
            .filter(|t| !t.is_loop_back())
            .map(|t| Task::Block {
                target: *t,
                path: Some(Rc::clone(path)),
            })
            .collect()
    }

    /// An indented suite for `role`; `pass` when nothing is connected.
    fn suite(&self, index: usize, role: PortRole, path: &Rc<Path>, out: &mut Emission) {
        out.tasks.push(Task::Indent);
        let body = self.follow(index, role, path);
        if body.is_empty() {
            out.line(format!("pass  # nothing connected to '{role}'"));
        } else {
            out.tasks.extend(body);
        }
        out.tasks.push(Task::Dedent);
    }

    // -----------------------------------------------------------------------
    // Per-block emission
    // -----------------------------------------------------------------------

    fn emit_block(&self, block: &Block, index: usize, here: &Rc<Path>) -> Result<Emission, GenerationFault> {
        let mut out = Emission::default();
        out.line(python_comment(&format!("block {}: {} ({})", block.id, block.name, block.op)));

        match &block.op {
            BlockOp::Motor(op) => {
                self.emit_motor(block, *op, &mut out)?;
                out.tasks.extend(self.follow(index, PortRole::Out, here));
            }
            BlockOp::Sensor(sensor) => {
                self.emit_sensor(block, *sensor, &mut out)?;
                out.tasks.extend(self.follow(index, PortRole::Out, here));
            }
            BlockOp::Conditional => {
                let condition = self.condition(block, &mut out)?;
                out.line(format!("if {condition}:"));
                self.suite(index, PortRole::True, here, &mut out);
                out.line("else:");
                self.suite(index, PortRole::False, here, &mut out);
            }
            BlockOp::Loop(kind) => {
                self.emit_loop(block, *kind, index, here, &mut out)?;
                out.tasks.extend(self.follow(index, PortRole::Done, here));
            }
            BlockOp::Assign => {
                self.emit_assign(block, &mut out)?;
                out.tasks.extend(self.follow(index, PortRole::Out, here));
            }
            BlockOp::Increment => {
                self.emit_step(block, "+=", &mut out)?;
                out.tasks.extend(self.follow(index, PortRole::Out, here));
            }
            BlockOp::Decrement => {
                self.emit_step(block, "-=", &mut out)?;
                out.tasks.extend(self.follow(index, PortRole::Out, here));
            }
            BlockOp::Unknown { kind } => {
                out.warn(GenerationFault::UnknownKind {
                    block: block.id,
                    name: block.name.clone(),
                    kind: kind.clone(),
                });
                out.line("pass");
                out.tasks.extend(self.follow(index, PortRole::Out, here));
            }
        }
        Ok(out)
    }

    fn emit_motor(&self, block: &Block, op: MotorOp, out: &mut Emission) -> Result<(), GenerationFault> {
        let Some(extent_param) = op.extent_param() else {
            let none = Value::Str(String::new());
            out.line(format!("print({})", python_string(&op.describe(&none, &none))));
            return Ok(());
        };
        let speed = self.param(block, "speed", out)?;
        let extent = self.param(block, extent_param, out)?;
        out.line(format!("print({})", python_string(&op.describe(&speed, &extent))));
        match (extent_param, op.wait_seconds(&extent)) {
            ("time", _) => out.line(format!("time.sleep({})", python_literal(&extent))),
            (_, Some(seconds)) => out.line(format!("time.sleep({})", python_literal(&Value::Float(seconds)))),
            _ => {}
        }
        Ok(())
    }

    fn emit_sensor(&self, block: &Block, sensor: SensorOp, out: &mut Emission) -> Result<(), GenerationFault> {
        let sensor_id = self.param(block, "sensor_id", out)?;
        let variable = self.text_param(block, "variable")?;
        let reading = Value::Float(self.options.sensor_reading);

        let message = format!(
            "{} sensor {sensor_id}: {reading} {} -> {variable}",
            sensor.default_variable(),
            sensor.unit()
        );
        out.line(format!("print({})", python_string(&message)));

        let literal = python_literal(&reading);
        self.write(block, &variable, &literal, out);
        for sink in self.graph.captured_variables(block.id) {
            self.write(block, sink, &literal, out);
        }
        Ok(())
    }

    fn emit_loop(
        &self,
        block: &Block,
        kind: LoopKind,
        index: usize,
        here: &Rc<Path>,
        out: &mut Emission,
    ) -> Result<(), GenerationFault> {
        let header = match kind {
            LoopKind::Repeat => {
                let count = repeat_count(&self.param(block, "count", out)?);
                out.line(format!("for _ in range({count}):"));
                self.suite(index, PortRole::Body, here, out);
                return Ok(());
            }
            LoopKind::While => format!("while {}:", self.condition(block, out)?),
            LoopKind::Forever => "while True:".to_string(),
        };

        let limit = self.options.max_loop_iterations;
        let guard = format!("_guard_{}", block.id);
        let message = GuardTrip::LoopIterations {
            block: block.id,
            name: block.name.clone(),
            limit,
        }
        .to_string();

        out.line(format!("{guard} = 0"));
        out.line(header);
        out.tasks.push(Task::Indent);
        out.line(format!("{guard} += 1"));
        out.line(format!("if {guard} > {limit}:"));
        out.tasks.push(Task::Indent);
        out.line(format!("print({})", python_string(&format!("guard: {message}"))));
        out.line("break");
        out.tasks.push(Task::Dedent);
        out.tasks.extend(self.follow(index, PortRole::Body, here));
        out.tasks.push(Task::Dedent);
        Ok(())
    }

    fn emit_assign(&self, block: &Block, out: &mut Emission) -> Result<(), GenerationFault> {
        let variable = self.text_param(block, "variable")?;
        let value = match self.connected_source(block, PortRole::Value) {
            Some(Some(source)) => source,
            Some(None) => {
                return Err(GenerationFault::MissingSource {
                    block: block.id,
                    name: block.name.clone(),
                    input: "value".to_string(),
                })
            }
            None => {
                let text = self.text_param(block, "value")?;
                match expr::parse(&text) {
                    Ok(e) => e.render_python(),
                    Err(error) => {
                        return Err(GenerationFault::Expression {
                            block: block.id,
                            name: block.name.clone(),
                            source_text: text,
                            error,
                        })
                    }
                }
            }
        };
        self.write(block, &variable, &value, out);
        Ok(())
    }

    fn emit_step(&self, block: &Block, op: &str, out: &mut Emission) -> Result<(), GenerationFault> {
        let variable = self.text_param(block, "variable")?;
        let amount = self.param(block, "amount", out)?;
        let Some(ident) = self.writable(block, &variable, out) else {
            return Ok(());
        };
        out.line(format!("if {} not in globals():", python_string(&ident)));
        out.tasks.push(Task::Indent);
        out.line(format!("{ident} = 0"));
        out.tasks.push(Task::Dedent);
        out.line(format!("{ident} {op} {}", python_literal(&amount)));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Values
    // -----------------------------------------------------------------------

    /// A range-checked parameter; a bad value is replaced by the default
    /// with a warning comment.
    fn param(&self, block: &Block, name: &str, out: &mut Emission) -> Result<Value, GenerationFault> {
        let param = block.param(name).ok_or_else(|| GenerationFault::MissingParam {
            block: block.id,
            name: block.name.clone(),
            param: name.to_string(),
        })?;
        match param.checked_value() {
            Ok(v) => Ok(v),
            Err(issue) => {
                out.warn(GenerationFault::BadParam {
                    block: block.id,
                    name: block.name.clone(),
                    param: name.to_string(),
                    issue: issue.to_string(),
                });
                Ok(param.default.clone())
            }
        }
    }

    fn text_param(&self, block: &Block, name: &str) -> Result<String, GenerationFault> {
        let param = block.param(name).ok_or_else(|| GenerationFault::MissingParam {
            block: block.id,
            name: block.name.clone(),
            param: name.to_string(),
        })?;
        Ok(match param.value_or_default() {
            Value::Str(s) => s,
            other => other.to_string(),
        })
    }

    /// Python source for the value feeding a data input.
    ///
    /// `None` when the input is unconnected; `Some(None)` when it is fed by
    /// something generated code cannot name.
    fn connected_source(&self, block: &Block, role: PortRole) -> Option<Option<String>> {
        let port = self.graph.port_of(block.id, role)?;
        let conn = self.graph.inbound(port.id)?;
        let source = self.graph.port(conn.from);
        Some(source.and_then(|source| {
            if let Some(variable) = source.owner.variable() {
                return Some(sanitize_identifier(variable));
            }
            let feeder = self.graph.block(source.owner.block()?)?;
            match feeder.op {
                BlockOp::Sensor(_) if source.role == PortRole::Reading => {
                    let name = feeder.param("variable")?.value_or_default();
                    Some(sanitize_identifier(name.as_str()?))
                }
                _ => None,
            }
        }))
    }

    /// Python condition for a conditional or while block. A malformed or
    /// unreadable condition renders as `False` with a warning.
    fn condition(&self, block: &Block, out: &mut Emission) -> Result<String, GenerationFault> {
        match self.connected_source(block, PortRole::Condition) {
            Some(Some(source)) => return Ok(source),
            Some(None) => {
                out.warn(GenerationFault::MissingSource {
                    block: block.id,
                    name: block.name.clone(),
                    input: "condition".to_string(),
                });
                return Ok("False".to_string());
            }
            None => {}
        }

        let text = self.text_param(block, "condition")?;
        match expr::parse(&text) {
            Ok(e) => Ok(e.render_python()),
            Err(error) => {
                out.warn(GenerationFault::Condition {
                    block: block.id,
                    name: block.name.clone(),
                    source_text: text,
                    error,
                });
                Ok("False".to_string())
            }
        }
    }

    /// The identifier to assign for `variable`, or `None` (with a warning
    /// and `pass`) when the variable is read-only.
    fn writable(&self, block: &Block, variable: &str, out: &mut Emission) -> Option<String> {
        if self.graph.variable(variable).is_some_and(|v| !v.access.is_writable()) {
            out.warn(GenerationFault::ReadOnly {
                block: block.id,
                name: block.name.clone(),
                variable: variable.to_string(),
            });
            out.line("pass");
            return None;
        }
        let ident = sanitize_identifier(variable);
        if ident != variable {
            out.warn(GenerationFault::Identifier {
                block: block.id,
                name: block.name.clone(),
                original: variable.to_string(),
                rewritten: ident.clone(),
            });
        }
        out.assigns(&ident);
        Some(ident)
    }

    fn write(&self, block: &Block, variable: &str, value: &str, out: &mut Emission) {
        if let Some(ident) = self.writable(block, variable, out) {
            out.line(format!("{ident} = {value}"));
        }
    }
}
