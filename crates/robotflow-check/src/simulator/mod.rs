//! Execution simulator for block programs.
//!
//! Interprets a [`ProgramGraph`] directly, producing the console log a
//! generated program would print plus the final variable values.
//!
//! # Architecture
//!
//! - [`Simulator`] borrows the graph immutably and walks the execution
//!   adjacency computed by [`crate::order::resolve`] with an explicit work
//!   stack. Each stack entry carries its path of visited blocks.
//! - [`SimulatorConfig`] holds the ceilings: visits per path, path depth,
//!   loop iterations and a total step budget.
//! - [`SimulationFault`] is a per-block failure. The block is skipped (a
//!   condition reads as false, a write leaves the prior value) and the run
//!   continues.
//! - [`GuardTrip`] records a ceiling being hit. It stops one path or one
//!   loop; the step budget ends the run early, which still counts as
//!   completed with the log gathered so far.
//! - [`LogEntry`] is one line of output, in execution order.
//!
//! # Usage
//!
//! ```ignore
//! let report = execute(&graph, &IndexMap::new());
//! for line in &report.log {
//!     println!("{line}");
//! }
//! ```

pub mod error;
pub mod eval;
pub mod state;
pub mod trace;

use indexmap::IndexMap;
use robotflow_core::graph::ProgramGraph;
use robotflow_core::types::Value;

pub use error::{GuardTrip, SimulationFault};
pub use state::{RunStatus, SimulationReport, Simulator, SimulatorConfig};
pub use trace::{LogEntry, LogKind};

/// Runs `graph` with default ceilings. `initial` overrides declared variable
/// values and may introduce new ones.
pub fn execute(graph: &ProgramGraph, initial: &IndexMap<String, Value>) -> SimulationReport {
    execute_with_config(graph, initial, SimulatorConfig::default())
}

pub fn execute_with_config(
    graph: &ProgramGraph,
    initial: &IndexMap<String, Value>,
    config: SimulatorConfig,
) -> SimulationReport {
    Simulator::new(graph, config, initial).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use robotflow_core::id::{BlockId, PortId};
    use robotflow_core::ops::{BlockOp, LoopKind, MotorOp, PortRole, SensorOp};
    use robotflow_core::types::ValueType;
    use robotflow_core::variable::{Access, Variable};

    fn port(g: &ProgramGraph, block: BlockId, role: PortRole) -> PortId {
        g.port_of(block, role).unwrap().id
    }

    fn wire(g: &mut ProgramGraph, from: BlockId, from_role: PortRole, to: BlockId, to_role: PortRole) {
        let out = port(g, from, from_role);
        let inp = port(g, to, to_role);
        g.add_connection(out, inp).unwrap();
    }

    fn actions_of(report: &SimulationReport, block: BlockId) -> usize {
        report
            .log
            .iter()
            .filter(|e| e.block == block && e.kind == LogKind::Action)
            .count()
    }

    fn run(g: &ProgramGraph) -> SimulationReport {
        execute(g, &IndexMap::new())
    }

    // -----------------------------------------------------------------------
    // Straight-line blocks
    // -----------------------------------------------------------------------

    #[test]
    fn single_motor_forward() {
        let mut g = ProgramGraph::new();
        g.add_block("go", BlockOp::Motor(MotorOp::Forward));
        let report = run(&g);
        assert!(report.is_completed());
        assert_eq!(report.messages(), vec!["forward: speed=50, time=1.0s"]);
        assert!(report.faults.is_empty());
    }

    #[test]
    fn sequence_runs_in_wiring_order() {
        let mut g = ProgramGraph::new();
        let stop = g.add_block("halt", BlockOp::Motor(MotorOp::Stop));
        let left = g.add_block("left", BlockOp::Motor(MotorOp::TurnLeft));
        wire(&mut g, left, PortRole::Out, stop, PortRole::In);
        let report = run(&g);
        assert_eq!(
            report.messages(),
            vec!["turn left: speed=30, angle=90deg", "stop"]
        );
    }

    #[test]
    fn out_of_range_param_uses_default_and_faults() {
        let mut g = ProgramGraph::new();
        let go = g.add_block("go", BlockOp::Motor(MotorOp::Forward));
        g.set_param(go, "speed", Value::Int(250)).unwrap();
        let report = run(&g);
        assert_eq!(report.messages().last(), Some(&"forward: speed=50, time=1.0s"));
        assert!(matches!(
            report.faults.as_slice(),
            [SimulationFault::BadParam { param, .. }] if param == "speed"
        ));
    }

    #[test]
    fn unknown_kind_faults_and_continues() {
        let mut g = ProgramGraph::new();
        let odd = g.add_block("odd", BlockOp::Unknown { kind: "arm.grip".into() });
        let stop = g.add_block("halt", BlockOp::Motor(MotorOp::Stop));
        wire(&mut g, odd, PortRole::Out, stop, PortRole::In);
        let report = run(&g);
        assert!(matches!(
            report.faults.as_slice(),
            [SimulationFault::UnknownKind { kind, .. }] if kind == "arm.grip"
        ));
        assert_eq!(actions_of(&report, stop), 1);
    }

    // -----------------------------------------------------------------------
    // Guards
    // -----------------------------------------------------------------------

    #[test]
    fn three_block_cycle_visits_each_block_ceiling_times() {
        let mut g = ProgramGraph::new();
        let a = g.add_block("a", BlockOp::Motor(MotorOp::Forward));
        let b = g.add_block("b", BlockOp::Motor(MotorOp::TurnLeft));
        let c = g.add_block("c", BlockOp::Motor(MotorOp::Backward));
        wire(&mut g, a, PortRole::Out, b, PortRole::In);
        wire(&mut g, b, PortRole::Out, c, PortRole::In);
        wire(&mut g, c, PortRole::Out, a, PortRole::In);

        for limit in [1, 3, 5] {
            let config = SimulatorConfig {
                max_repetitions: limit,
                ..SimulatorConfig::default()
            };
            let report = execute_with_config(&g, &IndexMap::new(), config);
            assert!(report.is_completed());
            for block in [a, b, c] {
                assert_eq!(actions_of(&report, block), limit, "limit {limit}");
            }
            assert_eq!(
                report.guard_trips,
                vec![GuardTrip::Repetition {
                    block: a,
                    name: "a".into(),
                    limit,
                }]
            );
        }
    }

    #[test]
    fn depth_ceiling_stops_long_chains() {
        let mut g = ProgramGraph::new();
        let mut prev = g.add_block("m0", BlockOp::Motor(MotorOp::Stop));
        for i in 1..6 {
            let next = g.add_block(&format!("m{i}"), BlockOp::Motor(MotorOp::Stop));
            wire(&mut g, prev, PortRole::Out, next, PortRole::In);
            prev = next;
        }
        let config = SimulatorConfig {
            max_depth: 4,
            ..SimulatorConfig::default()
        };
        let report = execute_with_config(&g, &IndexMap::new(), config);
        assert_eq!(report.messages().iter().filter(|m| **m == "stop").count(), 4);
        assert!(matches!(report.guard_trips.as_slice(), [GuardTrip::Depth { limit: 4, .. }]));
    }

    #[test]
    fn while_loop_stops_at_iteration_ceiling_then_continues() {
        let mut g = ProgramGraph::new();
        let lp = g.add_block("spin", BlockOp::Loop(LoopKind::While));
        g.set_param(lp, "condition", Value::Str("true".into())).unwrap();
        let inc = g.add_block("tick", BlockOp::Increment);
        let stop = g.add_block("halt", BlockOp::Motor(MotorOp::Stop));
        wire(&mut g, lp, PortRole::Body, inc, PortRole::In);
        wire(&mut g, lp, PortRole::Done, stop, PortRole::In);

        let config = SimulatorConfig {
            max_loop_iterations: 5,
            ..SimulatorConfig::default()
        };
        let report = execute_with_config(&g, &IndexMap::new(), config);
        assert_eq!(report.variables["count"], Value::Int(5));
        assert!(matches!(
            report.guard_trips.as_slice(),
            [GuardTrip::LoopIterations { limit: 5, .. }]
        ));
        assert_eq!(report.messages().last(), Some(&"stop"));
    }

    #[test]
    fn while_loop_ends_when_condition_fails() {
        let mut g = ProgramGraph::new();
        let lp = g.add_block("until ten", BlockOp::Loop(LoopKind::While));
        let inc = g.add_block("tick", BlockOp::Increment);
        wire(&mut g, lp, PortRole::Body, inc, PortRole::In);
        wire(&mut g, inc, PortRole::Out, lp, PortRole::End);

        let mut initial = IndexMap::new();
        initial.insert("count".to_string(), Value::Int(7));
        let report = execute(&g, &initial);
        assert_eq!(report.variables["count"], Value::Int(10));
        assert!(report.guard_trips.is_empty());
    }

    // -----------------------------------------------------------------------
    // Loops and conditionals
    // -----------------------------------------------------------------------

    #[test]
    fn repeat_runs_body_count_times() {
        let mut g = ProgramGraph::new();
        let lp = g.add_block("thrice", BlockOp::Loop(LoopKind::Repeat));
        g.set_param(lp, "count", Value::Int(3)).unwrap();
        let inc = g.add_block("tick", BlockOp::Increment);
        wire(&mut g, lp, PortRole::Body, inc, PortRole::In);
        let report = run(&g);
        assert_eq!(report.variables["count"], Value::Int(3));
        assert_eq!(report.messages()[0], "repeat 3 times");
    }

    #[test]
    fn repeat_with_non_positive_count_runs_once() {
        for count in [0, -4] {
            let mut g = ProgramGraph::new();
            let lp = g.add_block("once", BlockOp::Loop(LoopKind::Repeat));
            g.set_param(lp, "count", Value::Int(count)).unwrap();
            let inc = g.add_block("tick", BlockOp::Increment);
            wire(&mut g, lp, PortRole::Body, inc, PortRole::In);
            let report = run(&g);
            assert_eq!(report.variables["count"], Value::Int(1), "count {count}");
        }
    }

    #[test]
    fn conditional_picks_branch_from_expression() {
        let mut g = ProgramGraph::new();
        let cond = g.add_block("check", BlockOp::Conditional);
        let yes = g.add_block("yes", BlockOp::Motor(MotorOp::Forward));
        let no = g.add_block("no", BlockOp::Motor(MotorOp::Stop));
        wire(&mut g, cond, PortRole::True, yes, PortRole::In);
        wire(&mut g, cond, PortRole::False, no, PortRole::In);

        let mut initial = IndexMap::new();
        initial.insert("count".to_string(), Value::Int(2));
        let report = execute(&g, &initial);
        assert_eq!(actions_of(&report, yes), 1);
        assert_eq!(actions_of(&report, no), 0);

        initial.insert("count".to_string(), Value::Int(0));
        let report = execute(&g, &initial);
        assert_eq!(actions_of(&report, yes), 0);
        assert_eq!(actions_of(&report, no), 1);
    }

    #[test]
    fn failed_condition_takes_false_branch() {
        let mut g = ProgramGraph::new();
        let cond = g.add_block("check", BlockOp::Conditional);
        let no = g.add_block("no", BlockOp::Motor(MotorOp::Stop));
        wire(&mut g, cond, PortRole::False, no, PortRole::In);
        let report = run(&g);
        assert_eq!(actions_of(&report, no), 1);
        assert!(matches!(
            report.faults.as_slice(),
            [SimulationFault::Expression { source_text, .. }] if source_text == "count > 0"
        ));
    }

    #[test]
    fn condition_from_bound_variable() {
        let mut g = ProgramGraph::new();
        g.declare_variable(Variable::new("armed", ValueType::Bool, Value::Bool(true)))
            .unwrap();
        let cond = g.add_block("check", BlockOp::Conditional);
        let yes = g.add_block("yes", BlockOp::Motor(MotorOp::Forward));
        wire(&mut g, cond, PortRole::True, yes, PortRole::In);
        let cond_in = port(&g, cond, PortRole::Condition);
        g.bind_variable("armed", cond_in).unwrap();

        let report = run(&g);
        assert_eq!(actions_of(&report, yes), 1);
        assert!(report.faults.is_empty());
    }

    // -----------------------------------------------------------------------
    // Variables
    // -----------------------------------------------------------------------

    #[test]
    fn increment_initialises_undeclared_variable() {
        let mut g = ProgramGraph::new();
        g.add_block("tick", BlockOp::Increment);
        let report = run(&g);
        assert_eq!(report.variables["count"], Value::Int(1));
        assert_eq!(report.messages(), vec!["count initialised to 0", "count = 1"]);
    }

    #[test]
    fn decrement_by_amount() {
        let mut g = ProgramGraph::new();
        let dec = g.add_block("down", BlockOp::Decrement);
        g.set_param(dec, "amount", Value::Int(4)).unwrap();
        g.declare_variable(Variable::new("count", ValueType::Int, Value::Int(10)))
            .unwrap();
        let report = run(&g);
        assert_eq!(report.variables["count"], Value::Int(6));
    }

    #[test]
    fn read_only_write_is_refused() {
        let mut g = ProgramGraph::new();
        g.declare_variable(
            Variable::new("limit", ValueType::Int, Value::Int(5)).with_access(Access::ReadOnly),
        )
        .unwrap();
        let set = g.add_block("set", BlockOp::Assign);
        g.set_param(set, "variable", Value::Str("limit".into())).unwrap();
        g.set_param(set, "value", Value::Str("7".into())).unwrap();

        let report = run(&g);
        assert_eq!(report.variables["limit"], Value::Int(5));
        assert!(matches!(
            report.faults.as_slice(),
            [SimulationFault::ReadOnlyWrite { variable, .. }] if variable == "limit"
        ));
        assert_eq!(report.log[0].kind, LogKind::Fault);
    }

    #[test]
    fn type_mismatch_keeps_prior_value() {
        let mut g = ProgramGraph::new();
        g.declare_variable(Variable::new("armed", ValueType::Bool, Value::Bool(false)))
            .unwrap();
        let set = g.add_block("set", BlockOp::Assign);
        g.set_param(set, "variable", Value::Str("armed".into())).unwrap();
        g.set_param(set, "value", Value::Str("3.5".into())).unwrap();

        let report = run(&g);
        assert_eq!(report.variables["armed"], Value::Bool(false));
        assert!(matches!(
            report.faults.as_slice(),
            [SimulationFault::TypeMismatch {
                expected: ValueType::Bool,
                found: ValueType::Float,
                ..
            }]
        ));
    }

    #[test]
    fn assign_evaluates_expression_against_variables() {
        let mut g = ProgramGraph::new();
        let set = g.add_block("set", BlockOp::Assign);
        g.set_param(set, "variable", Value::Str("total".into())).unwrap();
        g.set_param(set, "value", Value::Str("count * 2 + 1".into())).unwrap();
        let mut initial = IndexMap::new();
        initial.insert("count".to_string(), Value::Int(4));
        let report = execute(&g, &initial);
        assert_eq!(report.variables["total"], Value::Int(9));
        assert_eq!(report.messages(), vec!["total = 9"]);
    }

    #[test]
    fn sensor_writes_variable_and_captured_sinks() {
        let mut g = ProgramGraph::new();
        g.declare_variable(Variable::new("last", ValueType::Float, Value::Float(0.0)))
            .unwrap();
        let s = g.add_block("eye", BlockOp::Sensor(SensorOp::Distance));
        g.set_param(s, "variable", Value::Str("dist".into())).unwrap();
        let reading = port(&g, s, PortRole::Reading);
        g.capture_variable(reading, "last").unwrap();

        let config = SimulatorConfig {
            sensor_reading: 12.5,
            ..SimulatorConfig::default()
        };
        let report = execute_with_config(&g, &IndexMap::new(), config);
        assert_eq!(report.variables["dist"], Value::Float(12.5));
        assert_eq!(report.variables["last"], Value::Float(12.5));
        assert_eq!(report.messages(), vec!["distance sensor 1: 12.5 cm -> dist"]);
    }

    #[test]
    fn temporaries_are_not_reported() {
        let mut g = ProgramGraph::new();
        g.declare_variable(
            Variable::new("scratch", ValueType::Int, Value::Int(0)).with_access(Access::Temporary),
        )
        .unwrap();
        g.declare_variable(Variable::new("kept", ValueType::Int, Value::Int(1)))
            .unwrap();
        g.add_block("halt", BlockOp::Motor(MotorOp::Stop));
        let report = run(&g);
        assert!(!report.variables.contains_key("scratch"));
        assert_eq!(report.variables["kept"], Value::Int(1));
    }

    #[test]
    fn initial_values_are_coerced_to_declared_type() {
        let mut g = ProgramGraph::new();
        g.declare_variable(Variable::new("speed", ValueType::Float, Value::Float(0.0)))
            .unwrap();
        g.add_block("halt", BlockOp::Motor(MotorOp::Stop));
        let mut initial = IndexMap::new();
        initial.insert("speed".to_string(), Value::Int(3));
        let report = execute(&g, &initial);
        assert_eq!(report.variables["speed"], Value::Float(3.0));
    }

    // -----------------------------------------------------------------------
    // Fatal
    // -----------------------------------------------------------------------

    #[test]
    fn empty_graph_aborts_with_empty_log() {
        let report = run(&ProgramGraph::new());
        assert!(matches!(report.status, RunStatus::Aborted { .. }));
        assert!(report.log.is_empty());
        assert!(report.variables.is_empty());
    }

    #[test]
    fn repeated_runs_are_identical() {
        let mut g = ProgramGraph::new();
        let a = g.add_block("a", BlockOp::Motor(MotorOp::Forward));
        let b = g.add_block("b", BlockOp::Increment);
        wire(&mut g, a, PortRole::Out, b, PortRole::In);
        wire(&mut g, b, PortRole::Out, a, PortRole::In);
        assert_eq!(run(&g), run(&g));
    }
}
