//! End-to-end tests for resolution plus simulation.
//!
//! Programs are built through the `ProgramGraph` editing API, resolved, and
//! run through the simulator; the rendered log is compared against snapshots.

use indexmap::IndexMap;
use proptest::prelude::*;

use robotflow_check::{execute, execute_with_config, resolve, GuardTrip, RunStatus, SimulatorConfig};
use robotflow_core::graph::ProgramGraph;
use robotflow_core::id::BlockId;
use robotflow_core::ops::{BlockOp, LoopKind, MotorOp, PortRole};
use robotflow_core::types::Value;

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

fn wire(g: &mut ProgramGraph, from: BlockId, from_role: PortRole, to: BlockId, to_role: PortRole) {
    let out = g.port_of(from, from_role).unwrap().id;
    let inp = g.port_of(to, to_role).unwrap().id;
    g.add_connection(out, inp).unwrap();
}

fn rendered_log(g: &ProgramGraph) -> String {
    execute(g, &IndexMap::new())
        .log
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

// ===== Sequencing through loops and branches =====

#[test]
fn drive_count_and_branch() {
    let mut g = ProgramGraph::new();
    let go = g.add_block("go", BlockOp::Motor(MotorOp::Forward));
    let lp = g.add_block("twice", BlockOp::Loop(LoopKind::Repeat));
    g.set_param(lp, "count", Value::Int(2)).unwrap();
    let tick = g.add_block("tick", BlockOp::Increment);
    let check = g.add_block("check", BlockOp::Conditional);
    g.set_param(check, "condition", Value::Str("count > 1".into())).unwrap();
    let halt = g.add_block("halt", BlockOp::Motor(MotorOp::Stop));
    let back = g.add_block("back", BlockOp::Motor(MotorOp::Backward));

    wire(&mut g, go, PortRole::Out, lp, PortRole::Start);
    wire(&mut g, lp, PortRole::Body, tick, PortRole::In);
    wire(&mut g, lp, PortRole::Done, check, PortRole::In);
    wire(&mut g, check, PortRole::True, halt, PortRole::In);
    wire(&mut g, check, PortRole::False, back, PortRole::In);

    insta::assert_snapshot!(rendered_log(&g), @r"
    [0 go] forward: speed=50, time=1.0s
    [1 twice] repeat 2 times
    [2 tick] count initialised to 0
    [2 tick] count = 1
    [2 tick] count = 2
    [3 check] if -> true
    [4 halt] stop
    ");
}

#[test]
fn disconnected_programs_all_run() {
    let mut g = ProgramGraph::new();
    let a = g.add_block("a", BlockOp::Motor(MotorOp::TurnRight));
    let b = g.add_block("b", BlockOp::Motor(MotorOp::Stop));
    let order = resolve(&g);
    assert_eq!(order.entries(), &[0, 1]);

    let report = execute(&g, &IndexMap::new());
    let blocks: Vec<BlockId> = report.log.iter().map(|e| e.block).collect();
    assert_eq!(blocks, vec![a, b]);
}

// ===== Guarded cycles =====

#[test]
fn cycle_is_reported_and_bounded() {
    let mut g = ProgramGraph::new();
    let a = g.add_block("a", BlockOp::Motor(MotorOp::Forward));
    let b = g.add_block("b", BlockOp::Increment);
    let c = g.add_block("c", BlockOp::Motor(MotorOp::TurnLeft));
    wire(&mut g, a, PortRole::Out, b, PortRole::In);
    wire(&mut g, b, PortRole::Out, c, PortRole::In);
    wire(&mut g, c, PortRole::Out, a, PortRole::In);

    let order = resolve(&g);
    assert_eq!(order.cycles().len(), 1);
    assert_eq!(order.cycles()[0].blocks, vec![a, b, c]);

    let report = execute(&g, &IndexMap::new());
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.variables["count"], Value::Int(3));
    assert!(matches!(
        report.guard_trips.as_slice(),
        [GuardTrip::Repetition { limit: 3, .. }]
    ));
}

#[test]
fn forever_loop_is_capped() {
    let mut g = ProgramGraph::new();
    let lp = g.add_block("always", BlockOp::Loop(LoopKind::Forever));
    let tick = g.add_block("tick", BlockOp::Increment);
    wire(&mut g, lp, PortRole::Body, tick, PortRole::In);
    wire(&mut g, tick, PortRole::Out, lp, PortRole::End);

    let config = SimulatorConfig {
        max_loop_iterations: 20,
        ..SimulatorConfig::default()
    };
    let report = execute_with_config(&g, &IndexMap::new(), config);
    assert!(report.is_completed());
    assert_eq!(report.variables["count"], Value::Int(20));
    assert_eq!(report.guard_trips.len(), 1);
}

// ===== Termination =====

fn arb_wiring() -> impl Strategy<Value = Vec<(usize, usize)>> {
    prop::collection::vec((0usize..5, 0usize..5), 0..12)
}

proptest! {
    /// Any execution wiring among plain blocks terminates deterministically.
    #[test]
    fn arbitrary_wiring_terminates(wiring in arb_wiring()) {
        let mut g = ProgramGraph::new();
        let ids: Vec<BlockId> = (0..5)
            .map(|i| {
                let op = if i % 2 == 0 {
                    BlockOp::Motor(MotorOp::Forward)
                } else {
                    BlockOp::Increment
                };
                g.add_block(&format!("b{i}"), op)
            })
            .collect();
        for (from, to) in wiring {
            wire(&mut g, ids[from], PortRole::Out, ids[to], PortRole::In);
        }

        let config = SimulatorConfig {
            max_steps: 5_000,
            ..SimulatorConfig::default()
        };
        let first = execute_with_config(&g, &IndexMap::new(), config.clone());
        let second = execute_with_config(&g, &IndexMap::new(), config.clone());
        prop_assert!(first.steps <= config.max_steps + 1);
        prop_assert_eq!(first, second);
    }
}
