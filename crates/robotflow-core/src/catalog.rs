//! The block catalog: default parameters and port layout per [`BlockOp`].
//!
//! This is the toolbox the editor offers. Parameter ranges here are the ones
//! the code generator and simulator enforce.

use crate::node::Param;
use crate::ops::{BlockOp, LoopKind, MotorOp, PortRole};
use crate::types::{Direction, PortKind, ValueType};

/// Shape of one port in a block's layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortSpec {
    pub role: PortRole,
    pub direction: Direction,
    pub kind: PortKind,
}

impl PortSpec {
    const fn exec_in(role: PortRole) -> Self {
        PortSpec {
            role,
            direction: Direction::Input,
            kind: PortKind::Execution,
        }
    }

    const fn exec_out(role: PortRole) -> Self {
        PortSpec {
            role,
            direction: Direction::Output,
            kind: PortKind::Execution,
        }
    }

    const fn data(role: PortRole, direction: Direction, ty: ValueType) -> Self {
        PortSpec {
            role,
            direction,
            kind: PortKind::Data(ty),
        }
    }
}

/// Default parameters for a freshly placed block.
pub fn default_params(op: &BlockOp) -> Vec<Param> {
    match op {
        BlockOp::Motor(MotorOp::Forward | MotorOp::Backward) => vec![
            Param::int("speed", 50, 0, 100),
            Param::float("time", 1.0, 0.1, 10.0),
        ],
        BlockOp::Motor(MotorOp::TurnLeft | MotorOp::TurnRight) => vec![
            Param::int("speed", 30, 0, 100),
            Param::int("angle", 90, 1, 360),
        ],
        BlockOp::Motor(MotorOp::Stop) => Vec::new(),
        BlockOp::Sensor(sensor) => vec![
            Param::int("sensor_id", 1, 1, 16),
            Param::string("variable", sensor.default_variable()),
        ],
        BlockOp::Conditional => vec![Param::expression("condition", "count > 0")],
        BlockOp::Loop(LoopKind::Repeat) => vec![Param::int_any("count", 10)],
        BlockOp::Loop(LoopKind::While) => vec![Param::expression("condition", "count < 10")],
        BlockOp::Loop(LoopKind::Forever) => Vec::new(),
        BlockOp::Assign => vec![
            Param::string("variable", "count"),
            Param::expression("value", "0"),
        ],
        BlockOp::Increment | BlockOp::Decrement => vec![
            Param::string("variable", "count"),
            Param::int_any("amount", 1),
        ],
        BlockOp::Unknown { .. } => Vec::new(),
    }
}

/// Input and output port layout, in port order.
pub fn port_layout(op: &BlockOp) -> (Vec<PortSpec>, Vec<PortSpec>) {
    use PortRole::*;

    let sequential = || (vec![PortSpec::exec_in(In)], vec![PortSpec::exec_out(Out)]);
    let looped = |extra: Option<PortSpec>| {
        let mut inputs = vec![PortSpec::exec_in(Start), PortSpec::exec_in(End)];
        inputs.extend(extra);
        (
            inputs,
            vec![PortSpec::exec_out(Body), PortSpec::exec_out(Done)],
        )
    };

    match op {
        BlockOp::Motor(_) | BlockOp::Increment | BlockOp::Decrement => sequential(),
        BlockOp::Unknown { .. } => sequential(),
        BlockOp::Sensor(_) => (
            vec![PortSpec::exec_in(In)],
            vec![
                PortSpec::exec_out(Out),
                PortSpec::data(Reading, Direction::Output, ValueType::Float),
            ],
        ),
        BlockOp::Conditional => (
            vec![
                PortSpec::exec_in(In),
                PortSpec::data(Condition, Direction::Input, ValueType::Bool),
            ],
            vec![PortSpec::exec_out(True), PortSpec::exec_out(False)],
        ),
        BlockOp::Loop(LoopKind::Repeat | LoopKind::Forever) => looped(None),
        BlockOp::Loop(LoopKind::While) => looped(Some(PortSpec::data(
            Condition,
            Direction::Input,
            ValueType::Bool,
        ))),
        BlockOp::Assign => (
            vec![
                PortSpec::exec_in(In),
                PortSpec::data(Value, Direction::Input, ValueType::Float),
            ],
            vec![PortSpec::exec_out(Out)],
        ),
    }
}
