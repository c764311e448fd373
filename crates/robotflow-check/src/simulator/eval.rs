//! Per-block evaluation helpers for the simulator.
//!
//! These functions read a block's parameters and evaluate its expressions.
//! They never fail outright: a bad parameter falls back to its catalog default
//! and the problem is returned alongside the value as a [`SimulationFault`].
//! Control flow and variable writes are handled by the simulator in
//! `state.rs`.

use robotflow_core::expr::{self, Scope};
use robotflow_core::node::Block;
use robotflow_core::ops::MotorOp;
use robotflow_core::types::Value;

use super::error::SimulationFault;

/// Reads a parameter, range-checked.
///
/// Out-of-range or malformed values yield the default plus a
/// [`SimulationFault::BadParam`]; an absent parameter yields `None` plus
/// [`SimulationFault::MissingParam`].
pub fn param_value(block: &Block, param: &str, faults: &mut Vec<SimulationFault>) -> Option<Value> {
    let Some(p) = block.param(param) else {
        faults.push(SimulationFault::MissingParam {
            block: block.id,
            name: block.name.clone(),
            param: param.to_string(),
        });
        return None;
    };
    match p.checked_value() {
        Ok(v) => Some(v),
        Err(issue) => {
            faults.push(SimulationFault::BadParam {
                block: block.id,
                name: block.name.clone(),
                param: param.to_string(),
                issue: issue.to_string(),
            });
            Some(p.default.clone())
        }
    }
}

/// Reads a string-valued parameter (variable names, expressions).
pub fn param_text(block: &Block, param: &str, faults: &mut Vec<SimulationFault>) -> Option<String> {
    param_value(block, param, faults).map(|v| match v {
        Value::Str(s) => s,
        other => other.to_string(),
    })
}

/// Evaluates the expression held in `param` against `scope`.
pub fn eval_param(
    block: &Block,
    param: &str,
    scope: &dyn Scope,
    faults: &mut Vec<SimulationFault>,
) -> Option<Value> {
    let text = param_text(block, param, faults)?;
    match expr::eval_str(&text, scope) {
        Ok(v) => Some(v),
        Err(error) => {
            faults.push(SimulationFault::Expression {
                block: block.id,
                name: block.name.clone(),
                source_text: text,
                error,
            });
            None
        }
    }
}

/// The console line a motor block prints.
pub fn motor_message(block: &Block, op: MotorOp, faults: &mut Vec<SimulationFault>) -> String {
    let unknown = Value::Str("?".to_string());
    let Some(extent) = op.extent_param() else {
        return op.describe(&unknown, &unknown);
    };
    let speed = param_value(block, "speed", faults).unwrap_or_else(|| unknown.clone());
    let extent = param_value(block, extent, faults).unwrap_or(unknown);
    op.describe(&speed, &extent)
}

/// Coerces a repeat count to an iteration count of at least one.
pub fn repeat_count(count: &Value) -> usize {
    let n = match count {
        Value::Float(f) if f.is_finite() => f.trunc() as i64,
        other => other.as_i64().unwrap_or(1),
    };
    usize::try_from(n.max(1)).unwrap_or(1)
}
