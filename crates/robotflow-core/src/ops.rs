//! Block operation enums.
//!
//! [`BlockOp`] is the closed vocabulary of block kinds. Every consumer (code
//! generator, simulator, resolver) matches it exhaustively; a kind string that
//! the catalog does not know is preserved as [`BlockOp::Unknown`] rather than
//! silently mapped to something else.
//!
//! Kind strings are namespaced by category (`motor.forward`, `logic.if`, ...)
//! and are the form written to persisted documents.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Value;

// ---------------------------------------------------------------------------
// Sub-enums for grouped operations
// ---------------------------------------------------------------------------

/// Motor commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MotorOp {
    Forward,
    Backward,
    TurnLeft,
    TurnRight,
    Stop,
}

impl MotorOp {
    /// Name of the parameter paired with `speed`: `time` for drives, `angle`
    /// for turns. `Stop` takes no parameters.
    pub fn extent_param(&self) -> Option<&'static str> {
        match self {
            MotorOp::Forward | MotorOp::Backward => Some("time"),
            MotorOp::TurnLeft | MotorOp::TurnRight => Some("angle"),
            MotorOp::Stop => None,
        }
    }

    /// Seconds the generated program waits after issuing the command. Drives
    /// wait their `time`; turns wait one second per 90 degrees.
    pub fn wait_seconds(&self, extent: &Value) -> Option<f64> {
        match self {
            MotorOp::Forward | MotorOp::Backward => extent.as_f64(),
            MotorOp::TurnLeft | MotorOp::TurnRight => extent.as_f64().map(|angle| angle / 90.0),
            MotorOp::Stop => None,
        }
    }

    /// The console line for this command. Both the simulator log and the
    /// generated program print exactly this text.
    pub fn describe(&self, speed: &Value, extent: &Value) -> String {
        match self {
            MotorOp::Forward => format!("forward: speed={speed}, time={extent}s"),
            MotorOp::Backward => format!("backward: speed={speed}, time={extent}s"),
            MotorOp::TurnLeft => format!("turn left: speed={speed}, angle={extent}deg"),
            MotorOp::TurnRight => format!("turn right: speed={speed}, angle={extent}deg"),
            MotorOp::Stop => "stop".to_string(),
        }
    }
}

/// Sensor reads. Each publishes a float reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorOp {
    Distance,
    Light,
    Sound,
    Temperature,
}

impl SensorOp {
    /// Default variable name the reading is bound to.
    pub fn default_variable(&self) -> &'static str {
        match self {
            SensorOp::Distance => "distance",
            SensorOp::Light => "light",
            SensorOp::Sound => "sound",
            SensorOp::Temperature => "temperature",
        }
    }

    /// Unit suffix used in printed readings.
    pub fn unit(&self) -> &'static str {
        match self {
            SensorOp::Distance => "cm",
            SensorOp::Light => "lux",
            SensorOp::Sound => "dB",
            SensorOp::Temperature => "C",
        }
    }
}

/// Loop flavours. All loops share the start/end/body/done port layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoopKind {
    /// Fixed iteration count (`count` parameter, coerced to at least 1).
    Repeat,
    /// Re-evaluates a condition before each iteration.
    While,
    /// Runs until the iteration guard trips.
    Forever,
}

// ---------------------------------------------------------------------------
// BlockOp
// ---------------------------------------------------------------------------

/// The operation a block performs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockOp {
    Motor(MotorOp),
    Sensor(SensorOp),
    /// Two-way branch on a boolean condition.
    Conditional,
    Loop(LoopKind),
    /// Overwrites a variable.
    Assign,
    /// Adds `amount` to a variable, initialising it to 0 if undefined.
    Increment,
    /// Subtracts `amount` from a variable, initialising it to 0 if undefined.
    Decrement,
    /// A kind string not present in the catalog.
    Unknown { kind: String },
}

impl BlockOp {
    /// Every catalog kind, in toolbox order.
    pub const CATALOG: [BlockOp; 16] = [
        BlockOp::Motor(MotorOp::Forward),
        BlockOp::Motor(MotorOp::Backward),
        BlockOp::Motor(MotorOp::TurnLeft),
        BlockOp::Motor(MotorOp::TurnRight),
        BlockOp::Motor(MotorOp::Stop),
        BlockOp::Sensor(SensorOp::Distance),
        BlockOp::Sensor(SensorOp::Light),
        BlockOp::Sensor(SensorOp::Sound),
        BlockOp::Sensor(SensorOp::Temperature),
        BlockOp::Conditional,
        BlockOp::Loop(LoopKind::Repeat),
        BlockOp::Loop(LoopKind::While),
        BlockOp::Loop(LoopKind::Forever),
        BlockOp::Assign,
        BlockOp::Increment,
        BlockOp::Decrement,
    ];

    /// The persisted kind string.
    pub fn kind_name(&self) -> &str {
        match self {
            BlockOp::Motor(MotorOp::Forward) => "motor.forward",
            BlockOp::Motor(MotorOp::Backward) => "motor.backward",
            BlockOp::Motor(MotorOp::TurnLeft) => "motor.turn_left",
            BlockOp::Motor(MotorOp::TurnRight) => "motor.turn_right",
            BlockOp::Motor(MotorOp::Stop) => "motor.stop",
            BlockOp::Sensor(SensorOp::Distance) => "sensor.distance",
            BlockOp::Sensor(SensorOp::Light) => "sensor.light",
            BlockOp::Sensor(SensorOp::Sound) => "sensor.sound",
            BlockOp::Sensor(SensorOp::Temperature) => "sensor.temperature",
            BlockOp::Conditional => "logic.if",
            BlockOp::Loop(LoopKind::Repeat) => "logic.repeat",
            BlockOp::Loop(LoopKind::While) => "logic.while",
            BlockOp::Loop(LoopKind::Forever) => "logic.forever",
            BlockOp::Assign => "variable.assign",
            BlockOp::Increment => "variable.increment",
            BlockOp::Decrement => "variable.decrement",
            BlockOp::Unknown { kind } => kind,
        }
    }

    /// Maps a persisted kind string back to an op. Unknown strings are kept
    /// verbatim in [`BlockOp::Unknown`].
    pub fn from_kind_name(kind: &str) -> BlockOp {
        BlockOp::CATALOG
            .iter()
            .find(|op| op.kind_name() == kind)
            .cloned()
            .unwrap_or_else(|| BlockOp::Unknown {
                kind: kind.to_string(),
            })
    }

    /// Category prefix of the kind string (`motor`, `sensor`, `logic`, `variable`).
    pub fn category(&self) -> &str {
        let kind = self.kind_name();
        kind.split_once('.').map(|(cat, _)| cat).unwrap_or(kind)
    }

    pub fn is_loop(&self) -> bool {
        matches!(self, BlockOp::Loop(_))
    }

    /// Returns `true` if this op writes a variable.
    pub fn is_variable_write(&self) -> bool {
        matches!(
            self,
            BlockOp::Assign | BlockOp::Increment | BlockOp::Decrement | BlockOp::Sensor(_)
        )
    }
}

impl fmt::Display for BlockOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind_name())
    }
}

// ---------------------------------------------------------------------------
// Port roles
// ---------------------------------------------------------------------------

/// The role a port plays on its owner. Roles are how consumers find "the true
/// branch" or "the loop body" without depending on port order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortRole {
    /// Sequential execution input.
    In,
    /// Sequential execution output.
    Out,
    Condition,
    Value,
    Reading,
    True,
    False,
    /// Loop entry.
    Start,
    /// Loop-back input: reaching it ends the current iteration.
    End,
    Body,
    Done,
    /// Virtual port owned by a variable.
    Variable,
}

impl PortRole {
    pub fn name(&self) -> &'static str {
        match self {
            PortRole::In => "in",
            PortRole::Out => "out",
            PortRole::Condition => "condition",
            PortRole::Value => "value",
            PortRole::Reading => "reading",
            PortRole::True => "true",
            PortRole::False => "false",
            PortRole::Start => "start",
            PortRole::End => "end",
            PortRole::Body => "body",
            PortRole::Done => "done",
            PortRole::Variable => "variable",
        }
    }
}

impl fmt::Display for PortRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
