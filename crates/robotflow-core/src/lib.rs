//! Graph model for block-based robot programs.
//!
//! A program is a [`ProgramGraph`] of [`Block`]s whose ports are wired by
//! [`Connection`]s. Execution connections order blocks; data connections pass
//! values. Variables are declared on the graph and can be wired in through
//! virtual ports.

pub mod catalog;
pub mod connect;
pub mod edge;
pub mod error;
pub mod expr;
pub mod graph;
pub mod id;
pub mod ident;
pub mod node;
pub mod ops;
pub mod types;
pub mod variable;

// Re-export commonly used types
pub use connect::{classify, ensure_well_formed, validate_graph};
pub use edge::{Connection, EdgeKind};
pub use error::{ConnectError, CoreError, StructuralError};
pub use expr::{EvalError, Expr, ParseError, Scope};
pub use graph::ProgramGraph;
pub use id::{BlockId, ConnectionId, PortId};
pub use ident::{is_valid_identifier, sanitize_identifier};
pub use node::{Block, Param, ParamIssue, Port, PortOwner};
pub use ops::{BlockOp, LoopKind, MotorOp, PortRole, SensorOp};
pub use types::{Direction, ParamType, PortKind, Value, ValueType};
pub use variable::{Access, Variable};
