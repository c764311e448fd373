//! Simulation log.
//!
//! Every block the simulator runs appends a [`LogEntry`]; so does every
//! recovered fault and guard trip, in the order they happened.

use std::fmt;

use robotflow_core::id::BlockId;

/// What a log line records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    /// A block ran.
    Action,
    /// A block faulted and was recovered.
    Fault,
    /// A traversal ceiling tripped.
    Guard,
}

/// A single line of the simulation log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub kind: LogKind,
    pub block: BlockId,
    pub block_name: String,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.kind {
            LogKind::Action => "",
            LogKind::Fault => "fault: ",
            LogKind::Guard => "guard: ",
        };
        write!(f, "[{} {}] {tag}{}", self.block, self.block_name, self.message)
    }
}
