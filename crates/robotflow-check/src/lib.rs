//! Static analysis and simulation of block programs.
//!
//! [`order`] turns execution wiring into per-port successor lists and
//! reports cycles. [`simulator`] interprets a program over those lists.

pub mod order;
pub mod simulator;

pub use order::{resolve, Branch, CycleDiagnostic, ExecTarget, ExecutionOrder};
pub use simulator::{
    execute, execute_with_config, GuardTrip, LogEntry, LogKind, RunStatus, SimulationFault,
    SimulationReport, Simulator, SimulatorConfig,
};
