//! ProgramGraph: the block program container.
//!
//! [`ProgramGraph`] owns four flat tables keyed by stable handles: blocks (in
//! declaration order), ports, connections and variables. All mutations go
//! through `ProgramGraph` methods so the connection invariants hold at all
//! times:
//!
//! - every connection runs output -> input,
//! - an input port has at most one inbound connection (a new connection
//!   supersedes the old one),
//! - removing a block removes every connection touching it, along with any
//!   variable virtual port left dangling.
//!
//! Block indices are positions in declaration order and shift when a block is
//! removed. Connections never store indices, so nothing needs rewriting.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::catalog;
use crate::connect::classify;
use crate::edge::Connection;
use crate::error::{ConnectError, CoreError};
use crate::id::{BlockId, ConnectionId, PortId};
use crate::node::{Block, Param, Port, PortOwner};
use crate::ops::{BlockOp, PortRole};
use crate::types::{Direction, PortKind, Value};
use crate::variable::Variable;

/// The block program container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgramGraph {
    /// Blocks in declaration order.
    blocks: IndexMap<BlockId, Block>,
    /// Every port, block-owned or virtual.
    ports: HashMap<PortId, Port>,
    /// Connections in creation order.
    connections: IndexMap<ConnectionId, Connection>,
    /// Declared variables in declaration order.
    variables: IndexMap<String, Variable>,
    next_block_id: u32,
    next_port_id: u32,
    next_connection_id: u32,
}

impl ProgramGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        ProgramGraph::default()
    }

    /// Constructs a `ProgramGraph` from its component tables.
    ///
    /// This enables the storage layer to rebuild a graph from loaded data
    /// without going through the editing methods. No invariant is checked
    /// here; run [`crate::connect::validate_graph`] on the result.
    pub fn from_parts(
        blocks: Vec<Block>,
        ports: Vec<Port>,
        connections: Vec<Connection>,
        variables: Vec<Variable>,
    ) -> Self {
        let next_block_id = blocks.iter().map(|b| b.id.0 + 1).max().unwrap_or(0);
        let next_port_id = ports.iter().map(|p| p.id.0 + 1).max().unwrap_or(0);
        let next_connection_id = connections.iter().map(|c| c.id.0 + 1).max().unwrap_or(0);

        ProgramGraph {
            blocks: blocks.into_iter().map(|b| (b.id, b)).collect(),
            ports: ports.into_iter().map(|p| (p.id, p)).collect(),
            connections: connections.into_iter().map(|c| (c.id, c)).collect(),
            variables: variables.into_iter().map(|v| (v.name.clone(), v)).collect(),
            next_block_id,
            next_port_id,
            next_connection_id,
        }
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    /// Blocks in declaration order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(&id)
    }

    /// The block at a declaration-order index.
    pub fn block_at(&self, index: usize) -> Option<&Block> {
        self.blocks.get_index(index).map(|(_, b)| b)
    }

    /// Current declaration-order index of a block.
    pub fn block_index(&self, id: BlockId) -> Option<usize> {
        self.blocks.get_index_of(&id)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn port(&self, id: PortId) -> Option<&Port> {
        self.ports.get(&id)
    }

    /// All ports, sorted by handle.
    pub fn ports(&self) -> Vec<&Port> {
        let mut ports: Vec<&Port> = self.ports.values().collect();
        ports.sort_by_key(|p| p.id);
        ports
    }

    pub fn port_count(&self) -> usize {
        self.ports.len()
    }

    /// The port of `block` playing `role`, searching inputs then outputs.
    pub fn port_of(&self, block: BlockId, role: PortRole) -> Option<&Port> {
        self.blocks
            .get(&block)?
            .ports()
            .filter_map(|id| self.ports.get(&id))
            .find(|p| p.role == role)
    }

    /// Connections in creation order.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// The connection terminating at an input port, if any.
    pub fn inbound(&self, port: PortId) -> Option<&Connection> {
        self.connections.values().find(|c| c.to == port)
    }

    /// Connections leaving an output port, in creation order.
    pub fn outbound(&self, port: PortId) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(move |c| c.from == port)
    }

    /// The block owning a port, `None` for virtual or unknown ports.
    pub fn owner_block(&self, port: PortId) -> Option<BlockId> {
        self.ports.get(&port)?.owner.block()
    }

    /// Declared variables in declaration order.
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Names of variables captured from data outputs of `block` (variable
    /// sinks), in connection order.
    pub fn captured_variables(&self, block: BlockId) -> Vec<&str> {
        self.connections
            .values()
            .filter(|c| self.owner_block(c.from) == Some(block))
            .filter_map(|c| self.ports.get(&c.to)?.owner.variable())
            .collect()
    }

    // -----------------------------------------------------------------------
    // Block methods
    // -----------------------------------------------------------------------

    /// Adds a block with the catalog's default parameters and ports.
    pub fn add_block(&mut self, name: &str, op: BlockOp) -> BlockId {
        let params = catalog::default_params(&op);
        self.insert_block(name, op, params)
    }

    /// Adds a block, overriding catalog defaults with `params` by name.
    ///
    /// Parameters the catalog does not declare are appended as given.
    pub fn add_block_with_params(&mut self, name: &str, op: BlockOp, params: Vec<Param>) -> BlockId {
        let mut merged = catalog::default_params(&op);
        for param in params {
            match merged.iter_mut().find(|p| p.name == param.name) {
                Some(slot) => slot.value = param.value,
                None => merged.push(param),
            }
        }
        self.insert_block(name, op, merged)
    }

    fn insert_block(&mut self, name: &str, op: BlockOp, params: Vec<Param>) -> BlockId {
        let id = BlockId(self.next_block_id);
        self.next_block_id += 1;

        let (input_specs, output_specs) = catalog::port_layout(&op);
        let mut inputs = SmallVec::new();
        for spec in input_specs {
            inputs.push(self.new_port(spec.role, spec.direction, spec.kind, PortOwner::Block(id)));
        }
        let mut outputs = SmallVec::new();
        for spec in output_specs {
            outputs.push(self.new_port(spec.role, spec.direction, spec.kind, PortOwner::Block(id)));
        }

        self.blocks.insert(
            id,
            Block {
                id,
                name: name.to_string(),
                op,
                params,
                inputs,
                outputs,
            },
        );
        id
    }

    fn new_port(&mut self, role: PortRole, direction: Direction, kind: PortKind, owner: PortOwner) -> PortId {
        let id = PortId(self.next_port_id);
        self.next_port_id += 1;
        self.ports.insert(
            id,
            Port {
                id,
                role,
                direction,
                kind,
                owner,
            },
        );
        id
    }

    /// Removes a block, every connection touching it, its ports, and any
    /// virtual variable port left without a connection.
    ///
    /// Surviving blocks keep their relative order; their indices shift down.
    pub fn remove_block(&mut self, id: BlockId) -> Result<Block, CoreError> {
        let block = self
            .blocks
            .shift_remove(&id)
            .ok_or(CoreError::BlockNotFound { id })?;

        let owned: Vec<PortId> = block.ports().collect();
        let touching: Vec<ConnectionId> = self
            .connections
            .values()
            .filter(|c| owned.contains(&c.from) || owned.contains(&c.to))
            .map(|c| c.id)
            .collect();
        for conn_id in touching {
            self.detach(conn_id);
        }
        for port in owned {
            self.ports.remove(&port);
        }
        Ok(block)
    }

    /// Replaces a parameter value, returning the old one.
    ///
    /// Values are not range-checked here; consumers check them at use and
    /// fall back to the catalog default.
    pub fn set_param(&mut self, block: BlockId, name: &str, value: Value) -> Result<Value, CoreError> {
        let b = self
            .blocks
            .get_mut(&block)
            .ok_or(CoreError::BlockNotFound { id: block })?;
        let param = b.param_mut(name).ok_or_else(|| CoreError::ParamNotFound {
            block,
            name: name.to_string(),
        })?;
        Ok(std::mem::replace(&mut param.value, value))
    }

    /// Renames a block.
    pub fn rename_block(&mut self, block: BlockId, name: &str) -> Result<(), CoreError> {
        let b = self
            .blocks
            .get_mut(&block)
            .ok_or(CoreError::BlockNotFound { id: block })?;
        b.name = name.to_string();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Connection methods
    // -----------------------------------------------------------------------

    /// Connects an output port to an input port.
    ///
    /// The pair is classified first; on rejection nothing changes. On success
    /// any connection already terminating at `to` is removed, then the new
    /// connection is inserted with its derived kind.
    pub fn add_connection(&mut self, from: PortId, to: PortId) -> Result<Connection, ConnectError> {
        let from_port = self.ports.get(&from).ok_or(ConnectError::PortNotFound { id: from })?;
        let to_port = self.ports.get(&to).ok_or(ConnectError::PortNotFound { id: to })?;
        let kind = classify(from_port, to_port)?;

        let superseded = self.inbound(to).map(|c| c.id);
        if let Some(old) = superseded {
            tracing::debug!(old = %old, port = %to, "superseding existing connection");
            self.detach(old);
        }

        let id = ConnectionId(self.next_connection_id);
        self.next_connection_id += 1;
        let conn = Connection { id, from, to, kind };
        self.connections.insert(id, conn.clone());
        Ok(conn)
    }

    /// Removes a connection. A virtual variable port at either end goes with it.
    pub fn remove_connection(&mut self, id: ConnectionId) -> Result<Connection, CoreError> {
        self.detach(id).ok_or(CoreError::ConnectionNotFound { id })
    }

    /// Removes a connection and any virtual endpoint left unconnected.
    fn detach(&mut self, id: ConnectionId) -> Option<Connection> {
        let conn = self.connections.shift_remove(&id)?;
        for port in [conn.from, conn.to] {
            let is_virtual = self.ports.get(&port).is_some_and(Port::is_virtual);
            let still_used = self.connections.values().any(|c| c.from == port || c.to == port);
            if is_virtual && !still_used {
                self.ports.remove(&port);
            }
        }
        Some(conn)
    }

    // -----------------------------------------------------------------------
    // Variable methods
    // -----------------------------------------------------------------------

    /// Declares a variable. Names are unique.
    pub fn declare_variable(&mut self, variable: Variable) -> Result<(), CoreError> {
        if self.variables.contains_key(&variable.name) {
            return Err(CoreError::DuplicateVariable {
                name: variable.name,
            });
        }
        self.variables.insert(variable.name.clone(), variable);
        Ok(())
    }

    /// Removes a variable together with all of its bindings and sinks.
    pub fn remove_variable(&mut self, name: &str) -> Result<Variable, CoreError> {
        let variable = self
            .variables
            .shift_remove(name)
            .ok_or_else(|| CoreError::VariableNotFound {
                name: name.to_string(),
            })?;
        let bound: Vec<ConnectionId> = self
            .connections
            .values()
            .filter(|c| {
                [c.from, c.to]
                    .iter()
                    .any(|p| self.ports.get(p).and_then(|p| p.owner.variable()) == Some(name))
            })
            .map(|c| c.id)
            .collect();
        for id in bound {
            self.detach(id);
        }
        self.ports.retain(|_, p| p.owner.variable() != Some(name));
        Ok(variable)
    }

    /// Feeds a declared variable into a data input through a fresh virtual
    /// output port. Any connection already at `to` is superseded.
    pub fn bind_variable(&mut self, name: &str, to: PortId) -> Result<Connection, CoreError> {
        let variable = self
            .variables
            .get(name)
            .ok_or_else(|| CoreError::VariableNotFound {
                name: name.to_string(),
            })?;
        let ty = variable.ty;
        let target = self.ports.get(&to).ok_or(CoreError::PortNotFound { id: to })?;
        if target.direction != Direction::Input || target.kind.is_execution() || target.is_virtual() {
            return Err(CoreError::NotBindable {
                port: to,
                expected: Direction::Input,
            });
        }

        let source = self.new_port(
            PortRole::Variable,
            Direction::Output,
            PortKind::Data(ty),
            PortOwner::Variable(name.to_string()),
        );
        self.add_connection(source, to).map_err(|e| {
            self.ports.remove(&source);
            CoreError::from(e)
        })
    }

    /// Captures a data output into a declared variable through a fresh
    /// virtual input port. A variable has at most one sink: older sinks of
    /// the same variable are removed first.
    pub fn capture_variable(&mut self, from: PortId, name: &str) -> Result<Connection, CoreError> {
        let variable = self
            .variables
            .get(name)
            .ok_or_else(|| CoreError::VariableNotFound {
                name: name.to_string(),
            })?;
        let ty = variable.ty;
        let source = self.ports.get(&from).ok_or(CoreError::PortNotFound { id: from })?;
        if source.direction != Direction::Output || source.kind.is_execution() || source.is_virtual() {
            return Err(CoreError::NotBindable {
                port: from,
                expected: Direction::Output,
            });
        }

        let older: Vec<ConnectionId> = self
            .connections
            .values()
            .filter(|c| {
                self.ports
                    .get(&c.to)
                    .is_some_and(|p| p.owner.variable() == Some(name))
            })
            .map(|c| c.id)
            .collect();
        for id in older {
            tracing::debug!(connection = %id, variable = name, "replacing variable sink");
            self.detach(id);
        }

        let sink = self.new_port(
            PortRole::Variable,
            Direction::Input,
            PortKind::Data(ty),
            PortOwner::Variable(name.to_string()),
        );
        self.add_connection(from, sink).map_err(|e| {
            self.ports.remove(&sink);
            CoreError::from(e)
        })
    }

    /// Resets the graph to empty. Handle counters keep counting.
    pub fn clear(&mut self) {
        self.blocks.clear();
        self.ports.clear();
        self.connections.clear();
        self.variables.clear();
    }
}
