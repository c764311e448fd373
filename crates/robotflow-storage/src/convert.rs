//! Decompose/recompose conversions between ProgramGraph and ProgramDocument.
//!
//! [`decompose`] flattens a ProgramGraph into a [`ProgramDocument`].
//! [`recompose`] rebuilds a ProgramGraph from a document: block ports come
//! back from the catalog layout under their stored ids, variable endpoints
//! get fresh virtual ports, and the result is validated before it is
//! returned.

use std::collections::{HashMap, HashSet};

use robotflow_core::catalog::{default_params, port_layout};
use robotflow_core::connect::validate_graph;
use robotflow_core::edge::Connection;
use robotflow_core::error::StructuralError;
use robotflow_core::graph::ProgramGraph;
use robotflow_core::id::{BlockId, ConnectionId, PortId};
use robotflow_core::node::{Block, Param, Port, PortOwner};
use robotflow_core::ops::{BlockOp, PortRole};
use robotflow_core::types::{Direction, PortKind, ValueType};

use crate::error::StorageError;
use crate::types::{BlockRecord, ConnectionRecord, EndpointRecord, ProgramDocument, FORMAT_VERSION};

/// Flattens a ProgramGraph into its document form.
///
/// Connections whose endpoints are missing from the port table are left out.
pub fn decompose(graph: &ProgramGraph) -> ProgramDocument {
    let blocks = graph
        .blocks()
        .map(|b| BlockRecord {
            id: b.id,
            name: b.name.clone(),
            kind: b.op.kind_name().to_string(),
            params: b.params.clone(),
            inputs: b.inputs.to_vec(),
            outputs: b.outputs.to_vec(),
        })
        .collect();

    let connections = graph
        .connections()
        .filter_map(|c| {
            let record = ConnectionRecord {
                id: c.id,
                from: endpoint(graph, c.from)?,
                to: endpoint(graph, c.to)?,
                kind: c.kind,
            };
            Some(record)
        })
        .collect();

    ProgramDocument {
        version: FORMAT_VERSION,
        name: String::new(),
        blocks,
        connections,
        variables: graph.variables().cloned().collect(),
    }
}

fn endpoint(graph: &ProgramGraph, port: PortId) -> Option<EndpointRecord> {
    let Some(p) = graph.port(port) else {
        tracing::warn!(%port, "dropping connection to missing port");
        return None;
    };
    Some(match &p.owner {
        PortOwner::Block(block) => EndpointRecord::Port { block: *block, port },
        PortOwner::Variable(name) => EndpointRecord::Variable(name.clone()),
    })
}

/// Rebuilds a ProgramGraph from a document.
///
/// Fails with [`StorageError::ReconstructionError`] when the document
/// contradicts the catalog (wrong port counts), reuses an id, names a
/// missing block, port or variable, or rebuilds into a graph that fails
/// validation.
pub fn recompose(doc: &ProgramDocument) -> Result<ProgramGraph, StorageError> {
    if doc.version > FORMAT_VERSION {
        return Err(StorageError::UnsupportedVersion {
            found: doc.version,
            supported: FORMAT_VERSION,
        });
    }

    let mut rebuild = Rebuild::default();
    let mut blocks = Vec::with_capacity(doc.blocks.len());
    for record in &doc.blocks {
        blocks.push(rebuild.block(record)?);
    }

    let mut variables = Vec::with_capacity(doc.variables.len());
    for var in &doc.variables {
        if rebuild.variables.insert(var.name.clone(), var.ty).is_some() {
            return Err(StorageError::reconstruction(format!(
                "duplicate variable '{}'",
                var.name
            )));
        }
        variables.push(var.clone());
    }

    rebuild.next_port = rebuild.seen_ports.iter().map(|p| p.0 + 1).max().unwrap_or(0);
    let mut seen_connections: HashSet<ConnectionId> = HashSet::new();
    let mut connections = Vec::with_capacity(doc.connections.len());
    for record in &doc.connections {
        if !seen_connections.insert(record.id) {
            return Err(StorageError::reconstruction(format!(
                "duplicate connection id {}",
                record.id
            )));
        }
        let from = rebuild.endpoint(record.id, &record.from, Direction::Output)?;
        let to = rebuild.endpoint(record.id, &record.to, Direction::Input)?;
        connections.push(Connection {
            id: record.id,
            from,
            to,
            kind: record.kind,
        });
    }

    let graph = ProgramGraph::from_parts(blocks, rebuild.ports, connections, variables);
    let errors = validate_graph(&graph);
    if !errors.is_empty() {
        return Err(StorageError::reconstruction(
            StructuralError::Malformed { errors }.to_string(),
        ));
    }
    Ok(graph)
}

/// Running state while a document is rebuilt.
#[derive(Default)]
struct Rebuild {
    ports: Vec<Port>,
    seen_blocks: HashSet<BlockId>,
    seen_ports: HashSet<PortId>,
    port_owner: HashMap<PortId, BlockId>,
    variables: HashMap<String, ValueType>,
    next_port: u32,
}

impl Rebuild {
    fn block(&mut self, record: &BlockRecord) -> Result<Block, StorageError> {
        if !self.seen_blocks.insert(record.id) {
            return Err(StorageError::reconstruction(format!(
                "duplicate block id {}",
                record.id
            )));
        }

        let op = BlockOp::from_kind_name(&record.kind);
        if let BlockOp::Unknown { kind } = &op {
            tracing::warn!(block = %record.id, kind = %kind, "unknown block kind kept as-is");
        }

        let (input_specs, output_specs) = port_layout(&op);
        if input_specs.len() != record.inputs.len() || output_specs.len() != record.outputs.len() {
            return Err(StorageError::reconstruction(format!(
                "block {} '{}': {} has {} input(s) and {} output(s), document lists {} and {}",
                record.id,
                record.name,
                record.kind,
                input_specs.len(),
                output_specs.len(),
                record.inputs.len(),
                record.outputs.len()
            )));
        }

        let specs = input_specs.iter().chain(output_specs.iter());
        let ids = record.inputs.iter().chain(record.outputs.iter());
        for (spec, &id) in specs.zip(ids) {
            if !self.seen_ports.insert(id) {
                return Err(StorageError::reconstruction(format!("duplicate port id {id}")));
            }
            self.port_owner.insert(id, record.id);
            self.ports.push(Port {
                id,
                role: spec.role,
                direction: spec.direction,
                kind: spec.kind,
                owner: PortOwner::Block(record.id),
            });
        }

        Ok(Block {
            id: record.id,
            name: record.name.clone(),
            params: merge_params(&op, &record.params),
            op,
            inputs: record.inputs.iter().copied().collect(),
            outputs: record.outputs.iter().copied().collect(),
        })
    }

    fn endpoint(
        &mut self,
        connection: ConnectionId,
        endpoint: &EndpointRecord,
        direction: Direction,
    ) -> Result<PortId, StorageError> {
        match endpoint {
            EndpointRecord::Port { block, port } => match self.port_owner.get(port) {
                Some(owner) if owner == block => Ok(*port),
                Some(owner) => Err(StorageError::reconstruction(format!(
                    "connection {connection}: port {port} belongs to block {owner}, not {block}"
                ))),
                None => Err(StorageError::reconstruction(format!(
                    "connection {connection}: unknown port {port} on block {block}"
                ))),
            },
            EndpointRecord::Variable(name) => {
                let ty = *self.variables.get(name).ok_or_else(|| {
                    StorageError::reconstruction(format!(
                        "connection {connection}: unknown variable '{name}'"
                    ))
                })?;
                let id = PortId(self.next_port);
                self.next_port += 1;
                self.ports.push(Port {
                    id,
                    role: PortRole::Variable,
                    direction,
                    kind: PortKind::Data(ty),
                    owner: PortOwner::Variable(name.clone()),
                });
                Ok(id)
            }
        }
    }
}

/// Stored values over catalog parameters. The catalog keeps authority over
/// type, default and range; parameters it does not know are kept as stored.
fn merge_params(op: &BlockOp, stored: &[Param]) -> Vec<Param> {
    let mut params = default_params(op);
    for param in stored {
        match params.iter_mut().find(|p| p.name == param.name) {
            Some(existing) => existing.value = param.value.clone(),
            None => params.push(param.clone()),
        }
    }
    params
}
