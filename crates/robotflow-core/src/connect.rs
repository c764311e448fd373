//! Connection validation.
//!
//! [`classify`] decides whether a pair of ports may be connected and what
//! kind of edge the connection is. [`validate_graph`] re-applies the same
//! rules to a whole graph, which is how graphs rebuilt from persisted
//! documents are checked.

use std::collections::HashMap;

use crate::edge::EdgeKind;
use crate::error::{ConnectError, StructuralError};
use crate::graph::ProgramGraph;
use crate::id::PortId;
use crate::node::{Port, PortOwner};
use crate::types::{Direction, PortKind};

/// Classifies a prospective connection from `from` to `to`.
///
/// Both endpoints must face the right way (output -> input). Two execution
/// ports make an execution edge. Two data ports make a data edge when their
/// value types agree, or when either endpoint is a variable virtual port,
/// which accepts any value type.
pub fn classify(from: &Port, to: &Port) -> Result<EdgeKind, ConnectError> {
    if from.direction == to.direction {
        return Err(ConnectError::SameDirection {
            from: from.id,
            to: to.id,
            direction: from.direction,
        });
    }
    if from.direction != Direction::Output {
        return Err(ConnectError::Reversed {
            from: from.id,
            to: to.id,
        });
    }

    let mismatch = || ConnectError::TypeMismatch {
        from: from.id,
        to: to.id,
        from_kind: from.kind,
        to_kind: to.kind,
    };

    match (from.kind, to.kind) {
        (PortKind::Execution, PortKind::Execution) => Ok(EdgeKind::Execution),
        (PortKind::Data(a), PortKind::Data(b)) => {
            if a == b || from.is_virtual() || to.is_virtual() {
                Ok(EdgeKind::Data)
            } else {
                Err(mismatch())
            }
        }
        _ => Err(mismatch()),
    }
}

/// Checks every structural rule over a whole graph, returning all problems
/// found (empty when the graph is well formed).
///
/// Beyond the per-connection rules of [`classify`], this checks that every
/// port a block lists exists and belongs to it, that every block-owned port
/// has a live owner, that every connection's endpoints exist, that no input
/// has more than one inbound connection, and that stored edge-kind tags match
/// the recomputed kind.
pub fn validate_graph(graph: &ProgramGraph) -> Vec<ConnectError> {
    let mut errors = Vec::new();

    for block in graph.blocks() {
        for port_id in block.ports() {
            match graph.port(port_id) {
                None => errors.push(ConnectError::PortNotFound { id: port_id }),
                Some(port) if port.owner != PortOwner::Block(block.id) => {
                    errors.push(ConnectError::ForeignPort {
                        block: block.id,
                        port: port_id,
                    })
                }
                Some(_) => {}
            }
        }
    }

    for port in graph.ports() {
        if let PortOwner::Block(owner) = port.owner {
            if graph.block(owner).is_none() {
                errors.push(ConnectError::MissingOwner {
                    port: port.id,
                    block: owner,
                });
            }
        }
    }

    let mut inbound: HashMap<PortId, usize> = HashMap::new();
    for conn in graph.connections() {
        let from = graph.port(conn.from);
        let to = graph.port(conn.to);
        let (from, to) = match (from, to) {
            (Some(f), Some(t)) => (f, t),
            (None, _) => {
                errors.push(ConnectError::DanglingPort {
                    connection: conn.id,
                    port: conn.from,
                });
                continue;
            }
            (_, None) => {
                errors.push(ConnectError::DanglingPort {
                    connection: conn.id,
                    port: conn.to,
                });
                continue;
            }
        };

        match classify(from, to) {
            Ok(actual) if actual != conn.kind => errors.push(ConnectError::KindTagMismatch {
                connection: conn.id,
                stored: conn.kind,
                actual,
            }),
            Ok(_) => {}
            Err(e) => errors.push(e),
        }
        *inbound.entry(conn.to).or_default() += 1;
    }

    let mut crowded: Vec<(PortId, usize)> = inbound.into_iter().filter(|(_, n)| *n > 1).collect();
    crowded.sort();
    for (port, count) in crowded {
        errors.push(ConnectError::MultipleInbound { port, count });
    }

    errors
}

/// Rejects a graph that consumers must not touch: empty, or failing
/// [`validate_graph`].
pub fn ensure_well_formed(graph: &ProgramGraph) -> Result<(), StructuralError> {
    if graph.is_empty() {
        return Err(StructuralError::EmptyGraph);
    }
    let errors = validate_graph(graph);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(StructuralError::Malformed { errors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::Connection;
    use crate::id::{BlockId, ConnectionId};
    use crate::ops::{BlockOp, MotorOp, PortRole, SensorOp};
    use crate::types::ValueType;

    fn port(id: u32, direction: Direction, kind: PortKind) -> Port {
        Port {
            id: PortId(id),
            role: PortRole::In,
            direction,
            kind,
            owner: PortOwner::Block(BlockId(0)),
        }
    }

    fn virtual_port(id: u32, direction: Direction, ty: ValueType) -> Port {
        Port {
            id: PortId(id),
            role: PortRole::Variable,
            direction,
            kind: PortKind::Data(ty),
            owner: PortOwner::Variable("v".into()),
        }
    }

    // -----------------------------------------------------------------------
    // classify
    // -----------------------------------------------------------------------

    #[test]
    fn execution_pair() {
        let a = port(0, Direction::Output, PortKind::Execution);
        let b = port(1, Direction::Input, PortKind::Execution);
        assert_eq!(classify(&a, &b), Ok(EdgeKind::Execution));
    }

    #[test]
    fn same_direction_rejected_both_ways() {
        let a = port(0, Direction::Output, PortKind::Execution);
        let b = port(1, Direction::Output, PortKind::Execution);
        assert!(matches!(
            classify(&a, &b),
            Err(ConnectError::SameDirection {
                direction: Direction::Output,
                ..
            })
        ));
        let c = port(2, Direction::Input, PortKind::Execution);
        let d = port(3, Direction::Input, PortKind::Execution);
        assert!(matches!(
            classify(&c, &d),
            Err(ConnectError::SameDirection {
                direction: Direction::Input,
                ..
            })
        ));
    }

    #[test]
    fn input_to_output_rejected() {
        let a = port(0, Direction::Input, PortKind::Execution);
        let b = port(1, Direction::Output, PortKind::Execution);
        assert!(matches!(classify(&a, &b), Err(ConnectError::Reversed { .. })));
    }

    #[test]
    fn data_types_must_match() {
        let f = port(0, Direction::Output, PortKind::Data(ValueType::Float));
        let b = port(1, Direction::Input, PortKind::Data(ValueType::Bool));
        let f_in = port(2, Direction::Input, PortKind::Data(ValueType::Float));
        assert!(matches!(classify(&f, &b), Err(ConnectError::TypeMismatch { .. })));
        assert_eq!(classify(&f, &f_in), Ok(EdgeKind::Data));
    }

    #[test]
    fn execution_never_mixes_with_data() {
        let e = port(0, Direction::Output, PortKind::Execution);
        let d = port(1, Direction::Input, PortKind::Data(ValueType::Bool));
        assert!(matches!(classify(&e, &d), Err(ConnectError::TypeMismatch { .. })));
    }

    #[test]
    fn virtual_ports_accept_any_type() {
        let src = virtual_port(0, Direction::Output, ValueType::Int);
        let cond = port(1, Direction::Input, PortKind::Data(ValueType::Bool));
        assert_eq!(classify(&src, &cond), Ok(EdgeKind::Data));

        let reading = port(2, Direction::Output, PortKind::Data(ValueType::Float));
        let sink = virtual_port(3, Direction::Input, ValueType::String);
        assert_eq!(classify(&reading, &sink), Ok(EdgeKind::Data));
    }

    #[test]
    fn virtual_port_does_not_accept_execution() {
        let src = virtual_port(0, Direction::Output, ValueType::Bool);
        let exec = port(1, Direction::Input, PortKind::Execution);
        assert!(classify(&src, &exec).is_err());
    }

    // -----------------------------------------------------------------------
    // validate_graph
    // -----------------------------------------------------------------------

    fn two_blocks() -> (ProgramGraph, PortId, PortId) {
        let mut g = ProgramGraph::new();
        let a = g.add_block("a", BlockOp::Motor(MotorOp::Forward));
        let b = g.add_block("b", BlockOp::Motor(MotorOp::Stop));
        let out = g.port_of(a, PortRole::Out).unwrap().id;
        let inp = g.port_of(b, PortRole::In).unwrap().id;
        (g, out, inp)
    }

    fn rebuild(g: &ProgramGraph, connections: Vec<Connection>) -> ProgramGraph {
        ProgramGraph::from_parts(
            g.blocks().cloned().collect(),
            g.ports().into_iter().cloned().collect(),
            connections,
            g.variables().cloned().collect(),
        )
    }

    #[test]
    fn edited_graph_is_valid() {
        let (mut g, out, inp) = two_blocks();
        g.add_connection(out, inp).unwrap();
        assert!(validate_graph(&g).is_empty());
        assert!(ensure_well_formed(&g).is_ok());
    }

    #[test]
    fn detects_wrong_kind_tag() {
        let (g, out, inp) = two_blocks();
        let g = rebuild(
            &g,
            vec![Connection {
                id: ConnectionId(0),
                from: out,
                to: inp,
                kind: EdgeKind::Data,
            }],
        );
        assert_eq!(
            validate_graph(&g),
            vec![ConnectError::KindTagMismatch {
                connection: ConnectionId(0),
                stored: EdgeKind::Data,
                actual: EdgeKind::Execution,
            }]
        );
    }

    #[test]
    fn detects_double_inbound_and_dangling() {
        let (g, out, inp) = two_blocks();
        let conn = |id, from, to| Connection {
            id: ConnectionId(id),
            from,
            to,
            kind: EdgeKind::Execution,
        };
        let g = rebuild(
            &g,
            vec![conn(0, out, inp), conn(1, out, inp), conn(2, PortId(99), inp)],
        );
        let errors = validate_graph(&g);
        assert!(errors.contains(&ConnectError::DanglingPort {
            connection: ConnectionId(2),
            port: PortId(99),
        }));
        assert!(errors.contains(&ConnectError::MultipleInbound {
            port: inp,
            count: 2,
        }));
    }

    #[test]
    fn detects_reversed_stored_connection() {
        let (g, out, inp) = two_blocks();
        let g = rebuild(
            &g,
            vec![Connection {
                id: ConnectionId(0),
                from: inp,
                to: out,
                kind: EdgeKind::Execution,
            }],
        );
        assert!(matches!(
            validate_graph(&g).as_slice(),
            [ConnectError::Reversed { .. }]
        ));
    }

    #[test]
    fn detects_orphaned_ports() {
        let mut g = ProgramGraph::new();
        let s = g.add_block("s", BlockOp::Sensor(SensorOp::Sound));
        let ports: Vec<Port> = g.ports().into_iter().cloned().collect();
        let g = ProgramGraph::from_parts(Vec::new(), ports, Vec::new(), Vec::new());
        let errors = validate_graph(&g);
        assert_eq!(errors.len(), 3);
        assert!(errors
            .iter()
            .all(|e| matches!(e, ConnectError::MissingOwner { block, .. } if *block == s)));
    }

    #[test]
    fn empty_graph_is_structural() {
        assert_eq!(
            ensure_well_formed(&ProgramGraph::new()),
            Err(StructuralError::EmptyGraph)
        );
    }
}
