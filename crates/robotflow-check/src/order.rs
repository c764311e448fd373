//! Execution-order resolution.
//!
//! [`resolve`] turns the execution connections of a graph into the adjacency
//! both the code generator and the simulator walk: for each block (by
//! declaration index) and each of its execution outputs (in port order), the
//! ordered list of blocks that run next.
//!
//! The resolver never rejects a graph. Cycles are reported as
//! [`CycleDiagnostic`]s; consumers bound their own traversal. Connections into
//! a loop's `end` port are declared loop-back edges: they close an iteration,
//! so they are left out of both the cycle check and entry detection.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::unionfind::UnionFind;
use petgraph::Direction as Flow;
use serde::Serialize;

use robotflow_core::graph::ProgramGraph;
use robotflow_core::id::BlockId;
use robotflow_core::ops::PortRole;

/// One execution successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExecTarget {
    /// Declaration index of the target block.
    pub index: usize,
    pub block: BlockId,
    /// Role of the input port the connection lands on.
    pub port: PortRole,
}

impl ExecTarget {
    /// Returns `true` for a loop-back edge.
    pub fn is_loop_back(&self) -> bool {
        self.port == PortRole::End
    }
}

/// The successors reached through one execution output port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Branch {
    pub role: PortRole,
    pub targets: Vec<ExecTarget>,
}

/// A cycle among execution edges, listed in traversal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleDiagnostic {
    pub blocks: Vec<BlockId>,
}

/// Control-flow adjacency of a graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionOrder {
    branches: Vec<Vec<Branch>>,
    entries: Vec<usize>,
    cycles: Vec<CycleDiagnostic>,
}

impl ExecutionOrder {
    /// Execution outputs of the block at `index`, in port order.
    pub fn branches(&self, index: usize) -> &[Branch] {
        self.branches.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Successors through the output playing `role`; empty when unconnected.
    pub fn successors(&self, index: usize, role: PortRole) -> &[ExecTarget] {
        self.branches(index)
            .iter()
            .find(|b| b.role == role)
            .map(|b| b.targets.as_slice())
            .unwrap_or(&[])
    }

    /// Entry block indices, ascending.
    pub fn entries(&self) -> &[usize] {
        &self.entries
    }

    pub fn cycles(&self) -> &[CycleDiagnostic] {
        &self.cycles
    }

    pub fn block_count(&self) -> usize {
        self.branches.len()
    }
}

/// Builds the execution adjacency, entry list and cycle diagnostics.
///
/// Entry policy: every block without an inbound execution edge is an entry.
/// A weakly connected execution component with no such block contributes its
/// lowest-index block instead, so every block is reachable from exactly one
/// entry point and no block is entered twice.
pub fn resolve(graph: &ProgramGraph) -> ExecutionOrder {
    let n = graph.block_count();
    let mut branches: Vec<Vec<Branch>> = Vec::with_capacity(n);
    let mut flow: DiGraph<usize, ()> = DiGraph::with_capacity(n, graph.connection_count());
    for index in 0..n {
        flow.add_node(index);
    }
    let mut inbound = vec![0usize; n];
    let mut components = UnionFind::<usize>::new(n);

    for (index, block) in graph.blocks().enumerate() {
        let mut outs = Vec::new();
        for port_id in &block.outputs {
            let Some(port) = graph.port(*port_id) else {
                continue;
            };
            if !port.kind.is_execution() {
                continue;
            }
            let mut targets = Vec::new();
            for conn in graph.outbound(port.id) {
                let Some(target_port) = graph.port(conn.to) else {
                    continue;
                };
                let Some(target_block) = target_port.owner.block() else {
                    continue;
                };
                let Some(target_index) = graph.block_index(target_block) else {
                    continue;
                };
                let target = ExecTarget {
                    index: target_index,
                    block: target_block,
                    port: target_port.role,
                };
                components.union(index, target_index);
                if !target.is_loop_back() {
                    inbound[target_index] += 1;
                    flow.add_edge(NodeIndex::new(index), NodeIndex::new(target_index), ());
                }
                targets.push(target);
            }
            outs.push(Branch {
                role: port.role,
                targets,
            });
        }
        branches.push(outs);
    }

    let mut entries: Vec<usize> = (0..n).filter(|&i| inbound[i] == 0).collect();
    let mut covered = vec![false; n];
    for &e in &entries {
        covered[components.find(e)] = true;
    }
    for index in 0..n {
        let root = components.find(index);
        if !covered[root] {
            covered[root] = true;
            tracing::debug!(index, "component has no entry block, starting at lowest index");
            entries.push(index);
        }
    }
    entries.sort_unstable();

    let cycles = find_cycles(graph, &flow);
    for cycle in &cycles {
        tracing::debug!(blocks = ?cycle.blocks, "execution cycle");
    }

    ExecutionOrder {
        branches,
        entries,
        cycles,
    }
}

/// Iterative depth-first search with an explicit frame stack and an
/// on-stack marker. Every edge closing onto the current path yields one
/// diagnostic.
fn find_cycles(graph: &ProgramGraph, flow: &DiGraph<usize, ()>) -> Vec<CycleDiagnostic> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        OnStack,
        Done,
    }

    let successors = |node: usize| -> Vec<usize> {
        let mut next: Vec<usize> = flow
            .neighbors_directed(NodeIndex::new(node), Flow::Outgoing)
            .map(|n| n.index())
            .collect();
        // petgraph yields most recent edges first.
        next.reverse();
        next
    };
    let block_id = |index: usize| graph.block_at(index).map(|b| b.id);

    let n = flow.node_count();
    let mut mark = vec![Mark::Unvisited; n];
    let mut cycles = Vec::new();

    for start in 0..n {
        if mark[start] != Mark::Unvisited {
            continue;
        }
        let mut stack: Vec<(usize, Vec<usize>, usize)> = vec![(start, successors(start), 0)];
        let mut path = vec![start];
        mark[start] = Mark::OnStack;

        while let Some((node, next, cursor)) = stack.last_mut() {
            if *cursor < next.len() {
                let succ = next[*cursor];
                *cursor += 1;
                match mark[succ] {
                    Mark::Unvisited => {
                        mark[succ] = Mark::OnStack;
                        path.push(succ);
                        stack.push((succ, successors(succ), 0));
                    }
                    Mark::OnStack => {
                        let from = path.iter().position(|&p| p == succ).unwrap_or(0);
                        cycles.push(CycleDiagnostic {
                            blocks: path[from..].iter().filter_map(|&i| block_id(i)).collect(),
                        });
                    }
                    Mark::Done => {}
                }
            } else {
                mark[*node] = Mark::Done;
                path.pop();
                stack.pop();
            }
        }
    }
    cycles
}

#[cfg(test)]
mod tests {
    use super::*;
    use robotflow_core::ops::{BlockOp, LoopKind, MotorOp};

    fn chain(g: &mut ProgramGraph, from: BlockId, role: PortRole, to: BlockId, to_role: PortRole) {
        let out = g.port_of(from, role).unwrap().id;
        let inp = g.port_of(to, to_role).unwrap().id;
        g.add_connection(out, inp).unwrap();
    }

    fn stop(g: &mut ProgramGraph, name: &str) -> BlockId {
        g.add_block(name, BlockOp::Motor(MotorOp::Stop))
    }

    #[test]
    fn linear_chain_has_one_entry() {
        let mut g = ProgramGraph::new();
        let a = stop(&mut g, "a");
        let b = stop(&mut g, "b");
        let c = stop(&mut g, "c");
        chain(&mut g, a, PortRole::Out, b, PortRole::In);
        chain(&mut g, b, PortRole::Out, c, PortRole::In);

        let order = resolve(&g);
        assert_eq!(order.entries(), &[0]);
        assert!(order.cycles().is_empty());
        let next = order.successors(0, PortRole::Out);
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].block, b);
        assert!(order.successors(2, PortRole::Out).is_empty());
    }

    #[test]
    fn disconnected_blocks_are_each_entries() {
        let mut g = ProgramGraph::new();
        stop(&mut g, "a");
        stop(&mut g, "b");
        let order = resolve(&g);
        insta::assert_debug_snapshot!(order.entries(), @r"
        [
            0,
            1,
        ]
        ");
    }

    #[test]
    fn pure_cycle_enters_at_lowest_index() {
        let mut g = ProgramGraph::new();
        let a = stop(&mut g, "a");
        let b = stop(&mut g, "b");
        let c = stop(&mut g, "c");
        chain(&mut g, a, PortRole::Out, b, PortRole::In);
        chain(&mut g, b, PortRole::Out, c, PortRole::In);
        chain(&mut g, c, PortRole::Out, a, PortRole::In);

        let order = resolve(&g);
        assert_eq!(order.entries(), &[0]);
        assert_eq!(
            order.cycles(),
            &[CycleDiagnostic {
                blocks: vec![a, b, c]
            }]
        );
    }

    #[test]
    fn cycle_fed_from_outside_keeps_real_entry() {
        let mut g = ProgramGraph::new();
        let cyc1 = stop(&mut g, "x");
        let cyc2 = stop(&mut g, "y");
        chain(&mut g, cyc1, PortRole::Out, cyc2, PortRole::In);
        chain(&mut g, cyc2, PortRole::Out, cyc1, PortRole::In);
        let lone = stop(&mut g, "lone");

        let order = resolve(&g);
        assert_eq!(order.entries(), &[0, 2]);
        assert_eq!(g.block_index(lone), Some(2));
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let mut g = ProgramGraph::new();
        let a = g.add_block("spin", BlockOp::Motor(MotorOp::TurnLeft));
        chain(&mut g, a, PortRole::Out, a, PortRole::In);
        let order = resolve(&g);
        assert_eq!(order.cycles().len(), 1);
        assert_eq!(order.cycles()[0].blocks, vec![a]);
    }

    #[test]
    fn loop_back_edges_are_not_cycles() {
        let mut g = ProgramGraph::new();
        let lp = g.add_block("loop", BlockOp::Loop(LoopKind::Repeat));
        let body = stop(&mut g, "body");
        chain(&mut g, lp, PortRole::Body, body, PortRole::In);
        chain(&mut g, body, PortRole::Out, lp, PortRole::End);

        let order = resolve(&g);
        assert!(order.cycles().is_empty());
        assert_eq!(order.entries(), &[0]);
        let back = order.successors(1, PortRole::Out);
        assert!(back[0].is_loop_back());
        assert_eq!(order.branches(0).len(), 2);
        assert!(order.successors(0, PortRole::Done).is_empty());
    }

    #[test]
    fn conditional_branches_in_port_order() {
        let mut g = ProgramGraph::new();
        let cond = g.add_block("if", BlockOp::Conditional);
        let yes = stop(&mut g, "yes");
        let no = stop(&mut g, "no");
        chain(&mut g, cond, PortRole::False, no, PortRole::In);
        chain(&mut g, cond, PortRole::True, yes, PortRole::In);

        let order = resolve(&g);
        let roles: Vec<PortRole> = order.branches(0).iter().map(|b| b.role).collect();
        assert_eq!(roles, vec![PortRole::True, PortRole::False]);
        assert_eq!(order.successors(0, PortRole::True)[0].block, yes);
        assert_eq!(order.successors(0, PortRole::False)[0].block, no);
    }

    #[test]
    fn fan_out_preserves_connection_order() {
        let mut g = ProgramGraph::new();
        let a = stop(&mut g, "a");
        let b = stop(&mut g, "b");
        let c = stop(&mut g, "c");
        chain(&mut g, a, PortRole::Out, c, PortRole::In);
        chain(&mut g, a, PortRole::Out, b, PortRole::In);

        let order = resolve(&g);
        let next: Vec<BlockId> = order.successors(0, PortRole::Out).iter().map(|t| t.block).collect();
        assert_eq!(next, vec![c, b]);
    }

    #[test]
    fn order_serializes() {
        let mut g = ProgramGraph::new();
        let a = stop(&mut g, "a");
        let b = stop(&mut g, "b");
        chain(&mut g, a, PortRole::Out, b, PortRole::In);
        let json = serde_json::to_value(resolve(&g)).unwrap();
        assert_eq!(json["entries"], serde_json::json!([0]));
        assert_eq!(json["branches"][0][0]["targets"][0]["port"], "in");
    }
}
