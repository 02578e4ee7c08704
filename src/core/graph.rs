// This module implements the numbering core of the profiler: it discovers a
// function's CFG through the CfgAdaptor trait, classifies loop back-edges with an
// iterative three-color DFS, replaces each back-edge with a pair of synthetic
// entry/exit edges so the graph becomes a DAG, and assigns per-edge increments in
// a reverse-topological sweep so that the sum of increments along any entry-to-exit
// path is a unique integer in [0, num_paths). Back-edge records are kept in a side
// table and referenced by index from their synthetic edges, which also determines
// the increment/reset pair applied when a loop closes at runtime.

use super::adaptor::CfgAdaptor;
use super::error::{GraphError, GraphResult};
use std::collections::{HashMap, HashSet, VecDeque};

/// Original CFG edge `src -> dest` classified as a loop back-edge.
///
/// `inc` is accumulated into the path register when the back-edge is taken,
/// before the path is emitted; `reset` is the value the register is
/// re-initialized to afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackEdge {
    pub src: u32,
    pub dest: u32,
    pub inc: u64,
    pub reset: u64,
}

/// Outgoing DAG edge. `back_edge` indexes into [`Graph::back_edges`] when the
/// edge is a synthetic stand-in for a back-edge; `None` means an ordinary edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct To {
    pub dest: u32,
    pub inc: u64,
    pub back_edge: Option<u32>,
}

/// A basic block with its outgoing edges. `block` is the host IR's handle,
/// carried through so instrumentation can address the underlying block.
#[derive(Debug, Clone)]
pub struct Node<B> {
    pub block: B,
    pub tos: Vec<To>,
}

/// The function's CFG, transformed into a DAG and annotated with increments.
///
/// Nodes are indexed densely in adaptor discovery order. After [`Graph::build`]
/// returns, summing `inc` along any entry-to-exit walk yields a distinct
/// integer in `[0, num_paths)`.
#[derive(Debug, Clone)]
pub struct Graph<B> {
    nodes: Vec<Node<B>>,
    back_edges: Vec<BackEdge>,
    entry: u32,
    exit: u32,
    num_paths: u64,
}

impl<B: Copy + Eq + core::hash::Hash> Graph<B> {
    /// Build the annotated DAG for the adaptor's current function.
    ///
    /// The entry is the adaptor's designated entry block; any *other* block
    /// without predecessors violates the single-entry invariant. The exit is
    /// the last block in discovery order with no successors ([`GraphError::NoExit`]
    /// if none exists; functions with several return blocks keep this
    /// last-one-wins rule).
    pub fn build<A: CfgAdaptor<BlockRef = B>>(adaptor: &A) -> GraphResult<Self> {
        let mut nodes: Vec<Node<B>> = Vec::new();
        let mut index_of: HashMap<B, u32> = HashMap::new();
        for block in adaptor.blocks() {
            index_of.insert(block, nodes.len() as u32);
            nodes.push(Node {
                block,
                tos: Vec::new(),
            });
        }

        let mut in_degree = vec![0u32; nodes.len()];
        let mut exit = None;
        for i in 0..nodes.len() {
            let succs: Vec<u32> = adaptor
                .block_succs(nodes[i].block)
                .filter_map(|succ| index_of.get(&succ).copied())
                .collect();
            for dest in succs {
                nodes[i].tos.push(To {
                    dest,
                    inc: 0,
                    back_edge: None,
                });
                in_degree[dest as usize] += 1;
            }
            if nodes[i].tos.is_empty() {
                exit = Some(i as u32);
            }
        }
        let exit = exit.ok_or(GraphError::NoExit)?;

        let entry = index_of
            .get(&adaptor.entry_block())
            .copied()
            .ok_or(GraphError::EntryNotFound)?;
        for (i, &deg) in in_degree.iter().enumerate() {
            if deg == 0 && i as u32 != entry {
                return Err(GraphError::MultipleEntries { block: i as u32 });
            }
        }

        let mut graph = Graph {
            nodes,
            back_edges: Vec::new(),
            entry,
            exit,
            num_paths: 0,
        };
        graph.detect_and_replace_back_edges();
        let order = graph.topological_order();
        graph.assign_increments(&order);
        Ok(graph)
    }
}

impl<B> Graph<B> {
    /// Entry node index.
    pub fn entry(&self) -> u32 {
        self.entry
    }

    /// Exit node index.
    pub fn exit(&self) -> u32 {
        self.exit
    }

    /// Number of distinct entry-to-exit paths in the transformed DAG.
    pub fn num_paths(&self) -> u64 {
        self.num_paths
    }

    /// All nodes, indexed densely in discovery order.
    pub fn nodes(&self) -> &[Node<B>] {
        &self.nodes
    }

    /// The back-edge table. Synthetic edges reference entries by index.
    pub fn back_edges(&self) -> &[BackEdge] {
        &self.back_edges
    }

    /// Depth-first classification of back-edges, followed by their removal and
    /// replacement with synthetic edges.
    ///
    /// The walk three-colors nodes (white unvisited, gray on the stack, black
    /// done); an edge into a gray node is a back-edge. Written as an explicit
    /// stack walk so deep CFGs cannot overflow the call stack. Successors are
    /// visited in discovery order, so the back-edge set is reproducible.
    fn detect_and_replace_back_edges(&mut self) {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        let n = self.nodes.len();
        let mut color = vec![Color::White; n];
        // to_erase[i] holds the destinations of back-edges starting at i
        let mut to_erase: Vec<HashSet<u32>> = vec![HashSet::new(); n];

        // (node, index of the next successor edge to examine)
        let mut stack: Vec<(u32, usize)> = vec![(self.entry, 0)];
        color[self.entry as usize] = Color::Gray;
        while let Some(&mut (curr, ref mut edge_idx)) = stack.last_mut() {
            let tos = &self.nodes[curr as usize].tos;
            if *edge_idx == tos.len() {
                color[curr as usize] = Color::Black;
                stack.pop();
                continue;
            }
            let next = tos[*edge_idx].dest;
            *edge_idx += 1;
            match color[next as usize] {
                Color::Gray => {
                    self.back_edges.push(BackEdge {
                        src: curr,
                        dest: next,
                        inc: 0,
                        reset: 0,
                    });
                    to_erase[curr as usize].insert(next);
                }
                Color::White => {
                    color[next as usize] = Color::Gray;
                    stack.push((next, 0));
                }
                Color::Black => {}
            }
        }

        for (i, node) in self.nodes.iter_mut().enumerate() {
            node.tos.retain(|to| !to_erase[i].contains(&to.dest));
        }

        // Each back-edge becomes a virtual loop-closing path through exit and
        // entry; increments are filled in by the numbering sweep.
        for idx in 0..self.back_edges.len() {
            let be = self.back_edges[idx];
            self.nodes[be.src as usize].tos.push(To {
                dest: self.exit,
                inc: 0,
                back_edge: Some(idx as u32),
            });
            self.nodes[self.entry as usize].tos.push(To {
                dest: be.dest,
                inc: 0,
                back_edge: Some(idx as u32),
            });
        }
    }

    /// Kahn-style topological order of the transformed graph, seeded with the
    /// entry. FIFO queue, ties broken by enqueue order; every node appears
    /// exactly once.
    fn topological_order(&self) -> Vec<u32> {
        let n = self.nodes.len();
        let mut in_degree = vec![0u32; n];
        for node in &self.nodes {
            for to in &node.tos {
                in_degree[to.dest as usize] += 1;
            }
        }

        let mut queue = VecDeque::new();
        let mut emitted = vec![false; n];
        let mut order = Vec::with_capacity(n);
        queue.push_back(self.entry);
        order.push(self.entry);
        emitted[self.entry as usize] = true;
        while let Some(curr) = queue.pop_front() {
            for to in &self.nodes[curr as usize].tos {
                let dest = to.dest as usize;
                in_degree[dest] -= 1;
                if in_degree[dest] == 0 && !emitted[dest] {
                    emitted[dest] = true;
                    queue.push_back(to.dest);
                    order.push(to.dest);
                }
            }
        }
        order
    }

    /// Reverse-topological increment assignment (Ball-Larus numbering).
    ///
    /// `num_paths[n]` counts the distinct paths from `n` to the exit; each
    /// outgoing edge's increment is the running sum of its earlier siblings'
    /// path counts, which gives every entry-to-exit path a unique sum.
    fn assign_increments(&mut self, order: &[u32]) {
        let n = self.nodes.len();
        let mut num_paths = vec![0u64; n];
        for &idx in order.iter().rev() {
            let i = idx as usize;
            if self.nodes[i].tos.is_empty() {
                num_paths[i] = 1;
                continue;
            }
            num_paths[i] = 0;
            for e in 0..self.nodes[i].tos.len() {
                let dest = self.nodes[i].tos[e].dest as usize;
                self.nodes[i].tos[e].inc = num_paths[i];
                num_paths[i] += num_paths[dest];
            }
        }
        self.num_paths = num_paths[self.entry as usize];

        // A synthetic edge leaving the entry is the loop re-entry and supplies
        // the reset value; one leaving any other node is the loop tail and
        // supplies the increment.
        for i in 0..n {
            for e in 0..self.nodes[i].tos.len() {
                let to = self.nodes[i].tos[e];
                if let Some(be) = to.back_edge {
                    if i as u32 == self.entry {
                        self.back_edges[be as usize].reset = to.inc;
                    } else {
                        self.back_edges[be as usize].inc = to.inc;
                    }
                }
            }
        }
    }
}
