#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Incremental best-first path search over a cached adjacency graph.
//!
//! The solver owns a graph discovered once by breadth-first expansion from a
//! seed set and keeps per-node scratch that is only trusted when its stamp
//! matches the running query, so consecutive queries never pay for a full
//! reset. Edge costs and heuristics are supplied per query through
//! [`PathCost`], which lets the caller fold dynamic battlefield state into the
//! search without rebuilding the graph.

use std::{collections::HashMap, hash::Hash};

mod queue;

pub use queue::IntrinsicPriorityQueue;

/// Static connectivity the solver caches.
pub trait Topology {
    /// Node identifier.
    type Node: Copy + Eq + Hash;

    /// Appends every node directly reachable from `node` to `out`.
    fn neighbors(&self, node: Self::Node, out: &mut Vec<Self::Node>);
}

/// Per-query edge weights and the estimate guiding the search.
pub trait PathCost<N> {
    /// Cost of stepping from `from` to the adjacent `to`.
    ///
    /// Non-finite costs mark the edge as unusable for this query.
    fn edge_cost(&self, from: N, to: N) -> f64;

    /// Lower bound on the cost of travelling from `from` to `to`.
    fn heuristic(&self, from: N, to: N) -> f64;
}

/// Route returned by the solver.
#[derive(Clone, Debug, PartialEq)]
pub struct Path<N> {
    nodes: Vec<N>,
    costs: Vec<f64>,
}

impl<N: Copy> Path<N> {
    /// Nodes from start to destination, both included.
    #[must_use]
    pub fn nodes(&self) -> &[N] {
        &self.nodes
    }

    /// Cumulative cost at every node; the first entry is zero.
    #[must_use]
    pub fn costs(&self) -> &[f64] {
        &self.costs
    }

    /// Total cost of the route.
    #[must_use]
    pub fn total_cost(&self) -> f64 {
        self.costs.last().copied().unwrap_or(0.0)
    }

    /// Node the route starts from.
    #[must_use]
    pub fn start(&self) -> Option<N> {
        self.nodes.first().copied()
    }

    /// Node the route ends on.
    #[must_use]
    pub fn destination(&self) -> Option<N> {
        self.nodes.last().copied()
    }

    /// Number of steps along the route.
    #[must_use]
    pub fn hops(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }

    /// Consumes the route, yielding its nodes.
    #[must_use]
    pub fn into_nodes(self) -> Vec<N> {
        self.nodes
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Scratch {
    stamp: u64,
    cost_from_start: f64,
    predecessor: Option<usize>,
    closed: bool,
    destination: bool,
}

/// Reusable incremental search engine.
#[derive(Debug)]
pub struct PathSolver<N> {
    nodes: Vec<N>,
    lookup: HashMap<N, usize>,
    adjacency: Vec<Vec<usize>>,
    scratch: Vec<Scratch>,
    open: IntrinsicPriorityQueue,
    sequence: u64,
    buffer: Vec<N>,
}

impl<N: Copy + Eq + Hash> PathSolver<N> {
    /// Builds the adjacency graph reachable from the provided seeds.
    pub fn new<T>(topology: &T, seeds: &[N]) -> Self
    where
        T: Topology<Node = N>,
    {
        let mut solver = Self {
            nodes: Vec::new(),
            lookup: HashMap::new(),
            adjacency: Vec::new(),
            scratch: Vec::new(),
            open: IntrinsicPriorityQueue::new(),
            sequence: 0,
            buffer: Vec::new(),
        };
        solver.expand_from(topology, seeds);
        solver
    }

    /// Number of nodes discovered so far.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Reports whether the node has been discovered.
    #[must_use]
    pub fn contains(&self, node: N) -> bool {
        self.lookup.contains_key(&node)
    }

    /// Number of queries answered so far.
    #[must_use]
    pub const fn queries(&self) -> u64 {
        self.sequence
    }

    /// Finds the cheapest route from `start` to whichever destination is
    /// cheapest to reach.
    ///
    /// A start node the graph has never seen is expanded on demand. Returns
    /// `None` when no destination is reachable.
    pub fn solve<T, C>(
        &mut self,
        topology: &T,
        cost: &C,
        start: N,
        destinations: &[N],
    ) -> Option<Path<N>>
    where
        T: Topology<Node = N>,
        C: PathCost<N>,
    {
        if !self.contains(start) {
            self.expand_from(topology, &[start]);
        }

        self.sequence += 1;
        let stamp = self.sequence;
        let start_index = *self.lookup.get(&start)?;

        let targets: Vec<N> = destinations
            .iter()
            .copied()
            .filter(|node| self.lookup.contains_key(node))
            .collect();
        if targets.is_empty() {
            return None;
        }
        for target in &targets {
            if let Some(&index) = self.lookup.get(target) {
                let scratch = self.touch(index, stamp);
                scratch.destination = true;
            }
        }

        let estimate = |node: N| {
            targets
                .iter()
                .map(|&target| cost.heuristic(node, target))
                .fold(f64::INFINITY, f64::min)
        };

        self.open.clear();
        {
            let scratch = self.touch(start_index, stamp);
            scratch.cost_from_start = 0.0;
        }
        let _ = self.open.push_or_decrease(start_index, estimate(start));

        while let Some((current, _)) = self.open.pop() {
            let current_cost = {
                let scratch = self.touch(current, stamp);
                scratch.closed = true;
                if scratch.destination {
                    return Some(self.reconstruct(current, stamp));
                }
                scratch.cost_from_start
            };
            let from = self.nodes[current];

            for position in 0..self.adjacency[current].len() {
                let next = self.adjacency[current][position];
                let to = self.nodes[next];
                let step = cost.edge_cost(from, to);
                if !step.is_finite() {
                    continue;
                }
                let tentative = current_cost + step.max(0.0);

                let scratch = self.touch(next, stamp);
                if scratch.closed || tentative >= scratch.cost_from_start {
                    continue;
                }
                scratch.cost_from_start = tentative;
                scratch.predecessor = Some(current);
                let _ = self.open.push_or_decrease(next, tentative + estimate(to));
            }
        }

        None
    }

    fn touch(&mut self, index: usize, stamp: u64) -> &mut Scratch {
        let scratch = &mut self.scratch[index];
        if scratch.stamp != stamp {
            *scratch = Scratch {
                stamp,
                cost_from_start: f64::INFINITY,
                predecessor: None,
                closed: false,
                destination: false,
            };
        }
        scratch
    }

    fn reconstruct(&self, destination: usize, stamp: u64) -> Path<N> {
        let mut indices = vec![destination];
        let mut cursor = destination;
        while let Some(previous) = self
            .scratch
            .get(cursor)
            .filter(|scratch| scratch.stamp == stamp)
            .and_then(|scratch| scratch.predecessor)
        {
            indices.push(previous);
            cursor = previous;
        }
        indices.reverse();

        let nodes = indices.iter().map(|&index| self.nodes[index]).collect();
        let costs = indices
            .iter()
            .map(|&index| self.scratch[index].cost_from_start)
            .collect();
        Path { nodes, costs }
    }

    fn expand_from<T>(&mut self, topology: &T, seeds: &[N])
    where
        T: Topology<Node = N>,
    {
        let mut frontier = Vec::new();
        for &seed in seeds {
            if !self.contains(seed) {
                frontier.push(self.register(seed));
            }
        }

        let mut cursor = 0;
        while cursor < frontier.len() {
            let index = frontier[cursor];
            cursor += 1;

            self.buffer.clear();
            topology.neighbors(self.nodes[index], &mut self.buffer);
            let mut edges = Vec::with_capacity(self.buffer.len());
            for position in 0..self.buffer.len() {
                let neighbor = self.buffer[position];
                let neighbor_index = match self.lookup.get(&neighbor) {
                    Some(&known) => known,
                    None => {
                        let fresh = self.register(neighbor);
                        frontier.push(fresh);
                        fresh
                    }
                };
                edges.push(neighbor_index);
            }
            self.adjacency[index] = edges;
        }
    }

    fn register(&mut self, node: N) -> usize {
        let index = self.nodes.len();
        self.nodes.push(node);
        let _ = self.lookup.insert(node, index);
        self.adjacency.push(Vec::new());
        self.scratch.push(Scratch::default());
        index
    }
}
