/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::traits::*;
use lender::*;

/// A mutable random-access graph based on a vector of vectors.
///
/// This is the graph of choice to build small graphs by hand, as a source
/// for compression and in tests. Arcs can be added in any order; duplicates
/// are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VecGraph {
    /// The number of arcs in the graph.
    num_arcs: u64,
    /// For each node, its successors in increasing order.
    succ: Vec<Vec<usize>>,
}

impl VecGraph {
    /// Creates a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new empty graph with `n` nodes.
    pub fn empty(n: usize) -> Self {
        Self {
            num_arcs: 0,
            succ: (0..n).map(|_| Vec::new()).collect(),
        }
    }

    /// Creates a graph from an arc list; nodes are added as needed.
    pub fn from_arcs(arcs: impl IntoIterator<Item = (usize, usize)>) -> Self {
        let mut graph = Self::new();
        for (u, v) in arcs {
            graph.add_node(u.max(v));
            graph.add_arc(u, v);
        }
        graph
    }

    /// Creates a graph copying the nodes and successors of a lender.
    pub fn from_lender<L: IntoLender>(iter_nodes: L) -> Self
    where
        L::Lender: for<'next> NodeLender<'next>,
    {
        let mut graph = Self::new();
        for_!( (node, successors) in iter_nodes {
            graph.add_node(node);
            for v in successors {
                graph.add_node(v);
                graph.add_arc(node, v);
            }
        });
        graph
    }

    /// Adds nodes up to `node` (included) and returns true if the graph
    /// grew.
    pub fn add_node(&mut self, node: usize) -> bool {
        let len = self.succ.len();
        self.succ.extend((len..=node).map(|_| Vec::new()));
        len <= node
    }

    /// Adds an arc; both endpoints must already be nodes of the graph.
    /// Returns true if the arc is new.
    ///
    /// # Panics
    ///
    /// If one of the endpoints is not a node of the graph.
    pub fn add_arc(&mut self, u: usize, v: usize) -> bool {
        let num_nodes = self.succ.len();
        assert!(
            u.max(v) < num_nodes,
            "Node {} does not exist (the graph has {} nodes)",
            u.max(v),
            num_nodes,
        );
        match self.succ[u].binary_search(&v) {
            Ok(_) => false,
            Err(pos) => {
                self.succ[u].insert(pos, v);
                self.num_arcs += 1;
                true
            }
        }
    }
}

impl SequentialGraph for VecGraph {
    type Lender<'node>
        = RandomAccessLender<'node, VecGraph>
    where
        Self: 'node;

    #[inline(always)]
    fn num_nodes(&self) -> usize {
        self.succ.len()
    }

    #[inline(always)]
    fn num_arcs_hint(&self) -> Option<u64> {
        Some(self.num_arcs)
    }

    fn iter_from(&self, from: usize) -> Self::Lender<'_> {
        RandomAccessLender {
            graph: self,
            nodes: from..self.succ.len(),
        }
    }
}

impl RandomAccessGraph for VecGraph {
    type Successors<'succ>
        = std::iter::Copied<std::slice::Iter<'succ, usize>>
    where
        Self: 'succ;

    #[inline(always)]
    fn num_arcs(&self) -> u64 {
        self.num_arcs
    }

    #[inline(always)]
    fn successors(&self, node_id: usize) -> Self::Successors<'_> {
        self.succ[node_id].iter().copied()
    }

    #[inline(always)]
    fn outdegree(&self, node_id: usize) -> usize {
        self.succ[node_id].len()
    }
}

impl SplitGraph for VecGraph {
    type SplitLender<'a>
        = split::ra::Lender<'a, VecGraph>
    where
        Self: 'a;
    type IntoIterator<'a>
        = split::ra::IntoIterator<'a, VecGraph>
    where
        Self: 'a;

    fn split_iter(&self, how_many: usize) -> Self::IntoIterator<'_> {
        split::ra::Iter::new(self, how_many)
    }
}

impl<'a> IntoLender for &'a VecGraph {
    type Lender = <VecGraph as SequentialGraph>::Lender<'a>;

    #[inline(always)]
    fn into_lender(self) -> Self::Lender {
        self.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_arcs_sorts_and_dedups() {
        let graph = VecGraph::from_arcs([(1, 2), (0, 3), (0, 1), (0, 3), (3, 0)]);
        assert_eq!(graph.num_nodes(), 4);
        assert_eq!(graph.num_arcs(), 4);
        assert_eq!(graph.successors(0).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(graph.successors(1).collect::<Vec<_>>(), vec![2]);
        assert_eq!(graph.successors(2).collect::<Vec<_>>(), vec![]);
        assert_eq!(graph.successors(3).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_from_lender_copies() {
        let graph = VecGraph::from_arcs([(0, 1), (1, 2), (2, 0), (2, 1)]);
        let copy = VecGraph::from_lender(&graph);
        assert_eq!(graph, copy);
    }
}
