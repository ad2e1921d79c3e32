/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

/*!

Basic traits to access graphs, both sequentially and in random-access
fashion.

A [sequential graph](SequentialGraph) associates to each node of a graph a
list of successors, enumerated by a [lender](NodeLender) in increasing node
order. A [random-access graph](RandomAccessGraph) provides, additionally,
direct access to the successor list of any node.

The number of nodes *n* is returned by [`SequentialGraph::num_nodes`], and
node identifiers are in the interval [0 . . *n*).

*/

use crate::traits::lenders::{NodeLender, SortedLender};
use anyhow::{bail, ensure, Result};
use impl_tools::autoimpl;
use lender::*;
use std::rc::Rc;

/// A graph that can be accessed sequentially.
///
/// The iterator returned by [`iter`](SequentialGraph::iter) is a
/// [`NodeLender`]: to access the next pair, you must have finished using the
/// previous one. Lenders of graphs stored by this crate return nodes in
/// ascending order and successors in strictly increasing order; the marker
/// traits [`SortedLender`] and
/// [`SortedIterator`](crate::traits::SortedIterator) advertise these
/// properties.
#[autoimpl(for<S: trait + ?Sized> &S, &mut S, Rc<S>)]
pub trait SequentialGraph {
    /// The type of [`Lender`] over the nodes of the graph returned
    /// by [`iter`](SequentialGraph::iter).
    type Lender<'node>: for<'next> NodeLender<'next>
    where
        Self: 'node;

    /// Returns the number of nodes in the graph.
    fn num_nodes(&self) -> usize;

    /// Returns the number of arcs in the graph, if available.
    fn num_arcs_hint(&self) -> Option<u64> {
        None
    }

    /// Returns a lender over the whole graph.
    fn iter(&self) -> Self::Lender<'_> {
        self.iter_from(0)
    }

    /// Returns a lender over the graph starting at node `from` (included).
    fn iter_from(&self, from: usize) -> Self::Lender<'_>;
}

/// A [`SequentialGraph`] providing, additionally, random access to successor
/// lists.
#[autoimpl(for<S: trait + ?Sized> &S, &mut S, Rc<S>)]
pub trait RandomAccessGraph: SequentialGraph {
    /// The type of the iterator over the successors of a node returned by
    /// [`successors`](RandomAccessGraph::successors).
    type Successors<'succ>: IntoIterator<Item = usize>
    where
        Self: 'succ;

    /// Returns the number of arcs in the graph.
    fn num_arcs(&self) -> u64;

    /// Returns the successors of a node, in increasing order.
    fn successors(&self, node_id: usize) -> Self::Successors<'_>;

    /// Returns the number of successors of a node.
    fn outdegree(&self, node_id: usize) -> usize;
}

/// Checks whether two graphs with sorted lenders and sorted successors are
/// equal, reporting the first difference found.
pub fn eq_sorted<G0: SequentialGraph, G1: SequentialGraph>(g0: &G0, g1: &G1) -> Result<()>
where
    for<'a> G0::Lender<'a>: SortedLender,
    for<'a> G1::Lender<'a>: SortedLender,
{
    ensure!(
        g0.num_nodes() == g1.num_nodes(),
        "Different number of nodes: {} != {}",
        g0.num_nodes(),
        g1.num_nodes()
    );
    for_!(((node0, succ0), (node1, succ1)) in g0.iter().zip(g1.iter()) {
        debug_assert_eq!(node0, node1);
        let mut succ0 = succ0.into_iter();
        let mut succ1 = succ1.into_iter();
        let mut index = 0;
        loop {
            match (succ0.next(), succ1.next()) {
                (None, None) => break,
                (Some(s0), Some(s1)) => {
                    ensure!(
                        s0 == s1,
                        "Different successors for node {} at index {}: {} != {}",
                        node0,
                        index,
                        s0,
                        s1
                    );
                }
                (s0, s1) => bail!(
                    "Different outdegree for node {}: the {} list ends at index {}",
                    node0,
                    if s0.is_none() { "first" } else { "second" },
                    index
                ),
            }
            index += 1;
        }
    });
    Ok(())
}

/// Checks that the sequential and random-access implementations of a graph
/// agree on every node, and that the lender visits exactly
/// [`num_nodes`](SequentialGraph::num_nodes) nodes and
/// [`num_arcs`](RandomAccessGraph::num_arcs) arcs.
pub fn check_impl<G: RandomAccessGraph>(graph: &G) -> Result<()> {
    let mut num_nodes = 0;
    let mut num_arcs: u64 = 0;
    for_!((node, succ) in graph.iter() {
        num_nodes += 1;
        let seq = succ.into_iter().collect::<Vec<_>>();
        let random = graph.successors(node).into_iter().collect::<Vec<_>>();
        ensure!(
            seq == random,
            "Different successors for node {}: {:?} (sequential) != {:?} (random access)",
            node,
            seq,
            random
        );
        ensure!(
            seq.len() == graph.outdegree(node),
            "Outdegree of node {} is {} but the successor list has length {}",
            node,
            graph.outdegree(node),
            seq.len()
        );
        num_arcs += seq.len() as u64;
    });
    ensure!(
        num_nodes == graph.num_nodes(),
        "The lender visited {} nodes, but the graph has {}",
        num_nodes,
        graph.num_nodes()
    );
    ensure!(
        num_arcs == graph.num_arcs(),
        "The lender visited {} arcs, but the graph has {}",
        num_arcs,
        graph.num_arcs()
    );
    Ok(())
}

/// A lender implementing sequential access on top of random access.
///
/// Graphs that implement just the random-access primitives can use this
/// structure to implement [`SequentialGraph::iter_from`].
pub struct RandomAccessLender<'node, G: RandomAccessGraph> {
    pub graph: &'node G,
    pub nodes: core::ops::Range<usize>,
}

unsafe impl<G: RandomAccessGraph> SortedLender for RandomAccessLender<'_, G> {}

impl<'succ, G: RandomAccessGraph> NodeLender<'succ> for RandomAccessLender<'_, G> {
    type IntoIterator = <G as RandomAccessGraph>::Successors<'succ>;
}

impl<'succ, G: RandomAccessGraph> Lending<'succ> for RandomAccessLender<'_, G> {
    type Lend = (usize, <G as RandomAccessGraph>::Successors<'succ>);
}

impl<G: RandomAccessGraph> Lender for RandomAccessLender<'_, G> {
    #[inline(always)]
    fn next(&mut self) -> Option<Lend<'_, Self>> {
        self.nodes
            .next()
            .map(|node_id| (node_id, self.graph.successors(node_id)))
    }
}

impl<G: RandomAccessGraph> ExactSizeLender for RandomAccessLender<'_, G> {
    fn len(&self) -> usize {
        self.nodes.len()
    }
}
