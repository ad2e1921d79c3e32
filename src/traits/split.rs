/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Splitting the lender of a graph into multiple lenders over contiguous node
//! ranges, so that the graph can be scanned or recompressed in parallel.

use impl_tools::autoimpl;
use std::rc::Rc;

use super::{graph::SequentialGraph, lenders::NodeLender};

/// A graph whose lender can be split into `n` thread-safe lenders over
/// contiguous, disjoint node ranges covering [0 . . *n*).
///
/// Graphs that cannot provide independent lenders (for instance, because the
/// backing store does not support independent cursors) simply do not
/// implement this trait, and can only be stored single-threaded.
///
/// Due to limitations of the current type system there is no blanket
/// implementation, but the [`seq`] and [`ra`] modules provide ready-made
/// implementations for the sequential (cloneable-lender) and random-access
/// cases: implement the trait by setting the associated types to the aliases
/// they export and return their `Iter` structure.
#[autoimpl(for<S: trait + ?Sized> &S, &mut S, Rc<S>)]
pub trait SplitGraph: SequentialGraph {
    type SplitLender<'a>: for<'next> NodeLender<'next> + Send + Sync
    where
        Self: 'a;
    type IntoIterator<'a>: IntoIterator<Item = Self::SplitLender<'a>>
    where
        Self: 'a;

    /// Splits the graph lender into `how_many` lenders over contiguous node
    /// ranges, in range order.
    fn split_iter(&self, how_many: usize) -> Self::IntoIterator<'_>;
}

/// Ready-made implementation for the sequential case: the lender is cloned at
/// regular intervals, so it must be `Clone` (which in turn requires the
/// underlying decoder to support independent positions).
pub mod seq {
    use crate::traits::SequentialGraph;

    pub struct Iter<L> {
        lender: L,
        nodes_per_iter: usize,
        how_many: usize,
        remaining: usize,
    }

    impl<L: lender::Lender> Iter<L> {
        pub fn new(lender: L, num_nodes: usize, how_many: usize) -> Self {
            Self {
                lender,
                nodes_per_iter: num_nodes.div_ceil(how_many),
                how_many,
                remaining: how_many,
            }
        }
    }

    impl<L: lender::Lender + Clone> Iterator for Iter<L> {
        type Item = lender::Take<L>;

        fn next(&mut self) -> Option<Self::Item> {
            if self.remaining == 0 {
                return None;
            }
            if self.remaining != self.how_many {
                // move past the chunk handed out by the previous call
                for _ in 0..self.nodes_per_iter {
                    if self.lender.next().is_none() {
                        break;
                    }
                }
            }
            self.remaining -= 1;
            Some(self.lender.clone().take(self.nodes_per_iter))
        }

        fn size_hint(&self) -> (usize, Option<usize>) {
            (self.remaining, Some(self.remaining))
        }
    }

    impl<L: lender::Lender + Clone> ExactSizeIterator for Iter<L> {
        fn len(&self) -> usize {
            self.remaining
        }
    }

    pub type Lender<'a, S> = lender::Take<<S as SequentialGraph>::Lender<'a>>;
    pub type IntoIterator<'a, S> = Iter<<S as SequentialGraph>::Lender<'a>>;
}

/// Ready-made implementation for the random-access case: each part starts
/// with a fresh [`iter_from`](crate::traits::SequentialGraph::iter_from).
pub mod ra {
    use crate::traits::{RandomAccessGraph, SequentialGraph};

    pub struct Iter<'a, R: RandomAccessGraph> {
        graph: &'a R,
        nodes_per_iter: usize,
        how_many: usize,
        i: usize,
    }

    impl<'a, R: RandomAccessGraph> Iter<'a, R> {
        pub fn new(graph: &'a R, how_many: usize) -> Self {
            Self {
                graph,
                nodes_per_iter: graph.num_nodes().div_ceil(how_many),
                how_many,
                i: 0,
            }
        }
    }

    impl<'a, R: RandomAccessGraph> Iterator for Iter<'a, R> {
        type Item = Lender<'a, R>;

        fn next(&mut self) -> Option<Self::Item> {
            use lender::Lender;

            if self.i == self.how_many {
                return None;
            }
            self.i += 1;
            // with more parts than nodes, the tail parts are empty
            let start = ((self.i - 1) * self.nodes_per_iter).min(self.graph.num_nodes());
            Some(self.graph.iter_from(start).take(self.nodes_per_iter))
        }
    }

    impl<R: RandomAccessGraph> ExactSizeIterator for Iter<'_, R> {
        fn len(&self) -> usize {
            self.how_many - self.i
        }
    }

    pub type Lender<'a, R> = lender::Take<<R as SequentialGraph>::Lender<'a>>;
    pub type IntoIterator<'a, R> = Iter<'a, R>;
}
