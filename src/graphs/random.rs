/*
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::traits::*;
use lender::{ExactSizeLender, IntoLender, Lend, Lender, Lending};
use rand::{rngs::SmallRng, Rng, SeedableRng};

/// A sequential Erdős–Rényi random graph.
///
/// Each of the *n*(*n* − 1) possible arcs (loops excluded) is present with
/// probability `p`; the seed makes the graph reproducible. Iteration is
/// quadratic in *n*, so if you plan to reuse the graph you should copy it
/// into a [`VecGraph`](crate::graphs::vec_graph::VecGraph) first.
#[derive(Debug, Clone)]
pub struct ErdosRenyi {
    n: usize,
    p: f64,
    seed: u64,
}

impl ErdosRenyi {
    /// Creates a random graph with `n` nodes, arc probability `p`, and the
    /// given pseudorandom seed.
    pub fn new(n: usize, p: f64, seed: u64) -> Self {
        assert!((0.0..=1.0).contains(&p), "p must be in [0..1]");
        Self { n, p, seed }
    }
}

impl SequentialGraph for ErdosRenyi {
    type Lender<'node>
        = Iter
    where
        Self: 'node;

    #[inline(always)]
    fn num_nodes(&self) -> usize {
        self.n
    }

    fn iter_from(&self, from: usize) -> Iter {
        let mut rng = SmallRng::seed_from_u64(self.seed);
        // each row consumes exactly n - 1 samples
        if self.n > 0 {
            for _ in 0..from * (self.n - 1) {
                rng.random_bool(self.p);
            }
        }
        Iter {
            n: self.n,
            p: self.p,
            x: from,
            rng,
        }
    }
}

impl SplitGraph for ErdosRenyi {
    type SplitLender<'a>
        = split::seq::Lender<'a, ErdosRenyi>
    where
        Self: 'a;
    type IntoIterator<'a>
        = split::seq::IntoIterator<'a, ErdosRenyi>
    where
        Self: 'a;

    fn split_iter(&self, how_many: usize) -> Self::IntoIterator<'_> {
        split::seq::Iter::new(self.iter(), self.n, how_many)
    }
}

impl<'a> IntoLender for &'a ErdosRenyi {
    type Lender = Iter;

    #[inline(always)]
    fn into_lender(self) -> Self::Lender {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct Iter {
    n: usize,
    p: f64,
    x: usize,
    rng: SmallRng,
}

unsafe impl SortedLender for Iter {}

impl NodeLender<'_> for Iter {
    type IntoIterator = Vec<usize>;
}

impl<'succ> Lending<'succ> for Iter {
    type Lend = (usize, Vec<usize>);
}

impl Lender for Iter {
    fn next(&mut self) -> Option<Lend<'_, Self>> {
        if self.x >= self.n {
            return None;
        }
        let successors = (0..self.n)
            .filter(|&y| y != self.x && self.rng.random_bool(self.p))
            .collect();
        let node = self.x;
        self.x += 1;
        Some((node, successors))
    }
}

impl ExactSizeLender for Iter {
    fn len(&self) -> usize {
        self.n - self.x
    }
}
