/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Splitting lenders into contiguous parts must cover every node exactly
//! once, in order, for every graph implementation.

mod common;

use anyhow::Result;
use bvgraph::prelude::*;
use common::*;
use lender::*;

/// Collects the nodes and successor lists seen by the split lenders, in
/// split order, checking contiguity.
fn collect_split<G: SplitGraph>(graph: &G, how_many: usize) -> Vec<(usize, Vec<usize>)> {
    let mut seen = Vec::new();
    for mut lender in graph.split_iter(how_many) {
        while let Some((node, successors)) = lender.next() {
            seen.push((node, successors.into_iter().collect()));
        }
    }
    seen
}

fn check_split<G: SplitGraph + RandomAccessGraph>(graph: &G) -> Result<()> {
    for how_many in [1, 2, 7, 32] {
        let seen = collect_split(graph, how_many);
        assert_eq!(seen.len(), graph.num_nodes(), "with {} parts", how_many);
        for (expected, (node, successors)) in seen.into_iter().enumerate() {
            assert_eq!(node, expected, "with {} parts", how_many);
            assert_eq!(
                successors,
                graph.successors(node).into_iter().collect::<Vec<_>>(),
                "with {} parts",
                how_many
            );
        }
    }
    Ok(())
}

#[test]
fn test_split_vec_graph() -> Result<()> {
    check_split(&VecGraph::from_lender(&ErdosRenyi::new(100, 0.1, 0)))
}

#[test]
fn test_split_bvgraph_random_access() -> Result<()> {
    let graph = VecGraph::from_lender(&ErdosRenyi::new(100, 0.1, 1));
    let (_dir, basename) = temp_basename()?;
    BvComp::store(&basename, &graph, CompFlags::default())?;
    let loaded = BvGraph::with_basename(&basename).load()?;
    check_split(&loaded)
}

#[test]
fn test_split_bvgraph_sequential() -> Result<()> {
    let graph = VecGraph::from_lender(&ErdosRenyi::new(100, 0.1, 2));
    let (_dir, basename) = temp_basename()?;
    BvComp::store(&basename, &graph, CompFlags::default())?;
    let seq = BvGraphSeq::with_basename(&basename).load()?;
    for how_many in [1, 2, 7, 32] {
        let seen = collect_split(&seq, how_many);
        assert_eq!(seen.len(), graph.num_nodes());
        for (expected, (node, successors)) in seen.into_iter().enumerate() {
            assert_eq!(node, expected);
            assert_eq!(successors, graph.successors(node).collect::<Vec<_>>());
        }
    }
    Ok(())
}

#[test]
fn test_split_erdos_renyi() -> Result<()> {
    let er = ErdosRenyi::new(100, 0.1, 3);
    let reference = VecGraph::from_lender(&er);
    for how_many in [1, 2, 7, 32] {
        let seen = collect_split(&er, how_many);
        assert_eq!(seen.len(), reference.num_nodes());
        for (expected, (node, successors)) in seen.into_iter().enumerate() {
            assert_eq!(node, expected);
            assert_eq!(successors, reference.successors(node).collect::<Vec<_>>());
        }
    }
    Ok(())
}
