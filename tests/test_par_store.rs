/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The parallel store must produce graphs that read back identical to a
//! single-threaded store, whatever the number of threads.

mod common;

use anyhow::Result;
use bvgraph::prelude::*;
use common::*;

fn check_parallel_store<G: SequentialGraph + SplitGraph>(source: &G) -> Result<()>
where
    for<'a> G::Lender<'a>: SortedLender,
{
    let comp_flags = CompFlags::default();

    let (_single_dir, single_basename) = temp_basename()?;
    BvComp::store(&single_basename, source, comp_flags)?;
    let single = BvGraphSeq::with_basename(&single_basename).load()?;

    for num_threads in [1, 2, 3, 7] {
        let thread_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()?;
        let (dir, basename) = temp_basename()?;
        BvComp::parallel_store(&basename, source, comp_flags, &thread_pool, dir.path())?;

        let parallel = BvGraphSeq::with_basename(&basename).load()?;
        eq_sorted(&single, &parallel)
            .map_err(|e| e.context(format!("with {} threads", num_threads)))?;
        eq_sorted(source, &parallel)?;

        let random = BvGraph::with_basename(&basename).load()?;
        check_impl(&random)?;

        // the concatenated offsets must match the actual record positions
        let mut iter = parallel.offset_deg_iter();
        let offsets_index_ok = {
            let mut previous = 0;
            let mut ok = true;
            for (offset, _degree) in iter.by_ref() {
                ok &= offset >= previous;
                previous = offset;
            }
            ok
        };
        assert!(offsets_index_ok);
    }
    Ok(())
}

#[test]
fn test_parallel_store_random_access_source() -> Result<()> {
    check_parallel_store(&VecGraph::from_lender(&ErdosRenyi::new(1000, 0.02, 0)))
}

#[test]
fn test_parallel_store_sequential_source() -> Result<()> {
    // a stored graph recompressed in parallel through cloneable sequential
    // lenders
    let graph = VecGraph::from_lender(&ErdosRenyi::new(500, 0.03, 4));
    let (_dir, basename) = temp_basename()?;
    BvComp::store(&basename, &graph, CompFlags::default())?;
    let seq = BvGraphSeq::with_basename(&basename).load()?;
    check_parallel_store(&seq)
}

#[test]
fn test_parallel_store_more_threads_than_nodes() -> Result<()> {
    let graph = VecGraph::from_arcs([(0, 1), (1, 2), (2, 0)]);
    let thread_pool = rayon::ThreadPoolBuilder::new().num_threads(8).build()?;
    let (dir, basename) = temp_basename()?;
    BvComp::parallel_store(&basename, &graph, CompFlags::default(), &thread_pool, dir.path())?;
    let loaded = BvGraph::with_basename(&basename).load()?;
    eq_sorted(&graph, &loaded)?;
    Ok(())
}

#[test]
fn test_parallel_store_default() -> Result<()> {
    let graph = VecGraph::from_lender(&ErdosRenyi::new(200, 0.05, 5));
    let (_dir, basename) = temp_basename()?;
    BvComp::parallel_store_default(&basename, &graph, CompFlags::default())?;
    let loaded = BvGraph::with_basename(&basename).load()?;
    eq_sorted(&graph, &loaded)?;
    Ok(())
}

#[test]
fn test_default_num_threads() {
    assert_eq!(BvComp::default_num_threads(0), 1);
    assert_eq!(BvComp::default_num_threads(99_999), 1);
    assert!(BvComp::default_num_threads(100_000_000) >= 1);
    assert!(BvComp::default_num_threads(100_000_000) <= num_cpus::get());
}
