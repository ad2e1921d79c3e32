/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Round trips: storing a graph and reading it back must reproduce every
//! successor list, for every combination of compression parameters.

mod common;

use anyhow::Result;
use bvgraph::prelude::*;
use common::*;

#[test]
fn test_default_flags() -> Result<()> {
    let graph = test_graph();
    let (_dir, basename) = temp_basename()?;
    BvComp::store(&basename, &graph, CompFlags::default())?;

    let seq = BvGraphSeq::with_basename(&basename).load()?;
    assert_eq!(seq.num_nodes(), graph.num_nodes());
    assert_eq!(seq.num_arcs_hint(), Some(graph.num_arcs()));
    eq_sorted(&graph, &seq)?;

    let random = BvGraph::with_basename(&basename).load()?;
    assert_eq!(random.num_nodes(), graph.num_nodes());
    assert_eq!(random.num_arcs(), graph.num_arcs());
    eq_sorted(&graph, &random)?;
    check_impl(&random)?;
    Ok(())
}

#[test]
fn test_flag_grid() -> Result<()> {
    let er = VecGraph::from_lender(&ErdosRenyi::new(100, 0.05, 0));
    let canonical = test_graph();
    for graph in [&er, &canonical] {
        for compression_window in [0, 1, 7] {
            for max_ref_count in [1, 3] {
                for min_interval_length in [0, 2, 4] {
                    for residuals in [
                        Code::Gamma,
                        Code::Delta,
                        Code::Zeta { k: 2 },
                        Code::Zeta { k: 3 },
                        Code::Nibble,
                    ] {
                        let flags = CompFlags {
                            residuals,
                            compression_window,
                            max_ref_count,
                            min_interval_length,
                            ..CompFlags::default()
                        };
                        let (_dir, basename) = temp_basename()?;
                        BvComp::store(&basename, graph, flags)?;
                        let loaded = BvGraph::with_basename(&basename).load()?;
                        eq_sorted(graph, &loaded).map_err(|e| {
                            e.context(format!("with compression flags {:?}", flags))
                        })?;
                        check_impl(&loaded)?;
                    }
                }
            }
        }
    }
    Ok(())
}

#[test]
fn test_nondefault_field_codes() -> Result<()> {
    let graph = VecGraph::from_lender(&ErdosRenyi::new(80, 0.1, 7));
    let flags = CompFlags {
        outdegrees: Code::Delta,
        references: Code::Gamma,
        blocks: Code::Nibble,
        intervals: Code::Delta,
        residuals: Code::Zeta { k: 4 },
        ..CompFlags::default()
    };
    let (_dir, basename) = temp_basename()?;
    BvComp::store(&basename, &graph, flags)?;
    let loaded = BvGraph::with_basename(&basename).load()?;
    eq_sorted(&graph, &loaded)?;
    Ok(())
}

#[test]
fn test_scenario_triangle_with_double_arc() -> Result<()> {
    // n = 3, arcs 0 -> 1, 1 -> 2, 2 -> 0, 2 -> 1
    let graph = VecGraph::from_arcs([(0, 1), (1, 2), (2, 0), (2, 1)]);
    let (_dir, basename) = temp_basename()?;
    BvComp::store(&basename, &graph, CompFlags::default())?;
    let loaded = BvGraph::with_basename(&basename).load()?;

    assert_eq!(loaded.num_nodes(), 3);
    assert_eq!(loaded.num_arcs(), 4);
    assert_eq!(loaded.outdegree(0), 1);
    assert_eq!(loaded.outdegree(1), 1);
    assert_eq!(loaded.outdegree(2), 2);
    itertools::assert_equal(loaded.successors(2), [0, 1]);
    Ok(())
}

#[test]
fn test_scenario_cycle() -> Result<()> {
    // directed cycle i -> (i + 1) % 10
    let graph = VecGraph::from_arcs((0..10).map(|i| (i, (i + 1) % 10)));
    let flags = CompFlags {
        compression_window: 7,
        ..CompFlags::default()
    };
    let (_dir, basename) = temp_basename()?;
    BvComp::store(&basename, &graph, flags)?;
    let loaded = BvGraph::with_basename(&basename).load()?;
    for i in 0..10 {
        assert_eq!(loaded.outdegree(i), 1);
        itertools::assert_equal(loaded.successors(i), [(i + 1) % 10]);
    }
    Ok(())
}

#[test]
fn test_scenario_complete_with_loops() -> Result<()> {
    let graph = VecGraph::from_arcs((0..5).flat_map(|i| (0..5).map(move |j| (i, j))));
    let (_dir, basename) = temp_basename()?;
    BvComp::store(&basename, &graph, CompFlags::default())?;
    let loaded = BvGraph::with_basename(&basename).load()?;
    assert_eq!(loaded.num_arcs(), 25);
    for i in 0..5 {
        itertools::assert_equal(loaded.successors(i), 0..5);
    }
    Ok(())
}

#[test]
fn test_scenario_binary_tree_no_references() -> Result<()> {
    // complete binary out-tree of height 3: 15 nodes, children 2i+1, 2i+2
    let graph = VecGraph::from_arcs((0..7).flat_map(|i| [(i, 2 * i + 1), (i, 2 * i + 2)]));
    let flags = CompFlags {
        compression_window: 0,
        ..CompFlags::default()
    };
    let (_dir, basename) = temp_basename()?;
    BvComp::store(&basename, &graph, flags)?;
    let loaded = BvGraph::with_basename(&basename).load()?;
    assert_eq!(loaded.num_nodes(), 15);
    for i in 0..15 {
        let expected = if i < 7 {
            vec![2 * i + 1, 2 * i + 2]
        } else {
            vec![]
        };
        itertools::assert_equal(loaded.successors(i), expected);
    }
    Ok(())
}

#[test]
fn test_scenario_identical_lists_are_copied() -> Result<()> {
    // nodes 2 and 3 have the same successor list; node 3 must either copy it
    // entirely or not at all, whichever costs less
    let mut graph = VecGraph::empty(4);
    for v in 0..3 {
        graph.add_arc(2, v);
        graph.add_arc(3, v);
    }
    let (_dir, basename) = temp_basename()?;
    BvComp::store(&basename, &graph, CompFlags::default())?;
    let loaded = BvGraph::with_basename(&basename).load()?;
    itertools::assert_equal(loaded.successors(2), 0..3);
    itertools::assert_equal(loaded.successors(3), 0..3);

    // the full copy is cheaper than re-coding three residuals
    let properties = read_properties(&basename)?;
    let copied: u64 = properties.get("copiedarcs").unwrap().parse()?;
    assert_eq!(copied, 3);
    Ok(())
}

/// Node i has successors {i + 1, ..., i + 50} mod n: long consecutive runs
/// that intervalization should capture, and nearly identical lists that
/// references should exploit.
fn banded_graph(n: usize) -> VecGraph {
    let mut graph = VecGraph::empty(n);
    for i in 0..n {
        for d in 1..=50 {
            graph.add_arc(i, (i + d) % n);
        }
    }
    graph
}

fn banded_scenario(n: usize) -> Result<()> {
    let graph = banded_graph(n);

    // With intervals disabled, the window is the only way to exploit the
    // overlap between consecutive lists, and it must pay off handsomely.
    let (_dir, basename) = temp_basename()?;
    let residuals_only_bits = BvComp::store(
        &basename,
        &graph,
        CompFlags {
            compression_window: 0,
            min_interval_length: 0,
            ..CompFlags::default()
        },
    )?;
    let (_dir2, basename2) = temp_basename()?;
    let windowed_bits = BvComp::store(
        &basename2,
        &graph,
        CompFlags {
            compression_window: 7,
            min_interval_length: 0,
            ..CompFlags::default()
        },
    )?;
    assert!(
        (windowed_bits as f64) < residuals_only_bits as f64 / 3.0,
        "references should shrink the graph substantially: {} vs {}",
        windowed_bits,
        residuals_only_bits
    );

    // With intervals enabled, the runs are captured either as intervals or
    // through a reference; a larger window can only help.
    let (_dir3, basename3) = temp_basename()?;
    let interval_bits = BvComp::store(
        &basename3,
        &graph,
        CompFlags {
            compression_window: 7,
            min_interval_length: 4,
            ..CompFlags::default()
        },
    )?;
    assert!(interval_bits <= residuals_only_bits);
    let properties = read_properties(&basename3)?;
    let intervalized: u64 = properties.get("intervalisedarcs").unwrap().parse()?;
    let copied: u64 = properties.get("copiedarcs").unwrap().parse()?;
    assert!(intervalized + copied > graph.num_arcs() / 2);

    let loaded = BvGraph::with_basename(&basename2).load()?;
    eq_sorted(&graph, &loaded)?;
    let loaded = BvGraph::with_basename(&basename3).load()?;
    eq_sorted(&graph, &loaded)?;
    Ok(())
}

#[test]
fn test_scenario_banded() -> Result<()> {
    banded_scenario(2_000)
}

#[test]
#[cfg(feature = "slow_tests")]
fn test_scenario_banded_full_size() -> Result<()> {
    env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Info)
        .try_init()?;
    banded_scenario(100_000)
}

#[test]
fn test_empty_graph() -> Result<()> {
    let graph = VecGraph::empty(5);
    let (_dir, basename) = temp_basename()?;
    BvComp::store(&basename, &graph, CompFlags::default())?;
    let loaded = BvGraph::with_basename(&basename).load()?;
    assert_eq!(loaded.num_nodes(), 5);
    assert_eq!(loaded.num_arcs(), 0);
    for i in 0..5 {
        assert_eq!(loaded.outdegree(i), 0);
    }
    Ok(())
}

#[test]
fn test_non_increasing_list_rejected() {
    let mut buffer: Vec<u64> = Vec::new();
    let writer = dsi_bitstream::prelude::BufBitWriter::<dsi_bitstream::prelude::BE, _>::new(
        dsi_bitstream::prelude::MemWordWriterVec::new(&mut buffer),
    );
    let mut bvcomp = BvComp::new(
        DynEncoder::new(writer, &CompFlags::default()),
        7,
        3,
        4,
        0,
    );
    assert!(bvcomp.push(vec![3, 1, 2]).is_err());
    assert!(bvcomp.push(vec![1, 1]).is_err());
}
