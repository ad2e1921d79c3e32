/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Bit-level checks of the stored format: hand-computed streams, reference
//! bounds, and reference-chain depths.

mod common;

use anyhow::Result;
use bvgraph::prelude::*;
use common::*;

/// With ɣ codes everywhere, no window and no intervals, the stream of a tiny
/// graph can be computed by hand:
///
/// - node 0, successors [1]: ɣ(1) = 010, first residual int2nat(1 - 0) = 2,
///   ɣ(2) = 011;
/// - node 1, successors [0, 1]: ɣ(2) = 011, first residual
///   int2nat(0 - 1) = 1, ɣ(1) = 010, gap ɣ(0) = 1.
///
/// Stream: 010011 0110101, 13 bits, i.e. bytes 0x4D 0xA8 after padding.
/// Offsets: ɣ(0) ɣ(6) ɣ(7) = 1 00111 0001000, i.e. bytes 0x9C 0x40.
#[test]
fn test_hand_computed_stream() -> Result<()> {
    let graph = VecGraph::from_arcs([(0, 1), (1, 0), (1, 1)]);
    let flags = CompFlags {
        outdegrees: Code::Gamma,
        references: Code::Unary,
        blocks: Code::Gamma,
        intervals: Code::Gamma,
        residuals: Code::Gamma,
        min_interval_length: 0,
        compression_window: 0,
        max_ref_count: 0,
    };
    let (_dir, basename) = temp_basename()?;
    let total_bits = BvComp::store(&basename, &graph, flags)?;
    assert_eq!(total_bits, 13);

    let graph_bytes = std::fs::read(basename.with_extension(GRAPH_EXTENSION))?;
    assert_eq!(graph_bytes[0], 0x4D);
    assert_eq!(graph_bytes[1], 0xA8);
    assert!(graph_bytes[2..].iter().all(|&b| b == 0));

    let offsets_bytes = std::fs::read(basename.with_extension(OFFSETS_EXTENSION))?;
    assert_eq!(offsets_bytes[0], 0x9C);
    assert_eq!(offsets_bytes[1], 0x40);

    // and of course it must read back
    let loaded = BvGraph::with_basename(&basename).load()?;
    eq_sorted(&graph, &loaded)?;
    Ok(())
}

/// Walks a stored stream with a raw decoder, checking that every reference
/// stays within the window and that no reference chain exceeds
/// `max_ref_count`.
fn check_references(basename: &std::path::Path) -> Result<()> {
    let (num_nodes, _num_arcs, flags) =
        parse_properties(basename.with_extension(PROPERTIES_EXTENSION))?;
    let factory = MemoryFactory::new_mem(basename.with_extension(GRAPH_EXTENSION))?;
    let mut decoder = DynDecoder::new(factory.new_reader(), &flags)?;

    let window = flags.compression_window + 1;
    let mut degrees = vec![0usize; window];
    let mut chains = vec![0usize; window];

    for node in 0..num_nodes {
        let degree = decoder.read_outdegree() as usize;
        if degree == 0 {
            degrees[node % window] = 0;
            chains[node % window] = 0;
            continue;
        }

        let mut left_to_decode = degree;
        let mut chain = 0;
        if flags.compression_window != 0 {
            let reference = decoder.read_reference_offset() as usize;
            assert!(reference <= flags.compression_window, "node {}", node);
            assert!(reference <= node, "node {}", node);
            if reference != 0 {
                chain = chains[(node - reference) % window] + 1;
                assert!(chain <= flags.max_ref_count, "node {}", node);

                let ref_degree = degrees[(node - reference) % window];
                let number_of_blocks = decoder.read_block_count() as usize;
                if number_of_blocks == 0 {
                    left_to_decode -= ref_degree;
                } else {
                    let mut covered = decoder.read_block() as usize;
                    left_to_decode -= covered;
                    for block_id in 1..number_of_blocks {
                        let block = decoder.read_block() as usize + 1;
                        if block_id % 2 == 0 {
                            left_to_decode -= block;
                        }
                        covered += block;
                    }
                    assert!(covered <= ref_degree, "node {}", node);
                    if number_of_blocks % 2 == 0 {
                        left_to_decode -= ref_degree - covered;
                    }
                }
            }
        }

        if left_to_decode != 0 && flags.min_interval_length != 0 {
            let number_of_intervals = decoder.read_interval_count() as usize;
            for _ in 0..number_of_intervals {
                let _ = decoder.read_interval_start();
                left_to_decode -=
                    decoder.read_interval_len() as usize + flags.min_interval_length;
            }
        }

        if left_to_decode != 0 {
            let _ = decoder.read_first_residual();
            for _ in 1..left_to_decode {
                let _ = decoder.read_residual();
            }
        }

        degrees[node % window] = degree;
        chains[node % window] = chain;
    }
    Ok(())
}

#[test]
fn test_reference_bounds() -> Result<()> {
    let graph = VecGraph::from_lender(&ErdosRenyi::new(400, 0.05, 11));
    for (compression_window, max_ref_count) in [(1, 1), (7, 1), (7, 3), (4, 2)] {
        let flags = CompFlags {
            compression_window,
            max_ref_count,
            ..CompFlags::default()
        };
        let (_dir, basename) = temp_basename()?;
        BvComp::store(&basename, &graph, flags)?;
        check_references(&basename)?;
    }
    Ok(())
}

/// The banded graph compresses through chained references; the chains must
/// still respect `max_ref_count`.
#[test]
fn test_reference_chains_on_banded_graph() -> Result<()> {
    let mut graph = VecGraph::empty(300);
    for i in 0..300 {
        for d in 1..=20 {
            graph.add_arc(i, (i + d) % 300);
        }
    }
    let flags = CompFlags {
        compression_window: 7,
        max_ref_count: 2,
        min_interval_length: 0,
        ..CompFlags::default()
    };
    let (_dir, basename) = temp_basename()?;
    BvComp::store(&basename, &graph, flags)?;
    check_references(&basename)?;
    let loaded = BvGraph::with_basename(&basename).load()?;
    eq_sorted(&graph, &loaded)?;
    Ok(())
}
