/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Access paths: load modes, random vs sequential equivalence, offsets
//! monotonicity, the `.ef` side-file lifecycle, and load-time validation.

mod common;

use anyhow::Result;
use bvgraph::prelude::*;
use common::*;
use dsi_bitstream::prelude::*;
use lender::*;

#[test]
fn test_load_modes() -> Result<()> {
    let graph = test_graph();
    let (_dir, basename) = temp_basename()?;
    BvComp::store(&basename, &graph, CompFlags::default())?;

    eq_sorted(&graph, &BvGraph::with_basename(&basename).load()?)?;
    eq_sorted(
        &graph,
        &BvGraph::with_basename(&basename).mode::<LoadMem>().load()?,
    )?;
    eq_sorted(
        &graph,
        &BvGraph::with_basename(&basename).mode::<LoadMmap>().load()?,
    )?;
    eq_sorted(
        &graph,
        &BvGraph::with_basename(&basename).mode::<File>().load()?,
    )?;
    eq_sorted(
        &graph,
        &BvGraph::with_basename(&basename)
            .graph_mode::<LoadMem>()
            .offsets_mode::<File>()
            .flags(MemoryFlags::RANDOM_ACCESS)
            .load()?,
    )?;
    // offline: sequential scans only
    eq_sorted(
        &graph,
        &BvGraphSeq::with_basename(&basename).mode::<File>().load()?,
    )?;
    Ok(())
}

#[test]
fn test_random_matches_sequential() -> Result<()> {
    let graph = VecGraph::from_lender(&ErdosRenyi::new(300, 0.03, 3));
    let (_dir, basename) = temp_basename()?;
    BvComp::store(&basename, &graph, CompFlags::default())?;
    let loaded = BvGraph::with_basename(&basename).load()?;
    // outdegrees, successor equality, arc/node counts
    check_impl(&loaded)?;
    // strict ordering
    for node in 0..loaded.num_nodes() {
        let successors = loaded.successors(node).collect::<Vec<_>>();
        assert!(successors.windows(2).all(|w| w[0] < w[1]));
        assert!(successors.iter().all(|&v| v < loaded.num_nodes()));
    }
    Ok(())
}

#[test]
fn test_iter_from_matches_full_iteration() -> Result<()> {
    let graph = VecGraph::from_lender(&ErdosRenyi::new(120, 0.05, 9));
    let (_dir, basename) = temp_basename()?;
    BvComp::store(&basename, &graph, CompFlags::default())?;
    let loaded = BvGraph::with_basename(&basename).load()?;

    for from in [0, 1, 5, 7, 8, 63, 119, 120] {
        let mut iter = loaded.iter_from(from);
        let mut expected = from;
        while let Some((node, successors)) = iter.next() {
            assert_eq!(node, expected);
            assert_eq!(
                successors.collect::<Vec<_>>(),
                graph.successors(node).collect::<Vec<_>>(),
                "at node {} starting from {}",
                node,
                from
            );
            expected += 1;
        }
        assert_eq!(expected, loaded.num_nodes());
    }
    Ok(())
}

#[test]
fn test_offsets_are_monotone_and_end_at_stream_length() -> Result<()> {
    let graph = VecGraph::from_lender(&ErdosRenyi::new(150, 0.05, 1));
    let (_dir, basename) = temp_basename()?;
    let total_bits = BvComp::store(&basename, &graph, CompFlags::default())?;

    // decode the gap-coded offsets stream
    let offsets_data = std::fs::read(basename.with_extension(OFFSETS_EXTENSION))?;
    let mut words: Vec<u32> = offsets_data
        .chunks(4)
        .map(|c| {
            let mut bytes = [0; 4];
            bytes[..c.len()].copy_from_slice(c);
            u32::from_ne_bytes(bytes)
        })
        .collect();
    // slack for the reader's lookahead
    words.extend([0, 0, 0, 0]);
    let mut reader = BufBitReader::<BE, _>::new(MemWordReader::new(words));

    let mut offsets = vec![reader.read_gamma()?];
    assert_eq!(offsets[0], 0);
    for node in 0..graph.num_nodes() {
        let offset = offsets.last().unwrap() + reader.read_gamma()?;
        assert!(
            offset > *offsets.last().unwrap(),
            "offset of node {} is not increasing",
            node + 1
        );
        offsets.push(offset);
    }
    assert_eq!(*offsets.last().unwrap(), total_bits);

    // the offsets/degrees iterator must agree with the offsets stream
    let seq = BvGraphSeq::with_basename(&basename).load()?;
    let mut iter = seq.offset_deg_iter();
    for (node, (offset, degree)) in iter.by_ref().enumerate() {
        assert_eq!(offset, offsets[node]);
        assert_eq!(degree, graph.outdegree(node));
    }
    assert_eq!(iter.bit_pos(), total_bits);
    Ok(())
}

#[test]
fn test_ef_side_file_lifecycle() -> Result<()> {
    let graph = test_graph();
    let (_dir, basename) = temp_basename()?;
    BvComp::store(&basename, &graph, CompFlags::default())?;

    let ef_path = basename.with_extension(EF_EXTENSION);
    assert!(!ef_path.exists());

    // the first random-access load builds the side file
    eq_sorted(&graph, &BvGraph::with_basename(&basename).load()?)?;
    assert!(ef_path.exists());

    // with a fresh side file the offsets stream is not needed any more
    std::fs::remove_file(basename.with_extension(OFFSETS_EXTENSION))?;
    eq_sorted(&graph, &BvGraph::with_basename(&basename).load()?)?;

    // without both the side file and the offsets stream, the index is
    // rebuilt by scanning the graph stream itself
    std::fs::remove_file(&ef_path)?;
    eq_sorted(&graph, &BvGraph::with_basename(&basename).load()?)?;
    assert!(ef_path.exists());
    Ok(())
}

#[test]
fn test_load_validation() -> Result<()> {
    let graph = test_graph();
    let (_dir, basename) = temp_basename()?;
    BvComp::store(&basename, &graph, CompFlags::default())?;
    let properties_path = basename.with_extension(PROPERTIES_EXTENSION);
    let original = std::fs::read_to_string(&properties_path)?;

    // unknown graph class
    std::fs::write(
        &properties_path,
        original.replace(
            "graphclass=it.unimi.dsi.webgraph.BVGraph",
            "graphclass=some.other.Format",
        ),
    )?;
    assert!(BvGraph::with_basename(&basename).load().is_err());

    // newer version
    std::fs::write(&properties_path, original.replace("version=0", "version=1"))?;
    assert!(BvGraph::with_basename(&basename).load().is_err());

    // Golomb residuals are rejected deterministically
    std::fs::write(
        &properties_path,
        original.replace("compressionflags=", "compressionflags=RESIDUALS_GOLOMB"),
    )?;
    assert!(BvGraph::with_basename(&basename).load().is_err());

    // little-endian graphs are not supported
    std::fs::write(&properties_path, format!("{}endianness=little\n", original))?;
    assert!(BvGraph::with_basename(&basename).load().is_err());

    // restore and make sure the graph still loads
    std::fs::write(&properties_path, original)?;
    eq_sorted(&graph, &BvGraph::with_basename(&basename).load()?)?;
    Ok(())
}
