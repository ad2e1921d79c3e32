/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Building and caching the Elias-Fano index of record offsets.
//!
//! The `.offsets` file stores the ɣ-coded gaps between the bit offsets of
//! consecutive records; random access needs them in a structure answering
//! `offset_at(node)` in near-constant time. The index is built once,
//! serialized as the `.ef` side file, and reused as long as it is newer than
//! the files it derives from.

use super::*;
use crate::utils::MmapHelper;
use anyhow::{Context, Result};
use dsi_bitstream::prelude::*;
use dsi_progress_logger::prelude::*;
use epserde::prelude::*;
use std::fs::File;
use std::io::{BufWriter, Seek};
use std::path::Path;
use sux::prelude::*;

/// Returns whether the `.ef` side file exists and is newer than both the
/// `.offsets` and the `.graph` files.
pub fn offsets_index_is_fresh(basename: impl AsRef<Path>) -> Result<bool> {
    let basename = basename.as_ref();
    let ef_path = basename.with_extension(EF_EXTENSION);
    if !ef_path.exists() {
        return Ok(false);
    }
    let ef_modified = ef_path
        .metadata()
        .with_context(|| format!("Cannot stat {}", ef_path.display()))?
        .modified()
        .context("Cannot read modification times")?;
    for extension in [OFFSETS_EXTENSION, GRAPH_EXTENSION] {
        let source = basename.with_extension(extension);
        if source.exists() && source.metadata()?.modified()? > ef_modified {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Builds the Elias-Fano offsets index of the graph with basename `basename`
/// and serializes it as the `.ef` side file.
///
/// The index is built from the `.offsets` gap stream; if that file is
/// missing, the graph stream itself is scanned with an
/// [`OffsetDegIter`](crate::graphs::bvgraph::OffsetDegIter).
pub fn build_offsets_index(basename: impl AsRef<Path>) -> Result<()> {
    let basename = basename.as_ref();
    let graph_path = basename.with_extension(GRAPH_EXTENSION);
    let properties_path = basename.with_extension(PROPERTIES_EXTENSION);
    let offsets_path = basename.with_extension(OFFSETS_EXTENSION);

    let (num_nodes, _num_arcs, _comp_flags) = parse_properties(&properties_path)?;

    // An upper bound on the last offset: the length in bits of the whole
    // graph file.
    let mut file = File::open(&graph_path)
        .with_context(|| format!("Could not open {}", graph_path.display()))?;
    let file_len = 8 * file
        .seek(std::io::SeekFrom::End(0))
        .with_context(|| format!("Could not seek in {}", graph_path.display()))? as usize;

    let mut efb = EliasFanoBuilder::new(num_nodes + 1, file_len);

    if offsets_path.exists() {
        log::info!(
            "Building the offsets index of {} from the offsets file",
            basename.display()
        );
        let offsets =
            MmapHelper::<u32>::mmap(&offsets_path, mmap_rs::MmapFlags::SEQUENTIAL)
                .with_context(|| format!("Could not mmap {}", offsets_path.display()))?;
        let mut reader = BufBitReader::<BE, _>::new(MemWordReader::new(offsets.as_ref()));

        let mut pl = ProgressLogger::default();
        pl.display_memory(true)
            .item_name("offset")
            .expected_updates(Some(num_nodes + 1));
        pl.start("Translating offsets to Elias-Fano...");
        let mut offset: u64 = 0;
        for _ in 0..num_nodes + 1 {
            offset += reader.read_gamma().context("Could not read offset gap")?;
            efb.push(offset as _);
            pl.light_update();
        }
        pl.done();
    } else {
        log::info!(
            "The offsets file is missing, scanning the graph stream of {}",
            basename.display()
        );
        let seq_graph = BvGraphSeq::with_basename(basename).load()?;
        let mut iter = seq_graph.offset_deg_iter();
        let mut pl = ProgressLogger::default();
        pl.display_memory(true)
            .item_name("node")
            .expected_updates(Some(num_nodes));
        pl.start("Scanning the graph...");
        for (offset, _degree) in iter.by_ref() {
            efb.push(offset as _);
            pl.light_update();
        }
        // one-past-the-end: the total content length of the stream
        efb.push(iter.bit_pos() as _);
        pl.done();
    }

    let ef = efb.build();
    let ef: EF = unsafe { ef.map_high_bits(SelectAdaptConst::<_, _, 12, 4>::new) };

    let ef_path = basename.with_extension(EF_EXTENSION);
    let mut ef_file = BufWriter::new(
        File::create(&ef_path)
            .with_context(|| format!("Could not create {}", ef_path.display()))?,
    );
    ef.serialize(&mut ef_file)
        .with_context(|| format!("Could not serialize the index to {}", ef_path.display()))?;
    Ok(())
}

/// Builds the `.ef` side file unless a fresh one is already there.
pub fn ensure_offsets_index(basename: impl AsRef<Path>) -> Result<()> {
    let basename = basename.as_ref();
    if offsets_index_is_fresh(basename)? {
        return Ok(());
    }
    build_offsets_index(basename)
}
