/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::graphs::bvgraph::codecs::{Encode, EncodeAndEstimate};
use crate::traits::NodeLender;
use crate::utils::{int2nat, CircularBuffer};
use anyhow::{ensure, Result};
use core::cmp::Ordering;
use lender::prelude::*;

/// Statistics accumulated while compressing a graph.
///
/// Per-field bit totals and arc classifications are summed over all nodes;
/// parallel workers keep their own copy, merged by the store driver before
/// the property file is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompStats {
    pub bits_outdegrees: u64,
    pub bits_references: u64,
    pub bits_blocks: u64,
    pub bits_intervals: u64,
    pub bits_residuals: u64,
    /// Arcs obtained by copying from a reference list.
    pub copied_arcs: u64,
    /// Arcs stored inside an interval.
    pub intervalized_arcs: u64,
    /// Arcs stored as residuals.
    pub residual_arcs: u64,
    /// Sum of the chosen reference offsets.
    pub total_ref_offset: u64,
    /// Sum of |successor - node| over all arcs.
    pub total_distance: u64,
}

impl CompStats {
    /// Merges the statistics of another worker into this one.
    pub fn add(&mut self, other: &CompStats) {
        self.bits_outdegrees += other.bits_outdegrees;
        self.bits_references += other.bits_references;
        self.bits_blocks += other.bits_blocks;
        self.bits_intervals += other.bits_intervals;
        self.bits_residuals += other.bits_residuals;
        self.copied_arcs += other.copied_arcs;
        self.intervalized_arcs += other.intervalized_arcs;
        self.residual_arcs += other.residual_arcs;
        self.total_ref_offset += other.total_ref_offset;
        self.total_distance += other.total_distance;
    }

    /// The total number of bits written for record fields.
    pub fn total_bits(&self) -> u64 {
        self.bits_outdegrees
            + self.bits_references
            + self.bits_blocks
            + self.bits_intervals
            + self.bits_residuals
    }

    /// Serializes the optional statistics keys of the property file.
    pub(crate) fn to_properties(&self, num_nodes: usize, num_arcs: u64) -> String {
        let mut s = String::new();
        if num_arcs != 0 {
            s.push_str(&format!(
                "bitsperlink={:.3}\n",
                self.total_bits() as f64 / num_arcs as f64
            ));
            s.push_str(&format!(
                "avgdist={:.3}\n",
                self.total_distance as f64 / num_arcs as f64
            ));
        }
        if num_nodes != 0 {
            s.push_str(&format!(
                "avgref={:.3}\n",
                self.total_ref_offset as f64 / num_nodes as f64
            ));
        }
        s.push_str(&format!("copiedarcs={}\n", self.copied_arcs));
        s.push_str(&format!("intervalisedarcs={}\n", self.intervalized_arcs));
        s.push_str(&format!("residualarcs={}\n", self.residual_arcs));
        s.push_str(&format!("bitsforoutdegrees={}\n", self.bits_outdegrees));
        s.push_str(&format!("bitsforreferences={}\n", self.bits_references));
        s.push_str(&format!("bitsforblocks={}\n", self.bits_blocks));
        s.push_str(&format!("bitsforintervals={}\n", self.bits_intervals));
        s.push_str(&format!("bitsforresiduals={}\n", self.bits_residuals));
        s
    }
}

/// The differential encoding of one successor list against one reference
/// list.
///
/// This could be a function, but keeping the buffers in a struct lets the
/// compressor reuse their allocations across nodes and candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DiffCompressor {
    /// The length of the list being compressed.
    outdegree: usize,
    /// The copy/skip run lengths over the reference list; the first entry is
    /// offset by one so that the writer can uniformly subtract one.
    blocks: Vec<usize>,
    /// The successors not covered by the copy blocks.
    extras: Vec<usize>,
    /// Left extremes of the intervals found in `extras`.
    left_interval: Vec<usize>,
    /// Lengths of the intervals found in `extras`.
    len_interval: Vec<usize>,
    /// The extras left over after intervalization.
    residuals: Vec<usize>,
}

impl DiffCompressor {
    /// `min_interval_length` value disabling intervalization.
    const NO_INTERVALS: usize = 0;

    fn new() -> Self {
        Self {
            outdegree: 0,
            blocks: vec![],
            extras: vec![],
            left_interval: vec![],
            len_interval: vec![],
            residuals: vec![],
        }
    }

    #[inline(always)]
    fn clear(&mut self) {
        self.outdegree = 0;
        self.blocks.clear();
        self.extras.clear();
        self.left_interval.clear();
        self.len_interval.clear();
        self.residuals.clear();
    }

    /// Fills the internal buffers with the encoding of `curr_list` against
    /// `ref_list` (none meaning no reference).
    fn compress(
        &mut self,
        curr_list: &[usize],
        ref_list: Option<&[usize]>,
        min_interval_length: usize,
    ) {
        self.clear();
        self.outdegree = curr_list.len();

        if self.outdegree != 0 {
            match ref_list {
                Some(ref_list) => self.diff_comp(curr_list, ref_list),
                None => self.extras.extend(curr_list),
            }

            if !self.extras.is_empty() {
                if min_interval_length != Self::NO_INTERVALS {
                    self.intervalize(min_interval_length);
                } else {
                    self.residuals.extend(&self.extras);
                }
            }
        }
        debug_assert_eq!(self.left_interval.len(), self.len_interval.len());
    }

    /// Walks `curr_list` and `ref_list` with two pointers, alternating copy
    /// and skip runs (copy first), and collecting non-copied successors into
    /// `extras`.
    fn diff_comp(&mut self, curr_list: &[usize], ref_list: &[usize]) {
        // position in curr_list
        let mut j = 0;
        // position in ref_list
        let mut k = 0;
        // length of the run being built
        let mut curr_block_len = 0;
        // whether the current run is a copy run
        let mut copying = true;

        while j < curr_list.len() && k < ref_list.len() {
            if copying {
                match curr_list[j].cmp(&ref_list[k]) {
                    Ordering::Greater => {
                        // the reference element is missing from the current
                        // list: close the copy run
                        self.blocks.push(curr_block_len);
                        copying = false;
                        curr_block_len = 0;
                    }
                    Ordering::Less => {
                        // not in the reference list at all
                        self.extras.push(curr_list[j]);
                        j += 1;
                    }
                    Ordering::Equal => {
                        j += 1;
                        k += 1;
                        curr_block_len += 1;
                    }
                }
            } else {
                match curr_list[j].cmp(&ref_list[k]) {
                    Ordering::Greater => {
                        k += 1;
                        curr_block_len += 1;
                    }
                    Ordering::Less => {
                        self.extras.push(curr_list[j]);
                        j += 1;
                    }
                    Ordering::Equal => {
                        // a match again: close the skip run
                        self.blocks.push(curr_block_len);
                        copying = true;
                        curr_block_len = 0;
                    }
                }
            }
        }
        // The last run is implicit, except when a copy run stops short of
        // the end of the reference list: without the explicit block the
        // decoder would copy the tail.
        if copying && k < ref_list.len() {
            self.blocks.push(curr_block_len);
        }

        self.extras.extend(&curr_list[j..]);

        // offset the first block so the writer can uniformly subtract one
        if !self.blocks.is_empty() {
            self.blocks[0] += 1;
        }
    }

    /// Extracts from `extras` the maximal runs of consecutive integers of
    /// length at least `min_interval_length`; shorter runs become residuals.
    fn intervalize(&mut self, min_interval_length: usize) {
        let total = self.extras.len();
        let mut i = 0;

        while i < total {
            let mut run = 1;
            while i + run < total && self.extras[i + run - 1] + 1 == self.extras[i + run] {
                run += 1;
            }
            if run >= min_interval_length {
                self.left_interval.push(self.extras[i]);
                self.len_interval.push(run);
                i += run;
            } else {
                self.residuals.push(self.extras[i]);
                i += 1;
            }
        }
    }

    /// Writes the buffered encoding to `writer`, returning the number of
    /// bits emitted and accounting them into `stats` per field.
    ///
    /// Must be called after [`compress`](DiffCompressor::compress); the
    /// reference offset is written only when `reference` is present (i.e.,
    /// when the graph has a nonzero compression window).
    fn write<W: Encode>(
        &self,
        writer: &mut W,
        node: usize,
        reference: Option<usize>,
        min_interval_length: usize,
        stats: &mut CompStats,
    ) -> Result<u64, W::Error> {
        let mut written_bits: u64 = 0;

        let bits = writer.write_outdegree(self.outdegree as u64)? as u64;
        stats.bits_outdegrees += bits;
        written_bits += bits;

        if self.outdegree != 0 {
            if let Some(reference) = reference {
                let bits = writer.write_reference_offset(reference as u64)? as u64;
                stats.bits_references += bits;
                written_bits += bits;
                if reference != 0 {
                    let mut bits = writer.write_block_count(self.blocks.len() as u64)? as u64;
                    for block in &self.blocks {
                        bits += writer.write_block((block - 1) as u64)? as u64;
                    }
                    stats.bits_blocks += bits;
                    written_bits += bits;
                }
            }

            if !self.extras.is_empty() && min_interval_length != Self::NO_INTERVALS {
                let mut bits = writer.write_interval_count(self.left_interval.len() as u64)? as u64;
                if !self.left_interval.is_empty() {
                    bits += writer.write_interval_start(int2nat(
                        self.left_interval[0] as i64 - node as i64,
                    ))? as u64;
                    bits += writer
                        .write_interval_len((self.len_interval[0] - min_interval_length) as u64)?
                        as u64;
                    let mut prev = self.left_interval[0] + self.len_interval[0];
                    for i in 1..self.left_interval.len() {
                        // intervals are disjoint, so the gap is off by two
                        bits += writer
                            .write_interval_start((self.left_interval[i] - prev - 1) as u64)?
                            as u64;
                        bits += writer
                            .write_interval_len((self.len_interval[i] - min_interval_length) as u64)?
                            as u64;
                        prev = self.left_interval[i] + self.len_interval[i];
                    }
                }
                stats.bits_intervals += bits;
                written_bits += bits;
            }

            if !self.residuals.is_empty() {
                let mut bits = writer
                    .write_first_residual(int2nat(self.residuals[0] as i64 - node as i64))?
                    as u64;
                for i in 1..self.residuals.len() {
                    bits += writer
                        .write_residual((self.residuals[i] - self.residuals[i - 1] - 1) as u64)?
                        as u64;
                }
                stats.bits_residuals += bits;
                written_bits += bits;
            }
        }

        Ok(written_bits)
    }
}

/// A BV-format graph compressor.
///
/// Nodes are [pushed](BvComp::push) in order with their successor lists; for
/// each node the compressor tries every reference within the window, costs
/// the candidates with the encoder's estimator, and writes the cheapest
/// encoding. See [`BvComp::store`](BvComp::store) and
/// [`BvComp::parallel_store`](BvComp::parallel_store) for the drivers
/// producing the on-disk files.
#[derive(Debug, Clone)]
pub struct BvComp<E> {
    /// The last `compression_window + 1` successor lists.
    window: CircularBuffer<Vec<usize>>,
    /// The length of the reference chain of each list in the window.
    ref_counts: CircularBuffer<usize>,
    /// The encoder producing the graph stream, with its estimator.
    encoder: E,
    /// One reusable differential compressor per candidate reference.
    compressors: Vec<DiffCompressor>,
    compression_window: usize,
    max_ref_count: usize,
    min_interval_length: usize,
    /// The node that will be compressed by the next `push`.
    curr_node: usize,
    /// The first node of this compressor's range (nonzero for parallel
    /// workers; references never cross the range start).
    start_node: usize,
    /// The number of arcs compressed so far.
    pub arcs: u64,
    /// The statistics accumulated so far.
    stats: CompStats,
}

impl<E: EncodeAndEstimate> BvComp<E> {
    /// A `min_interval_length` value disabling intervalization.
    pub const NO_INTERVALS: usize = DiffCompressor::NO_INTERVALS;

    /// Creates a compressor writing to `encoder`, starting at node
    /// `start_node`.
    pub fn new(
        encoder: E,
        compression_window: usize,
        max_ref_count: usize,
        min_interval_length: usize,
        start_node: usize,
    ) -> Self {
        BvComp {
            window: CircularBuffer::new(compression_window + 1),
            ref_counts: CircularBuffer::new(compression_window + 1),
            encoder,
            compressors: (0..compression_window + 1)
                .map(|_| DiffCompressor::new())
                .collect(),
            compression_window,
            max_ref_count,
            min_interval_length,
            curr_node: start_node,
            start_node,
            arcs: 0,
            stats: CompStats::default(),
        }
    }

    /// Returns the statistics accumulated so far.
    pub fn stats(&self) -> &CompStats {
        &self.stats
    }

    /// Compresses the successor list of the next node and returns the number
    /// of bits written.
    ///
    /// Nodes are implicit and contiguous: a node with no successors must be
    /// pushed as an empty iterator.
    pub fn push<I: IntoIterator<Item = usize>>(&mut self, succ_iter: I) -> Result<u64> {
        // Collect the iterator into the window slot of the current node,
        // reusing its allocation.
        {
            let mut succ_vec = self.window.take(self.curr_node);
            succ_vec.clear();
            succ_vec.extend(succ_iter);
            self.window.replace(self.curr_node, succ_vec);
        }
        let curr_list = &self.window[self.curr_node];
        ensure!(
            curr_list.len() < (1 << 31),
            "The outdegree of node {} does not fit 31 bits",
            self.curr_node
        );
        for pair in curr_list.windows(2) {
            ensure!(
                pair[0] < pair[1],
                "The successor list of node {} is not strictly increasing",
                self.curr_node
            );
        }
        self.arcs += curr_list.len() as u64;
        for &succ in curr_list.iter() {
            self.stats.total_distance += succ.abs_diff(self.curr_node) as u64;
        }

        // First candidate: no reference at all.
        let compressor = &mut self.compressors[0];
        compressor.compress(curr_list, None, self.min_interval_length);

        if self.compression_window == 0 {
            // No reference field is written at all.
            let written_bits = compressor.write(
                &mut self.encoder,
                self.curr_node,
                None,
                self.min_interval_length,
                &mut self.stats,
            )?;
            self.stats.intervalized_arcs += compressor.len_interval.iter().sum::<usize>() as u64;
            self.stats.residual_arcs += compressor.residuals.len() as u64;
            self.curr_node += 1;
            return Ok(written_bits);
        }

        let mut ref_offset = 0;
        let mut ref_count = 0;
        let mut min_bits = {
            let mut scratch = CompStats::default();
            let mut estimator = self.encoder.estimator();
            compressor.write(
                &mut estimator,
                self.curr_node,
                Some(0),
                self.min_interval_length,
                &mut scratch,
            )?
        };

        let candidates = 1 + self
            .compression_window
            .min(self.curr_node - self.start_node);
        for offset in 1..candidates {
            let ref_node = self.curr_node - offset;
            // A candidate whose chain is already maximal would exceed the
            // reference bound when copied from.
            let count = self.ref_counts[ref_node];
            if count >= self.max_ref_count {
                continue;
            }
            let ref_list = &self.window[ref_node];
            if ref_list.is_empty() {
                continue;
            }
            let compressor = &mut self.compressors[offset];
            compressor.compress(curr_list, Some(ref_list), self.min_interval_length);
            let bits = {
                let mut scratch = CompStats::default();
                let mut estimator = self.encoder.estimator();
                compressor.write(
                    &mut estimator,
                    self.curr_node,
                    Some(offset),
                    self.min_interval_length,
                    &mut scratch,
                )?
            };
            // Strictly less: on ties we keep the smallest reference, which
            // leaves shorter chains for future nodes.
            if bits < min_bits {
                min_bits = bits;
                ref_offset = offset;
                ref_count = count + 1;
            }
        }

        // Write the best candidate for real, reusing its buffers.
        let compressor = &mut self.compressors[ref_offset];
        let written_bits = compressor.write(
            &mut self.encoder,
            self.curr_node,
            Some(ref_offset),
            self.min_interval_length,
            &mut self.stats,
        )?;
        debug_assert_eq!(written_bits, min_bits);

        self.stats.total_ref_offset += ref_offset as u64;
        self.stats.copied_arcs += (compressor.outdegree - compressor.extras.len()) as u64;
        self.stats.intervalized_arcs += compressor.len_interval.iter().sum::<usize>() as u64;
        self.stats.residual_arcs += compressor.residuals.len() as u64;

        self.ref_counts[self.curr_node] = ref_count;
        self.curr_node += 1;
        Ok(written_bits)
    }

    /// Pushes every node of a lender.
    ///
    /// Returns the number of bits written. Nodes must be contiguous and in
    /// increasing order, matching this compressor's current node.
    pub fn extend<L>(&mut self, iter_nodes: L) -> Result<u64>
    where
        L: IntoLender,
        L::Lender: for<'next> NodeLender<'next>,
    {
        let mut count = 0;
        for_!( (_node, succ) in iter_nodes {
            count += self.push(succ)?;
        });
        Ok(count)
    }

    /// Consumes the compressor and flushes the encoder, returning the number
    /// of padding bits written.
    pub fn flush(mut self) -> Result<usize, E::Error> {
        self.encoder.flush()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_no_reference() {
        let mut compressor = DiffCompressor::new();
        compressor.compress(&[0, 1, 2, 5, 7, 8, 9], None, 2);
        assert_eq!(
            compressor,
            DiffCompressor {
                outdegree: 7,
                blocks: vec![],
                extras: vec![0, 1, 2, 5, 7, 8, 9],
                left_interval: vec![0, 7],
                len_interval: vec![3, 3],
                residuals: vec![5],
            }
        );
    }

    #[test]
    fn test_reference_prefix() {
        let mut compressor = DiffCompressor::new();
        compressor.compress(&[0, 1, 2, 5, 7, 8, 9], Some(&[0, 1, 2]), 2);
        // The copy run reaches the end of the reference list, so no block is
        // emitted at all.
        assert_eq!(
            compressor,
            DiffCompressor {
                outdegree: 7,
                blocks: vec![],
                extras: vec![5, 7, 8, 9],
                left_interval: vec![7],
                len_interval: vec![3],
                residuals: vec![5],
            }
        );
    }

    #[test]
    fn test_reference_with_tail_skip() {
        let mut compressor = DiffCompressor::new();
        compressor.compress(&[0, 1, 2, 5, 7, 8, 9], Some(&[0, 1, 2, 100]), 2);
        // The copy run must be closed explicitly, or the decoder would also
        // copy 100.
        assert_eq!(
            compressor,
            DiffCompressor {
                outdegree: 7,
                blocks: vec![4],
                extras: vec![5, 7, 8, 9],
                left_interval: vec![7],
                len_interval: vec![3],
                residuals: vec![5],
            }
        );
    }

    #[test]
    fn test_alternating_runs() {
        let mut compressor = DiffCompressor::new();
        compressor.compress(
            &[0, 1, 2, 5, 7, 8, 9, 100],
            Some(&[0, 1, 2, 4, 7, 8, 9, 101]),
            2,
        );
        assert_eq!(
            compressor,
            DiffCompressor {
                outdegree: 8,
                blocks: vec![4, 1, 3],
                extras: vec![5, 100],
                left_interval: vec![],
                len_interval: vec![],
                residuals: vec![5, 100],
            }
        );
    }

    #[test]
    fn test_intervals_disabled() {
        let mut compressor = DiffCompressor::new();
        compressor.compress(&[0, 1, 2, 3], None, DiffCompressor::NO_INTERVALS);
        assert_eq!(compressor.left_interval, vec![]);
        assert_eq!(compressor.residuals, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_identical_lists_single_block() {
        let mut compressor = DiffCompressor::new();
        compressor.compress(&[0, 1, 2], Some(&[0, 1, 2]), 4);
        // Full copy: the run reaches the end of the reference list, so the
        // block list is empty and there are no extras.
        assert_eq!(
            compressor,
            DiffCompressor {
                outdegree: 3,
                blocks: vec![],
                extras: vec![],
                left_interval: vec![],
                len_interval: vec![],
                residuals: vec![],
            }
        );
    }
}
